//! Command descriptors and lookup tables.
//!
//! Commands are declared once in a static table and indexed at startup.
//! Aliases resolve to their command; a name or alias declared twice is a
//! registration error surfaced before any dispatch happens, never a silent
//! override.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::cli::Invocation;
use crate::commands::{CommandContext, Outcome};
use crate::error::{Error, Result};

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Outcome>> + 'a>>;
pub type Handler = for<'a> fn(&'a mut CommandContext, Invocation) -> HandlerFuture<'a>;

#[derive(Debug)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub group: &'static str,
    pub requires_auth: bool,
    pub summary: &'static str,
    pub usage: &'static str,
    pub handler: Handler,
}

#[derive(Debug)]
pub struct CommandRegistry {
    descriptors: &'static [CommandDescriptor],
    by_name: HashMap<&'static str, usize>,
    by_alias: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    /// Indexes a descriptor table, rejecting duplicate names and alias
    /// collisions with any name or other alias.
    pub fn build(descriptors: &'static [CommandDescriptor]) -> Result<Self> {
        let mut by_name = HashMap::new();
        let mut by_alias = HashMap::new();

        for (index, descriptor) in descriptors.iter().enumerate() {
            if by_name.insert(descriptor.name, index).is_some() {
                return Err(Error::command(format!(
                    "duplicate command name '{}' in registration table",
                    descriptor.name
                )));
            }
        }
        for (index, descriptor) in descriptors.iter().enumerate() {
            for alias in descriptor.aliases {
                if by_name.contains_key(alias) {
                    return Err(Error::command(format!(
                        "alias '{alias}' of command '{}' collides with a command name",
                        descriptor.name
                    )));
                }
                if by_alias.insert(*alias, index).is_some() {
                    return Err(Error::command(format!(
                        "alias '{alias}' is declared by more than one command"
                    )));
                }
            }
        }

        Ok(Self {
            descriptors,
            by_name,
            by_alias,
        })
    }

    /// Resolves a token against names first, then aliases. `None` means the
    /// token is simply not a known command; that is not an error here.
    pub fn get(&self, token: &str) -> Option<&'static CommandDescriptor> {
        self.by_name
            .get(token)
            .or_else(|| self.by_alias.get(token))
            .map(|&index| &self.descriptors[index])
    }

    /// All descriptors in registration order, for help and diagnostics.
    pub fn list(&self) -> &'static [CommandDescriptor] {
        self.descriptors
    }

    /// Known names and aliases, used as diagnostic context for unknown
    /// command failures.
    pub fn known_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        for descriptor in self.descriptors {
            tokens.push(descriptor.name.to_string());
            for alias in descriptor.aliases {
                tokens.push(format!("{alias} (alias of {})", descriptor.name));
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop<'a>(_ctx: &'a mut CommandContext, _inv: Invocation) -> HandlerFuture<'a> {
        Box::pin(async { Ok(Outcome::Rendered(String::new())) })
    }

    static WELL_FORMED: &[CommandDescriptor] = &[
        CommandDescriptor {
            name: "alpha",
            aliases: &["a"],
            group: "general",
            requires_auth: false,
            summary: "",
            usage: "alpha",
            handler: noop,
        },
        CommandDescriptor {
            name: "beta",
            aliases: &["b"],
            group: "general",
            requires_auth: true,
            summary: "",
            usage: "beta",
            handler: noop,
        },
    ];

    static DUPLICATE_NAME: &[CommandDescriptor] = &[
        CommandDescriptor {
            name: "alpha",
            aliases: &[],
            group: "general",
            requires_auth: false,
            summary: "",
            usage: "alpha",
            handler: noop,
        },
        CommandDescriptor {
            name: "alpha",
            aliases: &[],
            group: "general",
            requires_auth: false,
            summary: "",
            usage: "alpha",
            handler: noop,
        },
    ];

    static ALIAS_SHADOWS_NAME: &[CommandDescriptor] = &[
        CommandDescriptor {
            name: "alpha",
            aliases: &["beta"],
            group: "general",
            requires_auth: false,
            summary: "",
            usage: "alpha",
            handler: noop,
        },
        CommandDescriptor {
            name: "beta",
            aliases: &[],
            group: "general",
            requires_auth: false,
            summary: "",
            usage: "beta",
            handler: noop,
        },
    ];

    static ALIAS_DECLARED_TWICE: &[CommandDescriptor] = &[
        CommandDescriptor {
            name: "alpha",
            aliases: &["x"],
            group: "general",
            requires_auth: false,
            summary: "",
            usage: "alpha",
            handler: noop,
        },
        CommandDescriptor {
            name: "beta",
            aliases: &["x"],
            group: "general",
            requires_auth: false,
            summary: "",
            usage: "beta",
            handler: noop,
        },
    ];

    #[test]
    fn names_resolve_before_aliases() {
        let registry = CommandRegistry::build(WELL_FORMED).expect("build");
        assert_eq!(registry.get("alpha").expect("found").name, "alpha");
        assert_eq!(registry.get("b").expect("found").name, "beta");
        assert!(registry.get("gamma").is_none());
    }

    #[test]
    fn listing_preserves_registration_order() {
        let registry = CommandRegistry::build(WELL_FORMED).expect("build");
        let names: Vec<&str> = registry.list().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn duplicate_names_fail_registration() {
        let err = CommandRegistry::build(DUPLICATE_NAME).expect_err("must fail");
        assert!(matches!(err, Error::Command(_)));
    }

    #[test]
    fn alias_colliding_with_a_name_fails_registration() {
        let err = CommandRegistry::build(ALIAS_SHADOWS_NAME).expect_err("must fail");
        assert!(matches!(err, Error::Command(_)));
    }

    #[test]
    fn alias_declared_twice_fails_registration() {
        let err = CommandRegistry::build(ALIAS_DECLARED_TWICE).expect_err("must fail");
        assert!(matches!(err, Error::Command(_)));
    }

    #[test]
    fn known_tokens_include_names_and_aliases() {
        let registry = CommandRegistry::build(WELL_FORMED).expect("build");
        let tokens = registry.known_tokens();
        assert!(tokens.iter().any(|t| t == "alpha"));
        assert!(tokens.iter().any(|t| t.starts_with("a (alias of alpha)")));
    }
}
