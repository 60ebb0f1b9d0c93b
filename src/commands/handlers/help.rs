//! The `help` and `version` commands.

use crate::cli::Invocation;
use crate::commands::registry::{CommandRegistry, HandlerFuture};
use crate::commands::{CommandContext, Outcome};

/// Renders the general help: usage, then every command grouped by its
/// `group` tag in registration order. Grouping is presentation only.
pub fn general_help(registry: &CommandRegistry) -> String {
    let mut out = format!(
        "parley {}, a command-line client for conversational-AI APIs\n\n\
         Usage: parley <command> [<subcommand>] [--flag[=value] | -f [value]] [args...]\n",
        env!("CARGO_PKG_VERSION")
    );

    let mut groups: Vec<&'static str> = Vec::new();
    for descriptor in registry.list() {
        if !groups.contains(&descriptor.group) {
            groups.push(descriptor.group);
        }
    }

    for group in groups {
        out.push_str(&format!("\n{group}:\n"));
        for descriptor in registry.list().iter().filter(|d| d.group == group) {
            let name = if descriptor.aliases.is_empty() {
                descriptor.name.to_string()
            } else {
                format!("{} ({})", descriptor.name, descriptor.aliases.join(", "))
            };
            out.push_str(&format!("  {name:<14} {}\n", descriptor.summary));
            out.push_str(&format!("  {:<14}   usage: parley {}\n", "", descriptor.usage));
        }
    }

    out.push_str(
        "\nAPI keys are kept in an encrypted vault; see 'parley keys'. \
         Set PARLEY_API_KEY or OPENAI_API_KEY to use a key without storing it.\n",
    );
    out
}

pub fn help<'a>(_ctx: &'a mut CommandContext, _inv: Invocation) -> HandlerFuture<'a> {
    Box::pin(async {
        let registry = crate::commands::default_registry()?;
        Ok(Outcome::Rendered(general_help(&registry)))
    })
}

pub fn version<'a>(_ctx: &'a mut CommandContext, _inv: Invocation) -> HandlerFuture<'a> {
    Box::pin(async { Ok(Outcome::Rendered(format!("parley {}", env!("CARGO_PKG_VERSION")))) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_help_lists_every_command_grouped() {
        let registry = crate::commands::default_registry().expect("registry");
        let help_text = general_help(&registry);

        for name in ["chat", "ask", "models", "sessions", "keys", "config", "help", "version"] {
            assert!(help_text.contains(name), "missing {name}");
        }
        for group in ["conversation:", "credentials:", "settings:", "general:"] {
            assert!(help_text.contains(group), "missing {group}");
        }
        assert!(help_text.contains("(c)"), "alias rendering");
    }
}
