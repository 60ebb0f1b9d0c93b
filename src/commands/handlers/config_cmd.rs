//! The `config` command: show and change persisted settings.

use crate::cli::Invocation;
use crate::commands::registry::HandlerFuture;
use crate::commands::{CommandContext, Outcome};
use crate::error::Error;

pub fn config<'a>(ctx: &'a mut CommandContext, inv: Invocation) -> HandlerFuture<'a> {
    Box::pin(async move {
        match inv.subcommand.as_deref() {
            None | Some("show") => Ok(Outcome::Rendered(ctx.config.render())),
            Some("set") => {
                let key = inv.positional_args.first().ok_or_else(|| {
                    Error::validation("usage: parley config set <key> <value>")
                })?;
                let value = inv.positional_args[1..].join(" ");
                if value.is_empty() {
                    return Err(Error::validation(
                        "usage: parley config set <key> <value>",
                    ));
                }
                ctx.config.set(key, &value)?;
                ctx.config.save()?;
                Ok(Outcome::Rendered(format!("Set {key} to: {value}")))
            }
            Some("unset") => {
                let key = inv.positional_args.first().ok_or_else(|| {
                    Error::validation("usage: parley config unset <key>")
                })?;
                ctx.config.unset(key)?;
                ctx.config.save()?;
                Ok(Outcome::Rendered(format!("Unset {key}")))
            }
            Some(other) => Err(Error::validation(format!(
                "unknown config subcommand '{other}' (expected show, set, or unset)"
            ))),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::KeyVault;
    use crate::config::Config;
    use crate::session::SessionStore;
    use tempfile::TempDir;

    fn context_in(dir: &TempDir) -> CommandContext {
        CommandContext::new(
            Config::default(),
            KeyVault::load_from_path(&dir.path().join("keys.json")).expect("vault"),
            SessionStore::open_at(dir.path().join("sessions")),
        )
    }

    fn invocation(subcommand: Option<&str>, positional: &[&str]) -> Invocation {
        Invocation {
            command: Some("config".to_string()),
            subcommand: subcommand.map(String::from),
            options: Default::default(),
            positional_args: positional.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn show_is_the_default_subcommand() {
        let dir = TempDir::new().expect("temp dir");
        let mut ctx = context_in(&dir);
        let outcome = config(&mut ctx, invocation(None, &[]))
            .await
            .expect("show succeeds");
        match outcome {
            Outcome::Rendered(text) => assert!(text.contains("default-model")),
            Outcome::Done => panic!("expected rendered output"),
        }
    }

    #[tokio::test]
    async fn set_without_a_value_reports_usage() {
        let dir = TempDir::new().expect("temp dir");
        let mut ctx = context_in(&dir);
        let err = config(&mut ctx, invocation(Some("set"), &["default-model"]))
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_keys_are_rejected_before_saving() {
        let dir = TempDir::new().expect("temp dir");
        let mut ctx = context_in(&dir);
        let err = config(&mut ctx, invocation(Some("set"), &["colour", "mauve"]))
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::Validation(_)));
    }
}
