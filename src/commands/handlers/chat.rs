//! The `chat` and `ask` commands.

use std::io::Write as _;
use std::path::Path;

use crate::api::client::{ChatTransport, Reply, StreamEvent};
use crate::api::{ChatMessage, ChatRequest};
use crate::chat::{run_loop, ChatOptions};
use crate::cli::Invocation;
use crate::commands::registry::HandlerFuture;
use crate::commands::{CommandContext, Outcome};
use crate::error::{Error, Result};
use crate::logging::TranscriptLog;

fn resolve_model(ctx: &CommandContext, inv: &Invocation) -> String {
    inv.option("model")
        .or_else(|| inv.option("m"))
        .unwrap_or(ctx.config.default_model())
        .to_string()
}

fn resolve_temperature(inv: &Invocation) -> Result<Option<f64>> {
    match inv.option("temperature") {
        None => Ok(None),
        Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| {
            Error::validation(format!("temperature must be a number, got '{raw}'"))
        }),
    }
}

pub fn chat<'a>(ctx: &'a mut CommandContext, inv: Invocation) -> HandlerFuture<'a> {
    Box::pin(async move {
        let transport = ctx.transport()?;
        let options = ChatOptions {
            model: resolve_model(ctx, &inv),
            stream: ctx.config.stream() && !inv.has_option("no-stream"),
            temperature: resolve_temperature(&inv)?,
        };

        let mut session = match inv.option("session").or_else(|| inv.option("s")) {
            Some(id) => {
                let session = ctx.sessions.load(id)?;
                println!(
                    "Resumed session '{}' ({} messages).",
                    session.id,
                    session.messages.len()
                );
                session
            }
            None => ctx.sessions.create(),
        };

        if let Some(system) = inv.option("system") {
            session.system_prompt = Some(system.to_string());
        }

        if let Some(files) = inv.option("file") {
            for path in files.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let uploaded = transport.upload_file(Path::new(path)).await?;
                println!("Attached {path} as {}.", uploaded.id);
                session.attached_file_ids.push(uploaded.id);
            }
        }

        let log = TranscriptLog::new(inv.option("log").map(String::from))?;
        run_loop(&transport, &ctx.sessions, &mut session, log, options).await?;
        Ok(Outcome::Done)
    })
}

/// The parser treats the first free token after `ask` as a subcommand;
/// for a prose prompt that token is just the first word, so it is folded
/// back in here.
fn prompt_text(inv: &Invocation) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(subcommand) = inv.subcommand.as_deref() {
        parts.push(subcommand);
    }
    parts.extend(inv.positional_args.iter().map(String::as_str));
    parts.join(" ")
}

pub fn ask<'a>(ctx: &'a mut CommandContext, inv: Invocation) -> HandlerFuture<'a> {
    Box::pin(async move {
        let prompt = prompt_text(&inv);
        if prompt.trim().is_empty() {
            return Err(Error::validation(
                "usage: parley ask [options] <prompt...>",
            ));
        }

        let transport = ctx.transport()?;
        let stream = ctx.config.stream() && !inv.has_option("no-stream");

        let mut messages = Vec::new();
        if let Some(system) = inv.option("system") {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt,
        });

        let request = ChatRequest {
            model: resolve_model(ctx, &inv),
            messages,
            stream,
            temperature: resolve_temperature(&inv)?,
        };

        match transport.send_message(request).await? {
            Reply::Complete(content) => Ok(Outcome::Rendered(content)),
            Reply::Stream(mut rx) => {
                while let Some(event) = rx.recv().await {
                    match event {
                        StreamEvent::Chunk(chunk) => {
                            print!("{chunk}");
                            let _ = std::io::stdout().flush();
                        }
                        StreamEvent::Error(message) => {
                            println!();
                            return Err(Error::api(message));
                        }
                        StreamEvent::End => break,
                    }
                }
                println!();
                Ok(Outcome::Done)
            }
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

    fn invocation_with_options(options: &[(&str, Option<&str>)]) -> Invocation {
        let mut inv = Invocation {
            command: Some("chat".to_string()),
            ..Default::default()
        };
        for (name, value) in options {
            let parsed = match value {
                Some(value) => crate::cli::OptionValue::Value(value.to_string()),
                None => crate::cli::OptionValue::Flag,
            };
            inv.options.insert(name.to_string(), parsed);
        }
        inv
    }

    #[test]
    fn model_resolution_prefers_the_option_over_config() {
        let dir = TempDir::new().expect("temp dir");
        let mut ctx = context_in(&dir);
        ctx.config.set("default-model", "configured").expect("set");

        let inv = invocation_with_options(&[("model", Some("from-flag"))]);
        assert_eq!(resolve_model(&ctx, &inv), "from-flag");

        let inv = invocation_with_options(&[]);
        assert_eq!(resolve_model(&ctx, &inv), "configured");
    }

    #[test]
    fn short_model_option_is_accepted() {
        let dir = TempDir::new().expect("temp dir");
        let ctx = context_in(&dir);
        let inv = invocation_with_options(&[("m", Some("short"))]);
        assert_eq!(resolve_model(&ctx, &inv), "short");
    }

    #[test]
    fn temperature_is_validated() {
        let inv = invocation_with_options(&[("temperature", Some("0.7"))]);
        assert_eq!(resolve_temperature(&inv).expect("parses"), Some(0.7));

        let inv = invocation_with_options(&[("temperature", Some("warm"))]);
        assert!(matches!(
            resolve_temperature(&inv),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn prompt_folds_the_subcommand_token_back_in() {
        let inv = Invocation {
            command: Some("ask".to_string()),
            subcommand: Some("what".to_string()),
            options: Default::default(),
            positional_args: vec!["is".to_string(), "rust".to_string()],
        };
        assert_eq!(prompt_text(&inv), "what is rust");
    }

    #[tokio::test]
    async fn ask_without_a_prompt_is_a_validation_error() {
        let dir = TempDir::new().expect("temp dir");
        let mut ctx = context_in(&dir);
        let inv = Invocation {
            command: Some("ask".to_string()),
            ..Default::default()
        };
        let err = ask(&mut ctx, inv).await.expect_err("must fail");
        assert!(matches!(err, Error::Validation(_)));
    }
}
