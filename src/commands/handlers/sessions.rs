//! The `sessions` command: inspect saved transcripts.

use crate::cli::Invocation;
use crate::commands::registry::HandlerFuture;
use crate::commands::{CommandContext, Outcome};
use crate::error::Error;

pub fn sessions<'a>(ctx: &'a mut CommandContext, inv: Invocation) -> HandlerFuture<'a> {
    Box::pin(async move {
        match inv.subcommand.as_deref() {
            None | Some("list") => {
                let ids = ctx.sessions.list()?;
                if ids.is_empty() {
                    return Ok(Outcome::Rendered(
                        "No saved sessions. Save one from a chat with /save.".to_string(),
                    ));
                }
                let mut out = String::from("Saved sessions:\n");
                for id in ids {
                    out.push_str(&format!("  {id}\n"));
                }
                Ok(Outcome::Rendered(out))
            }
            Some("delete") => {
                let id = inv.positional_args.first().ok_or_else(|| {
                    Error::validation("usage: parley sessions delete <id>")
                })?;
                ctx.sessions.delete(id)?;
                Ok(Outcome::Rendered(format!("Deleted session '{id}'.")))
            }
            Some(other) => Err(Error::validation(format!(
                "unknown sessions subcommand '{other}' (expected list or delete)"
            ))),
        }
    })
}
