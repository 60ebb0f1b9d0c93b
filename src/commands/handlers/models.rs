//! The `models` command: list what the credential can reach.

use crate::api::client::ChatTransport;
use crate::api::sort_models;
use crate::cli::Invocation;
use crate::commands::registry::HandlerFuture;
use crate::commands::{CommandContext, Outcome};

pub fn models<'a>(ctx: &'a mut CommandContext, _inv: Invocation) -> HandlerFuture<'a> {
    Box::pin(async move {
        let transport = ctx.transport()?;
        let mut models = transport.list_models().await?;
        if models.is_empty() {
            return Ok(Outcome::Rendered("No models available.".to_string()));
        }
        sort_models(&mut models);

        let mut out = String::from("Available models:\n");
        for model in &models {
            match &model.owned_by {
                Some(owner) => out.push_str(&format!("  {}  ({owner})\n", model.id)),
                None => out.push_str(&format!("  {}\n", model.id)),
            }
        }
        Ok(Outcome::Rendered(out))
    })
}
