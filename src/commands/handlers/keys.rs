//! The `keys` command: manage the credential vault.

use crate::cli::Invocation;
use crate::commands::registry::HandlerFuture;
use crate::commands::{CommandContext, Outcome};
use crate::error::Error;

pub fn keys<'a>(ctx: &'a mut CommandContext, inv: Invocation) -> HandlerFuture<'a> {
    Box::pin(async move {
        match inv.subcommand.as_deref() {
            Some("add") => {
                let name = inv.positional_args.first().ok_or_else(usage_add)?;
                let raw_key = inv.positional_args.get(1).ok_or_else(usage_add)?;
                // --no-use stores the key without switching to it.
                let make_current = !inv.has_option("no-use");
                ctx.vault.add_key(name, raw_key, make_current)?;
                let listing = ctx.vault.list_keys();
                if listing.current.as_deref() == Some(name.as_str()) {
                    Ok(Outcome::Rendered(format!(
                        "Stored key '{name}' and made it current."
                    )))
                } else {
                    Ok(Outcome::Rendered(format!("Stored key '{name}'.")))
                }
            }
            Some("remove") => {
                let name = inv.positional_args.first().ok_or_else(|| {
                    Error::validation("usage: parley keys remove <name>")
                })?;
                ctx.vault.remove_key(name)?;
                match ctx.vault.list_keys().current {
                    Some(current) => Ok(Outcome::Rendered(format!(
                        "Removed key '{name}'; current key is now '{current}'."
                    ))),
                    None => Ok(Outcome::Rendered(format!(
                        "Removed key '{name}'; no keys remain."
                    ))),
                }
            }
            Some("use") => {
                let name = inv.positional_args.first().ok_or_else(|| {
                    Error::validation("usage: parley keys use <name>")
                })?;
                ctx.vault.set_current_key(name)?;
                Ok(Outcome::Rendered(format!("Current key is now '{name}'.")))
            }
            Some("list") | None => Ok(Outcome::Rendered(render_listing(ctx))),
            Some(other) => Err(Error::validation(format!(
                "unknown keys subcommand '{other}' (expected add, remove, use, or list)"
            ))),
        }
    })
}

fn usage_add() -> Error {
    Error::validation("usage: parley keys add <name> <key> [--no-use]")
}

fn render_listing(ctx: &CommandContext) -> String {
    let listing = ctx.vault.list_keys();
    if listing.keys.is_empty() {
        return "No keys stored. Add one with 'parley keys add <name> <key>'.".to_string();
    }
    let mut out = String::from("Stored keys:\n");
    for (name, meta) in &listing.keys {
        let marker = if meta.is_current { "*" } else { " " };
        out.push_str(&format!(
            "{marker} {name}  (added {})\n",
            meta.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    out
}
