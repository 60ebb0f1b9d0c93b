//! Routes one process invocation to a command handler.
//!
//! A run moves through three states: idle (nothing parsed yet), resolving
//! (argv parsed, command looked up, auth precondition checked), and
//! executing (handler running). It terminates in a success outcome or a
//! typed failure. This is the single last-resort error boundary for a
//! command invocation: handler failures are logged and surfaced as a failed
//! outcome, never as a raw crash.

use tracing::{debug, error};

use crate::auth::ENV_KEY_SOURCES;
use crate::cli::parser;
use crate::commands::registry::CommandRegistry;
use crate::commands::{handlers, CommandContext, Outcome};
use crate::error::{Error, Result};

pub struct Dispatcher {
    registry: CommandRegistry,
    context: CommandContext,
}

impl Dispatcher {
    pub fn new(registry: CommandRegistry, context: CommandContext) -> Self {
        Self { registry, context }
    }

    pub async fn run(&mut self, args: &[String]) -> Result<Outcome> {
        // Idle -> Resolving.
        let invocation = parser::parse(args);

        // No command at all is a request for orientation, not a failure.
        let Some(command) = invocation.command.clone() else {
            return Ok(Outcome::Rendered(handlers::help::general_help(
                &self.registry,
            )));
        };

        let Some(descriptor) = self.registry.get(&command) else {
            return Err(Error::command(format!(
                "unknown command '{command}'\nKnown commands: {}",
                self.registry.known_tokens().join(", ")
            )));
        };

        // Auth gate: handlers that talk to the API never run without a
        // usable credential.
        if descriptor.requires_auth && !self.context.vault.has_valid_key() {
            return Err(Error::authentication(format!(
                "'{}' requires an API key; add one with 'parley keys add <name> <key>' \
                 or set one of: {}",
                descriptor.name,
                ENV_KEY_SOURCES.join(", ")
            )));
        }

        // Resolving -> Executing.
        debug!(command = descriptor.name, "dispatching");
        match (descriptor.handler)(&mut self.context, invocation).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(command = descriptor.name, error = %e, "command failed");
                Err(e)
            }
        }
    }
}
