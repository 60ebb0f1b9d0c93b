//! Command table, execution context, and dispatch.
//!
//! Every command the binary understands is declared in [`COMMANDS`]; the
//! registry indexes that table at startup and the dispatcher routes one
//! parsed invocation through it.

pub mod dispatcher;
pub mod handlers;
pub mod registry;

use crate::api::client::HttpTransport;
use crate::auth::KeyVault;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::SessionStore;

use registry::{CommandDescriptor, CommandRegistry};

/// What a successfully executed command hands back for presentation.
#[derive(Debug)]
pub enum Outcome {
    /// Text for the caller to print.
    Rendered(String),
    /// The command wrote its own output (interactive commands).
    Done,
}

/// Shared state handed to every handler.
pub struct CommandContext {
    pub config: Config,
    pub vault: KeyVault,
    pub sessions: SessionStore,
}

impl CommandContext {
    /// Context backed by the default on-disk locations.
    pub fn load() -> Result<Self> {
        Ok(Self {
            config: Config::load()?,
            vault: KeyVault::load()?,
            sessions: SessionStore::open(),
        })
    }

    pub fn new(config: Config, vault: KeyVault, sessions: SessionStore) -> Self {
        Self {
            config,
            vault,
            sessions,
        }
    }

    /// Transport bound to the resolved API key and configured base URL.
    pub fn transport(&mut self) -> Result<HttpTransport> {
        let api_key = self.vault.api_key()?.ok_or_else(|| {
            Error::authentication(
                "no API key available; add one with 'parley keys add <name> <key>'",
            )
        })?;
        Ok(HttpTransport::new(self.config.base_url(), api_key))
    }
}

/// The registration table. Order here is the order `help` lists commands.
static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "chat",
        aliases: &["c"],
        group: "conversation",
        requires_auth: true,
        summary: "Start an interactive conversation.",
        usage: "chat [--model <id>] [--system <prompt>] [--session <id>] [--file <path,...>] [--log <path>] [--no-stream]",
        handler: handlers::chat::chat,
    },
    CommandDescriptor {
        name: "ask",
        aliases: &["q"],
        group: "conversation",
        requires_auth: true,
        summary: "Send a single prompt and print the reply.",
        usage: "ask [--model <id>] [--system <prompt>] [--no-stream] <prompt...>",
        handler: handlers::chat::ask,
    },
    CommandDescriptor {
        name: "models",
        aliases: &["m"],
        group: "conversation",
        requires_auth: true,
        summary: "List models available to your key.",
        usage: "models",
        handler: handlers::models::models,
    },
    CommandDescriptor {
        name: "sessions",
        aliases: &[],
        group: "conversation",
        requires_auth: false,
        summary: "List or delete saved sessions.",
        usage: "sessions [list | delete <id>]",
        handler: handlers::sessions::sessions,
    },
    CommandDescriptor {
        name: "keys",
        aliases: &["k"],
        group: "credentials",
        requires_auth: false,
        summary: "Manage stored API keys.",
        usage: "keys <add <name> <key> | remove <name> | use <name> | list>",
        handler: handlers::keys::keys,
    },
    CommandDescriptor {
        name: "config",
        aliases: &["cfg"],
        group: "settings",
        requires_auth: false,
        summary: "Show or change configuration values.",
        usage: "config [show | set <key> <value> | unset <key>]",
        handler: handlers::config_cmd::config,
    },
    CommandDescriptor {
        name: "help",
        aliases: &["h"],
        group: "general",
        requires_auth: false,
        summary: "Show this help.",
        usage: "help",
        handler: handlers::help::help,
    },
    CommandDescriptor {
        name: "version",
        aliases: &[],
        group: "general",
        requires_auth: false,
        summary: "Print the version.",
        usage: "version",
        handler: handlers::help::version,
    },
];

/// Builds the registry from the static table, failing fast on collisions.
pub fn default_registry() -> Result<CommandRegistry> {
    CommandRegistry::build(COMMANDS)
}
