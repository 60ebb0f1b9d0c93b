//! Parley is a command-line client for hosted conversational-AI APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`cli`] tokenizes argv into a command, subcommand, options, and
//!   positional arguments.
//! - [`commands`] owns the command registry and the dispatcher that routes
//!   one invocation to a handler, enforcing the authentication gate.
//! - [`auth`] is the encrypted credential vault with its "current key"
//!   selection and in-memory plaintext cache.
//! - [`session`] persists and restores named conversation transcripts.
//! - [`api`] speaks the remote service's wire format, including streamed
//!   replies.
//! - [`chat`] runs the interactive read-eval loop for the `chat` command.
//!
//! The binary entrypoint (`src/main.rs`) builds the registry and context,
//! hands argv to [`commands::dispatcher::Dispatcher`], and maps the outcome
//! to an exit code.

pub mod api;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
