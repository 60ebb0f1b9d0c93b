//! Handler bodies for the registered commands.

pub mod chat;
pub mod config_cmd;
pub mod help;
pub mod keys;
pub mod models;
pub mod sessions;
