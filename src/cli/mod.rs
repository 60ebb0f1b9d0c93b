//! Command-line tokenization.
//!
//! The grammar is deliberately small: `parley <command> [<subcommand>]
//! [--flag[=value] | -f [value] | -abc] [positional...]`. Parsing produces an
//! [`parser::Invocation`] and nothing else; interpreting option values beyond
//! string/boolean is the consuming handler's job.

pub mod parser;

pub use parser::{Invocation, OptionValue};
