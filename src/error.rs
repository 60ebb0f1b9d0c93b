use std::error::Error as StdError;
use std::fmt;

/// Failure categories surfaced by the core.
///
/// Every fallible core operation returns one of these rather than an
/// ambiguous sentinel. Lookups with a documented "absent" case
/// (`CommandRegistry::get`, `KeyVault::current_key`) return `Option`
/// instead and never use an error for plain absence.
#[derive(Debug)]
pub enum Error {
    /// Malformed input: empty names, bad key format, missing required args.
    Validation(String),

    /// No usable credential, or the stored credential failed to decrypt.
    Authentication(String),

    /// Persisted state (vault, session, config file) could not be read or
    /// written.
    Configuration {
        message: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// Unknown command or a registry that failed to build.
    Command(String),

    /// Remote-call failure, re-surfaced verbatim from the transport.
    Api(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    pub fn configuration_with(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Error::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn command(message: impl Into<String>) -> Self {
        Error::Command(message.into())
    }

    pub fn api(message: impl Into<String>) -> Self {
        Error::Api(message.into())
    }

    /// Short tag used when reporting the failure to the operator.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Authentication(_) => "authentication",
            Error::Configuration { .. } => "configuration",
            Error::Command(_) => "command",
            Error::Api(_) => "api",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(message)
            | Error::Authentication(message)
            | Error::Command(message)
            | Error::Api(message) => write!(f, "{message}"),
            Error::Configuration { message, source } => match source {
                Some(source) => write!(f, "{message}: {source}"),
                None => write!(f, "{message}"),
            },
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Configuration {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_keep_their_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::configuration_with("could not write vault file", io);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn labels_match_categories() {
        assert_eq!(Error::validation("x").label(), "validation");
        assert_eq!(Error::authentication("x").label(), "authentication");
        assert_eq!(Error::command("x").label(), "command");
        assert_eq!(Error::api("x").label(), "api");
    }
}
