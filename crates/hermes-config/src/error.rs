//! Why a [`HermesConfig`](crate::HermesConfig) could not be produced.

use std::path::PathBuf;
use thiserror::Error;

/// A configuration source was missing, malformed, or held a value the
/// dispatcher or client cannot run with.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `with_file` pointed at nothing.
    #[error("no configuration at {path}")]
    Missing {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but reading it failed.
    #[error("cannot read {path}")]
    Unreadable {
        /// Requested path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Only `toml` and `json` sources are understood.
    #[error("unsupported configuration format '{0}', expected toml or json")]
    UnsupportedFormat(String),

    /// Malformed TOML, or TOML naming an unknown section or key.
    #[error("bad TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or JSON naming an unknown section or key.
    #[error("bad JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file was found but could not be applied.
    #[error("bad .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// A `PREFIX__SECTION__KEY` variable did not parse.
    #[error("environment override {var}: {reason}")]
    EnvOverride {
        /// Variable name as found in the environment.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// A loaded value fails validation, e.g. `client.retry.max_attempts = 0`.
    #[error("{key}: {reason}")]
    Invalid {
        /// Dotted key, such as `client.base_url`.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_key() {
        let err = ConfigError::invalid("client.base_url", "missing scheme");
        assert_eq!(err.to_string(), "client.base_url: missing scheme");

        let err = ConfigError::env_override("HERMES__CLIENT__TIMEOUT_MS", "expected integer");
        assert_eq!(
            err.to_string(),
            "environment override HERMES__CLIENT__TIMEOUT_MS: expected integer"
        );
    }

    #[test]
    fn test_unreadable_keeps_io_source() {
        let err = ConfigError::Unreadable {
            path: PathBuf::from("/etc/hermes/hermes.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/etc/hermes/hermes.toml"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
