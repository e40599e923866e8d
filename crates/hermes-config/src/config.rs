//! Root configuration type.

use hermes_telemetry::LogFormat;
use http::Uri;
use serde::{Deserialize, Serialize};

use crate::{ClientSettings, ConfigError, DispatcherSettings, LoggingSettings};

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Dispatcher (server side) settings.
    #[serde(default)]
    pub server: DispatcherSettings,

    /// Client engine settings.
    #[serde(default)]
    pub client: ClientSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl HermesConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `client.base_url` is not an absolute `http`/`https` URL
    /// - `client.timeout_ms` or `server.max_body_bytes` is zero
    /// - `client.retry.max_attempts` is zero
    /// - `logging.format` is not `json` or `pretty`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = &self.client.base_url;
        let uri = base_url
            .parse::<Uri>()
            .map_err(|e| ConfigError::invalid("client.base_url", e.to_string()))?;
        match uri.scheme_str() {
            Some("http" | "https") => {}
            _ => {
                return Err(ConfigError::invalid(
                    "client.base_url",
                    format!("expected an http or https URL, got '{base_url}'"),
                ))
            }
        }
        if uri.authority().is_none() {
            return Err(ConfigError::invalid(
                "client.base_url",
                format!("missing host in '{base_url}'"),
            ));
        }

        if self.client.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "client.timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.client.retry.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "client.retry.max_attempts",
                "must be at least 1",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if let Err(e) = self.logging.format.parse::<LogFormat>() {
            return Err(ConfigError::invalid("logging.format", e.to_string()));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, internal errors exposed.
    #[must_use]
    pub fn development() -> Self {
        Self {
            server: DispatcherSettings {
                expose_internal_errors: true,
                ..Default::default()
            },
            client: ClientSettings::default(),
            logging: LoggingSettings {
                level: "debug".to_string(),
                format: LogFormat::Pretty.as_str().to_string(),
                include_location: true,
                ..Default::default()
            },
        }
    }

    /// Production preset: JSON logs, internal errors hidden.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(HermesConfig::default().validate().is_ok());
        assert!(HermesConfig::development().validate().is_ok());
    }

    #[test]
    fn test_rejects_relative_base_url() {
        let mut config = HermesConfig::default();
        config.client.base_url = "/api".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("client.base_url"));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = HermesConfig::default();
        config.client.base_url = "ftp://files.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = HermesConfig::default();
        config.client.timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("client.timeout_ms"));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let mut config = HermesConfig::default();
        config.client.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = HermesConfig::default();
        config.logging.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn test_development_preset() {
        let config = HermesConfig::development();
        assert!(config.server.expose_internal_errors);
        assert_eq!(config.logging.format, "pretty");
        assert!(!HermesConfig::production().server.expose_internal_errors);
    }
}
