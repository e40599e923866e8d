//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use std::time::Duration;

use hermes_core::ExponentialBackoff;
use hermes_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Dispatcher configuration section.
///
/// # Example
///
/// ```
/// use hermes_config::DispatcherSettings;
///
/// let settings = DispatcherSettings::default();
/// assert_eq!(settings.max_body_bytes, 1024 * 1024);
/// assert!(!settings.expose_internal_errors);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatcherSettings {
    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Send the real message of unexpected failures to callers.
    ///
    /// Development only: messages can carry internal detail.
    #[serde(default)]
    pub expose_internal_errors: bool,

    /// Message sent in place of hidden unexpected failures.
    #[serde(default = "default_internal_error_message")]
    pub internal_error_message: String,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            expose_internal_errors: false,
            internal_error_message: default_internal_error_message(),
        }
    }
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_internal_error_message() -> String {
    "An internal error occurred".to_string()
}

/// Retry configuration of the client engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Attempts per call, including the first. `1` disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Builds the backoff policy these settings describe.
    #[must_use]
    pub fn policy(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

fn default_max_attempts() -> u32 {
    1
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Client configuration section.
///
/// # Example
///
/// ```
/// use hermes_config::ClientSettings;
///
/// let settings = ClientSettings::default();
/// assert_eq!(settings.base_url, "http://localhost:8080");
/// assert_eq!(settings.timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientSettings {
    /// Base URL every request path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retry settings.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            retry: RetrySettings::default(),
        }
    }
}

impl ClientSettings {
    /// Returns the per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives (e.g., "info", "hermes_server=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `json` or `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include file and line in log records.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: default_log_format(),
            include_location: false,
        }
    }
}

impl LoggingSettings {
    /// Converts these settings into a telemetry [`LogConfig`].
    ///
    /// An unknown format falls back to JSON; [`HermesConfig::validate`]
    /// rejects unknown formats before this point.
    ///
    /// [`HermesConfig::validate`]: crate::HermesConfig::validate
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let format = self.format.parse::<LogFormat>().unwrap_or_default();
        let base = match format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format,
            file_line_info: self.include_location,
            ..base
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    LogFormat::Json.as_str().to_string()
}
