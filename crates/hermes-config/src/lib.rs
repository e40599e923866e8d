//! Typed configuration for Hermes.
//!
//! - TOML and JSON configuration files
//! - `.env` files via `dotenvy`
//! - Environment variable overrides (`PREFIX__SECTION__KEY`)
//! - Strict validation (unknown fields are rejected)
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! max_body_bytes = 1048576
//! expose_internal_errors = false
//!
//! [client]
//! base_url = "http://localhost:8080"
//! timeout_ms = 30000
//!
//! [client.retry]
//! max_attempts = 3
//! base_delay_ms = 100
//! max_delay_ms = 30000
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{ClientSettings, DispatcherSettings, LoggingSettings, RetrySettings};
