//! Observability for Hermes.
//!
//! - **Logging**: structured JSON (production) or pretty (development) output
//!   through `tracing-subscriber`
//! - **Diagnostics**: [`TracingDiagnostics`], the default
//!   [`DiagnosticsSink`](hermes_core::DiagnosticsSink), which turns call
//!   events into log records with the standard [`fields`]
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(operation_id = "get_user", "ready");
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod diagnostics;
pub mod error;
pub mod logging;

pub use diagnostics::TracingDiagnostics;
pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
