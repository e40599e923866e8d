//! The default diagnostics sink.

use std::time::Duration;

use hermes_core::{DiagnosticEvent, DiagnosticsSink, ErrorClass};

/// Writes call events as `tracing` records.
///
/// Started events are logged at `debug`, completions at `info`. Failures are
/// logged at `error` for infrastructure errors and at `warn` otherwise.
/// Field names follow [`fields`](crate::fields).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    /// Creates the sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DiagnosticsSink for TracingDiagnostics {
    fn record(&self, event: &DiagnosticEvent<'_>) {
        let ctx = event.context();
        let request_id = ctx.request_id();
        let trace_id = ctx.trace_id().unwrap_or_default();

        match *event {
            DiagnosticEvent::Started { side, .. } => {
                tracing::debug!(
                    request_id = %request_id,
                    trace_id = trace_id,
                    side = side.as_str(),
                    contract = ctx.contract(),
                    operation_id = ctx.operation(),
                    http.method = %ctx.method(),
                    http.path = ctx.path(),
                    "Call started"
                );
            }
            DiagnosticEvent::Completed {
                side,
                status,
                duration,
                ..
            } => {
                tracing::info!(
                    request_id = %request_id,
                    trace_id = trace_id,
                    side = side.as_str(),
                    contract = ctx.contract(),
                    operation_id = ctx.operation(),
                    http.method = %ctx.method(),
                    http.path = ctx.path(),
                    http.status_code = status,
                    duration_ms = millis(duration),
                    "Call completed"
                );
            }
            DiagnosticEvent::Failed {
                side,
                kind,
                status,
                message,
                duration,
                ..
            } => {
                if kind.class() == ErrorClass::Infrastructure {
                    tracing::error!(
                        request_id = %request_id,
                        trace_id = trace_id,
                        side = side.as_str(),
                        contract = ctx.contract(),
                        operation_id = ctx.operation(),
                        http.method = %ctx.method(),
                        http.path = ctx.path(),
                        http.status_code = status,
                        duration_ms = millis(duration),
                        error.kind = kind.as_str(),
                        error = message,
                        "Call failed"
                    );
                } else {
                    tracing::warn!(
                        request_id = %request_id,
                        trace_id = trace_id,
                        side = side.as_str(),
                        contract = ctx.contract(),
                        operation_id = ctx.operation(),
                        http.method = %ctx.method(),
                        http.path = ctx.path(),
                        http.status_code = status,
                        duration_ms = millis(duration),
                        error.kind = kind.as_str(),
                        error = message,
                        "Call failed"
                    );
                }
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
