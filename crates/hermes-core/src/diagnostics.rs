//! Fire-and-forget diagnostics around each call.

use std::time::Duration;

use crate::context::CallContext;
use crate::error::ErrorKind;

/// Which side of the wire emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSide {
    /// Emitted by the dispatcher.
    Server,
    /// Emitted by the client engine.
    Client,
}

impl CallSide {
    /// Returns a short lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

/// A diagnostics event.
#[derive(Debug, Clone, Copy)]
pub enum DiagnosticEvent<'a> {
    /// The call began.
    Started {
        /// Emitting side.
        side: CallSide,
        /// The call.
        ctx: &'a CallContext,
    },
    /// The call finished with a successful outcome.
    Completed {
        /// Emitting side.
        side: CallSide,
        /// The call.
        ctx: &'a CallContext,
        /// HTTP status sent or received.
        status: u16,
        /// Wall time of the call.
        duration: Duration,
    },
    /// The call finished with a failed outcome.
    Failed {
        /// Emitting side.
        side: CallSide,
        /// The call.
        ctx: &'a CallContext,
        /// Resolved error kind.
        kind: ErrorKind,
        /// HTTP status sent or received.
        status: u16,
        /// Error message.
        message: &'a str,
        /// Wall time of the call.
        duration: Duration,
    },
}

impl<'a> DiagnosticEvent<'a> {
    /// Returns the call this event belongs to.
    #[must_use]
    pub const fn context(&self) -> &'a CallContext {
        match self {
            Self::Started { ctx, .. } | Self::Completed { ctx, .. } | Self::Failed { ctx, .. } => {
                *ctx
            }
        }
    }
}

/// Receives diagnostics events.
///
/// Sinks must not block. Callers isolate panics raised by a sink, so a
/// misbehaving sink never changes an outcome.
pub trait DiagnosticsSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &DiagnosticEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn record(&self, _event: &DiagnosticEvent<'_>) {}
}

/// Records an event, swallowing any panic raised by the sink.
pub fn emit(sink: &dyn DiagnosticsSink, event: &DiagnosticEvent<'_>) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.record(event)));
    if result.is_err() {
        tracing::warn!(
            operation_id = event.context().operation(),
            "diagnostics sink panicked; event dropped"
        );
    }
}
