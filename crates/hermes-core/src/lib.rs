//! # Hermes Core
//!
//! Shared vocabulary of the Hermes contract-to-HTTP mapping engine.
//!
//! - [`ContractError`], [`ErrorKind`] and [`Outcome`] - the error taxonomy and its status table
//! - [`WireType`] and [`TypeShape`] - how parameter types travel
//! - [`ContractSignature`] and [`Contract`] - recorded contract declarations
//! - [`BoundArguments`] - positional arguments of one call
//! - [`CallContext`] and [`RequestId`] - per-call context
//! - [`RequestValidator`], [`PermissionChecker`], [`DiagnosticsSink`],
//!   [`RetryPolicy`], [`CircuitBreaker`] - pluggable collaborators

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod args;
mod context;
pub mod diagnostics;
mod error;
mod policy;
mod resilience;
mod signature;
pub mod wire;

pub use args::BoundArguments;
pub use context::{CallContext, RequestId, REQUEST_ID_HEADER, TRACE_ID_HEADER};
pub use diagnostics::{CallSide, DiagnosticEvent, DiagnosticsSink, NoopDiagnostics};
pub use error::{
    ContractError, ErrorClass, ErrorDetail, ErrorEnvelope, ErrorKind, Outcome,
    CLIENT_CLOSED_REQUEST,
};
pub use policy::{AllowAll, DenyAll, PermissionChecker, PermissionDecision, RequestValidator};
pub use resilience::{CircuitBreaker, ExponentialBackoff, NoRetry, RetryPolicy};
pub use signature::{
    Contract, ContractSignature, OperationOverrides, OperationSignature, ParameterSignature,
};
pub use wire::{PropertyShape, ScalarKind, TypeShape, WireType, WireValue};

/// Re-exported so signatures and wire values do not force a direct dependency.
pub use tokio_util::sync::CancellationToken;
