//! The server-side face of a contract implementation.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use hermes_core::{BoundArguments, Contract, ContractError, Outcome};
use serde::Serialize;
use serde_json::Value;

/// Future returned by [`ContractService::invoke`].
pub type BoxedOutcome = BoxFuture<'static, Outcome<Value>>;

/// An implementation of a contract, callable by operation name.
///
/// The `#[contract]` attribute generates this for every implementor of the
/// contract trait (`UserContractService<S>`), decoding each argument with
/// [`BoundArguments::decode`] and encoding the success value with
/// [`encode_success`]. Hand-written implementations follow the same shape.
pub trait ContractService: Send + Sync + 'static {
    /// The contract this service implements.
    type Contract: Contract;

    /// Invokes `operation` with arguments in declared order.
    ///
    /// Unknown operation names resolve to an unexpected error.
    fn invoke(self: Arc<Self>, operation: &str, args: BoundArguments) -> BoxedOutcome;

    /// Decodes `args` into the operation's parameter types and returns the
    /// call without starting it.
    ///
    /// The dispatcher prepares every call before the permission check, so a
    /// malformed argument is reported as a validation error before any
    /// authorization decision. Decoding errors surface here; the returned
    /// future only runs the operation. The default defers everything to
    /// [`invoke`](Self::invoke).
    fn prepare(self: Arc<Self>, operation: &str, args: BoundArguments) -> Outcome<BoxedOutcome> {
        Ok(self.invoke(operation, args))
    }
}

/// Turns an operation result into the JSON the dispatcher sends.
///
/// `()` and `None` encode as `null`, which the dispatcher answers with 204.
pub fn encode_success<T: Serialize>(outcome: Outcome<T>) -> Outcome<Value> {
    let value = outcome?;
    serde_json::to_value(&value)
        .map_err(|e| ContractError::unexpected(format!("failed to serialize result: {e}")))
}
