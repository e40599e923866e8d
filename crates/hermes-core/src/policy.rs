//! Validation and permission collaborators.
//!
//! Both are consulted per call, after binding and before the operation runs.
//! Neither is implemented here beyond trivial allow/deny helpers; real rules
//! belong to the host application.

use crate::args::BoundArguments;
use crate::context::CallContext;
use crate::error::{ContractError, Outcome};

/// Checks bound arguments before an operation runs.
///
/// Validators run in registration order and the first failure wins. A
/// returned error of any kind is reported to the caller as a validation
/// failure.
///
/// Closures with the matching signature are validators:
///
/// ```
/// use hermes_core::{BoundArguments, CallContext, ContractError, Outcome, RequestValidator};
///
/// let positive_id = |_: &CallContext, args: &BoundArguments| -> Outcome {
///     match args.json("id").and_then(serde_json::Value::as_i64) {
///         Some(id) if id <= 0 => Err(ContractError::validation("id must be positive")),
///         _ => Ok(()),
///     }
/// };
///
/// let ctx = CallContext::new("UserContract", "get_user");
/// assert!(positive_id.validate(&ctx, &BoundArguments::new()).is_ok());
/// ```
pub trait RequestValidator: Send + Sync {
    /// Validates the arguments of one call.
    fn validate(&self, ctx: &CallContext, args: &BoundArguments) -> Outcome;
}

impl<F> RequestValidator for F
where
    F: Fn(&CallContext, &BoundArguments) -> Outcome + Send + Sync,
{
    fn validate(&self, ctx: &CallContext, args: &BoundArguments) -> Outcome {
        self(ctx, args)
    }
}

/// Result of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    /// The call may proceed.
    Granted,
    /// The caller is known but not allowed.
    Denied {
        /// The reason for denial.
        reason: String,
    },
    /// The caller could not be identified.
    Unauthenticated {
        /// The reason for rejection.
        reason: String,
    },
}

impl PermissionDecision {
    /// Converts the decision into an outcome.
    pub fn into_outcome(self) -> Outcome {
        match self {
            Self::Granted => Ok(()),
            Self::Denied { reason } => Err(ContractError::permission(reason)),
            Self::Unauthenticated { reason } => Err(ContractError::unauthorized(reason)),
        }
    }
}

/// Decides whether the caller of an endpoint that requires authorization may
/// proceed.
pub trait PermissionChecker: Send + Sync {
    /// Evaluates the call.
    fn check(&self, ctx: &CallContext) -> PermissionDecision;
}

/// Grants every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn check(&self, _ctx: &CallContext) -> PermissionDecision {
        PermissionDecision::Granted
    }
}

/// Denies every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl PermissionChecker for DenyAll {
    fn check(&self, ctx: &CallContext) -> PermissionDecision {
        PermissionDecision::Denied {
            reason: format!("access to '{}' denied", ctx.operation()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_decision_outcomes() {
        assert!(PermissionDecision::Granted.into_outcome().is_ok());

        let denied = PermissionDecision::Denied {
            reason: "no".to_string(),
        };
        assert_eq!(denied.into_outcome().unwrap_err().kind(), ErrorKind::Permission);

        let anonymous = PermissionDecision::Unauthenticated {
            reason: "who?".to_string(),
        };
        assert_eq!(
            anonymous.into_outcome().unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_builtin_checkers() {
        let ctx = CallContext::new("OrderContract", "delete_order");
        assert_eq!(AllowAll.check(&ctx), PermissionDecision::Granted);
        match DenyAll.check(&ctx) {
            PermissionDecision::Denied { reason } => assert!(reason.contains("delete_order")),
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn test_closure_validator() {
        let reject = |_: &CallContext, _: &BoundArguments| -> Outcome {
            Err(ContractError::validation("nope"))
        };
        let ctx = CallContext::new("C", "op");
        assert!(reject.validate(&ctx, &BoundArguments::new()).is_err());
    }
}
