//! Invocation points for retry and circuit-breaker policies.
//!
//! The client engine asks a [`CircuitBreaker`] whether to proceed and reports
//! each result back; it asks a [`RetryPolicy`] how long to wait before trying
//! again. Breaker state machines live outside this crate.

use std::time::Duration;

use crate::error::{ContractError, ErrorKind};

/// Decides whether and when a failed call is retried.
pub trait RetryPolicy: Send + Sync {
    /// Returns the delay before the next attempt, or `None` to give up.
    ///
    /// `attempt` counts the attempts already made, starting at 1.
    fn next_delay(&self, attempt: u32, error: &ContractError) -> Option<Duration>;
}

/// Gate consulted before each outbound call.
pub trait CircuitBreaker: Send + Sync {
    /// Returns `false` to refuse the call without sending it.
    fn allow_request(&self, operation: &str) -> bool;

    /// Records a call that produced an answer (including business errors).
    fn record_success(&self, operation: &str);

    /// Records a transient or infrastructure failure.
    fn record_failure(&self, operation: &str, error: &ContractError);
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_delay(&self, _attempt: u32, _error: &ContractError) -> Option<Duration> {
        None
    }
}

/// Retries transient failures with exponentially growing delays.
///
/// An open breaker is never retried, since the breaker would refuse again.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hermes_core::{ContractError, ExponentialBackoff, RetryPolicy};
///
/// let policy = ExponentialBackoff::new(3, Duration::from_millis(100));
/// let timeout = ContractError::timeout("slow");
///
/// assert_eq!(policy.next_delay(1, &timeout), Some(Duration::from_millis(100)));
/// assert_eq!(policy.next_delay(2, &timeout), Some(Duration::from_millis(200)));
/// assert_eq!(policy.next_delay(3, &timeout), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    /// Creates a policy allowing `max_attempts` attempts in total.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Caps individual delays.
    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32, error: &ContractError) -> Option<Duration> {
        if attempt >= self.max_attempts
            || !error.kind().is_transient()
            || error.kind() == ErrorKind::CircuitBreakerOpen
        {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}
