//! Error taxonomy shared by the server and client paths.
//!
//! Every failure that crosses a component boundary is a [`ContractError`]
//! carrying one [`ErrorKind`]. The kind decides the HTTP status on the way out
//! and is recovered from the status (plus the error envelope) on the way back.
//!
//! | Kind | Status | Class |
//! |---|---|---|
//! | `Validation` | 400 | Business |
//! | `Unauthorized` | 401 | Business |
//! | `Permission` | 403 | Business |
//! | `NotFound` | 404 | Business |
//! | `Conflict` | 409 | Business |
//! | `Cancelled` | 499 | Business |
//! | `Timeout` | 504 (408 accepted when decoding) | Transient |
//! | `TooManyRequests` | 429 | Transient |
//! | `Unavailable` | 503 | Transient |
//! | `CircuitBreakerOpen` | 503 | Transient |
//! | `Database` | 500 | Infrastructure |
//! | `Unexpected` | 500 | Infrastructure |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a contract operation.
///
/// `Ok(())` (or any value serializing to JSON `null`) means "success without a
/// value" and travels as `204 No Content`.
pub type Outcome<T = ()> = Result<T, ContractError>;

/// Non-standard status used for requests the caller abandoned.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Closed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or rejected input.
    Validation,
    /// The caller is not authenticated.
    Unauthorized,
    /// The caller is authenticated but not allowed.
    Permission,
    /// The addressed resource does not exist.
    NotFound,
    /// The request conflicts with current state.
    Conflict,
    /// The caller abandoned the request.
    Cancelled,
    /// The operation did not finish in time.
    Timeout,
    /// The caller is being rate limited.
    TooManyRequests,
    /// A dependency could not be reached.
    Unavailable,
    /// A circuit breaker refused the call.
    CircuitBreakerOpen,
    /// A storage layer failed.
    Database,
    /// Anything else.
    Unexpected,
}

/// Coarse grouping of error kinds, used by resilience policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// A legitimate answer from the service; retrying will not change it.
    Business,
    /// Likely to succeed if retried later.
    Transient,
    /// The service or its infrastructure is broken.
    Infrastructure,
}

impl ErrorKind {
    /// All kinds, in table order.
    pub const ALL: [Self; 12] = [
        Self::Validation,
        Self::Unauthorized,
        Self::Permission,
        Self::NotFound,
        Self::Conflict,
        Self::Cancelled,
        Self::Timeout,
        Self::TooManyRequests,
        Self::Unavailable,
        Self::CircuitBreakerOpen,
        Self::Database,
        Self::Unexpected,
    ];

    /// Returns the numeric HTTP status emitted by the server for this kind.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Unauthorized => 401,
            Self::Permission => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Cancelled => CLIENT_CLOSED_REQUEST,
            Self::Timeout => 504,
            Self::TooManyRequests => 429,
            Self::Unavailable | Self::CircuitBreakerOpen => 503,
            Self::Database | Self::Unexpected => 500,
        }
    }

    /// Returns the HTTP status code emitted by the server for this kind.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the class of this kind.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Validation
            | Self::Unauthorized
            | Self::Permission
            | Self::NotFound
            | Self::Conflict
            | Self::Cancelled => ErrorClass::Business,
            Self::Timeout
            | Self::TooManyRequests
            | Self::Unavailable
            | Self::CircuitBreakerOpen => ErrorClass::Transient,
            Self::Database | Self::Unexpected => ErrorClass::Infrastructure,
        }
    }

    /// Returns `true` for kinds worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }

    /// Returns the snake_case wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Permission => "permission",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::TooManyRequests => "too_many_requests",
            Self::Unavailable => "unavailable",
            Self::CircuitBreakerOpen => "circuit_breaker_open",
            Self::Database => "database",
            Self::Unexpected => "unexpected",
        }
    }

    /// Returns the machine-readable code used in error envelopes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Permission => "PERMISSION_DENIED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Cancelled => "CANCELLED",
            Self::Timeout => "TIMEOUT",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::Unavailable => "UNAVAILABLE",
            Self::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
            Self::Database => "DATABASE_ERROR",
            Self::Unexpected => "UNEXPECTED_ERROR",
        }
    }

    /// Returns `true` if a response with `status` may carry this kind.
    #[must_use]
    pub fn accepts_status(&self, status: StatusCode) -> bool {
        match self {
            Self::Timeout => matches!(status.as_u16(), 408 | 504),
            kind => kind.status() == status.as_u16(),
        }
    }

    /// Recovers the kind of a failed response.
    ///
    /// `hint` is the kind named in the response's error envelope, if any. It is
    /// trusted only when consistent with the status, which is how 500 and 503
    /// are told apart. Without a usable hint the status table decides.
    #[must_use]
    pub fn from_status(status: StatusCode, hint: Option<Self>) -> Self {
        if let Some(kind) = hint.filter(|kind| kind.accepts_status(status)) {
            return kind;
        }
        match status.as_u16() {
            400 | 405 | 415 | 422 => Self::Validation,
            401 => Self::Unauthorized,
            403 => Self::Permission,
            404 => Self::NotFound,
            409 => Self::Conflict,
            408 | 504 => Self::Timeout,
            429 => Self::TooManyRequests,
            CLIENT_CLOSED_REQUEST => Self::Cancelled,
            502 | 503 => Self::Unavailable,
            code if (400..500).contains(&code) => Self::Validation,
            _ => Self::Unexpected,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed contract operation.
///
/// # Example
///
/// ```
/// use hermes_core::{ContractError, ErrorKind, Outcome};
///
/// fn find(id: i32) -> Outcome<String> {
///     if id < 0 {
///         return Err(ContractError::validation("id must be positive"));
///     }
///     Err(ContractError::not_found(format!("user {id} not found")))
/// }
///
/// let err = find(7).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct ContractError {
    kind: ErrorKind,
    message: String,
    details: Option<serde_json::Value>,
}

impl ContractError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates an unauthenticated error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Creates a permission-denied error.
    #[must_use]
    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Creates a rate-limit error.
    #[must_use]
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooManyRequests, message)
    }

    /// Creates an unavailable-dependency error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Creates a circuit-breaker refusal.
    #[must_use]
    pub fn circuit_breaker_open(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CircuitBreakerOpen, message)
    }

    /// Creates a storage failure.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Creates an unexpected error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// Attaches structured details that travel in the envelope.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the structured details, if any.
    #[must_use]
    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    /// Returns the error class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                kind: Some(self.kind),
                code: self.kind.code().to_string(),
                message: self.message.clone(),
                details: self.details.clone(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Rebuilds an error from a failed response's status and envelope.
    #[must_use]
    pub fn from_envelope(status: StatusCode, envelope: ErrorEnvelope) -> Self {
        let kind = ErrorKind::from_status(status, envelope.error.kind);
        Self {
            kind,
            message: envelope.error.message,
            details: envelope.error.details,
        }
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation(err.to_string())
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Precise error kind. Optional so that envelopes from other producers
    /// still decode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Machine-readable error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
