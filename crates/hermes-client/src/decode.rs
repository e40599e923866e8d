//! Turning a received response back into an outcome.

use bytes::Bytes;
use hermes_core::{ContractError, ErrorEnvelope, ErrorKind, Outcome};
use http::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Rebuilds an outcome from a response.
///
/// A 2xx response decodes its JSON body as `T`; an empty body or 204 decodes
/// from `null`, so `()` and `Option<_>` success types need no body. Any other
/// status becomes a failure: the error envelope's kind is used when it agrees
/// with the status, otherwise the status table decides.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use hermes_client::decode_response;
/// use hermes_core::ErrorKind;
/// use http::{Response, StatusCode};
///
/// let mut response = Response::new(Bytes::from_static(b"upstream down"));
/// *response.status_mut() = StatusCode::BAD_GATEWAY;
///
/// let err = decode_response::<i32>(response).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::Unavailable);
/// assert_eq!(err.message(), "upstream down");
/// ```
pub fn decode_response<T: DeserializeOwned>(response: Response<Bytes>) -> Outcome<T> {
    let status = response.status();
    let body = response.into_body();

    if status.is_success() {
        return decode_success(status, &body);
    }

    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&body) {
        return Err(ContractError::from_envelope(status, envelope));
    }

    let kind = ErrorKind::from_status(status, None);
    Err(ContractError::new(kind, fallback_message(status, &body)))
}

fn decode_success<T: DeserializeOwned>(status: StatusCode, body: &Bytes) -> Outcome<T> {
    let value = if status == StatusCode::NO_CONTENT || body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(body)
            .map_err(|e| ContractError::unexpected(format!("malformed response body: {e}")))?
    };
    serde_json::from_value(value)
        .map_err(|e| ContractError::unexpected(format!("unexpected response shape: {e}")))
}

fn fallback_message(status: StatusCode, body: &Bytes) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), ToString::to_string)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn response(status: u16, body: &str) -> Response<Bytes> {
        let mut response = Response::new(Bytes::from(body.to_string()));
        *response.status_mut() = StatusCode::from_u16(status).unwrap();
        response
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i32,
        name: String,
    }

    #[test]
    fn test_success_body() {
        let user: User = decode_response(response(200, r#"{"id":1,"name":"alice"}"#)).unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_no_content() {
        decode_response::<()>(response(204, "")).unwrap();
        assert_eq!(decode_response::<Option<i32>>(response(200, "")).unwrap(), None);
    }

    #[test]
    fn test_body_of_wrong_shape() {
        let err = decode_response::<User>(response(200, "[1,2]")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        let err = decode_response::<User>(response(200, "{not json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn test_envelope_kind_and_details() {
        let body = json!({
            "error": {
                "kind": "database",
                "code": "DATABASE_ERROR",
                "message": "deadlock",
                "details": {"table": "users"}
            },
            "request_id": "abc"
        });
        let err = decode_response::<i32>(response(500, &body.to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Database);
        assert_eq!(err.message(), "deadlock");
        assert_eq!(err.details(), Some(&json!({"table": "users"})));
    }

    #[test]
    fn test_envelope_kind_contradicting_status() {
        let body = json!({"error": {"kind": "not_found", "code": "NOT_FOUND", "message": "x"}});
        let err = decode_response::<i32>(response(503, &body.to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_envelope_without_kind() {
        let body = json!({"error": {"code": "BREAKER", "message": "open"}});
        let err = decode_response::<i32>(response(503, &body.to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(err.message(), "open");
    }

    #[test]
    fn test_status_fallbacks() {
        let cases = [
            (405, ErrorKind::Validation),
            (418, ErrorKind::Validation),
            (408, ErrorKind::Timeout),
            (500, ErrorKind::Unexpected),
            (501, ErrorKind::Unexpected),
            (503, ErrorKind::Unavailable),
        ];
        for (status, kind) in cases {
            let err = decode_response::<i32>(response(status, "")).unwrap_err();
            assert_eq!(err.kind(), kind, "status {status}");
        }
    }

    #[test]
    fn test_empty_failure_uses_reason_phrase() {
        let err = decode_response::<i32>(response(404, "")).unwrap_err();
        assert_eq!(err.message(), "Not Found");
    }
}
