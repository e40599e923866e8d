//! Canonical text forms of wire values.
//!
//! Route segments and query entries carry text. These functions convert that
//! text into the JSON a parameter type deserializes from, and back.
//!
//! | Kind | Text | JSON |
//! |---|---|---|
//! | Integer / Float | base 10 | number |
//! | Boolean | `true` / `false` (any case) | bool |
//! | DateTime / Date / Time | RFC 3339 / `YYYY-MM-DD` / `HH:MM:SS[.f]` | string |
//! | Duration | integer milliseconds | `{"secs", "nanos"}` |
//! | Uuid | hyphenated | string |
//! | Enum | variant name (any case) | string |
//! | structured | compact JSON | value |

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use hermes_core::{ScalarKind, TypeShape};
use serde_json::{json, Value};

const NAIVE_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE: &str = "%Y-%m-%d";
const TIME: &str = "%H:%M:%S%.f";

/// Parses wire text into the JSON form of `shape`.
pub fn parse_text(shape: &TypeShape, text: &str) -> Result<Value, String> {
    match shape {
        TypeShape::Scalar(kind) => parse_scalar(kind, text),
        TypeShape::Structured(_) | TypeShape::Sequence | TypeShape::Map => serde_json::from_str(text)
            .map_err(|e| format!("'{text}' is not valid JSON: {e}")),
        TypeShape::Cancellation => Err("a cancellation signal cannot be sent as text".to_string()),
    }
}

/// Parses wire text into the JSON form of a scalar kind.
pub fn parse_scalar(kind: &ScalarKind, text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    match kind {
        ScalarKind::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| trimmed.parse::<u64>().map(Value::from))
            .map_err(|_| format!("'{text}' is not a valid integer")),
        ScalarKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("'{text}' is not a valid number")),
        ScalarKind::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(format!("'{text}' is not a valid boolean"))
            }
        }
        ScalarKind::Text => Ok(Value::String(text.to_string())),
        ScalarKind::DateTime => {
            let valid = DateTime::parse_from_rfc3339(trimmed).is_ok()
                || NaiveDateTime::parse_from_str(trimmed, NAIVE_DATE_TIME).is_ok();
            if valid {
                Ok(Value::String(trimmed.to_string()))
            } else {
                Err(format!("'{text}' is not a valid RFC 3339 timestamp"))
            }
        }
        ScalarKind::Date => NaiveDate::parse_from_str(trimmed, DATE)
            .map(|_| Value::String(trimmed.to_string()))
            .map_err(|_| format!("'{text}' is not a valid date")),
        ScalarKind::Time => NaiveTime::parse_from_str(trimmed, TIME)
            .map(|_| Value::String(trimmed.to_string()))
            .map_err(|_| format!("'{text}' is not a valid time")),
        ScalarKind::Duration => trimmed
            .parse::<u64>()
            .map(|ms| json!({ "secs": ms / 1000, "nanos": (ms % 1000) * 1_000_000 }))
            .map_err(|_| format!("'{text}' is not a valid duration in milliseconds")),
        ScalarKind::Uuid => uuid::Uuid::parse_str(trimmed)
            .map(|id| Value::String(id.hyphenated().to_string()))
            .map_err(|_| format!("'{text}' is not a valid UUID")),
        ScalarKind::Enum(variants) => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(trimmed))
            .map(|v| Value::String(v.clone()))
            .ok_or_else(|| {
                format!(
                    "'{text}' is not one of: {}",
                    variants.join(", ")
                )
            }),
    }
}

/// Formats a JSON value as wire text for `shape`.
///
/// Returns `Ok(None)` for `null`, which means "omit".
pub fn format_text(shape: &TypeShape, value: &Value) -> Result<Option<String>, String> {
    if value.is_null() {
        return Ok(None);
    }
    match shape {
        TypeShape::Scalar(kind) => format_scalar(kind, value).map(Some),
        TypeShape::Cancellation => Ok(None),
        TypeShape::Structured(_) | TypeShape::Sequence | TypeShape::Map => {
            serde_json::to_string(value)
                .map(Some)
                .map_err(|e| e.to_string())
        }
    }
}

fn format_scalar(kind: &ScalarKind, value: &Value) -> Result<String, String> {
    match (kind, value) {
        (ScalarKind::Duration, Value::Object(parts)) => {
            let secs = parts.get("secs").and_then(Value::as_u64).unwrap_or(0);
            let nanos = parts.get("nanos").and_then(Value::as_u64).unwrap_or(0);
            secs.checked_mul(1000)
                .and_then(|ms| ms.checked_add(nanos / 1_000_000))
                .map(|ms| ms.to_string())
                .ok_or_else(|| format!("{secs}s does not fit in a u64 count of milliseconds"))
        }
        (_, Value::String(text)) => Ok(text.clone()),
        (_, Value::Number(number)) => Ok(number.to_string()),
        (_, Value::Bool(flag)) => Ok(flag.to_string()),
        (_, other) => Err(format!("{other} cannot be sent as a {kind:?} value")),
    }
}
