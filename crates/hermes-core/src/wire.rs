//! Wire shapes of contract parameters.
//!
//! A [`WireType`] knows its [`TypeShape`], which is all the scanner needs to
//! decide where a parameter travels, and how to move itself in and out of a
//! [`WireValue`]. Scalars, `Option`, collections, the `chrono`/`uuid` types and
//! [`CancellationToken`] are covered here; contract-specific structs and enums
//! get an implementation from `#[derive(WireType)]`.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{ContractError, Outcome};

/// Scalar kinds that have a canonical text form for routes and query strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Any integer type.
    Integer,
    /// Any floating point type.
    Float,
    /// `true` / `false`.
    Boolean,
    /// Free text.
    Text,
    /// RFC 3339 timestamp.
    DateTime,
    /// `YYYY-MM-DD`.
    Date,
    /// `HH:MM:SS[.fff]`.
    Time,
    /// Integer milliseconds on the wire.
    Duration,
    /// Hyphenated UUID.
    Uuid,
    /// Unit-only enum; the variant names as they serialize.
    Enum(Vec<String>),
}

/// Shape of a parameter or property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// A single value with canonical text form.
    Scalar(ScalarKind),
    /// A record with named properties.
    Structured(Vec<PropertyShape>),
    /// A list of values.
    Sequence,
    /// A string-keyed map or arbitrary JSON.
    Map,
    /// The ambient cancellation signal. Never serialized.
    Cancellation,
}

impl TypeShape {
    /// Returns `true` for scalar shapes.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Returns `true` for shapes that travel as JSON documents.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_) | Self::Sequence | Self::Map)
    }

    /// Returns `true` for the cancellation signal.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancellation)
    }

    /// Returns the scalar kind, if scalar.
    #[must_use]
    pub const fn scalar_kind(&self) -> Option<&ScalarKind> {
        match self {
            Self::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns the declared properties of a structured shape.
    #[must_use]
    pub fn properties(&self) -> &[PropertyShape] {
        match self {
            Self::Structured(props) => props,
            _ => &[],
        }
    }
}

/// A named property of a structured shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyShape {
    /// Property name as it serializes.
    pub name: String,
    /// Property shape.
    pub shape: TypeShape,
    /// Whether the property must be present.
    pub required: bool,
}

impl PropertyShape {
    /// Describes a property of type `T`.
    #[must_use]
    pub fn of<T: WireType>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: T::shape(),
            required: T::REQUIRED,
        }
    }
}

/// A parameter value in transit.
#[derive(Debug, Clone)]
pub enum WireValue {
    /// A JSON value.
    Json(serde_json::Value),
    /// The cancellation signal of the call.
    Cancellation(CancellationToken),
}

impl WireValue {
    /// Returns the JSON value, if this is not a cancellation signal.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Cancellation(_) => None,
        }
    }
}

impl Default for WireValue {
    fn default() -> Self {
        Self::Json(serde_json::Value::Null)
    }
}

impl PartialEq for WireValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Cancellation(_), Self::Cancellation(_)) => true,
            _ => false,
        }
    }
}

/// A type that can appear as a contract parameter.
pub trait WireType: Sized {
    /// Whether a value must be supplied. `Option<T>` flips this.
    const REQUIRED: bool = true;

    /// Returns the wire shape.
    fn shape() -> TypeShape;

    /// Rebuilds a value from the wire.
    fn from_wire(value: WireValue) -> Outcome<Self>;

    /// Puts a value on the wire.
    fn to_wire(&self) -> Outcome<WireValue>;
}

/// Decodes a JSON wire value with serde.
pub fn decode_json<T: DeserializeOwned>(value: WireValue) -> Outcome<T> {
    match value {
        WireValue::Json(json) => {
            serde_json::from_value(json).map_err(|e| ContractError::validation(e.to_string()))
        }
        WireValue::Cancellation(_) => Err(ContractError::validation(
            "expected a value, found a cancellation signal",
        )),
    }
}

/// Encodes a value as a JSON wire value with serde.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Outcome<WireValue> {
    serde_json::to_value(value)
        .map(WireValue::Json)
        .map_err(|e| ContractError::unexpected(format!("failed to serialize argument: {e}")))
}

macro_rules! scalar_wire_type {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl WireType for $ty {
                fn shape() -> TypeShape {
                    TypeShape::Scalar($kind)
                }

                fn from_wire(value: WireValue) -> Outcome<Self> {
                    decode_json(value)
                }

                fn to_wire(&self) -> Outcome<WireValue> {
                    encode_json(self)
                }
            }
        )+
    };
}

scalar_wire_type!(ScalarKind::Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
scalar_wire_type!(ScalarKind::Float => f32, f64);
scalar_wire_type!(ScalarKind::Boolean => bool);
scalar_wire_type!(ScalarKind::Text => String, char);
scalar_wire_type!(ScalarKind::DateTime =>
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::NaiveDateTime,
);
scalar_wire_type!(ScalarKind::Date => chrono::NaiveDate);
scalar_wire_type!(ScalarKind::Time => chrono::NaiveTime);
scalar_wire_type!(ScalarKind::Duration => Duration);
scalar_wire_type!(ScalarKind::Uuid => uuid::Uuid);

impl WireType for serde_json::Value {
    const REQUIRED: bool = false;

    fn shape() -> TypeShape {
        TypeShape::Map
    }

    fn from_wire(value: WireValue) -> Outcome<Self> {
        decode_json(value)
    }

    fn to_wire(&self) -> Outcome<WireValue> {
        Ok(WireValue::Json(self.clone()))
    }
}

impl<T: WireType> WireType for Option<T> {
    const REQUIRED: bool = false;

    fn shape() -> TypeShape {
        T::shape()
    }

    fn from_wire(value: WireValue) -> Outcome<Self> {
        match value {
            WireValue::Json(serde_json::Value::Null) => Ok(None),
            other => T::from_wire(other).map(Some),
        }
    }

    fn to_wire(&self) -> Outcome<WireValue> {
        match self {
            Some(inner) => inner.to_wire(),
            None => Ok(WireValue::Json(serde_json::Value::Null)),
        }
    }
}

impl<T: Serialize + DeserializeOwned> WireType for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::Sequence
    }

    fn from_wire(value: WireValue) -> Outcome<Self> {
        decode_json(value)
    }

    fn to_wire(&self) -> Outcome<WireValue> {
        encode_json(self)
    }
}

impl<V: Serialize + DeserializeOwned> WireType for HashMap<String, V> {
    fn shape() -> TypeShape {
        TypeShape::Map
    }

    fn from_wire(value: WireValue) -> Outcome<Self> {
        decode_json(value)
    }

    fn to_wire(&self) -> Outcome<WireValue> {
        encode_json(self)
    }
}

impl<V: Serialize + DeserializeOwned> WireType for BTreeMap<String, V> {
    fn shape() -> TypeShape {
        TypeShape::Map
    }

    fn from_wire(value: WireValue) -> Outcome<Self> {
        decode_json(value)
    }

    fn to_wire(&self) -> Outcome<WireValue> {
        encode_json(self)
    }
}

impl WireType for CancellationToken {
    const REQUIRED: bool = false;

    fn shape() -> TypeShape {
        TypeShape::Cancellation
    }

    // A call without an ambient signal gets one that never fires.
    fn from_wire(value: WireValue) -> Outcome<Self> {
        match value {
            WireValue::Cancellation(token) => Ok(token),
            WireValue::Json(_) => Ok(Self::new()),
        }
    }

    fn to_wire(&self) -> Outcome<WireValue> {
        Ok(WireValue::Cancellation(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_shapes() {
        assert_eq!(i32::shape(), TypeShape::Scalar(ScalarKind::Integer));
        assert_eq!(f64::shape(), TypeShape::Scalar(ScalarKind::Float));
        assert_eq!(String::shape(), TypeShape::Scalar(ScalarKind::Text));
        assert_eq!(uuid::Uuid::shape(), TypeShape::Scalar(ScalarKind::Uuid));
        assert_eq!(Duration::shape(), TypeShape::Scalar(ScalarKind::Duration));
        assert!(i64::REQUIRED);
    }

    #[test]
    fn test_option_is_optional_with_inner_shape() {
        assert!(!Option::<i32>::REQUIRED);
        assert_eq!(Option::<i32>::shape(), TypeShape::Scalar(ScalarKind::Integer));
        assert_eq!(Option::<i32>::from_wire(WireValue::default()), Ok(None));
        assert_eq!(
            Option::<i32>::from_wire(WireValue::Json(json!(5))),
            Ok(Some(5))
        );
    }

    #[test]
    fn test_collections_are_structured() {
        assert!(Vec::<String>::shape().is_structured());
        assert!(HashMap::<String, i32>::shape().is_structured());
        assert!(!Vec::<String>::shape().is_scalar());
    }

    #[test]
    fn test_cancellation_token() {
        assert!(CancellationToken::shape().is_cancellation());
        let token = CancellationToken::new();
        let wire = token.to_wire().expect("encode");
        let back = CancellationToken::from_wire(wire).expect("decode");
        token.cancel();
        assert!(back.is_cancelled());
    }

    #[test]
    fn test_decode_mismatch_is_validation() {
        let err = i32::from_wire(WireValue::Json(json!("abc"))).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);

        let err = i32::from_wire(WireValue::Cancellation(CancellationToken::new())).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_duration_serializes_as_secs_and_nanos() {
        let wire = Duration::from_millis(1500).to_wire().expect("encode");
        assert_eq!(wire.as_json(), Some(&json!({ "secs": 1, "nanos": 500_000_000 })));
    }
}
