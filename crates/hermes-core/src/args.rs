//! Positional argument lists passed between the binder and an operation.

use tokio_util::sync::CancellationToken;

use crate::error::{ContractError, Outcome};
use crate::wire::{WireType, WireValue};

/// Arguments of one call, in declared parameter order.
///
/// On the server this is what the binder produces from a request; on the
/// client it is what a generated proxy collects before encoding the request.
/// Validators see the same structure on both sides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    entries: Vec<(String, WireValue)>,
}

impl BoundArguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an argument list with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends an argument.
    pub fn push(&mut self, name: impl Into<String>, value: WireValue) {
        self.entries.push((name.into(), value));
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an argument by parameter name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WireValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns the JSON value of an argument by parameter name.
    #[must_use]
    pub fn json(&self, name: &str) -> Option<&serde_json::Value> {
        self.get(name).and_then(WireValue::as_json)
    }

    /// Returns the first cancellation signal among the arguments.
    #[must_use]
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.entries.iter().find_map(|(_, v)| match v {
            WireValue::Cancellation(token) => Some(token),
            WireValue::Json(_) => None,
        })
    }

    /// Returns an iterator over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WireValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Moves the argument at `index` out, leaving `null` behind.
    pub fn take(&mut self, index: usize) -> Option<WireValue> {
        self.entries
            .get_mut(index)
            .map(|(_, value)| std::mem::take(value))
    }

    /// Moves the argument at `index` out and decodes it as `T`.
    ///
    /// Decoding failures become validation errors naming the parameter.
    pub fn decode<T: WireType>(&mut self, index: usize) -> Outcome<T> {
        let name = self
            .entries
            .get(index)
            .map(|(n, _)| n.clone())
            .ok_or_else(|| ContractError::validation(format!("missing argument #{index}")))?;
        let value = self.take(index).unwrap_or_default();
        T::from_wire(value).map_err(|e| {
            ContractError::new(e.kind(), format!("parameter '{name}': {}", e.message()))
        })
    }
}

impl FromIterator<(String, WireValue)> for BoundArguments {
    fn from_iter<I: IntoIterator<Item = (String, WireValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
