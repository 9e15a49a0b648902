//! Textual write payloads.

use serde_json::Value;

/// A parsed write payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The empty object literal: an explicit no-op.
    Empty,
    /// Any other value.
    Value(Value),
}

impl Payload {
    /// Parses request text.
    ///
    /// Well-formed JSON becomes its value; text that does not parse is kept as
    /// an opaque string. An empty object is [`Payload::Empty`].
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from(value),
            Err(_) => Payload::Value(Value::String(text.to_string())),
        }
    }

    /// The carried value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Payload::Empty => None,
            Payload::Value(v) => Some(v),
        }
    }

    /// Whether this is the no-op payload.
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(ref map) if map.is_empty() => Payload::Empty,
            other => Payload::Value(other),
        }
    }
}
