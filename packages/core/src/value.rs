//! The Value type - a tree-shaped data structure.
//!
//! This is the encoding-agnostic representation of a bound object. It maps
//! directly to JSON, MessagePack, CBOR, etc.; codecs convert it to and
//! from bytes for a negotiated protocol version.

use std::collections::BTreeMap;

/// A tree-shaped value bound to a name.
///
/// # Design Notes
///
/// - Uses `BTreeMap` for deterministic ordering
/// - Includes `Bytes` for binary data (unlike JSON, but like CBOR)
/// - Uses `i64` for integers
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value. Distinct from "name not bound".
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Key-value map with string keys.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The kind of this value, as a short tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from("x").kind(), "string");
        assert_eq!(Value::from(1i64).kind(), "integer");
        assert_eq!(Value::map().kind(), "map");
        assert_eq!(Value::array().kind(), "array");
        assert_eq!(Value::Bytes(vec![1, 2]).kind(), "bytes");
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert!(Value::Null.is_null());
        assert!(!Value::from(0i64).is_null());
    }
}
