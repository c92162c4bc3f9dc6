//! Conversions between Value and serde types.

use serde::de::DeserializeOwned;
use serde::Serialize;
use treeline_core::{NamingError, Value};

/// Convert a Value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, NamingError> {
    let json = value_to_json(value);
    serde_json::from_value(json).map_err(|e| NamingError::Codec { message: e.to_string() })
}

/// Convert a Rust type to a Value via serde.
pub fn to_value<T: Serialize>(data: &T) -> Result<Value, NamingError> {
    let json =
        serde_json::to_value(data).map_err(|e| NamingError::Codec { message: e.to_string() })?;
    Ok(json_to_value(json))
}

/// Convert our Value to serde_json::Value.
pub fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Bytes(b) => {
            // JSON doesn't have bytes, so we base64 encode
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&b);
            serde_json::Value::String(encoded)
        }
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.into_iter().map(|(k, v)| (k, value_to_json(v))).collect(),
        ),
    }
}

/// Convert serde_json::Value to our Value.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                // Fallback for very large numbers
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter().map(|(k, v)| (k, json_to_value(v))).collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Endpoint {
        host: String,
        port: u16,
        secure: bool,
    }

    #[test]
    fn roundtrip_struct() {
        let original = Endpoint { host: "node-a".to_string(), port: 7000, secure: true };

        let value = to_value(&original).unwrap();
        let recovered: Endpoint = from_value(value).unwrap();

        assert_eq!(original, recovered);
    }

    #[test]
    fn json_numbers_map_to_integer_or_float() {
        let json = serde_json::json!({ "i": 42, "f": 2.75, "n": -100 });
        match json_to_value(json) {
            Value::Map(map) => {
                assert_eq!(map.get("i"), Some(&Value::Integer(42)));
                assert_eq!(map.get("n"), Some(&Value::Integer(-100)));
                match map.get("f") {
                    Some(Value::Float(f)) => assert!((f - 2.75).abs() < 0.001),
                    other => panic!("expected float, got {:?}", other),
                }
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn bytes_become_base64_strings() {
        let json = value_to_json(Value::Bytes(vec![1, 2, 3]));
        assert_eq!(json, serde_json::Value::String("AQID".to_string()));
    }

    #[test]
    fn type_mismatch_is_a_codec_error() {
        let err = from_value::<Endpoint>(Value::from("not a struct")).unwrap_err();
        assert!(matches!(err, NamingError::Codec { .. }));
    }
}
