//! JSON codec implementation.

use bytes::Bytes;
use treeline_core::{Codec, NamingError, Value};

use crate::convert::{json_to_value, value_to_json};

/// A codec that carries values as JSON bytes.
///
/// Both protocol versions currently share the JSON envelope; the
/// negotiated version is checked so a future framing change stays a
/// codec-local concern.
///
/// # Example
///
/// ```rust
/// use treeline_serde::JsonCodec;
/// use treeline_core::{Codec, Value};
///
/// let codec = JsonCodec;
/// let value = Value::from("hello");
///
/// let bytes = codec.encode(&value, 2).unwrap();
/// let decoded = codec.decode(&bytes, 2).unwrap();
///
/// assert_eq!(decoded, value);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, bytes: &Bytes, version: u8) -> Result<Value, NamingError> {
        if !self.supports(version) {
            return Err(NamingError::UnsupportedVersion(version));
        }

        let json: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| NamingError::Codec { message: e.to_string() })?;

        Ok(json_to_value(json))
    }

    fn encode(&self, value: &Value, version: u8) -> Result<Bytes, NamingError> {
        if !self.supports(version) {
            return Err(NamingError::UnsupportedVersion(version));
        }

        let json = value_to_json(value.clone());
        let bytes = serde_json::to_vec(&json)
            .map_err(|e| NamingError::Codec { message: e.to_string() })?;

        Ok(Bytes::from(bytes))
    }

    fn supports(&self, version: u8) -> bool {
        treeline_wire::PROTOCOL_VERSIONS.contains(&version)
    }
}

/// A codec that combines multiple codecs.
///
/// Routes encode/decode to the first codec supporting the version.
pub struct MultiCodec {
    codecs: Vec<Box<dyn Codec>>,
}

impl MultiCodec {
    /// Create an empty multi-codec.
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Add a codec.
    pub fn add(&mut self, codec: impl Codec + 'static) {
        self.codecs.push(Box::new(codec));
    }

    /// Create a multi-codec with the JSON codec included.
    pub fn with_json() -> Self {
        let mut mc = Self::new();
        mc.add(JsonCodec);
        mc
    }
}

impl Default for MultiCodec {
    fn default() -> Self {
        Self::with_json()
    }
}

impl Codec for MultiCodec {
    fn decode(&self, bytes: &Bytes, version: u8) -> Result<Value, NamingError> {
        for codec in &self.codecs {
            if codec.supports(version) {
                return codec.decode(bytes, version);
            }
        }
        Err(NamingError::UnsupportedVersion(version))
    }

    fn encode(&self, value: &Value, version: u8) -> Result<Bytes, NamingError> {
        for codec in &self.codecs {
            if codec.supports(version) {
                return codec.encode(value, version);
            }
        }
        Err(NamingError::UnsupportedVersion(version))
    }

    fn supports(&self, version: u8) -> bool {
        self.codecs.iter().any(|c| c.supports(version))
    }
}
