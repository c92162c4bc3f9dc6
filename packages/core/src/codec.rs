//! Codec and object-filter traits.
//!
//! Codecs convert between [`Value`] and bytes for a negotiated protocol
//! version. Object filters gate which object types a server is willing to
//! deserialize - the server-side safety valve in front of any codec.

use std::collections::HashSet;

use bytes::Bytes;

use crate::{NamingError, Value};

/// Codec for converting between Value and bytes at a protocol version.
pub trait Codec: Send + Sync {
    /// Decode raw bytes into a Value.
    fn decode(&self, bytes: &Bytes, version: u8) -> Result<Value, NamingError>;

    /// Encode a Value into raw bytes.
    fn encode(&self, value: &Value, version: u8) -> Result<Bytes, NamingError>;

    /// Check if this codec supports a protocol version.
    fn supports(&self, version: u8) -> bool;
}

/// A codec that doesn't support any version.
///
/// Useful as a placeholder for contexts that never marshal objects.
pub struct NoCodec;

impl Codec for NoCodec {
    fn decode(&self, _bytes: &Bytes, version: u8) -> Result<Value, NamingError> {
        Err(NamingError::UnsupportedVersion(version))
    }

    fn encode(&self, _value: &Value, version: u8) -> Result<Bytes, NamingError> {
        Err(NamingError::UnsupportedVersion(version))
    }

    fn supports(&self, _version: u8) -> bool {
        false
    }
}

impl<T: Codec + ?Sized> Codec for Box<T> {
    fn decode(&self, bytes: &Bytes, version: u8) -> Result<Value, NamingError> {
        self.as_ref().decode(bytes, version)
    }

    fn encode(&self, value: &Value, version: u8) -> Result<Bytes, NamingError> {
        self.as_ref().encode(value, version)
    }

    fn supports(&self, version: u8) -> bool {
        self.as_ref().supports(version)
    }
}

/// Decides which object type tags may be deserialized.
pub trait ObjectFilter: Send + Sync {
    fn allows(&self, tag: &str) -> bool;
}

/// Accepts every object type.
pub struct AllowAll;

impl ObjectFilter for AllowAll {
    fn allows(&self, _tag: &str) -> bool {
        true
    }
}

/// Rejects the listed tags, accepts everything else.
pub struct DenyList {
    tags: HashSet<String>,
}

impl DenyList {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DenyList { tags: tags.into_iter().map(Into::into).collect() }
    }
}

impl ObjectFilter for DenyList {
    fn allows(&self, tag: &str) -> bool {
        !self.tags.contains(tag)
    }
}

/// Accepts only the listed tags.
pub struct AllowList {
    tags: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList { tags: tags.into_iter().map(Into::into).collect() }
    }
}

impl ObjectFilter for AllowList {
    fn allows(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl<T: ObjectFilter + ?Sized> ObjectFilter for Box<T> {
    fn allows(&self, tag: &str) -> bool {
        self.as_ref().allows(tag)
    }
}
