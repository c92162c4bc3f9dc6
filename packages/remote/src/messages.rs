//! Request/response messages for the remote naming protocol.
//!
//! The envelope is JSON either way; bound objects travel inside it as
//! [`WireObject`]s - codec-encoded bytes under a type tag, so the server
//! can refuse a tag before any payload is deserialized.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use treeline_core::{Codec, NamingError, ObjectFilter, Value};

/// A codec-encoded bound object plus its type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireObject {
    pub tag: String,
    pub bytes: Vec<u8>,
}

impl WireObject {
    /// Encode a value at the session's protocol version.
    pub fn from_value(
        codec: &dyn Codec,
        value: &Value,
        version: u8,
    ) -> Result<WireObject, NamingError> {
        let bytes = codec.encode(value, version)?;
        Ok(WireObject { tag: value.kind().to_string(), bytes: bytes.to_vec() })
    }

    /// Decode back into a value, consulting the filter before the codec
    /// touches the payload.
    pub fn into_value(
        self,
        codec: &dyn Codec,
        filter: &dyn ObjectFilter,
        version: u8,
    ) -> Result<Value, NamingError> {
        if !filter.allows(&self.tag) {
            return Err(NamingError::Rejected { tag: self.tag });
        }
        codec.decode(&Bytes::from(self.bytes), version)
    }
}

/// One naming operation, with names in their composite string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    Lookup { name: String },
    Bind { name: String, object: WireObject },
    Rebind { name: String, object: WireObject },
    Unbind { name: String },
    Rename { old: String, new: String },
    List { name: String },
    ListBindings { name: String },
    CreateSubcontext { name: String },
    DestroySubcontext { name: String },
    LookupLink { name: String },
}

/// One entry of a `List` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePair {
    pub name: String,
    pub kind: String,
}

/// What a listed name is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireBound {
    Object(WireObject),
    Link(String),
    Context,
}

/// One entry of a `ListBindings` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBinding {
    pub name: String,
    pub value: WireBound,
}

/// The server's reply to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Object(WireObject),
    Context { name: String },
    Link { target: String },
    Done,
    Names(Vec<WirePair>),
    Bindings(Vec<WireBinding>),
    Fault(Fault),
}

/// A non-transient failure reported by the remote side.
///
/// Faults map one-to-one onto the semantic [`NamingError`] variants; they
/// are surfaced to the caller immediately, never retried, and never touch
/// the blacklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fault {
    NotFound { name: String },
    NotContext { name: String },
    AlreadyBound { name: String },
    ContextNotEmpty { name: String },
    InvalidName { message: String },
    UnknownScheme { scheme: String },
    LinkLoop { name: String },
    Rejected { tag: String },
    Permission { message: String },
    Codec { message: String },
    Other { message: String },
}

impl From<NamingError> for Fault {
    fn from(error: NamingError) -> Self {
        match error {
            NamingError::Name(e) => Fault::InvalidName { message: e.to_string() },
            NamingError::InvalidName { message } => Fault::InvalidName { message },
            NamingError::NotFound { name } => Fault::NotFound { name },
            NamingError::NotContext { name } => Fault::NotContext { name },
            NamingError::AlreadyBound { name } => Fault::AlreadyBound { name },
            NamingError::ContextNotEmpty { name } => Fault::ContextNotEmpty { name },
            NamingError::UnknownScheme { scheme } => Fault::UnknownScheme { scheme },
            NamingError::LinkLoop { name } => Fault::LinkLoop { name },
            NamingError::Rejected { tag } => Fault::Rejected { tag },
            NamingError::Permission { message } => Fault::Permission { message },
            NamingError::Codec { message } => Fault::Codec { message },
            // Server-side infrastructure failures are not the client's
            // connectivity problem; they surface as plain errors.
            other => Fault::Other { message: other.to_string() },
        }
    }
}

impl From<Fault> for NamingError {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::NotFound { name } => NamingError::NotFound { name },
            Fault::NotContext { name } => NamingError::NotContext { name },
            Fault::AlreadyBound { name } => NamingError::AlreadyBound { name },
            Fault::ContextNotEmpty { name } => NamingError::ContextNotEmpty { name },
            Fault::InvalidName { message } => NamingError::InvalidName { message },
            Fault::UnknownScheme { scheme } => NamingError::UnknownScheme { scheme },
            Fault::LinkLoop { name } => NamingError::LinkLoop { name },
            Fault::Rejected { tag } => NamingError::Rejected { tag },
            Fault::Permission { message } => NamingError::Permission { message },
            Fault::Codec { message } => NamingError::Codec { message },
            Fault::Other { message } => NamingError::Other { message },
        }
    }
}

/// Serialize a request for the wire.
pub fn encode_request(request: &Request) -> Result<Bytes, NamingError> {
    serde_json::to_vec(request)
        .map(Bytes::from)
        .map_err(|e| NamingError::Codec { message: e.to_string() })
}

/// Parse a request off the wire.
pub fn decode_request(bytes: &[u8]) -> Result<Request, NamingError> {
    serde_json::from_slice(bytes).map_err(|e| NamingError::Codec { message: e.to_string() })
}

/// Serialize a response for the wire.
pub fn encode_response(response: &Response) -> Result<Bytes, NamingError> {
    serde_json::to_vec(response)
        .map(Bytes::from)
        .map_err(|e| NamingError::Codec { message: e.to_string() })
}

/// Parse a response off the wire.
pub fn decode_response(bytes: &[u8]) -> Result<Response, NamingError> {
    serde_json::from_slice(bytes).map_err(|e| NamingError::Codec { message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use treeline_core::{AllowAll, DenyList};
    use treeline_serde::JsonCodec;

    #[test]
    fn request_envelope_round_trips() {
        let request = Request::Rename { old: "a/b".to_string(), new: "a/c".to_string() };
        let bytes = encode_request(&request).unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), request);
    }

    #[test]
    fn response_envelope_round_trips() {
        let response = Response::Names(vec![WirePair {
            name: "x".to_string(),
            kind: "object".to_string(),
        }]);
        let bytes = encode_response(&response).unwrap();
        assert_eq!(decode_response(&bytes).unwrap(), response);
    }

    #[test]
    fn garbled_envelope_is_a_codec_error() {
        let err = decode_request(b"running with scissors").unwrap_err();
        assert!(matches!(err, NamingError::Codec { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn wire_object_round_trips_through_codec() {
        let codec = JsonCodec;
        let value = Value::from("payload");
        let object = WireObject::from_value(&codec, &value, 2).unwrap();
        assert_eq!(object.tag, "string");
        let decoded = object.into_value(&codec, &AllowAll, 2).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn filter_gates_before_the_codec_runs() {
        let codec = JsonCodec;
        let object = WireObject {
            tag: "string".to_string(),
            // Garbage payload: the filter must reject before decode.
            bytes: b"\xff\xfe".to_vec(),
        };
        let err = object.into_value(&codec, &DenyList::new(["string"]), 2).unwrap_err();
        assert!(matches!(err, NamingError::Rejected { .. }));
    }

    #[test]
    fn faults_map_onto_semantic_errors_both_ways() {
        let err = NamingError::NotFound { name: "a".to_string() };
        let fault: Fault = err.into();
        assert_eq!(fault, Fault::NotFound { name: "a".to_string() });
        let back: NamingError = fault.into();
        assert!(matches!(back, NamingError::NotFound { .. }));
        assert!(!back.is_transient());
    }

    #[test]
    fn infrastructure_errors_become_plain_faults() {
        let err = NamingError::NoAvailableProviders;
        let fault: Fault = err.into();
        assert!(matches!(fault, Fault::Other { .. }));
        // And crucially, the round trip is not transient for the client.
        let back: NamingError = fault.into();
        assert!(!back.is_transient());
    }
}
