//! The connection server: handshake, then serve requests against a
//! backing context.

use std::sync::Arc;

use treeline_core::{
    AllowAll, BoundValue, Codec, Context, ContextExt, NamingError, ObjectFilter, Resolved,
};
use treeline_wire::handshake::server_handshake;
use treeline_wire::{MessageChannel, WireError, PROTOCOL_VERSIONS};

use crate::messages::{
    decode_request, encode_response, Request, Response, WireBinding, WireBound, WireObject,
    WirePair,
};

/// Serves the remote naming protocol on accepted channels.
///
/// The server is transport-agnostic: whatever accepts connections hands
/// each new channel to [`Server::serve`], typically on its own thread.
/// Bound objects are deserialized only after the configured
/// [`ObjectFilter`] accepts their type tag.
pub struct Server {
    backing: Arc<dyn Context>,
    codec: Arc<dyn Codec>,
    filter: Arc<dyn ObjectFilter>,
    offered: Vec<u8>,
}

impl Server {
    pub fn new(backing: Arc<dyn Context>, codec: Arc<dyn Codec>) -> Self {
        Server {
            backing,
            codec,
            filter: Arc::new(AllowAll),
            offered: PROTOCOL_VERSIONS.to_vec(),
        }
    }

    /// Replace the deserialization gate.
    pub fn with_filter(mut self, filter: Arc<dyn ObjectFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Restrict the protocol versions offered in the greeting.
    pub fn with_versions(mut self, versions: &[u8]) -> Self {
        self.offered = versions.to_vec();
        self
    }

    /// Drive one connection to completion: greet, negotiate, then answer
    /// requests until the peer goes away.
    pub fn serve(&self, channel: &mut dyn MessageChannel) -> Result<(), NamingError> {
        let version = server_handshake(channel, &self.offered, None)?;
        log::debug!("serving connection at protocol version {}", version);
        loop {
            let bytes = match channel.recv(None) {
                Ok(bytes) => bytes,
                Err(WireError::ChannelClosed) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            let response = self.handle(&bytes, version);
            channel.send(encode_response(&response)?)?;
        }
    }

    fn handle(&self, bytes: &[u8], version: u8) -> Response {
        let request = match decode_request(bytes) {
            Ok(request) => request,
            Err(e) => return Response::Fault(e.into()),
        };
        match self.execute(request, version) {
            Ok(response) => response,
            Err(e) => Response::Fault(e.into()),
        }
    }

    fn execute(&self, request: Request, version: u8) -> Result<Response, NamingError> {
        match request {
            Request::Lookup { name } => {
                self.resolved_response(self.backing.lookup_str(&name)?, version)
            }
            Request::LookupLink { name } => {
                self.resolved_response(self.backing.lookup_link_str(&name)?, version)
            }
            Request::Bind { name, object } => {
                let value = object.into_value(&*self.codec, &*self.filter, version)?;
                self.backing.bind_str(&name, value)?;
                Ok(Response::Done)
            }
            Request::Rebind { name, object } => {
                let value = object.into_value(&*self.codec, &*self.filter, version)?;
                self.backing.rebind_str(&name, value)?;
                Ok(Response::Done)
            }
            Request::Unbind { name } => {
                self.backing.unbind_str(&name)?;
                Ok(Response::Done)
            }
            Request::Rename { old, new } => {
                self.backing.rename_str(&old, &new)?;
                Ok(Response::Done)
            }
            Request::List { name } => {
                let pairs = self.backing.list_str(&name)?;
                Ok(Response::Names(
                    pairs
                        .into_iter()
                        .map(|pair| WirePair { name: pair.name, kind: pair.kind })
                        .collect(),
                ))
            }
            Request::ListBindings { name } => {
                let bindings = self.backing.list_bindings_str(&name)?;
                let wire = bindings
                    .into_iter()
                    .map(|binding| {
                        let value = match binding.value {
                            BoundValue::Object(value) => WireBound::Object(
                                WireObject::from_value(&*self.codec, &value, version)?,
                            ),
                            BoundValue::Link(target) => WireBound::Link(target.to_string()),
                            BoundValue::Context => WireBound::Context,
                        };
                        Ok(WireBinding { name: binding.name, value })
                    })
                    .collect::<Result<Vec<_>, NamingError>>()?;
                Ok(Response::Bindings(wire))
            }
            Request::CreateSubcontext { name } => {
                self.backing.create_subcontext_str(&name)?;
                Ok(Response::Done)
            }
            Request::DestroySubcontext { name } => {
                self.backing.destroy_subcontext_str(&name)?;
                Ok(Response::Done)
            }
        }
    }

    fn resolved_response(
        &self,
        resolved: Resolved,
        version: u8,
    ) -> Result<Response, NamingError> {
        match resolved {
            Resolved::Object(value) => Ok(Response::Object(WireObject::from_value(
                &*self.codec,
                &value,
                version,
            )?)),
            Resolved::Context(ctx) => Ok(Response::Context { name: ctx.name_in_namespace() }),
            Resolved::Link(target) => Ok(Response::Link { target: target.to_string() }),
        }
    }
}
