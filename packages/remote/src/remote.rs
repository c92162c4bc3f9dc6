//! The remote dispatcher: a root context backed by candidate servers.

use std::sync::{Arc, Mutex};

use treeline_core::{
    Binding, BoundValue, Codec, Context, FederatingContext, NameClassPair, NameRef, NamingError,
    Resolved, Value,
};
use treeline_name::CompositeName;
use treeline_provider::ProviderEnvironment;
use treeline_wire::handshake::client_handshake;
use treeline_wire::{Destination, Session, Transport, PROTOCOL_VERSIONS};

use crate::messages::{
    decode_response, encode_request, Request, Response, WireBound, WireObject,
};

struct ActiveSession {
    destination: Destination,
    session: Session,
}

/// A root context that executes naming operations against remote servers,
/// with transparent multi-provider failover.
///
/// Each operation reuses the cached session when one exists; otherwise the
/// provider environment yields a destination, the handshake runs at the
/// configured timeout, and the session is cached. A connectivity failure
/// marks the destination in the shared blacklist and the operation moves
/// to the next candidate, up to the environment's retry limit.
pub struct RemoteContext {
    environment: Arc<ProviderEnvironment>,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    session: Mutex<Option<ActiveSession>>,
}

impl RemoteContext {
    pub fn new(
        environment: Arc<ProviderEnvironment>,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        RemoteContext { environment, transport, codec, session: Mutex::new(None) }
    }

    /// The shared provider environment.
    pub fn environment(&self) -> &Arc<ProviderEnvironment> {
        &self.environment
    }

    /// A new handle over the same environment, transport, and codec, with
    /// its own session cache.
    fn new_handle(&self) -> RemoteContext {
        RemoteContext {
            environment: Arc::clone(&self.environment),
            transport: Arc::clone(&self.transport),
            codec: Arc::clone(&self.codec),
            session: Mutex::new(None),
        }
    }

    fn establish(&self, destination: &Destination) -> Result<Session, NamingError> {
        let timeout = self.environment.connect_timeout();
        let mut channel = self.transport.connect(destination, timeout)?;
        let version = client_handshake(&mut *channel, &PROTOCOL_VERSIONS, Some(timeout))?;
        Ok(Session::new(version, channel))
    }

    fn exchange(
        &self,
        active: &mut ActiveSession,
        build: &dyn Fn(u8) -> Result<Request, NamingError>,
    ) -> Result<Response, NamingError> {
        let request = build(active.session.version())?;
        let bytes = encode_request(&request)?;
        let timeout = self.environment.connect_timeout();
        let reply = active.session.call(bytes, Some(timeout))?;
        decode_response(&reply)
    }

    /// Run one operation end-to-end with failover.
    fn call(
        &self,
        build: &dyn Fn(u8) -> Result<Request, NamingError>,
    ) -> Result<Response, NamingError> {
        let mut cached = self.session.lock().expect("session cache poisoned");
        let mut tried: Vec<Destination> = Vec::new();
        let mut attempts = 0usize;
        let mut last_error: Option<NamingError> = None;
        let limit = self.environment.retry_limit();

        loop {
            let mut active = match cached.take() {
                Some(active) => active,
                None => {
                    if attempts >= limit {
                        break;
                    }
                    let destination = match self.environment.select(&tried) {
                        Ok(destination) => destination,
                        Err(e) => {
                            last_error.get_or_insert(e);
                            break;
                        }
                    };
                    attempts += 1;
                    match self.establish(&destination) {
                        Ok(session) => ActiveSession { destination, session },
                        Err(e) if e.is_transient() => {
                            self.environment.record_failure(&destination);
                            log::warn!("connect to {} failed: {}", destination, e);
                            tried.push(destination);
                            last_error = Some(e);
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                }
            };

            match self.exchange(&mut active, build) {
                Ok(Response::Fault(fault)) => {
                    // The remote side answered; the session stays usable.
                    *cached = Some(active);
                    return Err(fault.into());
                }
                Ok(response) => {
                    *cached = Some(active);
                    return Ok(response);
                }
                Err(e) if e.is_transient() => {
                    self.environment.record_failure(&active.destination);
                    log::warn!("operation against {} failed: {}", active.destination, e);
                    if !tried.contains(&active.destination) {
                        tried.push(active.destination.clone());
                    }
                    last_error = Some(e);
                    // The session is discarded with `active`.
                }
                Err(e) => {
                    *cached = Some(active);
                    return Err(e);
                }
            }
        }

        match last_error {
            Some(NamingError::NoAvailableProviders) if attempts == 0 => {
                Err(NamingError::NoAvailableProviders)
            }
            Some(e) => Err(NamingError::CannotConnect { attempts, message: e.to_string() }),
            None => Err(NamingError::CannotConnect {
                attempts,
                message: "retry limit exhausted".to_string(),
            }),
        }
    }

    fn resolve_response(&self, response: Response) -> Result<Resolved, NamingError> {
        match response {
            Response::Object(object) => {
                let codec = Arc::clone(&self.codec);
                let version = self.session_version();
                Ok(Resolved::Object(object.into_value(
                    &*codec,
                    &treeline_core::AllowAll,
                    version,
                )?))
            }
            Response::Context { name } => {
                let prefix = CompositeName::parse(&name)?;
                let root: Arc<dyn Context> = Arc::new(self.new_handle());
                Ok(Resolved::Context(Box::new(FederatingContext::new(root, prefix))))
            }
            Response::Link { target } => Ok(Resolved::Link(CompositeName::parse(&target)?)),
            other => Err(unexpected(other)),
        }
    }

    /// Version of the currently cached session, falling back to the
    /// latest supported version. Object decoding only ever runs right
    /// after a successful call, while the session is cached.
    fn session_version(&self) -> u8 {
        self.session
            .lock()
            .expect("session cache poisoned")
            .as_ref()
            .map(|active| active.session.version())
            .unwrap_or(treeline_wire::LATEST_VERSION)
    }
}

fn unexpected(response: Response) -> NamingError {
    NamingError::Codec { message: format!("unexpected response: {:?}", response) }
}

fn render(name: NameRef<'_>) -> String {
    name.to_composite().to_string()
}

impl Context for RemoteContext {
    fn lookup(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        let name = render(name);
        let response = self.call(&|_| Ok(Request::Lookup { name: name.clone() }))?;
        self.resolve_response(response)
    }

    fn bind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        let name = render(name);
        let codec = Arc::clone(&self.codec);
        let response = self.call(&move |version| {
            Ok(Request::Bind {
                name: name.clone(),
                object: WireObject::from_value(&*codec, &value, version)?,
            })
        })?;
        match response {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn rebind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        let name = render(name);
        let codec = Arc::clone(&self.codec);
        let response = self.call(&move |version| {
            Ok(Request::Rebind {
                name: name.clone(),
                object: WireObject::from_value(&*codec, &value, version)?,
            })
        })?;
        match response {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn unbind(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let name = render(name);
        let response = self.call(&|_| Ok(Request::Unbind { name: name.clone() }))?;
        match response {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn rename(&self, old: NameRef<'_>, new: NameRef<'_>) -> Result<(), NamingError> {
        let old = render(old);
        let new = render(new);
        let response = self
            .call(&|_| Ok(Request::Rename { old: old.clone(), new: new.clone() }))?;
        match response {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn list(&self, name: NameRef<'_>) -> Result<Vec<NameClassPair>, NamingError> {
        let name = render(name);
        let response = self.call(&|_| Ok(Request::List { name: name.clone() }))?;
        match response {
            Response::Names(pairs) => Ok(pairs
                .into_iter()
                .map(|pair| NameClassPair { name: pair.name, kind: pair.kind })
                .collect()),
            other => Err(unexpected(other)),
        }
    }

    fn list_bindings(&self, name: NameRef<'_>) -> Result<Vec<Binding>, NamingError> {
        let name = render(name);
        let response = self.call(&|_| Ok(Request::ListBindings { name: name.clone() }))?;
        let version = self.session_version();
        match response {
            Response::Bindings(bindings) => bindings
                .into_iter()
                .map(|binding| {
                    let value = match binding.value {
                        WireBound::Object(object) => BoundValue::Object(object.into_value(
                            &*self.codec,
                            &treeline_core::AllowAll,
                            version,
                        )?),
                        WireBound::Link(target) => {
                            BoundValue::Link(CompositeName::parse(&target)?)
                        }
                        WireBound::Context => BoundValue::Context,
                    };
                    Ok(Binding { name: binding.name, value })
                })
                .collect(),
            other => Err(unexpected(other)),
        }
    }

    fn create_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let name = render(name);
        let response = self.call(&|_| Ok(Request::CreateSubcontext { name: name.clone() }))?;
        match response {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn destroy_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let name = render(name);
        let response = self.call(&|_| Ok(Request::DestroySubcontext { name: name.clone() }))?;
        match response {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn lookup_link(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        let name = render(name);
        let response = self.call(&|_| Ok(Request::LookupLink { name: name.clone() }))?;
        self.resolve_response(response)
    }

    fn close(&self) {
        // Drop the cached session; the next operation reconnects.
        self.session.lock().expect("session cache poisoned").take();
    }
}
