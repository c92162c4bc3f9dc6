//! treeline: resolve directory-style names to object bindings across one
//! or more candidate servers, with scheme-based federation, a private
//! version handshake, and transparent failover.
//!
//! This crate re-exports the public surface of the treeline workspace:
//!
//! - the name model ([`Name`], [`CompositeName`])
//! - the [`Context`] capability trait and its variants ([`Federation`],
//!   [`RelativeContext`], [`FederatingContext`], [`MemoryContext`],
//!   [`RemoteContext`])
//! - the provider machinery ([`ProviderEnvironment`], [`Blacklist`])
//! - the wire layer ([`Destination`], [`Transport`], handshake, [`Server`])
//! - the JSON codec ([`JsonCodec`])
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use treeline::{ContextExt, Federation, MemoryContext, Value};
//!
//! let federation = Federation::new(Arc::new(MemoryContext::new()));
//! federation.bind_str("apps", Value::from("local")).unwrap();
//!
//! let found = federation.lookup_str("apps").unwrap();
//! assert_eq!(found.into_object(), Some(Value::from("local")));
//! ```

pub use treeline_core::{
    AllowAll, AllowList, Binding, BoundValue, Codec, CompositeName, Context, ContextBox,
    ContextExt, ContextFactory, DenyList, FederatingContext, Federation, MemoryContext, Name,
    NameClassPair, NameError, NameRef, NamingError, NoCodec, ObjectFilter, RelativeContext,
    Resolved, SchemeRegistry, Value,
};
pub use treeline_name::name;
pub use treeline_provider::{
    Blacklist, Clock, ManualClock, ProviderEnvironment, ProviderEnvironmentBuilder, SystemClock,
};
pub use treeline_remote::{RemoteContext, Server};
pub use treeline_serde::{from_value, to_value, JsonCodec, MultiCodec};
pub use treeline_wire::{
    ChannelBox, Destination, MemoryChannel, MessageChannel, Session, Transport, WireError,
    LATEST_VERSION, MAGIC, PROTOCOL_VERSIONS,
};
pub use treeline_wire::handshake;
