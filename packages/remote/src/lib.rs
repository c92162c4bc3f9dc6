//! Remote naming over the treeline wire protocol.
//!
//! [`RemoteContext`] is the client side: a root context that dispatches
//! every operation to one of the candidate servers owned by its provider
//! environment, failing over on connectivity errors. [`Server`] is the
//! counterpart: it speaks the handshake on an accepted channel and serves
//! decoded requests against any backing [`treeline_core::Context`].

mod messages;
mod remote;
mod server;

pub use messages::{Fault, Request, Response, WireBinding, WireBound, WirePair, WireObject};
pub use remote::RemoteContext;
pub use server::Server;
