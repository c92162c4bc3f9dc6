//! Wire layer for treeline: the message-oriented channel abstraction,
//! destination addresses, and the protocol version handshake.
//!
//! Errors at this level are transport-focused. No semantic errors like
//! "name not found" - those belong in higher layers.

mod channel;
mod destination;
mod error;
pub mod handshake;
mod memory;
mod session;

pub use channel::{ChannelBox, MessageChannel, Transport};
pub use destination::Destination;
pub use error::WireError;
pub use handshake::{LATEST_VERSION, MAGIC, PROTOCOL_VERSIONS};
pub use memory::MemoryChannel;
pub use session::Session;
