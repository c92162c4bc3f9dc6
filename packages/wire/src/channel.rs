//! Channel and transport traits.
//!
//! A [`MessageChannel`] is a reliable, ordered, message-oriented duplex
//! channel to one peer. A [`Transport`] opens channels to destinations.
//! Both are object-safe so implementations can be swapped behind a `Box`.

use std::time::Duration;

use bytes::Bytes;

use crate::{Destination, WireError};

/// A boxed channel.
pub type ChannelBox = Box<dyn MessageChannel>;

/// A reliable, ordered, message-oriented duplex channel.
///
/// Per-channel message ordering is the implementation's responsibility.
/// A channel is owned by exactly one caller at a time.
pub trait MessageChannel: Send {
    /// Send one discrete message.
    fn send(&mut self, message: Bytes) -> Result<(), WireError>;

    /// Receive the next message, blocking until one arrives.
    ///
    /// With a timeout, returns [`WireError::Timeout`] if nothing arrives
    /// in time. A closed peer yields [`WireError::ChannelClosed`].
    fn recv(&mut self, timeout: Option<Duration>) -> Result<Bytes, WireError>;
}

/// Opens message channels to destinations.
pub trait Transport: Send + Sync {
    /// Open a channel to a destination, bounded by `timeout`.
    fn connect(&self, destination: &Destination, timeout: Duration)
        -> Result<ChannelBox, WireError>;
}

impl<T: MessageChannel + ?Sized> MessageChannel for Box<T> {
    fn send(&mut self, message: Bytes) -> Result<(), WireError> {
        self.as_mut().send(message)
    }

    fn recv(&mut self, timeout: Option<Duration>) -> Result<Bytes, WireError> {
        self.as_mut().recv(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(
        &self,
        destination: &Destination,
        timeout: Duration,
    ) -> Result<ChannelBox, WireError> {
        self.as_ref().connect(destination, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn connect(
        &self,
        destination: &Destination,
        timeout: Duration,
    ) -> Result<ChannelBox, WireError> {
        self.as_ref().connect(destination, timeout)
    }
}
