//! Negotiated protocol sessions.

use std::time::Duration;

use bytes::Bytes;

use crate::{ChannelBox, WireError};

/// A handshaken connection: the negotiated version plus the channel it
/// was negotiated on. The version is fixed for the session's lifetime and
/// governs message framing and feature availability.
pub struct Session {
    version: u8,
    channel: ChannelBox,
}

impl Session {
    pub fn new(version: u8, channel: ChannelBox) -> Self {
        Session { version, channel }
    }

    /// The protocol version negotiated for this session.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Send one message on the session's channel.
    pub fn send(&mut self, message: Bytes) -> Result<(), WireError> {
        self.channel.send(message)
    }

    /// Receive the next message from the session's channel.
    pub fn recv(&mut self, timeout: Option<Duration>) -> Result<Bytes, WireError> {
        self.channel.recv(timeout)
    }

    /// Send a request and wait for the single reply.
    pub fn call(&mut self, request: Bytes, timeout: Option<Duration>) -> Result<Bytes, WireError> {
        self.send(request)?;
        self.recv(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryChannel, MessageChannel};

    #[test]
    fn call_round_trips_one_message() {
        let (client, mut server) = MemoryChannel::pair();
        let mut session = Session::new(2, Box::new(client));
        assert_eq!(session.version(), 2);

        let echo = std::thread::spawn(move || {
            let msg = server.recv(None).unwrap();
            server.send(msg).unwrap();
        });

        let reply = session.call(Bytes::from_static(b"hello"), None).unwrap();
        assert_eq!(reply, Bytes::from_static(b"hello"));
        echo.join().unwrap();
    }
}
