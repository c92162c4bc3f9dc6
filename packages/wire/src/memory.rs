//! In-process channel pair backed by std mpsc queues.
//!
//! Used by tests and by in-process servers; each half sends into the
//! other's receive queue.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use bytes::Bytes;

use crate::{MessageChannel, WireError};

/// One half of an in-memory duplex channel.
pub struct MemoryChannel {
    tx: Sender<Bytes>,
    rx: Receiver<Bytes>,
}

impl MemoryChannel {
    /// Create a connected pair. Messages written to one half are read
    /// from the other, in order.
    pub fn pair() -> (MemoryChannel, MemoryChannel) {
        let (tx1, rx1) = mpsc::channel();
        let (tx2, rx2) = mpsc::channel();
        (MemoryChannel { tx: tx1, rx: rx2 }, MemoryChannel { tx: tx2, rx: rx1 })
    }
}

impl MessageChannel for MemoryChannel {
    fn send(&mut self, message: Bytes) -> Result<(), WireError> {
        self.tx.send(message).map_err(|_| WireError::ChannelClosed)
    }

    fn recv(&mut self, timeout: Option<Duration>) -> Result<Bytes, WireError> {
        match timeout {
            Some(limit) => self.rx.recv_timeout(limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => WireError::Timeout(limit),
                RecvTimeoutError::Disconnected => WireError::ChannelClosed,
            }),
            None => self.rx.recv().map_err(|_| WireError::ChannelClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_and_receive_in_order() {
        let (mut a, mut b) = MemoryChannel::pair();
        a.send(Bytes::from_static(b"one")).unwrap();
        a.send(Bytes::from_static(b"two")).unwrap();
        assert_eq!(b.recv(None).unwrap(), Bytes::from_static(b"one"));
        assert_eq!(b.recv(None).unwrap(), Bytes::from_static(b"two"));
    }

    #[test]
    fn both_directions() {
        let (mut a, mut b) = MemoryChannel::pair();
        a.send(Bytes::from_static(b"ping")).unwrap();
        assert_eq!(b.recv(None).unwrap(), Bytes::from_static(b"ping"));
        b.send(Bytes::from_static(b"pong")).unwrap();
        assert_eq!(a.recv(None).unwrap(), Bytes::from_static(b"pong"));
    }

    #[test]
    fn recv_times_out() {
        let (_a, mut b) = MemoryChannel::pair();
        let result = b.recv(Some(Duration::from_millis(10)));
        assert!(matches!(result, Err(WireError::Timeout(_))));
    }

    #[test]
    fn dropped_peer_closes_channel() {
        let (a, mut b) = MemoryChannel::pair();
        drop(a);
        assert!(matches!(b.recv(None), Err(WireError::ChannelClosed)));
        assert!(matches!(
            b.recv(Some(Duration::from_millis(5))),
            Err(WireError::ChannelClosed)
        ));
    }

    #[test]
    fn send_to_dropped_peer_fails() {
        let (mut a, b) = MemoryChannel::pair();
        drop(b);
        assert!(matches!(
            a.send(Bytes::from_static(b"x")),
            Err(WireError::ChannelClosed)
        ));
    }
}
