//! Protocol version handshake.
//!
//! On a new connection the server sends a greeting: the 6-byte magic
//! header, a one-byte count, and one byte per offered version. Version
//! values greater than 1 are sent with the high bit set so that legacy
//! peers comparing them as signed bytes still see them as distinct from
//! version 1; current peers mask the bit off on read. The client then
//! confirms with the magic followed by the single negotiated version byte.
//!
//! ```text
//! server -> client: [6 bytes magic][1 byte count N][N version bytes]
//! client -> server: [6 bytes magic][1 byte negotiated version]
//! ```
//!
//! Any mismatch on the magic bytes is a fatal `InvalidHeader` for the
//! connection attempt.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{MessageChannel, WireError};

/// Magic bytes opening every handshake message.
pub const MAGIC: [u8; 6] = *b"trln\r\n";

/// Protocol versions this implementation speaks, ascending.
pub const PROTOCOL_VERSIONS: [u8; 2] = [1, 2];

/// The most recent protocol version this implementation speaks.
pub const LATEST_VERSION: u8 = 2;

/// Encode a version byte for the wire: values above 1 carry the high bit.
fn encode_version(version: u8) -> u8 {
    if version > 1 {
        version | 0x80
    } else {
        version
    }
}

/// Decode a wire version byte, masking the legacy high bit off.
fn decode_version(byte: u8) -> u8 {
    byte & 0x7f
}

/// Build the server greeting for the given offered versions.
pub fn encode_greeting(offered: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(MAGIC.len() + 1 + offered.len());
    buf.put_slice(&MAGIC);
    buf.put_u8(offered.len() as u8);
    for &version in offered {
        buf.put_u8(encode_version(version));
    }
    buf.freeze()
}

/// Parse a server greeting, returning the offered versions.
pub fn decode_greeting(message: &[u8]) -> Result<Vec<u8>, WireError> {
    if message.len() < MAGIC.len() || message[..MAGIC.len()] != MAGIC {
        return Err(WireError::InvalidHeader);
    }
    let Some(&count) = message.get(MAGIC.len()) else {
        return Err(WireError::Malformed { message: "greeting missing version count".to_string() });
    };
    let versions = &message[MAGIC.len() + 1..];
    if versions.len() != count as usize {
        return Err(WireError::Malformed {
            message: format!("greeting advertised {} versions, carried {}", count, versions.len()),
        });
    }
    Ok(versions.iter().map(|&b| decode_version(b)).collect())
}

/// Build the client confirmation for the negotiated version.
pub fn encode_confirmation(version: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(MAGIC.len() + 1);
    buf.put_slice(&MAGIC);
    buf.put_u8(version);
    buf.freeze()
}

/// Parse a client confirmation, returning the chosen version.
pub fn decode_confirmation(message: &[u8]) -> Result<u8, WireError> {
    if message.len() < MAGIC.len() || message[..MAGIC.len()] != MAGIC {
        return Err(WireError::InvalidHeader);
    }
    match message.get(MAGIC.len()) {
        Some(&version) if message.len() == MAGIC.len() + 1 => Ok(version),
        _ => Err(WireError::Malformed { message: "confirmation must carry exactly one version byte".to_string() }),
    }
}

/// Pick the session version: the minimum of the client's latest supported
/// version and the highest server offering the client also supports.
pub fn negotiate(supported: &[u8], offered: &[u8]) -> Result<u8, WireError> {
    let latest = supported.iter().copied().max().unwrap_or(0);
    let best_common = offered
        .iter()
        .copied()
        .filter(|v| supported.contains(v))
        .max()
        .ok_or_else(|| WireError::NoCompatibleVersions { offered: offered.to_vec() })?;
    Ok(latest.min(best_common))
}

/// Client side: read the greeting, negotiate, confirm.
///
/// Returns the negotiated version for the session.
pub fn client_handshake(
    channel: &mut dyn MessageChannel,
    supported: &[u8],
    timeout: Option<Duration>,
) -> Result<u8, WireError> {
    let greeting = channel.recv(timeout)?;
    let offered = decode_greeting(&greeting)?;
    let version = negotiate(supported, &offered)?;
    channel.send(encode_confirmation(version))?;
    log::debug!("negotiated protocol version {}", version);
    Ok(version)
}

/// Server side: send the greeting, validate the confirmation.
///
/// The confirmed version must be one this server offered.
pub fn server_handshake(
    channel: &mut dyn MessageChannel,
    offered: &[u8],
    timeout: Option<Duration>,
) -> Result<u8, WireError> {
    channel.send(encode_greeting(offered))?;
    let confirmation = channel.recv(timeout)?;
    let version = decode_confirmation(&confirmation)?;
    if !offered.contains(&version) {
        return Err(WireError::Malformed {
            message: format!("client confirmed unoffered version {}", version),
        });
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryChannel;

    #[test]
    fn greeting_bytes_are_exact() {
        let greeting = encode_greeting(&[1, 2]);
        let mut expected = MAGIC.to_vec();
        expected.push(2);
        expected.push(0x01);
        expected.push(0x82); // 2 with the legacy high bit
        assert_eq!(&greeting[..], &expected[..]);
    }

    #[test]
    fn greeting_round_trips_with_high_bit_masked() {
        let offered = decode_greeting(&encode_greeting(&[1, 2])).unwrap();
        assert_eq!(offered, vec![1, 2]);
    }

    #[test]
    fn bad_magic_is_invalid_header() {
        let mut greeting = encode_greeting(&[1]).to_vec();
        greeting[0] ^= 0xff;
        assert!(matches!(decode_greeting(&greeting), Err(WireError::InvalidHeader)));

        // Truncated inside the magic is also a header failure.
        assert!(matches!(decode_greeting(&MAGIC[..4]), Err(WireError::InvalidHeader)));
    }

    #[test]
    fn count_mismatch_is_malformed() {
        let mut greeting = encode_greeting(&[1, 2]).to_vec();
        greeting.truncate(greeting.len() - 1);
        assert!(matches!(decode_greeting(&greeting), Err(WireError::Malformed { .. })));
    }

    #[test]
    fn negotiation_picks_highest_common() {
        // Client {1,2,3}, server offers {1,2} (2 with high bit on the wire).
        assert_eq!(negotiate(&[1, 2, 3], &[1, 2]).unwrap(), 2);
        // Client is the limiting side.
        assert_eq!(negotiate(&[1], &[1, 2, 3]).unwrap(), 1);
        assert_eq!(negotiate(&[1, 2], &[2]).unwrap(), 2);
    }

    #[test]
    fn negotiation_fails_with_no_common_version() {
        let err = negotiate(&[1], &[2, 3]).unwrap_err();
        match err {
            WireError::NoCompatibleVersions { offered } => assert_eq!(offered, vec![2, 3]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn client_and_server_agree_end_to_end() {
        let (mut client, mut server) = MemoryChannel::pair();
        let server_thread = std::thread::spawn(move || {
            server_handshake(&mut server, &PROTOCOL_VERSIONS, None).unwrap()
        });
        let client_version = client_handshake(&mut client, &PROTOCOL_VERSIONS, None).unwrap();
        let server_version = server_thread.join().unwrap();
        assert_eq!(client_version, LATEST_VERSION);
        assert_eq!(server_version, LATEST_VERSION);
    }

    #[test]
    fn legacy_client_pins_version_one() {
        let (mut client, mut server) = MemoryChannel::pair();
        let server_thread =
            std::thread::spawn(move || server_handshake(&mut server, &PROTOCOL_VERSIONS, None));
        let version = client_handshake(&mut client, &[1], None).unwrap();
        assert_eq!(version, 1);
        assert_eq!(server_thread.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn client_rejects_wrong_magic() {
        let (mut client, mut server) = MemoryChannel::pair();
        server.send(Bytes::from_static(b"nope!!\x01\x01")).unwrap();
        let err = client_handshake(&mut client, &PROTOCOL_VERSIONS, None).unwrap_err();
        assert!(matches!(err, WireError::InvalidHeader));
    }

    #[test]
    fn server_rejects_unoffered_confirmation() {
        let (mut client, mut server) = MemoryChannel::pair();
        let server_thread =
            std::thread::spawn(move || server_handshake(&mut server, &[1], None));
        // Skip negotiation and confirm a version the server never offered.
        let _greeting = client.recv(None).unwrap();
        client.send(encode_confirmation(7)).unwrap();
        assert!(matches!(
            server_thread.join().unwrap(),
            Err(WireError::Malformed { .. })
        ));
    }

    #[test]
    fn server_rejects_bad_confirmation_magic() {
        let (mut client, mut server) = MemoryChannel::pair();
        let server_thread =
            std::thread::spawn(move || server_handshake(&mut server, &PROTOCOL_VERSIONS, None));
        let _greeting = client.recv(None).unwrap();
        client.send(Bytes::from_static(b"xxxxxx\x02")).unwrap();
        assert!(matches!(
            server_thread.join().unwrap(),
            Err(WireError::InvalidHeader)
        ));
    }

    #[test]
    fn confirmation_length_is_checked() {
        let mut long = MAGIC.to_vec();
        long.extend_from_slice(&[2, 9]);
        assert!(matches!(decode_confirmation(&long), Err(WireError::Malformed { .. })));
    }
}
