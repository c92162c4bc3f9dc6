use std::time::Duration;

/// Errors at the wire layer: connectivity, framing, and handshake failures.
#[derive(thiserror::Error, Debug)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("invalid header")]
    InvalidHeader,

    #[error("no compatible protocol versions (server offered {offered:?})")]
    NoCompatibleVersions { offered: Vec<u8> },

    #[error("malformed handshake message: {message}")]
    Malformed { message: String },

    #[error("connection closed")]
    ChannelClosed,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to connect to {destination}: {message}")]
    Connect { destination: String, message: String },
}
