//! Error taxonomy for naming operations.

use treeline_name::NameError;
use treeline_wire::WireError;

/// Errors surfaced by naming operations.
///
/// These include semantic errors (unknown schemes, unbound names, rejected
/// object types) in addition to the connectivity errors from the wire
/// layer. Exactly one place decides retry behavior: [`NamingError::is_transient`].
#[derive(Debug)]
pub enum NamingError {
    /// Name parsing error.
    Name(NameError),

    /// A structurally valid name that is not usable for the operation.
    InvalidName { message: String },

    /// No binding at the name.
    NotFound { name: String },

    /// An intermediate node is not a context.
    NotContext { name: String },

    /// Bind target already bound.
    AlreadyBound { name: String },

    /// Subcontext still holds bindings.
    ContextNotEmpty { name: String },

    /// Composite name carries a scheme with no registered provider.
    UnknownScheme { scheme: String },

    /// Link resolution exceeded the depth bound.
    LinkLoop { name: String },

    /// Connectivity or protocol failure from the wire layer.
    Wire(WireError),

    /// Every configured destination is blacklisted (strict selection).
    NoAvailableProviders,

    /// Failover exhausted all candidates.
    CannotConnect { attempts: usize, message: String },

    /// The codec does not speak this protocol version.
    UnsupportedVersion(u8),

    /// Codec failed to encode or decode an object.
    Codec { message: String },

    /// Object type refused by the deserialization filter.
    Rejected { tag: String },

    /// Operation refused by the remote side.
    Permission { message: String },

    /// Generic error with message.
    Other { message: String },
}

impl NamingError {
    /// Whether this failure should be recorded against the destination and
    /// the operation retried on another candidate. Only connectivity and
    /// protocol failures qualify; resolution, permission, and marshalling
    /// errors surface immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, NamingError::Wire(_))
    }
}

impl std::fmt::Display for NamingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamingError::Name(e) => write!(f, "name error: {}", e),
            NamingError::InvalidName { message } => write!(f, "invalid name: {}", message),
            NamingError::NotFound { name } => write!(f, "name not found: {}", name),
            NamingError::NotContext { name } => write!(f, "not a context: {}", name),
            NamingError::AlreadyBound { name } => write!(f, "name already bound: {}", name),
            NamingError::ContextNotEmpty { name } => write!(f, "context not empty: {}", name),
            NamingError::UnknownScheme { scheme } => {
                write!(f, "no provider for scheme: {}", scheme)
            }
            NamingError::LinkLoop { name } => write!(f, "link loop resolving: {}", name),
            NamingError::Wire(e) => write!(f, "wire error: {}", e),
            NamingError::NoAvailableProviders => write!(f, "no providers available"),
            NamingError::CannotConnect { attempts, message } => {
                write!(f, "failed to connect to any server after {} attempts: {}", attempts, message)
            }
            NamingError::UnsupportedVersion(version) => {
                write!(f, "unsupported protocol version: {}", version)
            }
            NamingError::Codec { message } => write!(f, "codec error: {}", message),
            NamingError::Rejected { tag } => write!(f, "object type rejected: {}", tag),
            NamingError::Permission { message } => write!(f, "permission denied: {}", message),
            NamingError::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for NamingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NamingError::Name(e) => Some(e),
            NamingError::Wire(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NameError> for NamingError {
    fn from(e: NameError) -> Self {
        NamingError::Name(e)
    }
}

impl From<WireError> for NamingError {
    fn from(e: WireError) -> Self {
        NamingError::Wire(e)
    }
}
