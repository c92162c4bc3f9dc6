//! Destination addresses for candidate servers.

use std::fmt;

use url::Url;

use crate::WireError;

/// An opaque network address identifying one candidate server.
///
/// Equality is address-based: two destinations are equal when their URLs
/// are equal.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Destination {
    url: Url,
}

impl Destination {
    /// Parse a destination from a URL string.
    pub fn parse(s: &str) -> Result<Self, WireError> {
        Ok(Destination { url: Url::parse(s)? })
    }

    /// The underlying URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl From<Url> for Destination {
    fn from(url: Url) -> Self {
        Destination { url }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let d = Destination::parse("remote://node-a:7000").unwrap();
        assert_eq!(d.to_string(), "remote://node-a:7000");
        assert_eq!(d.url().host_str(), Some("node-a"));
    }

    #[test]
    fn equality_is_address_based() {
        let a = Destination::parse("remote://node-a:7000").unwrap();
        let b = Destination::parse("remote://node-a:7000").unwrap();
        let c = Destination::parse("remote://node-b:7000").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn invalid_url_rejected() {
        assert!(matches!(
            Destination::parse("not a url"),
            Err(WireError::UrlParse(_))
        ));
    }
}
