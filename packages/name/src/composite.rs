//! Composite names: a simple name optionally carrying a leading
//! `scheme:` token and an absolute-style flag.

use std::fmt;

use crate::name::{parse_segments, render_segments, Name, NameError};

/// A hierarchical name that may carry a single leading `scheme:` token,
/// such as `ejb:apps/frontend`.
///
/// The scheme selects which registered naming subsystem resolves the
/// remainder. Whether the remainder started with `/` is preserved so the
/// string form re-composes exactly.
///
/// # Examples
///
/// ```rust
/// use treeline_name::CompositeName;
///
/// let n = CompositeName::parse("ejb:apps/frontend").unwrap();
/// assert_eq!(n.scheme(), Some("ejb"));
/// assert_eq!(n.name().to_string(), "apps/frontend");
///
/// let n = CompositeName::parse("apps/frontend").unwrap();
/// assert_eq!(n.scheme(), None);
/// ```
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompositeName {
    scheme: Option<String>,
    absolute: bool,
    name: Name,
}

impl CompositeName {
    /// The empty composite name.
    pub fn empty() -> Self {
        CompositeName { scheme: None, absolute: false, name: Name::empty() }
    }

    /// Parse a composite name string.
    ///
    /// A single leading `identifier:` token before the first separator,
    /// quote, or escape is taken as the scheme. The remainder follows
    /// ordinary segment rules.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        let (scheme, rest) = match split_scheme_token(s) {
            Some((scheme, rest)) => (Some(scheme.to_string()), rest),
            None => (None, s),
        };

        let (absolute, rest) = match rest.strip_prefix('/') {
            Some(stripped) => (true, stripped),
            None => (false, rest),
        };

        let name = if rest.is_empty() {
            Name::empty()
        } else {
            Name::from_segments(parse_segments(rest)?)
        };

        Ok(CompositeName { scheme, absolute, name })
    }

    /// Wrap a simple name as a scheme-less composite name.
    pub fn from_name(name: Name) -> Self {
        CompositeName { scheme: None, absolute: false, name }
    }

    /// Build a composite name from a scheme token and a remainder.
    ///
    /// Fails if `scheme` is not a valid identifier.
    pub fn with_scheme(scheme: impl Into<String>, name: Name) -> Result<Self, NameError> {
        let scheme = scheme.into();
        if !is_scheme_token(&scheme) {
            return Err(NameError::InvalidScheme { scheme });
        }
        Ok(CompositeName { scheme: Some(scheme), absolute: false, name })
    }

    /// The scheme token, if present.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Check whether `token` is usable as a scheme (a non-empty
    /// identifier).
    pub fn is_valid_scheme(token: &str) -> bool {
        is_scheme_token(token)
    }

    /// Whether the remainder started with `/`.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// The remainder name, scheme stripped.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Split into the scheme (if any) and the remainder.
    pub fn split_scheme(&self) -> (Option<&str>, &Name) {
        (self.scheme.as_deref(), &self.name)
    }

    /// Discard the scheme, keeping the remainder.
    pub fn into_name(self) -> Name {
        self.name
    }

    /// Check whether the remainder is empty.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Number of remainder segments.
    pub fn len(&self) -> usize {
        self.name.len()
    }

    /// Get a remainder segment by index.
    pub fn get(&self, index: usize) -> Result<&str, NameError> {
        self.name.get(index)
    }

    /// Join with a suffix name, appending all of its segments. The scheme
    /// and absolute flag of `self` are kept.
    #[must_use]
    pub fn join(&self, suffix: &Name) -> CompositeName {
        CompositeName {
            scheme: self.scheme.clone(),
            absolute: self.absolute,
            name: self.name.join(suffix),
        }
    }

    /// Append all segments of `suffix` in place.
    pub fn append(&mut self, suffix: &Name) {
        self.name.append(suffix);
    }

    /// Append one segment, taken verbatim, in place.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.name.push(segment);
    }
}

impl fmt::Display for CompositeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}:", scheme)?;
        }
        if self.absolute {
            write!(f, "/")?;
        }
        let body = render_remainder(&self.name, self.scheme.is_none() && !self.absolute);
        write!(f, "{}", body)
    }
}

impl From<Name> for CompositeName {
    fn from(name: Name) -> Self {
        CompositeName::from_name(name)
    }
}

/// Render the remainder. When the composite has no scheme and no leading
/// slash, a first segment that itself looks like a `scheme:` token must be
/// quoted so the string form does not re-parse with a scheme.
fn render_remainder(name: &Name, guard_scheme: bool) -> String {
    let rendered = render_segments(&name.segments().map(str::to_string).collect::<Vec<_>>());
    if guard_scheme {
        if let Ok(first) = name.get(0) {
            if looks_like_scheme_prefix(first) {
                let mut quoted = String::with_capacity(rendered.len() + 2);
                quoted.push('"');
                for c in first.chars() {
                    if c == '"' || c == '\\' {
                        quoted.push('\\');
                    }
                    quoted.push(c);
                }
                quoted.push('"');
                let tail: Vec<String> =
                    name.segments().skip(1).map(str::to_string).collect();
                if tail.is_empty() {
                    return quoted;
                }
                return format!("{}/{}", quoted, render_segments(&tail));
            }
        }
    }
    rendered
}

fn looks_like_scheme_prefix(segment: &str) -> bool {
    match segment.split_once(':') {
        Some((token, _)) => is_scheme_token(token),
        None => false,
    }
}

/// Extract a leading `identifier:` token if one appears before any
/// separator, quote, or escape character.
fn split_scheme_token(s: &str) -> Option<(&str, &str)> {
    for (i, c) in s.char_indices() {
        match c {
            ':' => {
                let token = &s[..i];
                if is_scheme_token(token) {
                    return Some((token, &s[i + 1..]));
                }
                return None;
            }
            '/' | '\'' | '"' | '\\' => return None,
            _ => {}
        }
    }
    None
}

fn is_scheme_token(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if unicode_ident::is_xid_start(first) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}
