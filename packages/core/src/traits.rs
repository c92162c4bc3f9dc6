//! The Context capability trait and its argument/result types.

use std::sync::Arc;

use treeline_name::{CompositeName, Name};

use crate::{NamingError, Value};

/// A boxed context that is Send + Sync.
pub type ContextBox = Box<dyn Context>;

/// Borrowed name argument for context operations.
///
/// Names come in two kinds and the distinction is load-bearing for
/// re-basing: a composite suffix is appended segment by segment, while a
/// simple suffix is embedded as one opaque segment, never re-parsed.
#[derive(Clone, Copy, Debug)]
pub enum NameRef<'a> {
    /// A composite (possibly scheme-carrying) name.
    Composite(&'a CompositeName),
    /// A simple name from a single flat namespace.
    Simple(&'a Name),
}

impl NameRef<'_> {
    /// Whether the referenced name is the empty name. A bare scheme or a
    /// lone `/` is not empty.
    pub fn is_empty(&self) -> bool {
        match self {
            NameRef::Composite(c) => {
                c.is_empty() && c.scheme().is_none() && !c.is_absolute()
            }
            NameRef::Simple(n) => n.is_empty(),
        }
    }

    /// The composite view of this name. A simple name becomes a
    /// scheme-less composite with the same segments.
    pub fn to_composite(&self) -> CompositeName {
        match self {
            NameRef::Composite(c) => (*c).clone(),
            NameRef::Simple(n) => CompositeName::from_name((*n).clone()),
        }
    }

    /// The string form of the referenced name.
    pub fn render(&self) -> String {
        match self {
            NameRef::Composite(c) => c.to_string(),
            NameRef::Simple(n) => n.to_string(),
        }
    }
}

impl<'a> From<&'a CompositeName> for NameRef<'a> {
    fn from(name: &'a CompositeName) -> Self {
        NameRef::Composite(name)
    }
}

impl<'a> From<&'a Name> for NameRef<'a> {
    fn from(name: &'a Name) -> Self {
        NameRef::Simple(name)
    }
}

/// The result of a lookup.
pub enum Resolved {
    /// A bound object.
    Object(Value),
    /// A subtree, usable as an independent context.
    Context(ContextBox),
    /// An unresolved link (from `lookup_link`).
    Link(CompositeName),
}

impl core::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Resolved::Object(value) => f.debug_tuple("Object").field(value).finish(),
            Resolved::Context(_) => f.debug_tuple("Context").field(&"..").finish(),
            Resolved::Link(name) => f.debug_tuple("Link").field(name).finish(),
        }
    }
}

impl Resolved {
    /// The bound object, if this resolved to one.
    pub fn into_object(self) -> Option<Value> {
        match self {
            Resolved::Object(value) => Some(value),
            _ => None,
        }
    }

    /// The context, if this resolved to one.
    pub fn into_context(self) -> Option<ContextBox> {
        match self {
            Resolved::Context(ctx) => Some(ctx),
            _ => None,
        }
    }
}

/// What a name is bound to, as reported by `list_bindings`.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundValue {
    /// A plain object.
    Object(Value),
    /// A symbolic link to another name.
    Link(CompositeName),
    /// A subcontext.
    Context,
}

impl BoundValue {
    /// Short tag for the binding kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BoundValue::Object(_) => "object",
            BoundValue::Link(_) => "link",
            BoundValue::Context => "context",
        }
    }
}

/// One entry from `list`: the child's name and the kind of its binding.
#[derive(Clone, Debug, PartialEq)]
pub struct NameClassPair {
    pub name: String,
    pub kind: String,
}

/// One entry from `list_bindings`: the child's name and its binding.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: BoundValue,
}

/// A polymorphic node in the naming tree.
///
/// Every variant (root, relative, federating) supplies the same capability
/// set; only the re-basing/dispatch strategy differs. Implementations are
/// shared freely across threads, so operations take `&self`.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn Context>`.
pub trait Context: Send + Sync {
    /// Resolve a name to its binding.
    fn lookup(&self, name: NameRef<'_>) -> Result<Resolved, NamingError>;

    /// Bind a name to an object. Fails if the name is already bound.
    fn bind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError>;

    /// Bind a name to an object, replacing any existing binding.
    fn rebind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError>;

    /// Remove the binding for a name.
    fn unbind(&self, name: NameRef<'_>) -> Result<(), NamingError>;

    /// Move a binding from one name to another.
    fn rename(&self, old: NameRef<'_>, new: NameRef<'_>) -> Result<(), NamingError>;

    /// Enumerate the names bound under a context, with binding kinds.
    fn list(&self, name: NameRef<'_>) -> Result<Vec<NameClassPair>, NamingError>;

    /// Enumerate the names bound under a context, with bound values.
    fn list_bindings(&self, name: NameRef<'_>) -> Result<Vec<Binding>, NamingError>;

    /// Create an empty subcontext at a name.
    fn create_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError>;

    /// Remove an empty subcontext.
    fn destroy_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError>;

    /// Resolve a name, stopping at a link instead of following it.
    fn lookup_link(&self, name: NameRef<'_>) -> Result<Resolved, NamingError>;

    /// Release resources held by this context handle. Wrappers over a
    /// shared root do nothing here.
    fn close(&self) {}

    /// This context's name within its own namespace.
    fn name_in_namespace(&self) -> String {
        String::new()
    }
}

impl core::fmt::Debug for dyn Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("name_in_namespace", &self.name_in_namespace())
            .finish_non_exhaustive()
    }
}

impl<T: Context + ?Sized> Context for Box<T> {
    fn lookup(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        self.as_ref().lookup(name)
    }
    fn bind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        self.as_ref().bind(name, value)
    }
    fn rebind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        self.as_ref().rebind(name, value)
    }
    fn unbind(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        self.as_ref().unbind(name)
    }
    fn rename(&self, old: NameRef<'_>, new: NameRef<'_>) -> Result<(), NamingError> {
        self.as_ref().rename(old, new)
    }
    fn list(&self, name: NameRef<'_>) -> Result<Vec<NameClassPair>, NamingError> {
        self.as_ref().list(name)
    }
    fn list_bindings(&self, name: NameRef<'_>) -> Result<Vec<Binding>, NamingError> {
        self.as_ref().list_bindings(name)
    }
    fn create_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        self.as_ref().create_subcontext(name)
    }
    fn destroy_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        self.as_ref().destroy_subcontext(name)
    }
    fn lookup_link(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        self.as_ref().lookup_link(name)
    }
    fn close(&self) {
        self.as_ref().close()
    }
    fn name_in_namespace(&self) -> String {
        self.as_ref().name_in_namespace()
    }
}

impl<T: Context + ?Sized> Context for Arc<T> {
    fn lookup(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        self.as_ref().lookup(name)
    }
    fn bind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        self.as_ref().bind(name, value)
    }
    fn rebind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        self.as_ref().rebind(name, value)
    }
    fn unbind(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        self.as_ref().unbind(name)
    }
    fn rename(&self, old: NameRef<'_>, new: NameRef<'_>) -> Result<(), NamingError> {
        self.as_ref().rename(old, new)
    }
    fn list(&self, name: NameRef<'_>) -> Result<Vec<NameClassPair>, NamingError> {
        self.as_ref().list(name)
    }
    fn list_bindings(&self, name: NameRef<'_>) -> Result<Vec<Binding>, NamingError> {
        self.as_ref().list_bindings(name)
    }
    fn create_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        self.as_ref().create_subcontext(name)
    }
    fn destroy_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        self.as_ref().destroy_subcontext(name)
    }
    fn lookup_link(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        self.as_ref().lookup_link(name)
    }
    fn close(&self) {
        self.as_ref().close()
    }
    fn name_in_namespace(&self) -> String {
        self.as_ref().name_in_namespace()
    }
}

/// String-taking conveniences over [`Context`]. Strings are parsed as
/// composite names.
pub trait ContextExt: Context {
    fn lookup_str(&self, name: &str) -> Result<Resolved, NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.lookup(NameRef::Composite(&parsed))
    }

    fn bind_str(&self, name: &str, value: Value) -> Result<(), NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.bind(NameRef::Composite(&parsed), value)
    }

    fn rebind_str(&self, name: &str, value: Value) -> Result<(), NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.rebind(NameRef::Composite(&parsed), value)
    }

    fn unbind_str(&self, name: &str) -> Result<(), NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.unbind(NameRef::Composite(&parsed))
    }

    fn rename_str(&self, old: &str, new: &str) -> Result<(), NamingError> {
        let old = CompositeName::parse(old)?;
        let new = CompositeName::parse(new)?;
        self.rename(NameRef::Composite(&old), NameRef::Composite(&new))
    }

    fn list_str(&self, name: &str) -> Result<Vec<NameClassPair>, NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.list(NameRef::Composite(&parsed))
    }

    fn list_bindings_str(&self, name: &str) -> Result<Vec<Binding>, NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.list_bindings(NameRef::Composite(&parsed))
    }

    fn create_subcontext_str(&self, name: &str) -> Result<(), NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.create_subcontext(NameRef::Composite(&parsed))
    }

    fn destroy_subcontext_str(&self, name: &str) -> Result<(), NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.destroy_subcontext(NameRef::Composite(&parsed))
    }

    fn lookup_link_str(&self, name: &str) -> Result<Resolved, NamingError> {
        let parsed = CompositeName::parse(name)?;
        self.lookup_link(NameRef::Composite(&parsed))
    }
}

impl<T: Context + ?Sized> ContextExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use treeline_name::name;

    #[test]
    fn name_ref_emptiness() {
        let empty = Name::empty();
        assert!(NameRef::Simple(&empty).is_empty());

        let n = name!("a");
        assert!(!NameRef::Simple(&n).is_empty());

        let c = CompositeName::parse("").unwrap();
        assert!(NameRef::Composite(&c).is_empty());

        // A bare scheme is not the empty name.
        let c = CompositeName::parse("ejb:").unwrap();
        assert!(!NameRef::Composite(&c).is_empty());
    }

    #[test]
    fn name_ref_to_composite() {
        let n = name!("a/b");
        let c = NameRef::Simple(&n).to_composite();
        assert_eq!(c.scheme(), None);
        assert_eq!(c.name(), &n);
    }

    #[test]
    fn bound_value_kinds() {
        assert_eq!(BoundValue::Object(Value::Null).kind(), "object");
        assert_eq!(BoundValue::Context.kind(), "context");
        let link = BoundValue::Link(CompositeName::parse("a/b").unwrap());
        assert_eq!(link.kind(), "link");
    }

    #[test]
    fn resolved_accessors() {
        let r = Resolved::Object(Value::from("x"));
        assert_eq!(r.into_object(), Some(Value::from("x")));

        let r = Resolved::Link(CompositeName::parse("a").unwrap());
        assert!(r.into_object().is_none());
    }
}
