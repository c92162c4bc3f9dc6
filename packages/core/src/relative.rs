//! Relative and federating context wrappers.
//!
//! Both present a subtree of a root context as an independent context by
//! re-basing every incoming name onto a stored prefix, then delegating
//! verbatim. The federating variant preserves composite-name semantics
//! across the re-basing; the plain variant is bare segment concatenation.

use std::sync::Arc;

use treeline_name::{CompositeName, Name};

use crate::{
    Binding, Context, NameClassPair, NameRef, NamingError, Resolved, Value,
};

/// A context presenting `prefix` inside `root` as its own root, with no
/// scheme semantics.
pub struct RelativeContext {
    root: Arc<dyn Context>,
    prefix: Name,
}

impl RelativeContext {
    pub fn new(root: Arc<dyn Context>, prefix: Name) -> Self {
        RelativeContext { root, prefix }
    }

    /// Re-base a suffix onto the stored prefix: plain segment
    /// concatenation for either name kind.
    fn absolute_name(&self, suffix: NameRef<'_>) -> Name {
        match suffix {
            NameRef::Composite(c) => self.prefix.join(c.name()),
            NameRef::Simple(n) => self.prefix.join(n),
        }
    }

    /// A fresh wrapper over the same root and prefix.
    fn reopened(&self) -> Box<Self> {
        Box::new(RelativeContext { root: Arc::clone(&self.root), prefix: self.prefix.clone() })
    }
}

impl Context for RelativeContext {
    fn lookup(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        if name.is_empty() {
            return Ok(Resolved::Context(self.reopened()));
        }
        let abs = self.absolute_name(name);
        self.root.lookup(NameRef::Simple(&abs))
    }

    fn bind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.bind(NameRef::Simple(&abs), value)
    }

    fn rebind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.rebind(NameRef::Simple(&abs), value)
    }

    fn unbind(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.unbind(NameRef::Simple(&abs))
    }

    fn rename(&self, old: NameRef<'_>, new: NameRef<'_>) -> Result<(), NamingError> {
        let old_abs = self.absolute_name(old);
        let new_abs = self.absolute_name(new);
        self.root.rename(NameRef::Simple(&old_abs), NameRef::Simple(&new_abs))
    }

    fn list(&self, name: NameRef<'_>) -> Result<Vec<NameClassPair>, NamingError> {
        let abs = self.absolute_name(name);
        self.root.list(NameRef::Simple(&abs))
    }

    fn list_bindings(&self, name: NameRef<'_>) -> Result<Vec<Binding>, NamingError> {
        let abs = self.absolute_name(name);
        self.root.list_bindings(NameRef::Simple(&abs))
    }

    fn create_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.create_subcontext(NameRef::Simple(&abs))
    }

    fn destroy_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.destroy_subcontext(NameRef::Simple(&abs))
    }

    fn lookup_link(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        if name.is_empty() {
            return Ok(Resolved::Context(self.reopened()));
        }
        let abs = self.absolute_name(name);
        self.root.lookup_link(NameRef::Simple(&abs))
    }

    fn close(&self) {
        // The wrapper does not own the underlying connection.
    }

    fn name_in_namespace(&self) -> String {
        self.prefix.to_string()
    }
}

/// A context presenting `prefix` inside `root` as its own root while
/// preserving composite (scheme-aware) name semantics.
pub struct FederatingContext {
    root: Arc<dyn Context>,
    prefix: CompositeName,
}

impl FederatingContext {
    pub fn new(root: Arc<dyn Context>, prefix: CompositeName) -> Self {
        FederatingContext { root, prefix }
    }

    /// Re-base a suffix onto the stored composite prefix.
    ///
    /// A composite suffix contributes all of its segments. A simple suffix
    /// is embedded as ONE opaque segment, never re-parsed, so characters
    /// with special meaning in the composite grammar survive re-basing.
    fn absolute_name(&self, suffix: NameRef<'_>) -> CompositeName {
        match suffix {
            NameRef::Composite(c) => self.prefix.join(c.name()),
            NameRef::Simple(n) => {
                let mut abs = self.prefix.clone();
                abs.push(n.to_string());
                abs
            }
        }
    }

    /// A fresh wrapper over the same root and prefix.
    fn reopened(&self) -> Box<Self> {
        Box::new(FederatingContext { root: Arc::clone(&self.root), prefix: self.prefix.clone() })
    }
}

impl Context for FederatingContext {
    fn lookup(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        if name.is_empty() {
            return Ok(Resolved::Context(self.reopened()));
        }
        let abs = self.absolute_name(name);
        self.root.lookup(NameRef::Composite(&abs))
    }

    fn bind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.bind(NameRef::Composite(&abs), value)
    }

    fn rebind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.rebind(NameRef::Composite(&abs), value)
    }

    fn unbind(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.unbind(NameRef::Composite(&abs))
    }

    fn rename(&self, old: NameRef<'_>, new: NameRef<'_>) -> Result<(), NamingError> {
        let old_abs = self.absolute_name(old);
        let new_abs = self.absolute_name(new);
        self.root.rename(NameRef::Composite(&old_abs), NameRef::Composite(&new_abs))
    }

    fn list(&self, name: NameRef<'_>) -> Result<Vec<NameClassPair>, NamingError> {
        let abs = self.absolute_name(name);
        self.root.list(NameRef::Composite(&abs))
    }

    fn list_bindings(&self, name: NameRef<'_>) -> Result<Vec<Binding>, NamingError> {
        let abs = self.absolute_name(name);
        self.root.list_bindings(NameRef::Composite(&abs))
    }

    fn create_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.create_subcontext(NameRef::Composite(&abs))
    }

    fn destroy_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let abs = self.absolute_name(name);
        self.root.destroy_subcontext(NameRef::Composite(&abs))
    }

    fn lookup_link(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        if name.is_empty() {
            return Ok(Resolved::Context(self.reopened()));
        }
        let abs = self.absolute_name(name);
        self.root.lookup_link(NameRef::Composite(&abs))
    }

    fn close(&self) {
        // The wrapper does not own the underlying connection.
    }

    fn name_in_namespace(&self) -> String {
        self.prefix.to_string()
    }
}
