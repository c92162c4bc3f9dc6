//! In-memory naming tree.
//!
//! The native/default resolver: a tree of objects, links, and
//! subcontexts behind an `RwLock`, shared by every view derived from the
//! same root. Link targets are interpreted against the tree root.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use treeline_name::{CompositeName, Name};

use crate::{
    Binding, BoundValue, Context, NameClassPair, NameRef, NamingError, Resolved, Value,
};

const MAX_LINK_DEPTH: usize = 16;

#[derive(Clone, Debug)]
enum Node {
    Object(Value),
    Link(CompositeName),
    Context(BTreeMap<String, Node>),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Object(_) => "object",
            Node::Link(_) => "link",
            Node::Context(_) => "context",
        }
    }
}

/// An in-memory naming context.
///
/// Cloning produces another view of the same shared tree; `base` marks
/// which subtree the view is rooted at.
///
/// # Example
///
/// ```rust
/// use treeline_core::{ContextExt, MemoryContext, Value};
///
/// let ctx = MemoryContext::new();
/// ctx.bind_str("greeting", Value::from("hello")).unwrap();
/// let found = ctx.lookup_str("greeting").unwrap();
/// assert_eq!(found.into_object(), Some(Value::from("hello")));
/// ```
#[derive(Clone)]
pub struct MemoryContext {
    tree: Arc<RwLock<Node>>,
    base: Name,
}

impl MemoryContext {
    /// Create a new, empty naming tree.
    pub fn new() -> Self {
        MemoryContext {
            tree: Arc::new(RwLock::new(Node::Context(BTreeMap::new()))),
            base: Name::empty(),
        }
    }

    /// Bind a symbolic link at `name` pointing to `target`.
    ///
    /// The target is resolved against the tree root when the link is
    /// looked up.
    pub fn bind_link(&self, name: NameRef<'_>, target: CompositeName) -> Result<(), NamingError> {
        self.insert(name, Node::Link(target), false)
    }

    fn absolute(&self, name: NameRef<'_>) -> Name {
        let composite = name.to_composite();
        self.base.join(composite.name())
    }

    fn insert(&self, name: NameRef<'_>, node: Node, replace: bool) -> Result<(), NamingError> {
        let abs = self.absolute(name);
        if abs.is_empty() {
            return Err(NamingError::InvalidName {
                message: "cannot bind the empty name".to_string(),
            });
        }
        let mut tree = self.tree.write().expect("naming tree poisoned");
        let (entries, last) = parent_entries(&mut tree, &abs)?;
        if !replace && entries.contains_key(&last) {
            return Err(NamingError::AlreadyBound { name: abs.to_string() });
        }
        entries.insert(last, node);
        Ok(())
    }

    /// Resolve an absolute name, following links up to the depth bound.
    fn resolve(&self, mut abs: Name, follow_links: bool) -> Result<Resolved, NamingError> {
        for _ in 0..=MAX_LINK_DEPTH {
            let tree = self.tree.read().expect("naming tree poisoned");
            match find(&tree, &abs)? {
                None => return Err(NamingError::NotFound { name: abs.to_string() }),
                Some(Node::Object(value)) => return Ok(Resolved::Object(value.clone())),
                Some(Node::Context(_)) => {
                    return Ok(Resolved::Context(Box::new(MemoryContext {
                        tree: Arc::clone(&self.tree),
                        base: abs,
                    })))
                }
                Some(Node::Link(target)) => {
                    if !follow_links {
                        return Ok(Resolved::Link(target.clone()));
                    }
                    let next = target.name().clone();
                    drop(tree);
                    abs = next;
                }
            }
        }
        Err(NamingError::LinkLoop { name: abs.to_string() })
    }
}

impl Default for MemoryContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk to the node at `abs`, or `None` if the terminal entry is absent.
/// An intermediate non-context node is an error.
fn find<'a>(root: &'a Node, abs: &Name) -> Result<Option<&'a Node>, NamingError> {
    let mut node = root;
    for segment in abs.segments() {
        match node {
            Node::Context(entries) => match entries.get(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            },
            _ => return Err(NamingError::NotContext { name: abs.to_string() }),
        }
    }
    Ok(Some(node))
}

/// Walk to the parent of `abs`, returning its entry map and the final
/// segment. Every intermediate must exist and be a context.
fn parent_entries<'a>(
    root: &'a mut Node,
    abs: &Name,
) -> Result<(&'a mut BTreeMap<String, Node>, String), NamingError> {
    let last = abs.get(abs.len() - 1)?.to_string();
    let mut node = root;
    for i in 0..abs.len() - 1 {
        let segment = abs.get(i)?;
        match node {
            Node::Context(entries) => match entries.get_mut(segment) {
                Some(child) => node = child,
                None => return Err(NamingError::NotFound { name: abs.to_string() }),
            },
            _ => return Err(NamingError::NotContext { name: abs.to_string() }),
        }
    }
    match node {
        Node::Context(entries) => Ok((entries, last)),
        _ => Err(NamingError::NotContext { name: abs.to_string() }),
    }
}

impl Context for MemoryContext {
    fn lookup(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        if name.is_empty() {
            return Ok(Resolved::Context(Box::new(self.clone())));
        }
        self.resolve(self.absolute(name), true)
    }

    fn bind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        self.insert(name, Node::Object(value), false)
    }

    fn rebind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        self.insert(name, Node::Object(value), true)
    }

    fn unbind(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let abs = self.absolute(name);
        if abs.is_empty() {
            return Err(NamingError::InvalidName {
                message: "cannot unbind the empty name".to_string(),
            });
        }
        let mut tree = self.tree.write().expect("naming tree poisoned");
        let (entries, last) = parent_entries(&mut tree, &abs)?;
        // Unbinding an absent terminal is a no-op.
        entries.remove(&last);
        Ok(())
    }

    fn rename(&self, old: NameRef<'_>, new: NameRef<'_>) -> Result<(), NamingError> {
        let old_abs = self.absolute(old);
        let new_abs = self.absolute(new);
        if old_abs.is_empty() || new_abs.is_empty() {
            return Err(NamingError::InvalidName {
                message: "cannot rename the empty name".to_string(),
            });
        }
        let mut tree = self.tree.write().expect("naming tree poisoned");

        if find(&tree, &old_abs)?.is_none() {
            return Err(NamingError::NotFound { name: old_abs.to_string() });
        }
        if find(&tree, &new_abs)?.is_some() {
            return Err(NamingError::AlreadyBound { name: new_abs.to_string() });
        }

        let node = {
            let (entries, last) = parent_entries(&mut tree, &old_abs)?;
            match entries.remove(&last) {
                Some(node) => node,
                None => return Err(NamingError::NotFound { name: old_abs.to_string() }),
            }
        };

        match parent_entries(&mut tree, &new_abs) {
            Ok((entries, last)) => {
                entries.insert(last, node);
                Ok(())
            }
            Err(e) => {
                // The new path ran through the node just removed; put it
                // back before surfacing the error.
                if let Ok((entries, last)) = parent_entries(&mut tree, &old_abs) {
                    entries.insert(last, node);
                }
                Err(e)
            }
        }
    }

    fn list(&self, name: NameRef<'_>) -> Result<Vec<NameClassPair>, NamingError> {
        let abs = self.absolute(name);
        let tree = self.tree.read().expect("naming tree poisoned");
        match find(&tree, &abs)? {
            None => Err(NamingError::NotFound { name: abs.to_string() }),
            Some(Node::Context(entries)) => Ok(entries
                .iter()
                .map(|(child, node)| NameClassPair {
                    name: child.clone(),
                    kind: node.kind().to_string(),
                })
                .collect()),
            Some(_) => Err(NamingError::NotContext { name: abs.to_string() }),
        }
    }

    fn list_bindings(&self, name: NameRef<'_>) -> Result<Vec<Binding>, NamingError> {
        let abs = self.absolute(name);
        let tree = self.tree.read().expect("naming tree poisoned");
        match find(&tree, &abs)? {
            None => Err(NamingError::NotFound { name: abs.to_string() }),
            Some(Node::Context(entries)) => Ok(entries
                .iter()
                .map(|(child, node)| Binding {
                    name: child.clone(),
                    value: match node {
                        Node::Object(value) => BoundValue::Object(value.clone()),
                        Node::Link(target) => BoundValue::Link(target.clone()),
                        Node::Context(_) => BoundValue::Context,
                    },
                })
                .collect()),
            Some(_) => Err(NamingError::NotContext { name: abs.to_string() }),
        }
    }

    fn create_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        self.insert(name, Node::Context(BTreeMap::new()), false)
    }

    fn destroy_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let abs = self.absolute(name);
        if abs.is_empty() {
            return Err(NamingError::InvalidName {
                message: "cannot destroy the root context".to_string(),
            });
        }
        let mut tree = self.tree.write().expect("naming tree poisoned");
        let (entries, last) = parent_entries(&mut tree, &abs)?;
        let removable = match entries.get(&last) {
            // Destroying an absent subcontext is a no-op.
            None => return Ok(()),
            Some(Node::Context(children)) => children.is_empty(),
            Some(_) => return Err(NamingError::NotContext { name: abs.to_string() }),
        };
        if !removable {
            return Err(NamingError::ContextNotEmpty { name: abs.to_string() });
        }
        entries.remove(&last);
        Ok(())
    }

    fn lookup_link(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        if name.is_empty() {
            return Ok(Resolved::Context(Box::new(self.clone())));
        }
        self.resolve(self.absolute(name), false)
    }

    fn name_in_namespace(&self) -> String {
        self.base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContextExt;

    #[test]
    fn bind_and_lookup() {
        let ctx = MemoryContext::new();
        ctx.bind_str("a", Value::from("one")).unwrap();
        let found = ctx.lookup_str("a").unwrap();
        assert_eq!(found.into_object(), Some(Value::from("one")));
    }

    #[test]
    fn bind_twice_fails_rebind_succeeds() {
        let ctx = MemoryContext::new();
        ctx.bind_str("a", Value::from(1i64)).unwrap();
        assert!(matches!(
            ctx.bind_str("a", Value::from(2i64)),
            Err(NamingError::AlreadyBound { .. })
        ));
        ctx.rebind_str("a", Value::from(2i64)).unwrap();
        assert_eq!(ctx.lookup_str("a").unwrap().into_object(), Some(Value::from(2i64)));
    }

    #[test]
    fn lookup_missing_is_not_found() {
        let ctx = MemoryContext::new();
        match ctx.lookup_str("ghost").unwrap_err() {
            NamingError::NotFound { name } => assert_eq!(name, "ghost"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn bind_under_missing_parent_fails() {
        let ctx = MemoryContext::new();
        assert!(matches!(
            ctx.bind_str("missing/child", Value::Null),
            Err(NamingError::NotFound { .. })
        ));
    }

    #[test]
    fn traversing_a_leaf_is_not_a_context() {
        let ctx = MemoryContext::new();
        ctx.bind_str("leaf", Value::from(1i64)).unwrap();
        assert!(matches!(
            ctx.lookup_str("leaf/child"),
            Err(NamingError::NotContext { .. })
        ));
        assert!(matches!(
            ctx.list_str("leaf"),
            Err(NamingError::NotContext { .. })
        ));
    }

    #[test]
    fn subcontexts_nest() {
        let ctx = MemoryContext::new();
        ctx.create_subcontext_str("apps").unwrap();
        ctx.create_subcontext_str("apps/frontend").unwrap();
        ctx.bind_str("apps/frontend/port", Value::from(8080i64)).unwrap();

        let sub = ctx.lookup_str("apps/frontend").unwrap().into_context().unwrap();
        assert_eq!(sub.name_in_namespace(), "apps/frontend");
        let found = sub.lookup_str("port").unwrap();
        assert_eq!(found.into_object(), Some(Value::from(8080i64)));

        // The view shares the tree: writes through it land in the root.
        sub.bind_str("host", Value::from("web-1")).unwrap();
        assert!(ctx.lookup_str("apps/frontend/host").is_ok());
    }

    #[test]
    fn empty_lookup_returns_a_context_view() {
        let ctx = MemoryContext::new();
        ctx.bind_str("a", Value::Null).unwrap();
        let view = ctx.lookup_str("").unwrap().into_context().unwrap();
        assert!(view.lookup_str("a").is_ok());
    }

    #[test]
    fn unbind_is_idempotent_at_the_terminal() {
        let ctx = MemoryContext::new();
        ctx.bind_str("a", Value::Null).unwrap();
        ctx.unbind_str("a").unwrap();
        ctx.unbind_str("a").unwrap();
        // Missing intermediate still fails.
        assert!(matches!(
            ctx.unbind_str("no/such"),
            Err(NamingError::NotFound { .. })
        ));
    }

    #[test]
    fn rename_moves_bindings() {
        let ctx = MemoryContext::new();
        ctx.bind_str("old", Value::from("v")).unwrap();
        ctx.rename_str("old", "new").unwrap();
        assert!(ctx.lookup_str("old").is_err());
        assert_eq!(ctx.lookup_str("new").unwrap().into_object(), Some(Value::from("v")));
    }

    #[test]
    fn rename_refuses_to_clobber() {
        let ctx = MemoryContext::new();
        ctx.bind_str("a", Value::from(1i64)).unwrap();
        ctx.bind_str("b", Value::from(2i64)).unwrap();
        assert!(matches!(
            ctx.rename_str("a", "b"),
            Err(NamingError::AlreadyBound { .. })
        ));
        // The source survives the failed rename.
        assert_eq!(ctx.lookup_str("a").unwrap().into_object(), Some(Value::from(1i64)));
    }

    #[test]
    fn list_reports_kinds() {
        let ctx = MemoryContext::new();
        ctx.bind_str("obj", Value::Null).unwrap();
        ctx.create_subcontext_str("sub").unwrap();
        ctx.bind_link(
            NameRef::Composite(&CompositeName::parse("lnk").unwrap()),
            CompositeName::parse("obj").unwrap(),
        )
        .unwrap();

        let mut pairs = ctx.list_str("").unwrap();
        pairs.sort_by(|a, b| a.name.cmp(&b.name));
        let kinds: Vec<(&str, &str)> =
            pairs.iter().map(|p| (p.name.as_str(), p.kind.as_str())).collect();
        assert_eq!(kinds, vec![("lnk", "link"), ("obj", "object"), ("sub", "context")]);
    }

    #[test]
    fn destroy_subcontext_requires_empty() {
        let ctx = MemoryContext::new();
        ctx.create_subcontext_str("sub").unwrap();
        ctx.bind_str("sub/a", Value::Null).unwrap();
        assert!(matches!(
            ctx.destroy_subcontext_str("sub"),
            Err(NamingError::ContextNotEmpty { .. })
        ));
        ctx.unbind_str("sub/a").unwrap();
        ctx.destroy_subcontext_str("sub").unwrap();
        // Destroying again is a no-op.
        ctx.destroy_subcontext_str("sub").unwrap();
    }

    #[test]
    fn links_resolve_against_the_root() {
        let ctx = MemoryContext::new();
        ctx.create_subcontext_str("data").unwrap();
        ctx.bind_str("data/real", Value::from("target")).unwrap();
        ctx.bind_link(
            NameRef::Composite(&CompositeName::parse("alias").unwrap()),
            CompositeName::parse("data/real").unwrap(),
        )
        .unwrap();

        // lookup follows the link.
        let found = ctx.lookup_str("alias").unwrap();
        assert_eq!(found.into_object(), Some(Value::from("target")));

        // lookup_link stops at it.
        match ctx.lookup_link_str("alias").unwrap() {
            Resolved::Link(target) => assert_eq!(target.to_string(), "data/real"),
            _ => panic!("expected a link"),
        }
    }

    #[test]
    fn link_cycles_are_bounded() {
        let ctx = MemoryContext::new();
        ctx.bind_link(
            NameRef::Composite(&CompositeName::parse("a").unwrap()),
            CompositeName::parse("b").unwrap(),
        )
        .unwrap();
        ctx.bind_link(
            NameRef::Composite(&CompositeName::parse("b").unwrap()),
            CompositeName::parse("a").unwrap(),
        )
        .unwrap();
        assert!(matches!(
            ctx.lookup_str("a"),
            Err(NamingError::LinkLoop { .. })
        ));
    }

    #[test]
    fn binding_the_empty_name_is_invalid() {
        let ctx = MemoryContext::new();
        assert!(matches!(
            ctx.bind_str("", Value::Null),
            Err(NamingError::InvalidName { .. })
        ));
    }

    #[test]
    fn concurrent_binds_land_in_one_tree() {
        let ctx = MemoryContext::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let view = ctx.clone();
                std::thread::spawn(move || {
                    view.bind_str(&format!("n{}", i), Value::from(i as i64)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ctx.list_str("").unwrap().len(), 8);
    }
}
