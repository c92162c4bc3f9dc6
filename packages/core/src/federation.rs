//! Scheme-based name federation.
//!
//! A composite name may carry a leading `scheme:` token selecting which
//! naming subsystem resolves the remainder. [`Federation`] performs that
//! dispatch identically for every operation; only the final verb differs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use treeline_name::CompositeName;

use crate::{
    Binding, Context, ContextBox, NameClassPair, NameRef, NamingError, Resolved, Value,
};

/// A factory producing the root context for a scheme.
pub trait ContextFactory: Send + Sync {
    fn create(&self) -> Result<ContextBox, NamingError>;
}

impl<F> ContextFactory for F
where
    F: Fn() -> Result<ContextBox, NamingError> + Send + Sync,
{
    fn create(&self) -> Result<ContextBox, NamingError> {
        self()
    }
}

/// Registry of scheme -> context-provider bindings.
///
/// A factory is consulted once per scheme; the root it produces is cached
/// and shared by every subsequent operation on that scheme.
pub struct SchemeRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ContextFactory>>>,
    roots: RwLock<HashMap<String, Arc<dyn Context>>>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        SchemeRegistry {
            factories: RwLock::new(HashMap::new()),
            roots: RwLock::new(HashMap::new()),
        }
    }

    /// Register a provider factory for a scheme.
    pub fn register(
        &self,
        scheme: impl Into<String>,
        factory: impl ContextFactory + 'static,
    ) -> Result<(), NamingError> {
        let scheme = scheme.into();
        if !CompositeName::is_valid_scheme(&scheme) {
            return Err(NamingError::InvalidName {
                message: format!("'{}' is not a valid scheme", scheme),
            });
        }
        self.factories
            .write()
            .expect("scheme registry poisoned")
            .insert(scheme, Arc::new(factory));
        Ok(())
    }

    /// Registered schemes, unordered.
    pub fn schemes(&self) -> Vec<String> {
        self.factories
            .read()
            .expect("scheme registry poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// The root context for a scheme, creating and caching it on first use.
    pub fn resolve(&self, scheme: &str) -> Result<Arc<dyn Context>, NamingError> {
        if let Some(root) = self.roots.read().expect("scheme registry poisoned").get(scheme) {
            return Ok(Arc::clone(root));
        }
        let factory = {
            let factories = self.factories.read().expect("scheme registry poisoned");
            match factories.get(scheme) {
                Some(factory) => Arc::clone(factory),
                None => {
                    return Err(NamingError::UnknownScheme { scheme: scheme.to_string() })
                }
            }
        };
        let root: Arc<dyn Context> = Arc::from(factory.create()?);
        let mut roots = self.roots.write().expect("scheme registry poisoned");
        // A concurrent caller may have won the race; keep the first root.
        let entry = roots.entry(scheme.to_string()).or_insert_with(|| Arc::clone(&root));
        Ok(Arc::clone(entry))
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The federating front door: splits the scheme off a composite name and
/// dispatches the remainder to the registered provider root, or to the
/// default/native context when no scheme is present.
pub struct Federation {
    registry: SchemeRegistry,
    default_context: Arc<dyn Context>,
}

impl Federation {
    pub fn new(default_context: Arc<dyn Context>) -> Self {
        Federation { registry: SchemeRegistry::new(), default_context }
    }

    /// The scheme registry, for registering providers.
    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    /// Resolve the target context and the remainder name for one dispatch.
    fn route(&self, name: NameRef<'_>) -> Result<(Arc<dyn Context>, CompositeName), NamingError> {
        let composite = name.to_composite();
        match composite.scheme() {
            Some(scheme) => {
                let root = self.registry.resolve(scheme)?;
                let (_, remainder) = composite.split_scheme();
                Ok((root, CompositeName::from_name(remainder.clone())))
            }
            None => Ok((Arc::clone(&self.default_context), composite)),
        }
    }
}

impl Context for Federation {
    fn lookup(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.lookup(NameRef::Composite(&remainder))
    }

    fn bind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.bind(NameRef::Composite(&remainder), value)
    }

    fn rebind(&self, name: NameRef<'_>, value: Value) -> Result<(), NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.rebind(NameRef::Composite(&remainder), value)
    }

    fn unbind(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.unbind(NameRef::Composite(&remainder))
    }

    fn rename(&self, old: NameRef<'_>, new: NameRef<'_>) -> Result<(), NamingError> {
        let old_composite = old.to_composite();
        let new_composite = new.to_composite();
        if old_composite.scheme() != new_composite.scheme() {
            return Err(NamingError::Other {
                message: "rename cannot cross naming systems".to_string(),
            });
        }
        let (ctx, old_remainder) = self.route(old)?;
        let new_remainder = CompositeName::from_name(new_composite.name().clone());
        ctx.rename(
            NameRef::Composite(&old_remainder),
            NameRef::Composite(&new_remainder),
        )
    }

    fn list(&self, name: NameRef<'_>) -> Result<Vec<NameClassPair>, NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.list(NameRef::Composite(&remainder))
    }

    fn list_bindings(&self, name: NameRef<'_>) -> Result<Vec<Binding>, NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.list_bindings(NameRef::Composite(&remainder))
    }

    fn create_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.create_subcontext(NameRef::Composite(&remainder))
    }

    fn destroy_subcontext(&self, name: NameRef<'_>) -> Result<(), NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.destroy_subcontext(NameRef::Composite(&remainder))
    }

    fn lookup_link(&self, name: NameRef<'_>) -> Result<Resolved, NamingError> {
        let (ctx, remainder) = self.route(name)?;
        ctx.lookup_link(NameRef::Composite(&remainder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContextExt, MemoryContext};

    fn memory_factory() -> impl ContextFactory {
        || -> Result<ContextBox, NamingError> { Ok(Box::new(MemoryContext::new())) }
    }

    #[test]
    fn registered_scheme_routes_to_its_root() {
        let federation = Federation::new(Arc::new(MemoryContext::new()));
        federation.registry().register("ejb", memory_factory()).unwrap();

        federation.bind_str("ejb:apps/front", Value::from("remote")).unwrap();

        // The scheme root saw the remainder, stripped of the scheme.
        let via_scheme = federation.lookup_str("ejb:apps/front").unwrap();
        assert_eq!(via_scheme.into_object(), Some(Value::from("remote")));

        // The default context never saw the name.
        assert!(matches!(
            federation.lookup_str("apps/front"),
            Err(NamingError::NotFound { .. })
        ));
    }

    #[test]
    fn scheme_root_is_cached_across_operations() {
        let federation = Federation::new(Arc::new(MemoryContext::new()));
        federation.registry().register("dns", memory_factory()).unwrap();

        federation.bind_str("dns:hosts", Value::from("db")).unwrap();
        // A second operation reaches the same root, so the binding is
        // still visible.
        let found = federation.lookup_str("dns:hosts").unwrap();
        assert_eq!(found.into_object(), Some(Value::from("db")));
    }

    #[test]
    fn unknown_scheme_is_an_error() {
        let federation = Federation::new(Arc::new(MemoryContext::new()));
        let err = federation.lookup_str("nope:a/b").unwrap_err();
        match err {
            NamingError::UnknownScheme { scheme } => assert_eq!(scheme, "nope"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn schemeless_names_reach_the_default_context() {
        let default_context = Arc::new(MemoryContext::new());
        let federation = Federation::new(Arc::clone(&default_context) as Arc<dyn Context>);

        federation.bind_str("local", Value::from(1i64)).unwrap();
        let found = default_context.lookup_str("local").unwrap();
        assert_eq!(found.into_object(), Some(Value::from(1i64)));
    }

    #[test]
    fn dispatch_is_identical_across_verbs() {
        let federation = Federation::new(Arc::new(MemoryContext::new()));
        federation.registry().register("ejb", memory_factory()).unwrap();

        federation.create_subcontext_str("ejb:apps").unwrap();
        federation.bind_str("ejb:apps/a", Value::from("one")).unwrap();
        federation.rebind_str("ejb:apps/a", Value::from("two")).unwrap();
        federation.rename_str("ejb:apps/a", "ejb:apps/b").unwrap();

        let names = federation.list_str("ejb:apps").unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].name, "b");

        let bindings = federation.list_bindings_str("ejb:apps").unwrap();
        assert_eq!(bindings.len(), 1);

        federation.unbind_str("ejb:apps/b").unwrap();
        federation.destroy_subcontext_str("ejb:apps").unwrap();

        // Every verb fails identically for an unregistered scheme.
        assert!(matches!(
            federation.create_subcontext_str("gone:x"),
            Err(NamingError::UnknownScheme { .. })
        ));
        assert!(matches!(
            federation.list_str("gone:x"),
            Err(NamingError::UnknownScheme { .. })
        ));
    }

    #[test]
    fn rename_across_schemes_is_refused() {
        let federation = Federation::new(Arc::new(MemoryContext::new()));
        federation.registry().register("a", memory_factory()).unwrap();
        federation.registry().register("b", memory_factory()).unwrap();

        let err = federation.rename_str("a:x", "b:x").unwrap_err();
        assert!(matches!(err, NamingError::Other { .. }));
    }

    #[test]
    fn invalid_scheme_cannot_be_registered() {
        let registry = SchemeRegistry::new();
        let err = registry.register("not a scheme", memory_factory()).unwrap_err();
        assert!(matches!(err, NamingError::InvalidName { .. }));
    }

    #[test]
    fn factory_errors_surface() {
        let registry = SchemeRegistry::new();
        registry
            .register("bad", || -> Result<ContextBox, NamingError> {
                Err(NamingError::Other { message: "factory exploded".to_string() })
            })
            .unwrap();
        let err = registry.resolve("bad").unwrap_err();
        assert!(err.to_string().contains("factory exploded"));
    }
}
