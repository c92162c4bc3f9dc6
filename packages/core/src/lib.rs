//! Core treeline abstractions: the tree-shaped [`Value`], the [`Context`]
//! capability trait with its polymorphic variants, the error taxonomy,
//! codec and filter traits, scheme federation, and the relative/federating
//! context wrappers.

mod codec;
mod error;
mod federation;
mod memory;
mod relative;
mod traits;
mod value;

pub use codec::{AllowAll, AllowList, Codec, DenyList, NoCodec, ObjectFilter};
pub use error::NamingError;
pub use federation::{ContextFactory, Federation, SchemeRegistry};
pub use memory::MemoryContext;
pub use relative::{FederatingContext, RelativeContext};
pub use traits::{
    Binding, BoundValue, Context, ContextBox, ContextExt, NameClassPair, NameRef, Resolved,
};
pub use value::Value;

// Re-export the name model so most users depend on one crate.
pub use treeline_name::{name, CompositeName, Name, NameError};
