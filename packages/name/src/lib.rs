//! Name model for treeline: ordered string segments with quoting rules,
//! plus a composite variant that understands a leading `scheme:` prefix.
//!
//! Names are parsed from strings or built programmatically, and are
//! immutable except through explicit clone-and-mutate builders. The empty
//! name (zero segments) is a valid, distinct value meaning "this context
//! itself".

mod composite;
mod name;

pub use composite::CompositeName;
pub use name::{Name, NameError};
