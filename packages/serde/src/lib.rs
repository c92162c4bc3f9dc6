//! Serde integration for treeline: the JSON codec and conversions
//! between [`treeline_core::Value`] and serde types.

mod codec;
mod convert;

pub use codec::{JsonCodec, MultiCodec};
pub use convert::{from_value, json_to_value, to_value, value_to_json};
