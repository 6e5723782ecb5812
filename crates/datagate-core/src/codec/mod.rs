//! Value <-> byte conversion.
//!
//! A [`Codec`] is injected into every gateway, so any value type can bring
//! its own encoding without touching the gateway. [`JsonCodec`] is the
//! default and applies the envelope rule from [`shape`].

mod json;
pub mod shape;

pub use json::{EnvelopePolicy, JsonCodec};
pub use shape::{shape_of, Shape};

use crate::error::Result;

/// Converts a typed value to a byte payload and back.
///
/// `decode(encode(v))` must equal `v`.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<T>;
}
