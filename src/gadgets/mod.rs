//! Decoder gadgets: varints, dynamic byte access, in-circuit hashing and the
//! record walker built on top of them

pub mod access;
pub mod hash;
pub mod varint;
pub mod walker;

pub use access::{AccessStrategy, Accessor, ByteAccessor};
pub use varint::{DecodedVarint, VarintDecoder};
pub use walker::{ExpectedTag, WireRecord, WireStructureWalker};
