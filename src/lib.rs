//! ZK Wire Prover
//!
//! Zero-knowledge proofs that a length-delimited TLV buffer (a protobuf
//! transaction body) carries given field values, without revealing the
//! rest of the buffer. Circuits are rank-1 constraint systems over Baby Bear,
//! proved with Plonky3.
//!
//! # Architecture
//!
//! - Wire: canonical host-side TLV decoding and encoding
//! - Gadgets: varint decoding, witness-indexed byte access (linear, binary
//!   tree, chunked and Merkle-committed), in-circuit hashing and the record
//!   walker built from them
//! - Locator: single-field and ordered multi-message locator circuits
//! - Witness: parses a buffer and populates locator circuits
//! - Backend: compiles circuits to an AIR and proves them with uni-STARK

pub mod backend;
pub mod circuit;
pub mod config;
pub mod error;
pub mod gadgets;
pub mod hash;
pub mod locator;
pub mod proof;
pub mod trace;
pub mod wire;
pub mod witness;

pub use backend::{ProofBackend, StarkBackend, StarkProof};
pub use circuit::{compile, generate_assignment, Circuit, CompiledCircuit, MockProver};
pub use config::ProverConfig;
pub use error::{CircuitError, ProverError, WireError, WitnessError};
pub use gadgets::AccessStrategy;
pub use locator::{
    BufferBinding, FieldAssertion, FieldCircuit, FieldClaim, LocatorConfig, MessageAssertion,
    MessagesCircuit,
};
pub use proof::{CircuitKind, ProofBundle};
pub use trace::{Assignment, PublicAssignment};
pub use witness::WitnessBuilder;

use p3_baby_bear::BabyBear;

/// The field type used throughout the prover (Baby Bear: p = 2^31 - 2^27 + 1)
pub type F = BabyBear;

/// Baby Bear prime: 2^31 - 2^27 + 1 = 2013265921
pub const BABY_BEAR_PRIME: u32 = 2013265921;
