//! Error types for the wire parser, circuit construction and proving backend

use thiserror::Error;

/// Host-side TLV parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("buffer truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("varint at offset {offset} exceeds {max} bytes")]
    VarintTooLong { offset: usize, max: usize },

    #[error("varint at offset {offset} is not minimally encoded")]
    NonCanonicalVarint { offset: usize },

    #[error("expected tag {expected:#04x} at offset {offset}, found {found:#04x}")]
    UnexpectedTag { offset: usize, expected: u8, found: u8 },

    #[error("record at offset {offset} uses wire type {wire_type}, only length-delimited records are supported")]
    UnsupportedWireType { offset: usize, wire_type: u8 },

    #[error("record at offset {offset} uses a multi-byte key")]
    UnsupportedKey { offset: usize },

    #[error("record at offset {offset} overruns its container (ends at {end}, limit {limit})")]
    Overrun { offset: usize, end: usize, limit: usize },

    #[error("unexpected data at offset {offset} after the last expected field")]
    TrailingData { offset: usize },

    #[error("message index {index} out of range ({count} messages)")]
    MessageNotFound { index: usize, count: usize },

    #[error("no field with key {key:#04x} in message {message}")]
    FieldNotFound { message: usize, key: u8 },
}

/// Circuit configuration and witness-shape errors, raised before synthesis
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    #[error("at least one message assertion is required")]
    EmptyMessageList,

    #[error("buffer of {actual} bytes cannot hold the configured structure ({required} bytes required)")]
    BufferTooShort { required: usize, actual: usize },

    #[error("buffer length {len} exceeds the addressable range")]
    BufferTooLarge { len: usize },

    #[error("invalid message configuration: {0}")]
    InvalidMessage(String),

    #[error("varint window must be 1..={max} bytes, got {width}")]
    InvalidVarintWidth { width: usize, max: usize },

    #[error("bit decomposition of width {bits} exceeds the field capacity")]
    BitWidth { bits: usize },

    #[error("invalid access strategy: {0}")]
    InvalidStrategy(String),

    #[error("merkle-committed access already binds the buffer; use BufferBinding::Private")]
    IncompatibleBinding,

    #[error("witness shape mismatch: {0}")]
    WitnessShape(String),
}

/// Proving backend errors
#[derive(Debug, Error)]
pub enum ProverError {
    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error("assignment does not satisfy the circuit")]
    Unsatisfiable,

    #[error("proving key does not match the compiled circuit")]
    FingerprintMismatch,

    #[error("assignment has {found} variables, circuit expects {expected}")]
    AssignmentShape { expected: usize, found: usize },

    #[error("invalid prover configuration: {0}")]
    InvalidConfig(String),

    #[error("proof was produced with different STARK parameters than the verifier's")]
    ParameterMismatch,
}

/// Failures while turning a buffer into a populated circuit
#[derive(Debug, Error)]
pub enum WitnessError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Circuit(#[from] CircuitError),
}
