//! Proof backends
//!
//! A backend turns a compiled locator circuit into keys, proves populated
//! assignments against them and verifies proofs from public inputs alone.
//! [`StarkBackend`] proves the constraint system as a one-row-repeated AIR
//! with Plonky3.

pub mod air;
pub mod stark;

use std::sync::Arc;

pub use air::CircuitAir;
pub use stark::{StarkBackend, StarkProof, StarkProvingKey, StarkVerifyingKey};

use crate::circuit::{self, Circuit, CompiledCircuit};
use crate::error::ProverError;
use crate::trace::{Assignment, PublicAssignment};

pub trait ProofBackend {
    type ProvingKey;
    type VerifyingKey;
    type Proof;

    /// Synthesize the constraint layout of `circuit` without a witness
    fn compile<C: Circuit + ?Sized>(&self, circuit: &C) -> Result<Arc<CompiledCircuit>, ProverError> {
        Ok(Arc::new(circuit::compile(circuit)?))
    }

    fn setup(
        &self,
        circuit: Arc<CompiledCircuit>,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey), ProverError>;

    /// Prove `assignment` against `circuit`. Fails with
    /// [`ProverError::Unsatisfiable`] without naming the violated constraint.
    fn prove(
        &self,
        circuit: &CompiledCircuit,
        pk: &Self::ProvingKey,
        assignment: &Assignment,
    ) -> Result<Self::Proof, ProverError>;

    /// `false` for any proof that does not verify, including malformed ones
    fn verify(
        &self,
        proof: &Self::Proof,
        vk: &Self::VerifyingKey,
        public: &PublicAssignment,
    ) -> bool;
}
