//! Self-contained proof files

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use tracing::warn;

use crate::backend::{ProofBackend, StarkBackend, StarkProof};
use crate::circuit::Circuit;
use crate::config::ProverConfig;
use crate::error::{CircuitError, ProverError};
use crate::locator::{BufferPublic, FieldCircuit, FieldClaim, LocatorConfig, MessagesCircuit};
use crate::trace::PublicAssignment;

/// Which locator circuit a proof was produced with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    /// [`FieldCircuit`]: one field of the first message
    Field,
    /// [`MessagesCircuit`]: one field per leading message, in order
    Messages,
}

impl CircuitKind {
    /// Shape-only circuit for `config`, for compiling verifier keys
    pub fn shape(self, config: LocatorConfig) -> Result<Box<dyn Circuit>, CircuitError> {
        Ok(match self {
            Self::Field => Box::new(FieldCircuit::new(config)?),
            Self::Messages => Box::new(MessagesCircuit::new(config)?),
        })
    }
}

/// Everything a verifier needs: circuit shape, public data and the proof
#[derive(Serialize, Deserialize)]
pub struct ProofBundle {
    pub prover: ProverConfig,
    pub kind: CircuitKind,
    pub locator: LocatorConfig,
    pub buffer: BufferPublic,
    pub claims: Vec<FieldClaim>,
    pub proof: StarkProof,
}

impl ProofBundle {
    /// Public input vector implied by the bundled claims
    pub fn public_inputs(&self) -> Result<PublicAssignment, CircuitError> {
        self.locator.public_inputs(&self.buffer, &self.claims)
    }

    pub fn shape(&self) -> Result<Box<dyn Circuit>, CircuitError> {
        self.kind.shape(self.locator.clone())
    }

    /// Verify against the verifier's own backend. The parameters recorded in
    /// the bundle are only compared, never adopted.
    pub fn verify(&self, backend: &StarkBackend) -> Result<bool, ProverError> {
        if self.prover != *backend.config() {
            warn!(
                bundle_bits = self.prover.security_bits(),
                verifier_bits = backend.config().security_bits(),
                "bundle parameters differ from the verifier's"
            );
            return Err(ProverError::ParameterMismatch);
        }
        let compiled = backend.compile(self.shape()?.as_ref())?;
        let (_, vk) = backend.setup(compiled)?;
        let public = self.public_inputs()?;
        Ok(backend.verify(&self.proof, &vk, &public))
    }

    /// Load a bundle from a file
    pub fn load(path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("reading proof {}", path.display()))?;
        let bundle: Self = bincode::deserialize(&data)?;
        Ok(bundle)
    }

    /// Save the bundle to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = bincode::serialize(self)?;
        std::fs::write(path, data).with_context(|| format!("writing proof {}", path.display()))?;
        Ok(())
    }
}
