//! Plonky3 uni-STARK backend over Baby Bear

use std::fmt;
use std::sync::Arc;

use p3_baby_bear::{BabyBear, Poseidon2BabyBear};
use p3_challenger::DuplexChallenger;
use p3_commit::ExtensionMmcs;
use p3_dft::Radix2DitParallel;
use p3_field::extension::BinomialExtensionField;
use p3_field::Field;
use p3_fri::{FriConfig, TwoAdicFriPcs};
use p3_merkle_tree::MerkleTreeMmcs;
use p3_symmetric::{PaddingFreeSponge, TruncatedPermutation};
use p3_uni_stark::{Proof, StarkConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{CircuitAir, ProofBackend};
use crate::circuit::{mock, CompiledCircuit};
use crate::config::ProverConfig;
use crate::error::ProverError;
use crate::trace::{Assignment, PublicAssignment};

pub type Val = BabyBear;
pub type Perm = Poseidon2BabyBear<16>;
pub type Hash = PaddingFreeSponge<Perm, 16, 8, 8>;
pub type Compress = TruncatedPermutation<Perm, 2, 8, 16>;
pub type ValMmcs =
    MerkleTreeMmcs<<Val as Field>::Packing, <Val as Field>::Packing, Hash, Compress, 8>;
pub type Challenge = BinomialExtensionField<Val, 4>;
pub type ChallengeMmcs = ExtensionMmcs<Val, Challenge, ValMmcs>;
pub type Challenger = DuplexChallenger<Val, Perm, 16, 8>;
pub type Dft = Radix2DitParallel<Val>;
pub type Pcs = TwoAdicFriPcs<Val, Dft, ValMmcs, ChallengeMmcs>;
pub type WireStarkConfig = StarkConfig<Pcs, Challenge, Challenger>;

pub struct StarkBackend {
    config: ProverConfig,
    perm: Perm,
    stark: WireStarkConfig,
}

impl fmt::Debug for StarkBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StarkBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct StarkProvingKey {
    air: CircuitAir,
    fingerprint: [u8; 32],
}

#[derive(Clone, Debug)]
pub struct StarkVerifyingKey {
    air: CircuitAir,
    fingerprint: [u8; 32],
}

impl StarkProvingKey {
    pub fn circuit(&self) -> &CompiledCircuit {
        self.air.circuit()
    }
}

impl StarkVerifyingKey {
    pub fn circuit(&self) -> &CompiledCircuit {
        self.air.circuit()
    }

    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }
}

/// STARK proof tagged with the layout it was produced for
#[derive(Serialize, Deserialize)]
pub struct StarkProof {
    pub fingerprint: [u8; 32],
    pub inner: Proof<WireStarkConfig>,
}

impl StarkBackend {
    pub fn new(config: ProverConfig) -> Result<Self, ProverError> {
        config.validate()?;
        let perm = Perm::new_from_rng_128(&mut StdRng::seed_from_u64(config.permutation_seed));
        let stark = stark_config(&config, perm.clone());
        Ok(Self {
            config,
            perm,
            stark,
        })
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    fn challenger(&self) -> Challenger {
        Challenger::new(self.perm.clone())
    }
}

fn stark_config(config: &ProverConfig, perm: Perm) -> WireStarkConfig {
    let hash = Hash::new(perm.clone());
    let compress = Compress::new(perm);
    let val_mmcs = ValMmcs::new(hash, compress);
    let challenge_mmcs = ChallengeMmcs::new(val_mmcs.clone());
    let fri_config = FriConfig {
        log_blowup: config.log_blowup,
        log_final_poly_len: 0,
        num_queries: config.num_queries,
        proof_of_work_bits: config.proof_of_work_bits,
        mmcs: challenge_mmcs,
    };
    let pcs = Pcs::new(Dft::default(), val_mmcs, fri_config);
    WireStarkConfig::new(pcs)
}

impl ProofBackend for StarkBackend {
    type ProvingKey = StarkProvingKey;
    type VerifyingKey = StarkVerifyingKey;
    type Proof = StarkProof;

    fn setup(
        &self,
        circuit: Arc<CompiledCircuit>,
    ) -> Result<(StarkProvingKey, StarkVerifyingKey), ProverError> {
        let fingerprint = circuit.fingerprint();
        info!(
            variables = circuit.num_variables(),
            constraints = circuit.num_constraints(),
            public = circuit.num_public(),
            "stark setup"
        );
        let air = CircuitAir::new(circuit);
        Ok((
            StarkProvingKey {
                air: air.clone(),
                fingerprint,
            },
            StarkVerifyingKey { air, fingerprint },
        ))
    }

    #[instrument(skip_all, fields(width = circuit.num_variables()))]
    fn prove(
        &self,
        circuit: &CompiledCircuit,
        pk: &StarkProvingKey,
        assignment: &Assignment,
    ) -> Result<StarkProof, ProverError> {
        if circuit.fingerprint() != pk.fingerprint {
            return Err(ProverError::FingerprintMismatch);
        }
        if assignment.num_variables() != circuit.num_variables() {
            return Err(ProverError::AssignmentShape {
                expected: circuit.num_variables(),
                found: assignment.num_variables(),
            });
        }
        if !mock::is_satisfied(circuit, assignment) {
            warn!("refusing to prove an unsatisfying assignment");
            return Err(ProverError::Unsatisfiable);
        }

        let public: Vec<Val> = circuit
            .public_variables()
            .iter()
            .map(|v| assignment.values()[v.index()])
            .collect();
        let trace = assignment.to_trace(self.config.trace_rows, &mut rand::thread_rng());
        debug!(rows = self.config.trace_rows, public = public.len(), "proving");

        let mut challenger = self.challenger();
        let inner = p3_uni_stark::prove(&self.stark, &pk.air, &mut challenger, trace, &public);
        info!("proof generated");
        Ok(StarkProof {
            fingerprint: pk.fingerprint,
            inner,
        })
    }

    fn verify(&self, proof: &StarkProof, vk: &StarkVerifyingKey, public: &PublicAssignment) -> bool {
        if proof.fingerprint != vk.fingerprint || vk.circuit().fingerprint() != vk.fingerprint {
            debug!("fingerprint mismatch");
            return false;
        }
        if public.len() != vk.circuit().num_public() {
            debug!(
                expected = vk.circuit().num_public(),
                found = public.len(),
                "public input length mismatch"
            );
            return false;
        }

        let public = public.values().to_vec();
        let mut challenger = self.challenger();
        match p3_uni_stark::verify(&self.stark, &vk.air, &mut challenger, &proof.inner, &public) {
            Ok(()) => true,
            Err(err) => {
                debug!(?err, "stark verification failed");
                false
            }
        }
    }
}
