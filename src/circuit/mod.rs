//! Constraint system, generic gadgets and circuit compilation
//!
//! Circuits are described by implementing [`Circuit`]. Synthesizing without a
//! witness yields the [`CompiledCircuit`] shared by prover and verifier;
//! synthesizing with a witness yields an [`Assignment`].

pub mod gadgets;
pub mod mock;
pub mod system;

use byteorder::{ByteOrder, LittleEndian};
use p3_field::PrimeField32;
use p3_keccak::Keccak256Hash;
use p3_symmetric::CryptographicHasher;

pub use mock::MockProver;
pub use system::{Constraint, ConstraintSystem, LinearCombination, Variable};

use crate::error::CircuitError;
use crate::trace::Assignment;

/// A circuit that can lay out its constraints into a [`ConstraintSystem`]
pub trait Circuit {
    /// Allocate variables and constraints. Without a witness every private
    /// input is taken as zero; the constraint layout must not change.
    fn synthesize(&self, cs: &mut ConstraintSystem) -> Result<(), CircuitError>;
}

/// Immutable constraint layout, safe to share across proving threads
#[derive(Clone, Debug)]
pub struct CompiledCircuit {
    num_variables: usize,
    public: Vec<Variable>,
    constraints: Vec<Constraint>,
    fingerprint: [u8; 32],
}

impl CompiledCircuit {
    fn new(num_variables: usize, public: Vec<Variable>, constraints: Vec<Constraint>) -> Self {
        let fingerprint = fingerprint(num_variables, &public, &constraints);
        Self {
            num_variables,
            public,
            constraints,
            fingerprint,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_public(&self) -> usize {
        self.public.len()
    }

    pub fn public_variables(&self) -> &[Variable] {
        &self.public
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Keccak-256 digest of the constraint layout
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }
}

/// Synthesize the constraint layout of a circuit
pub fn compile<C: Circuit + ?Sized>(circuit: &C) -> Result<CompiledCircuit, CircuitError> {
    let mut cs = ConstraintSystem::new();
    circuit.synthesize(&mut cs)?;
    let (values, public, constraints) = cs.into_parts();
    Ok(CompiledCircuit::new(values.len(), public, constraints))
}

/// Synthesize a circuit with its witness and keep the variable values
pub fn generate_assignment<C: Circuit + ?Sized>(circuit: &C) -> Result<Assignment, CircuitError> {
    let mut cs = ConstraintSystem::new();
    circuit.synthesize(&mut cs)?;
    let (values, public, _) = cs.into_parts();
    Ok(Assignment::new(values, public))
}

fn fingerprint(num_variables: usize, public: &[Variable], constraints: &[Constraint]) -> [u8; 32] {
    let mut bytes = Vec::with_capacity(16 + public.len() * 4 + constraints.len() * 48);
    let mut word = [0u8; 4];

    let mut push = |bytes: &mut Vec<u8>, value: u32| {
        LittleEndian::write_u32(&mut word, value);
        bytes.extend_from_slice(&word);
    };

    push(&mut bytes, num_variables as u32);
    push(&mut bytes, public.len() as u32);
    for var in public {
        push(&mut bytes, var.index() as u32);
    }
    for constraint in constraints {
        for lc in [&constraint.a, &constraint.b, &constraint.c] {
            push(&mut bytes, lc.terms().len() as u32);
            for (var, coeff) in lc.terms() {
                push(&mut bytes, var.index() as u32);
                push(&mut bytes, coeff.as_canonical_u32());
            }
        }
    }

    Keccak256Hash.hash_iter(bytes)
}
