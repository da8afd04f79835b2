//! Native constraint checker used for diagnostics and as the prover's
//! satisfiability gate

use p3_field::FieldAlgebra;

use super::system::{Constraint, ConstraintSystem};
use super::{Circuit, CompiledCircuit};
use crate::error::CircuitError;
use crate::trace::Assignment;
use crate::F;

/// A constraint that evaluated to false
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub index: usize,
    pub label: &'static str,
}

/// Evaluates every constraint of a synthesized circuit against its values
pub struct MockProver {
    values: Vec<F>,
    constraints: Vec<Constraint>,
}

impl MockProver {
    /// Synthesize `circuit` with its witness and keep the result for checking
    pub fn run<C: Circuit + ?Sized>(circuit: &C) -> Result<Self, CircuitError> {
        let mut cs = ConstraintSystem::new();
        circuit.synthesize(&mut cs)?;
        Ok(Self::from_system(&cs))
    }

    pub fn from_system(cs: &ConstraintSystem) -> Self {
        Self {
            values: cs.values().to_vec(),
            constraints: cs.constraints().to_vec(),
        }
    }

    pub fn verify(&self) -> Result<(), Vec<Failure>> {
        let failures = unsatisfied(&self.constraints, &self.values);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    /// Panic with the failing constraint labels
    pub fn assert_satisfied(&self) {
        if let Err(failures) = self.verify() {
            let labels: Vec<_> = failures.iter().take(8).map(|f| f.label).collect();
            panic!(
                "{} constraints unsatisfied, first: {:?}",
                failures.len(),
                labels
            );
        }
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

fn unsatisfied(constraints: &[Constraint], values: &[F]) -> Vec<Failure> {
    constraints
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_satisfied(values))
        .map(|(index, c)| Failure {
            index,
            label: c.label,
        })
        .collect()
}

/// Check an assignment against a compiled circuit without revealing which
/// constraint failed
pub fn is_satisfied(circuit: &CompiledCircuit, assignment: &Assignment) -> bool {
    let values = assignment.values();
    values.len() == circuit.num_variables()
        && values.first() == Some(&F::ONE)
        && circuit.constraints().iter().all(|c| c.is_satisfied(values))
}
