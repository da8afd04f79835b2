//! Variable assignments and their layout as a STARK trace

use std::path::Path;

use anyhow::Result;
use p3_field::FieldAlgebra;
use p3_matrix::dense::RowMajorMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::circuit::Variable;
use crate::{BABY_BEAR_PRIME, F};

/// Full witness: one value per circuit variable, constant one first
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assignment {
    values: Vec<F>,
    public: Vec<Variable>,
}

/// The public part of an assignment, in allocation order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAssignment {
    values: Vec<F>,
}

impl Assignment {
    pub fn new(values: Vec<F>, public: Vec<Variable>) -> Self {
        Self { values, public }
    }

    pub fn values(&self) -> &[F] {
        &self.values
    }

    pub fn num_variables(&self) -> usize {
        self.values.len()
    }

    pub fn public_assignment(&self) -> PublicAssignment {
        PublicAssignment::new(self.public.iter().map(|v| self.values[v.index()]).collect())
    }

    /// Lay the assignment out as the first of `rows` trace rows. The other
    /// rows are uniformly random, so each column polynomial has `rows - 1`
    /// random degrees of freedom and openings outside the trace domain are
    /// independent of the assignment as long as there are fewer of them.
    pub fn to_trace<R: Rng>(&self, rows: usize, rng: &mut R) -> RowMajorMatrix<F> {
        let width = self.values.len();
        let mut values = Vec::with_capacity(width * rows);
        values.extend_from_slice(&self.values);
        values.extend(
            (width..width * rows.max(1))
                .map(|_| F::from_canonical_u32(rng.gen_range(0..BABY_BEAR_PRIME))),
        );
        RowMajorMatrix::new(values, width)
    }

    /// Load an assignment from a file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let assignment: Self = bincode::deserialize(&data)?;
        Ok(assignment)
    }

    /// Save the assignment to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = bincode::serialize(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

impl PublicAssignment {
    pub fn new(values: Vec<F>) -> Self {
        Self { values }
    }

    pub fn from_u32s(values: &[u32]) -> Self {
        Self::new(values.iter().map(|v| F::from_canonical_u32(*v)).collect())
    }

    pub fn values(&self) -> &[F] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use p3_matrix::Matrix;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::circuit::ConstraintSystem;

    fn sample() -> Assignment {
        let mut cs = ConstraintSystem::new();
        cs.alloc(F::from_canonical_u32(5));
        cs.alloc_public(F::from_canonical_u32(6));
        Assignment::new(cs.values().to_vec(), cs.public_variables().to_vec())
    }

    #[test]
    fn test_trace_layout() {
        let mut rng = StdRng::seed_from_u64(7);
        let trace = sample().to_trace(4, &mut rng);
        assert_eq!(trace.width(), 3);
        assert_eq!(trace.height(), 4);
        assert_eq!(trace.get(0, 0), F::ONE);
        assert_eq!(trace.get(0, 2), F::from_canonical_u32(6));
    }

    #[test]
    fn test_masking_rows_are_fresh() {
        let assignment = sample();
        let mut rng = StdRng::seed_from_u64(7);
        let first = assignment.to_trace(16, &mut rng);
        let second = assignment.to_trace(16, &mut rng);

        assert_eq!(first.row_slice(0).to_vec(), second.row_slice(0).to_vec());
        // No column is constant over the masked rows
        for col in 0..first.width() {
            assert!((1..16).any(|row| first.get(row, col) != first.get(0, col)));
        }
        assert_ne!(first.values, second.values);
    }

    #[test]
    fn test_save_and_load() {
        let assignment = sample();
        let path = std::env::temp_dir().join(format!("zkwire-assignment-{}.bin", std::process::id()));
        assignment.save(&path).unwrap();
        let loaded = Assignment::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.values(), assignment.values());
        assert_eq!(loaded.public_assignment(), PublicAssignment::from_u32s(&[6]));
    }
}
