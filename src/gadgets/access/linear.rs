//! Linear-scan access: one equality indicator per buffer position

use crate::circuit::gadgets::{is_zero, mul, to_bits};
use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;

use super::ByteAccessor;

/// `buf[idx] = sum(is_zero(idx - p) * buf[p])`
pub struct LinearAccessor {
    bytes: Vec<Variable>,
    index_bits: usize,
}

impl LinearAccessor {
    pub fn new(bytes: Vec<Variable>, index_bits: usize) -> Self {
        Self { bytes, index_bits }
    }
}

impl ByteAccessor for LinearAccessor {
    fn index_bits(&self) -> usize {
        self.index_bits
    }

    fn read(
        &self,
        cs: &mut ConstraintSystem,
        index: &LinearCombination,
    ) -> Result<Variable, CircuitError> {
        to_bits(cs, index, self.index_bits)?;

        let mut sum = LinearCombination::zero();
        for (p, byte) in self.bytes.iter().enumerate() {
            let hit = is_zero(cs, &(index.clone() - LinearCombination::from_usize(p)));
            sum = sum + mul(cs, &hit.into(), &(*byte).into());
        }

        let out = cs.alloc(cs.eval(&sum));
        cs.enforce_equal("linear read", out, sum);
        Ok(out)
    }
}
