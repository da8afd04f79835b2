//! Binary-tree access: the index bits drive a multiplexer tree over the
//! zero-padded buffer

use crate::circuit::gadgets::to_bits;
use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;

use super::{tree_select, ByteAccessor};

pub struct TreeAccessor {
    bytes: Vec<Variable>,
    index_bits: usize,
}

impl TreeAccessor {
    pub fn new(bytes: Vec<Variable>, index_bits: usize) -> Self {
        Self { bytes, index_bits }
    }
}

impl ByteAccessor for TreeAccessor {
    fn index_bits(&self) -> usize {
        self.index_bits
    }

    fn read(
        &self,
        cs: &mut ConstraintSystem,
        index: &LinearCombination,
    ) -> Result<Variable, CircuitError> {
        let bits = to_bits(cs, index, self.index_bits)?;
        let leaves = self.bytes.iter().map(|b| (*b).into()).collect();
        let selected = tree_select(cs, leaves, &bits);

        let out = cs.alloc(cs.eval(&selected));
        cs.enforce_equal("tree read", out, selected);
        Ok(out)
    }
}
