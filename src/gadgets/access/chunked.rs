//! Chunked access
//!
//! The buffer is split into chunks of `2^chunk_bits` bytes. One set of
//! indicators over the low index bits is shared by every chunk, each chunk
//! reduces to a single candidate byte, and the high index bits pick the
//! chunk through a multiplexer tree.

use crate::circuit::gadgets::{from_bits, is_zero, mul, to_bits};
use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;

use super::{tree_select, ByteAccessor};

pub struct ChunkedAccessor {
    bytes: Vec<Variable>,
    index_bits: usize,
    chunk_bits: usize,
}

impl ChunkedAccessor {
    pub fn new(bytes: Vec<Variable>, index_bits: usize, chunk_bits: usize) -> Self {
        Self {
            bytes,
            index_bits,
            chunk_bits,
        }
    }

    pub fn chunk_size(&self) -> usize {
        1 << self.chunk_bits
    }
}

impl ByteAccessor for ChunkedAccessor {
    fn index_bits(&self) -> usize {
        self.index_bits
    }

    fn read(
        &self,
        cs: &mut ConstraintSystem,
        index: &LinearCombination,
    ) -> Result<Variable, CircuitError> {
        let bits = to_bits(cs, index, self.index_bits)?;
        let (low_bits, high_bits) = bits.split_at(self.chunk_bits);
        let low = from_bits(low_bits);

        let indicators: Vec<LinearCombination> = (0..self.chunk_size())
            .map(|j| is_zero(cs, &(low.clone() - LinearCombination::from_usize(j))).into())
            .collect();

        let candidates = self
            .bytes
            .chunks(self.chunk_size())
            .map(|chunk| {
                chunk
                    .iter()
                    .zip(&indicators)
                    .fold(LinearCombination::zero(), |acc, (byte, hit)| {
                        acc + mul(cs, hit, &(*byte).into())
                    })
            })
            .collect();
        let selected = tree_select(cs, candidates, high_bits);

        let out = cs.alloc(cs.eval(&selected));
        cs.enforce_equal("chunked read", out, selected);
        Ok(out)
    }
}
