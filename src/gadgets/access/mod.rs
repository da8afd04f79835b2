//! Witness-indexed byte access
//!
//! Reading `buf[idx]` where `idx` is itself a circuit value. Every strategy
//! range checks the index to `index_bits` bits and returns 0 for positions
//! past the buffer, so varint look-ahead near the end of the buffer is always
//! well defined. All strategies return the same byte for the same
//! (buffer, index); they differ only in cost:
//!
//! | strategy    | constraints per read                 |
//! |-------------|--------------------------------------|
//! | linear      | ~3n                                  |
//! | binary tree | ~2^k (one mux per internal node)     |
//! | chunked     | ~2*2^c + n + n/2^c                   |
//! | merkle      | k compressions, independent of n     |

mod chunked;
mod linear;
mod merkle;
mod tree;

pub use chunked::ChunkedAccessor;
pub use linear::LinearAccessor;
pub use merkle::MerkleAccessor;
pub use tree::TreeAccessor;

use serde::{Deserialize, Serialize};

use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;

/// Buffers up to this size use linear scanning under [`AccessStrategy::auto`]
pub const LINEAR_THRESHOLD: usize = 16;
/// Buffers up to this size use the binary tree under [`AccessStrategy::auto`]
pub const TREE_THRESHOLD: usize = 1024;
/// Chunk width chosen for large buffers under [`AccessStrategy::auto`]
pub const DEFAULT_CHUNK_BITS: usize = 4;

/// How dynamic byte reads are arithmetized
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AccessStrategy {
    Linear,
    BinaryTree,
    Chunked { chunk_bits: usize },
    /// The buffer is committed by a public Merkle root instead of being
    /// loaded into the circuit
    MerkleCommitted,
}

impl AccessStrategy {
    /// Pick an in-circuit strategy from the buffer size
    pub fn auto(len: usize) -> Self {
        if len <= LINEAR_THRESHOLD {
            Self::Linear
        } else if len <= TREE_THRESHOLD {
            Self::BinaryTree
        } else {
            Self::Chunked {
                chunk_bits: DEFAULT_CHUNK_BITS,
            }
        }
    }

    pub fn validate(&self, index_bits: usize) -> Result<(), CircuitError> {
        match *self {
            Self::Chunked { chunk_bits } if chunk_bits == 0 || chunk_bits > index_bits => {
                Err(CircuitError::InvalidStrategy(format!(
                    "chunk_bits must be in 1..={index_bits}, got {chunk_bits}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Dynamic read interface shared by all strategies
pub trait ByteAccessor {
    /// Width of the accepted index; reads at `>= 2^index_bits` are unsatisfiable
    fn index_bits(&self) -> usize;

    /// Constrain and return `buf[index]`
    fn read(
        &self,
        cs: &mut ConstraintSystem,
        index: &LinearCombination,
    ) -> Result<Variable, CircuitError>;
}

/// Concrete accessor selected at synthesis time
pub enum Accessor {
    Linear(LinearAccessor),
    Tree(TreeAccessor),
    Chunked(ChunkedAccessor),
    Merkle(MerkleAccessor),
}

impl Accessor {
    /// Build an in-circuit accessor over already allocated buffer bytes
    pub fn over_bytes(
        strategy: AccessStrategy,
        bytes: Vec<Variable>,
        index_bits: usize,
    ) -> Result<Self, CircuitError> {
        strategy.validate(index_bits)?;
        match strategy {
            AccessStrategy::Linear => Ok(Self::Linear(LinearAccessor::new(bytes, index_bits))),
            AccessStrategy::BinaryTree => Ok(Self::Tree(TreeAccessor::new(bytes, index_bits))),
            AccessStrategy::Chunked { chunk_bits } => Ok(Self::Chunked(ChunkedAccessor::new(
                bytes, index_bits, chunk_bits,
            ))),
            AccessStrategy::MerkleCommitted => Err(CircuitError::InvalidStrategy(
                "merkle-committed access does not load buffer bytes".into(),
            )),
        }
    }
}

impl ByteAccessor for Accessor {
    fn index_bits(&self) -> usize {
        match self {
            Self::Linear(a) => a.index_bits(),
            Self::Tree(a) => a.index_bits(),
            Self::Chunked(a) => a.index_bits(),
            Self::Merkle(a) => a.index_bits(),
        }
    }

    fn read(
        &self,
        cs: &mut ConstraintSystem,
        index: &LinearCombination,
    ) -> Result<Variable, CircuitError> {
        match self {
            Self::Linear(a) => a.read(cs, index),
            Self::Tree(a) => a.read(cs, index),
            Self::Chunked(a) => a.read(cs, index),
            Self::Merkle(a) => a.read(cs, index),
        }
    }
}

/// Multiplex `leaves` (implicitly zero-padded to `2^bits.len()`) with
/// little-endian selector bits
pub(crate) fn tree_select(
    cs: &mut ConstraintSystem,
    leaves: Vec<LinearCombination>,
    bits: &[Variable],
) -> LinearCombination {
    use crate::circuit::gadgets::select;

    let mut level = leaves;
    for bit in bits {
        let bit = LinearCombination::from(*bit);
        level = level
            .chunks(2)
            .map(|pair| {
                let low = &pair[0];
                let high = pair.get(1).cloned().unwrap_or_default();
                match (low.as_constant(), high.as_constant()) {
                    (Some(a), Some(b)) if a == b => low.clone(),
                    _ => select(cs, &bit, &high, low).into(),
                }
            })
            .collect();
    }
    level.into_iter().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use p3_field::FieldAlgebra;
    use proptest::prelude::*;

    use super::*;
    use crate::circuit::gadgets::alloc_byte;
    use crate::circuit::MockProver;
    use crate::hash::ByteMerkleTree;
    use crate::F;

    const STRATEGIES: [AccessStrategy; 5] = [
        AccessStrategy::Linear,
        AccessStrategy::BinaryTree,
        AccessStrategy::Chunked { chunk_bits: 1 },
        AccessStrategy::Chunked { chunk_bits: 3 },
        AccessStrategy::MerkleCommitted,
    ];

    fn read_with(strategy: AccessStrategy, buf: &[u8], index: usize, index_bits: usize) -> (u8, bool) {
        let mut cs = ConstraintSystem::new();
        let accessor = match strategy {
            AccessStrategy::MerkleCommitted => {
                let tree = ByteMerkleTree::new(buf, index_bits).unwrap();
                Accessor::Merkle(MerkleAccessor::new(&mut cs, Some(tree), index_bits).unwrap())
            }
            _ => {
                let bytes = buf.iter().map(|b| alloc_byte(&mut cs, *b).unwrap()).collect();
                Accessor::over_bytes(strategy, bytes, index_bits).unwrap()
            }
        };
        let idx = cs.alloc(F::from_canonical_usize(index));
        let byte = accessor.read(&mut cs, &idx.into()).unwrap();
        let value = cs.eval_usize(&byte.into()) as u8;
        (value, MockProver::from_system(&cs).verify().is_ok())
    }

    #[test]
    fn test_all_strategies_agree() {
        let buf: Vec<u8> = (0..13u8).map(|i| i * 19 + 1).collect();
        for strategy in STRATEGIES {
            for index in 0..16 {
                let expected = buf.get(index).copied().unwrap_or(0);
                assert_eq!(
                    read_with(strategy, &buf, index, 4),
                    (expected, true),
                    "{strategy:?} at {index}"
                );
            }
        }
    }

    #[test]
    fn test_out_of_range_index_unsatisfiable() {
        let buf = [1u8, 2, 3];
        for strategy in STRATEGIES {
            let (_, ok) = read_with(strategy, &buf, 4, 2);
            assert!(!ok, "{strategy:?} accepted an index past 2^bits");
        }
    }

    #[test]
    fn test_auto_strategy() {
        assert_eq!(AccessStrategy::auto(16), AccessStrategy::Linear);
        assert_eq!(AccessStrategy::auto(200), AccessStrategy::BinaryTree);
        assert_eq!(
            AccessStrategy::auto(5000),
            AccessStrategy::Chunked { chunk_bits: 4 }
        );
        assert!(AccessStrategy::Chunked { chunk_bits: 0 }.validate(4).is_err());
        assert!(AccessStrategy::Chunked { chunk_bits: 5 }.validate(4).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_in_circuit_strategies_agree(
            buf in proptest::collection::vec(any::<u8>(), 1..40),
            index in 0usize..64,
        ) {
            let expected = buf.get(index).copied().unwrap_or(0);
            for strategy in &STRATEGIES[..4] {
                prop_assert_eq!(read_with(*strategy, &buf, index, 6), (expected, true));
            }
        }
    }
}
