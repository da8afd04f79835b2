//! Binary Merkle tree over buffer bytes, one leaf per byte

use p3_field::FieldAlgebra;

use super::{compress, hash_leaf, Digest, DIGEST_ELEMS};
use crate::error::CircuitError;
use crate::F;

/// Merkle tree over a zero-padded byte buffer of `2^depth` leaves
#[derive(Clone, Debug)]
pub struct ByteMerkleTree {
    depth: usize,
    leaves: Vec<u8>,
    /// `levels[0]` are leaf digests, the last level holds the root
    levels: Vec<Vec<Digest>>,
}

impl ByteMerkleTree {
    pub fn new(bytes: &[u8], depth: usize) -> Result<Self, CircuitError> {
        let capacity = 1usize << depth;
        if bytes.len() > capacity {
            return Err(CircuitError::WitnessShape(format!(
                "{} bytes do not fit a tree of depth {depth}",
                bytes.len()
            )));
        }

        let mut leaves = bytes.to_vec();
        leaves.resize(capacity, 0);

        let mut levels = vec![leaves.iter().map(|b| hash_leaf(*b)).collect::<Vec<_>>()];
        for _ in 0..depth {
            let next = levels[levels.len() - 1]
                .chunks(2)
                .map(|pair| compress(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }

        Ok(Self {
            depth,
            leaves,
            levels,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn root(&self) -> Digest {
        self.levels[self.depth][0]
    }

    /// Leaf byte, zero beyond the capacity
    pub fn leaf(&self, index: usize) -> u8 {
        self.leaves.get(index).copied().unwrap_or(0)
    }

    /// Sibling digests from the leaf level upwards. Out-of-range indexes
    /// yield an all-zero path, which cannot open against the root.
    pub fn path(&self, index: usize) -> Vec<Digest> {
        if index >= self.leaves.len() {
            return vec![[F::ZERO; DIGEST_ELEMS]; self.depth];
        }
        (0..self.depth)
            .map(|level| self.levels[level][(index >> level) ^ 1])
            .collect()
    }

    /// Recompute the root from a leaf and its path
    pub fn verify_path(root: &Digest, index: usize, byte: u8, path: &[Digest]) -> bool {
        let mut node = hash_leaf(byte);
        for (level, sibling) in path.iter().enumerate() {
            node = if (index >> level) & 1 == 0 {
                compress(&node, sibling)
            } else {
                compress(sibling, &node)
            };
        }
        node == *root
    }
}
