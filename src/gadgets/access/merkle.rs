//! Merkle-committed access
//!
//! The buffer never enters the circuit. Each read witnesses the leaf byte and
//! its authentication path; the index bits are the path directions and the
//! recomputed root must equal the public root.

use p3_field::FieldAlgebra;

use crate::circuit::gadgets::{alloc_byte, to_bits};
use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::error::CircuitError;
use crate::gadgets::hash::{compress_ordered, hash_leaf, DigestVars};
use crate::hash::{ByteMerkleTree, DIGEST_ELEMS};
use crate::F;

use super::ByteAccessor;

pub struct MerkleAccessor {
    root: [Variable; DIGEST_ELEMS],
    tree: Option<ByteMerkleTree>,
    depth: usize,
}

impl MerkleAccessor {
    /// Allocate the public root. Without a tree (shape-only synthesis) the
    /// root and every witnessed path are zero.
    pub fn new(
        cs: &mut ConstraintSystem,
        tree: Option<ByteMerkleTree>,
        depth: usize,
    ) -> Result<Self, CircuitError> {
        if let Some(tree) = &tree {
            if tree.depth() != depth {
                return Err(CircuitError::WitnessShape(format!(
                    "merkle tree of depth {}, circuit expects {depth}",
                    tree.depth()
                )));
            }
        }
        let root_values = tree
            .as_ref()
            .map(|t| t.root())
            .unwrap_or([F::ZERO; DIGEST_ELEMS]);
        let root = root_values.map(|v| cs.alloc_public(v));
        Ok(Self { root, tree, depth })
    }

    pub fn root(&self) -> &[Variable; DIGEST_ELEMS] {
        &self.root
    }
}

impl ByteAccessor for MerkleAccessor {
    fn index_bits(&self) -> usize {
        self.depth
    }

    fn read(
        &self,
        cs: &mut ConstraintSystem,
        index: &LinearCombination,
    ) -> Result<Variable, CircuitError> {
        let directions = to_bits(cs, index, self.depth)?;

        let position = cs.eval_usize(index);
        let (leaf, path) = match &self.tree {
            Some(tree) => (tree.leaf(position), tree.path(position)),
            None => (0, vec![[F::ZERO; DIGEST_ELEMS]; self.depth]),
        };

        let byte = alloc_byte(cs, leaf)?;
        let mut node = hash_leaf(cs, &byte.into());
        for (direction, sibling) in directions.iter().zip(&path) {
            let sibling: DigestVars = core::array::from_fn(|i| cs.alloc(sibling[i]).into());
            node = compress_ordered(cs, &node, &sibling, *direction);
        }

        for (computed, root) in node.into_iter().zip(self.root) {
            cs.enforce_equal("merkle root", computed, root);
        }
        Ok(byte)
    }
}
