//! In-circuit evaluation of the permutation in [`crate::hash`]

use p3_field::FieldAlgebra;

use crate::circuit::gadgets::{mul, select};
use crate::circuit::{ConstraintSystem, LinearCombination, Variable};
use crate::hash::{params, PermutationParams, DIGEST_ELEMS, LEAF_TAG, RATE, WIDTH};
use crate::F;

/// Digest as circuit values
pub type DigestVars = [LinearCombination; DIGEST_ELEMS];

/// x^7 with four multiplication constraints
fn sbox(cs: &mut ConstraintSystem, x: &LinearCombination) -> Variable {
    let x2: LinearCombination = mul(cs, x, x).into();
    let x4: LinearCombination = mul(cs, &x2, &x2).into();
    let x6: LinearCombination = mul(cs, &x4, &x2).into();
    mul(cs, &x6, x)
}

pub fn permute(
    cs: &mut ConstraintSystem,
    input: [LinearCombination; WIDTH],
) -> [LinearCombination; WIDTH] {
    let params = params();
    let mut state = input;

    for (round, constants) in params.round_constants.iter().enumerate() {
        for (lane, c) in state.iter_mut().zip(constants) {
            *lane = std::mem::take(lane) + LinearCombination::constant(*c);
        }
        if PermutationParams::is_full_round(round) {
            for lane in state.iter_mut() {
                *lane = sbox(cs, lane).into();
            }
        } else {
            state[0] = sbox(cs, &state[0]).into();
        }
        state = core::array::from_fn(|i| {
            params.mds[i]
                .iter()
                .zip(state.iter())
                .fold(LinearCombination::zero(), |acc, (m, s)| acc + s.clone().scale(*m))
        });
    }

    state
}

fn truncate(state: [LinearCombination; WIDTH]) -> DigestVars {
    let mut lanes = state.into_iter();
    core::array::from_fn(|_| lanes.next().unwrap_or_default())
}

pub fn hash_leaf(cs: &mut ConstraintSystem, byte: &LinearCombination) -> DigestVars {
    let mut state: [LinearCombination; WIDTH] = Default::default();
    state[0] = byte.clone();
    state[1] = LinearCombination::from_u32(LEAF_TAG);
    truncate(permute(cs, state))
}

pub fn compress(cs: &mut ConstraintSystem, left: &DigestVars, right: &DigestVars) -> DigestVars {
    let mut state: [LinearCombination; WIDTH] = Default::default();
    state[..DIGEST_ELEMS].clone_from_slice(left);
    state[DIGEST_ELEMS..].clone_from_slice(right);
    truncate(permute(cs, state))
}

/// Compress `node` with `sibling`, ordering the pair by a boolean direction
/// (`1` places `node` on the right)
pub fn compress_ordered(
    cs: &mut ConstraintSystem,
    node: &DigestVars,
    sibling: &DigestVars,
    direction: Variable,
) -> DigestVars {
    let bit = LinearCombination::from(direction);
    let mut left: DigestVars = Default::default();
    let mut right: DigestVars = Default::default();
    for i in 0..DIGEST_ELEMS {
        left[i] = select(cs, &bit, &sibling[i], &node[i]).into();
        // left + right == node + sibling
        right[i] = node[i].clone() + &sibling[i] - &left[i];
    }
    compress(cs, &left, &right)
}

/// Sponge commitment over byte variables
pub fn hash_bytes(cs: &mut ConstraintSystem, bytes: &[Variable]) -> DigestVars {
    let mut state: [LinearCombination; WIDTH] = Default::default();
    state[RATE] = LinearCombination::constant(F::from_canonical_usize(bytes.len()));
    for chunk in bytes.chunks(RATE) {
        for (lane, byte) in state.iter_mut().zip(chunk) {
            *lane = std::mem::take(lane) + *byte;
        }
        state = permute(cs, state);
    }
    if bytes.is_empty() {
        state = permute(cs, state);
    }
    truncate(state)
}
