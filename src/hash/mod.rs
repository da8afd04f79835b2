//! Arithmetic-friendly hash over Baby Bear
//!
//! A width-8 partial-SPN permutation with an x^7 S-box and a Cauchy MDS
//! layer. The same round schedule is evaluated natively here and in-circuit
//! by [`crate::gadgets::hash`], so both sides always agree.
//!
//! - leaf hash: `permute([byte, LEAF_TAG, 0, ..])[..4]`
//! - compression: `permute(left || right)[..4]`
//! - sponge: rate 4, capacity initialised with the message length

pub mod merkle;

use std::sync::OnceLock;

use byteorder::{ByteOrder, LittleEndian};
use p3_field::{Field, FieldAlgebra};
use p3_keccak::Keccak256Hash;
use p3_symmetric::CryptographicHasher;

pub use merkle::ByteMerkleTree;

use crate::F;

/// Permutation state width
pub const WIDTH: usize = 8;
/// Sponge rate
pub const RATE: usize = 4;
/// Digest size in field elements
pub const DIGEST_ELEMS: usize = 4;
/// Number of full rounds (split evenly before and after the partial rounds)
pub const FULL_ROUNDS: usize = 8;
/// Number of partial rounds
pub const PARTIAL_ROUNDS: usize = 14;

/// Domain separator placed next to a leaf byte
pub const LEAF_TAG: u32 = 0x6c656166;

pub type Digest = [F; DIGEST_ELEMS];

/// Round constants and linear layer
pub struct PermutationParams {
    pub round_constants: Vec<[F; WIDTH]>,
    pub mds: [[F; WIDTH]; WIDTH],
}

/// Shared permutation parameters, derived once
pub fn params() -> &'static PermutationParams {
    static PARAMS: OnceLock<PermutationParams> = OnceLock::new();
    PARAMS.get_or_init(PermutationParams::derive)
}

impl PermutationParams {
    fn derive() -> Self {
        let rounds = FULL_ROUNDS + PARTIAL_ROUNDS;
        let round_constants = (0..rounds)
            .map(|round| {
                core::array::from_fn(|lane| {
                    let mut seed = [0u8; 8];
                    LittleEndian::write_u32(&mut seed[..4], round as u32);
                    LittleEndian::write_u32(&mut seed[4..], lane as u32);
                    let digest = Keccak256Hash.hash_iter(
                        b"zkwire-permutation".iter().copied().chain(seed.iter().copied()),
                    );
                    F::from_wrapped_u32(LittleEndian::read_u32(&digest[..4]))
                })
            })
            .collect();

        // Cauchy matrix 1 / (x_i + y_j) with x_i = i, y_j = WIDTH + j
        let mds = core::array::from_fn(|i| {
            core::array::from_fn(|j| {
                F::from_canonical_usize(i + j + WIDTH)
                    .try_inverse()
                    .unwrap_or(F::ONE)
            })
        });

        Self {
            round_constants,
            mds,
        }
    }

    /// Whether `round` applies the S-box to every lane
    pub fn is_full_round(round: usize) -> bool {
        round < FULL_ROUNDS / 2 || round >= FULL_ROUNDS / 2 + PARTIAL_ROUNDS
    }
}

fn sbox(x: F) -> F {
    let x2 = x * x;
    let x4 = x2 * x2;
    let x6 = x4 * x2;
    x6 * x
}

/// Apply the permutation in place
pub fn permute(state: &mut [F; WIDTH]) {
    let params = params();
    for (round, constants) in params.round_constants.iter().enumerate() {
        for (lane, c) in state.iter_mut().zip(constants) {
            *lane += *c;
        }
        if PermutationParams::is_full_round(round) {
            state.iter_mut().for_each(|lane| *lane = sbox(*lane));
        } else {
            state[0] = sbox(state[0]);
        }
        let mixed: [F; WIDTH] = core::array::from_fn(|i| {
            params.mds[i]
                .iter()
                .zip(state.iter())
                .map(|(m, s)| *m * *s)
                .sum()
        });
        *state = mixed;
    }
}

fn truncate(state: &[F; WIDTH]) -> Digest {
    core::array::from_fn(|i| state[i])
}

/// Hash of a single buffer byte as a Merkle leaf
pub fn hash_leaf(byte: u8) -> Digest {
    let mut state = [F::ZERO; WIDTH];
    state[0] = F::from_canonical_u8(byte);
    state[1] = F::from_canonical_u32(LEAF_TAG);
    permute(&mut state);
    truncate(&state)
}

/// Two-to-one compression of Merkle nodes
pub fn compress(left: &Digest, right: &Digest) -> Digest {
    let mut state = [F::ZERO; WIDTH];
    state[..DIGEST_ELEMS].copy_from_slice(left);
    state[DIGEST_ELEMS..].copy_from_slice(right);
    permute(&mut state);
    truncate(&state)
}

/// Sponge commitment to a byte string
pub fn hash_bytes(bytes: &[u8]) -> Digest {
    let mut state = [F::ZERO; WIDTH];
    state[RATE] = F::from_canonical_usize(bytes.len());
    for chunk in bytes.chunks(RATE) {
        for (lane, byte) in state.iter_mut().zip(chunk) {
            *lane += F::from_canonical_u8(*byte);
        }
        permute(&mut state);
    }
    if bytes.is_empty() {
        permute(&mut state);
    }
    truncate(&state)
}

/// Render a digest as hex, four little-endian bytes per element
pub fn digest_to_hex(digest: &Digest) -> String {
    use p3_field::PrimeField32;
    let mut bytes = [0u8; DIGEST_ELEMS * 4];
    for (chunk, elem) in bytes.chunks_mut(4).zip(digest) {
        LittleEndian::write_u32(chunk, elem.as_canonical_u32());
    }
    hex::encode(bytes)
}
