//! Poseidon hash wrappers over the Pallas base field.
//!
//! Every tree node, leaf digest, message digest and tally commitment is built
//! from the fixed-length sponge below. Circuit adapters must use the same
//! `P128Pow5T3` instance so that off-circuit roots and witnesses agree.

use blake2b_simd::Params as Blake2bParams;
use ff::{Field, FromUniformBytes};
use halo2_gadgets::poseidon::primitives::{ConstantLength, Hash, P128Pow5T3};
use pasta_curves::pallas;

/// Protocol field element (Pallas base field).
pub type Fp = pallas::Base;

const DS_NUMS_V1: &[u8; 16] = b"qv.nums.v1\0\0\0\0\0\0"; // 10 + 6 = 16

/// Poseidon (width 3, rate 2) over exactly `L` inputs.
pub fn hash_fixed<const L: usize>(inputs: [Fp; L]) -> Fp {
    Hash::<Fp, P128Pow5T3, ConstantLength<L>, 3, 2>::init().hash(inputs)
}

/// Pairwise hash, the node hash of binary trees.
pub fn hash_left_right(left: Fp, right: Fp) -> Fp {
    hash_fixed([left, right])
}

/// 5-ary hash, the node hash of quinary trees and the state-leaf digest.
pub fn hash5(inputs: [Fp; 5]) -> Fp {
    hash_fixed(inputs)
}

/// `hash5` over up to five inputs, right-padded with zeros.
pub fn hash5_padded(inputs: &[Fp]) -> Fp {
    let mut padded = [Fp::ZERO; 5];
    for (slot, v) in padded.iter_mut().zip(inputs.iter()) {
        *slot = *v;
    }
    hash5(padded)
}

/// Hash the children of a k-ary node in left-to-right order.
/// Returns `None` for unsupported arities (only 2..=5 are defined).
pub fn hash_nodes(children: &[Fp]) -> Option<Fp> {
    match children.len() {
        2 => children.try_into().ok().map(hash_fixed::<2>),
        3 => children.try_into().ok().map(hash_fixed::<3>),
        4 => children.try_into().ok().map(hash_fixed::<4>),
        5 => children.try_into().ok().map(hash_fixed::<5>),
        _ => None,
    }
}

/// Whether `hash_nodes` is defined for this branching factor.
pub fn is_supported_arity(arity: usize) -> bool {
    (2..=5).contains(&arity)
}

/// Derive a field element from a label with no known structure
/// (BLAKE2b-512 wide reduction, domain-separated).
pub fn nothing_up_my_sleeve(label: &[u8]) -> Fp {
    let hash = Blake2bParams::new().hash_length(64).personal(DS_NUMS_V1).hash(label);
    let mut wide = [0u8; 64];
    wide.copy_from_slice(hash.as_bytes());
    <Fp as FromUniformBytes<64>>::from_uniform_bytes(&wide)
}
