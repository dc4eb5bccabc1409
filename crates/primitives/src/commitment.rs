//! Salted Poseidon commitment `hash(value, salt)`, used for published results.

use ff::Field;
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use crate::{hash_left_right, Fp};

/// Fresh uniformly random salt.
pub fn gen_random_salt<R: RngCore + CryptoRng>(rng: &mut R) -> Fp {
    Fp::random(rng)
}

/// `hash(value, salt)`.
pub fn salted_commitment(value: Fp, salt: Fp) -> Fp {
    hash_left_right(value, salt)
}

/// Constant-time check of a revealed `(value, salt)` against a commitment.
pub fn verify_salted_commitment(value: Fp, salt: Fp, claimed: &Fp) -> bool {
    salted_commitment(value, salt).ct_eq(claimed).into()
}
