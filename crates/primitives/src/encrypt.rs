//! Poseidon keystream cipher over field elements.
//!
//! `iv = H(plaintext)`, `data[i] = plaintext[i] + H(sharedKey, iv + i)`.
//! The salt inside every command keeps identical plaintexts from sharing an iv.

use crate::{hash_fixed, hash_left_right, Fp};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ciphertext<const N: usize> {
    pub iv: Fp,
    pub data: [Fp; N],
}

fn keystream(shared_key: Fp, iv: Fp, i: usize) -> Fp {
    hash_left_right(shared_key, iv + Fp::from(i as u64))
}

impl<const N: usize> Ciphertext<N> {
    pub fn encrypt(plaintext: &[Fp; N], shared_key: Fp) -> Self {
        let iv = hash_fixed(*plaintext);
        let data = core::array::from_fn(|i| plaintext[i] + keystream(shared_key, iv, i));
        Self { iv, data }
    }

    /// Exact inverse of `encrypt` under the same key; any other key yields noise.
    pub fn decrypt(&self, shared_key: Fp) -> [Fp; N] {
        core::array::from_fn(|i| self.data[i] - keystream(shared_key, self.iv, i))
    }
}
