//! Per-participant registry entry.

use ff::Field;
use primitives::{hash5, serde_fp, Fp, PubKey};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct StateLeaf {
    pub pub_key: PubKey,
    #[serde(with = "serde_fp")]
    pub vote_option_tree_root: Fp,
    pub voice_credit_balance: u64,
    pub nonce: u64,
}

impl StateLeaf {
    pub fn new(pub_key: PubKey, vote_option_tree_root: Fp, voice_credit_balance: u64) -> Self {
        Self { pub_key, vote_option_tree_root, voice_credit_balance, nonce: 0 }
    }

    /// Blank key, empty vote tree, nothing to spend. Its hash is the state
    /// tree's zero value.
    pub fn blank(empty_vote_option_root: Fp) -> Self {
        Self::new(PubKey::blank(), empty_vote_option_root, 0)
    }

    /// Padding leaf written into the zeroth slot. Fields are uniformly random
    /// so a sealed batch does not reveal how many steps were real.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let pub_key = primitives::Keypair::random(rng).pub_key;
        Self {
            pub_key,
            vote_option_tree_root: Fp::random(&mut *rng),
            voice_credit_balance: rng.next_u64(),
            nonce: rng.next_u64(),
        }
    }

    /// `[pub_x, pub_y, vote_option_tree_root, balance, nonce]`.
    pub fn as_fields(&self) -> [Fp; 5] {
        let [x, y] = self.pub_key.as_fields();
        [x, y, self.vote_option_tree_root, Fp::from(self.voice_credit_balance), Fp::from(self.nonce)]
    }

    pub fn hash(&self) -> Fp {
        hash5(self.as_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn blank_leaf_hash_is_stable() {
        let root = Fp::from(77u64);
        assert_eq!(StateLeaf::blank(root).hash(), StateLeaf::blank(root).hash());
        assert_eq!(
            StateLeaf::blank(root).hash(),
            hash5([Fp::ZERO, Fp::ZERO, root, Fp::ZERO, Fp::ZERO])
        );
    }

    #[test]
    fn every_field_is_bound() {
        let mut rng = StdRng::seed_from_u64(21);
        let leaf = StateLeaf::random(&mut rng);
        let h = leaf.hash();
        let mut other = leaf;
        other.nonce += 1;
        assert_ne!(other.hash(), h);
        let mut other = leaf;
        other.voice_credit_balance ^= 1;
        assert_ne!(other.hash(), h);
        let mut other = leaf;
        other.pub_key = PubKey::blank();
        assert_ne!(other.hash(), h);
    }

    #[test]
    fn random_leaves_differ() {
        let mut rng = StdRng::seed_from_u64(22);
        assert_ne!(StateLeaf::random(&mut rng), StateLeaf::random(&mut rng));
    }

    #[test]
    fn json_roundtrip() {
        let mut rng = StdRng::seed_from_u64(23);
        let leaf = StateLeaf::random(&mut rng);
        let back: StateLeaf = serde_json::from_str(&serde_json::to_string(&leaf).unwrap()).unwrap();
        assert_eq!(back, leaf);
    }
}
