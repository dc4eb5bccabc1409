//! Signed voting commands.

use primitives::{fp_to_u64, fp_to_hex, hash_fixed, serde_fp, Fp, Keypair, PrimitiveError, PubKey, Signature};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::Message;

/// Number of field elements in a command's canonical ordering.
pub const COMMAND_LEN: usize = 7;

/// A participant's signed intent. Immutable once signed.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Command {
    pub state_index: u64,
    pub new_pub_key: PubKey,
    pub vote_option_index: u64,
    pub new_vote_weight: u64,
    pub nonce: u64,
    #[serde(with = "serde_fp")]
    pub salt: Fp,
}

impl Command {
    /// Canonical ordering:
    /// `[state_index, pub_x, pub_y, vote_option_index, new_vote_weight, nonce, salt]`.
    pub fn as_fields(&self) -> [Fp; COMMAND_LEN] {
        let [x, y] = self.new_pub_key.as_fields();
        [
            Fp::from(self.state_index),
            x,
            y,
            Fp::from(self.vote_option_index),
            Fp::from(self.new_vote_weight),
            Fp::from(self.nonce),
            self.salt,
        ]
    }

    pub fn from_fields(fields: &[Fp; COMMAND_LEN]) -> Result<Self, PrimitiveError> {
        Ok(Self {
            state_index: fp_to_u64(&fields[0])?,
            new_pub_key: PubKey::from_fields(fields[1], fields[2])?,
            vote_option_index: fp_to_u64(&fields[3])?,
            new_vote_weight: fp_to_u64(&fields[4])?,
            nonce: fp_to_u64(&fields[5])?,
            salt: fields[6],
        })
    }

    pub fn hash(&self) -> Fp {
        hash_fixed(self.as_fields())
    }

    /// Signature by the current owner over the command hash.
    pub fn sign<R: RngCore + CryptoRng>(&self, signer: &Keypair, rng: &mut R) -> Signature {
        signer.sign(rng, &primitives::fp_to_bytes(&self.hash()))
    }

    pub fn verify_signature(&self, signature: &Signature, pub_key: &PubKey) -> bool {
        pub_key.verify(&primitives::fp_to_bytes(&self.hash()), signature)
    }

    /// Encrypt the command and its signature under an ECDH shared key.
    pub fn encrypt(&self, signature: &Signature, shared_key: Fp) -> Message {
        Message::encrypt(self, signature, shared_key)
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Command(state={}, option={}, weight={}, nonce={}, salt={})",
            self.state_index,
            self.vote_option_index,
            self.new_vote_weight,
            self.nonce,
            &fp_to_hex(&self.salt)[..8]
        )
    }
}
