//! Encrypted message log entries.

use ff::Field;
use primitives::{
    hash_fixed, serde_fp, serde_fp_vec, Ciphertext, Fp, PrimitiveError, Signature, SIGNATURE_LIMBS,
};
use serde::{Deserialize, Serialize};

use crate::{Command, COMMAND_LEN};

/// Encrypted payload length: command fields plus signature limbs.
pub const MESSAGE_DATA_LEN: usize = COMMAND_LEN + SIGNATURE_LIMBS;
/// Field elements hashed into a message-tree leaf (iv + data).
pub const MESSAGE_LEN: usize = MESSAGE_DATA_LEN + 1;

/// A `Command` and its signature encrypted under an ECDH shared key.
/// The ephemeral public key travels next to it in the log, not inside it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(try_from = "MessageRepr", into = "MessageRepr")]
pub struct Message {
    pub iv: Fp,
    pub data: [Fp; MESSAGE_DATA_LEN],
}

impl Message {
    pub fn encrypt(command: &Command, signature: &Signature, shared_key: Fp) -> Self {
        let plaintext = plaintext(command, signature);
        let ct = Ciphertext::encrypt(&plaintext, shared_key);
        Self { iv: ct.iv, data: ct.data }
    }

    /// Placeholder entry for padded batch slots; never decrypts to a valid command.
    pub fn padding() -> Self {
        Self { iv: Fp::ZERO, data: [Fp::ZERO; MESSAGE_DATA_LEN] }
    }

    /// Raw decrypted field elements, in plaintext order.
    pub fn decrypt_fields(&self, shared_key: Fp) -> [Fp; MESSAGE_DATA_LEN] {
        Ciphertext { iv: self.iv, data: self.data }.decrypt(shared_key)
    }

    pub fn decrypt(&self, shared_key: Fp) -> Result<(Command, Signature), PrimitiveError> {
        split_plaintext(&self.decrypt_fields(shared_key))
    }

    pub fn as_fields(&self) -> [Fp; MESSAGE_LEN] {
        let mut out = [Fp::ZERO; MESSAGE_LEN];
        out[0] = self.iv;
        out[1..].copy_from_slice(&self.data);
        out
    }

    /// Message-tree leaf value.
    pub fn hash(&self) -> Fp {
        hash_fixed(self.as_fields())
    }
}

/// `[command fields.., signature limbs..]`.
pub fn plaintext(command: &Command, signature: &Signature) -> [Fp; MESSAGE_DATA_LEN] {
    let mut out = [Fp::ZERO; MESSAGE_DATA_LEN];
    out[..COMMAND_LEN].copy_from_slice(&command.as_fields());
    out[COMMAND_LEN..].copy_from_slice(&signature.to_fields());
    out
}

/// Inverse of `plaintext`; fails on out-of-range integers or off-curve keys.
pub fn split_plaintext(fields: &[Fp; MESSAGE_DATA_LEN]) -> Result<(Command, Signature), PrimitiveError> {
    let mut cmd = [Fp::ZERO; COMMAND_LEN];
    cmd.copy_from_slice(&fields[..COMMAND_LEN]);
    let mut limbs = [Fp::ZERO; SIGNATURE_LIMBS];
    limbs.copy_from_slice(&fields[COMMAND_LEN..]);
    Ok((Command::from_fields(&cmd)?, Signature::from_fields(&limbs)?))
}

#[derive(Clone, Serialize, Deserialize)]
struct MessageRepr {
    #[serde(with = "serde_fp")]
    iv: Fp,
    #[serde(with = "serde_fp_vec")]
    data: Vec<Fp>,
}

impl From<Message> for MessageRepr {
    fn from(m: Message) -> Self {
        Self { iv: m.iv, data: m.data.to_vec() }
    }
}

impl TryFrom<MessageRepr> for Message {
    type Error = String;

    fn try_from(r: MessageRepr) -> Result<Self, Self::Error> {
        let data: [Fp; MESSAGE_DATA_LEN] = r
            .data
            .as_slice()
            .try_into()
            .map_err(|_| format!("expected {MESSAGE_DATA_LEN} data elements, got {}", r.data.len()))?;
        Ok(Self { iv: r.iv, data })
    }
}
