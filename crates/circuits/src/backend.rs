//! Proof-backend seam.
//!
//! The real prover lives outside this workspace. `DigestBackend` binds a
//! witness digest and the public signals under a key-specific transcript so
//! the rest of the pipeline (ledger checks, signal regeneration) can be
//! exercised end to end. It is not a SNARK.

use serde::{Deserialize, Serialize};

use primitives::Fp;

use crate::Transcript;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum ProofKind {
    BatchUpdate,
    Tally,
}

impl ProofKind {
    fn label(&self) -> &'static [u8] {
        match self {
            ProofKind::BatchUpdate => b"batch-update",
            ProofKind::Tally => b"tally",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Proof(#[serde(with = "serde_bytes")] pub Vec<u8>);

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct VerifyingKey {
    pub kind: ProofKind,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
}

pub trait ProofBackend {
    fn verifying_key(&self, kind: ProofKind) -> VerifyingKey;

    fn prove(&self, kind: ProofKind, witness_digest: &[u8; 32], signals: &[Fp]) -> anyhow::Result<Proof>;

    /// Pure predicate over `(vk, proof, signals)`.
    fn verify(&self, vk: &VerifyingKey, proof: &Proof, signals: &[Fp]) -> anyhow::Result<bool>;
}

/// Proof = `witness_digest || H(key, kind, signals, witness_digest)`.
#[derive(Clone, Debug)]
pub struct DigestBackend {
    key: [u8; 32],
}

impl DigestBackend {
    pub fn new(seed: &[u8]) -> Self {
        Self { key: Transcript::new(b"qv/digest-backend/key").challenge_bytes(seed) }
    }

    fn tag(&self, vk_bytes: &[u8], kind: ProofKind, witness_digest: &[u8], signals: &[Fp]) -> [u8; 32] {
        let mut t = Transcript::new(b"qv/digest-backend");
        t.absorb_bytes(&self.key);
        t.absorb_bytes(vk_bytes);
        t.absorb_bytes(kind.label());
        t.absorb_fields(signals);
        t.absorb_bytes(witness_digest);
        t.challenge_bytes(b"proof")
    }
}

impl Default for DigestBackend {
    fn default() -> Self {
        Self::new(b"default")
    }
}

impl ProofBackend for DigestBackend {
    fn verifying_key(&self, kind: ProofKind) -> VerifyingKey {
        let mut t = Transcript::new(b"qv/digest-backend/vk");
        t.absorb_bytes(&self.key);
        VerifyingKey { kind, bytes: t.challenge_bytes(kind.label()).to_vec() }
    }

    fn prove(&self, kind: ProofKind, witness_digest: &[u8; 32], signals: &[Fp]) -> anyhow::Result<Proof> {
        let vk = self.verifying_key(kind);
        let mut bytes = witness_digest.to_vec();
        bytes.extend_from_slice(&self.tag(&vk.bytes, kind, witness_digest, signals));
        Ok(Proof(bytes))
    }

    fn verify(&self, vk: &VerifyingKey, proof: &Proof, signals: &[Fp]) -> anyhow::Result<bool> {
        if proof.0.len() != 64 {
            anyhow::bail!("proof must be 64 bytes, got {}", proof.0.len());
        }
        let (digest, tag) = proof.0.split_at(32);
        Ok(self.tag(&vk.bytes, vk.kind, digest, signals).as_slice() == tag)
    }
}
