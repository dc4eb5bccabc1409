//! Hash transcript over BLAKE2b.

use blake2b_simd::Params as Blake2bParams;
use ff::PrimeField;

use primitives::Fp;

// 10 + 6 = 16
const DS_TRANSCRIPT: &[u8; 16] = b"qv.transcr\0\0\0\0\0\0";

#[derive(Default, Clone)]
pub struct Transcript {
    state: Vec<u8>,
}

impl Transcript {
    pub fn new(label: &[u8]) -> Self {
        let mut t = Self { state: Vec::new() };
        t.absorb_bytes(label);
        t
    }

    /// Length-prefixed, so adjacent absorbs cannot be re-split.
    pub fn absorb_bytes(&mut self, bytes: &[u8]) {
        self.state.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        self.state.extend_from_slice(bytes);
    }

    pub fn absorb_field(&mut self, f: &Fp) {
        self.absorb_bytes(f.to_repr().as_ref());
    }

    pub fn absorb_fields(&mut self, fs: &[Fp]) {
        self.absorb_u64(fs.len() as u64);
        for f in fs {
            self.absorb_field(f);
        }
    }

    pub fn absorb_u64(&mut self, v: u64) {
        self.absorb_bytes(&v.to_le_bytes());
    }

    pub fn challenge_bytes(&self, label: &[u8]) -> [u8; 32] {
        let hash = Blake2bParams::new()
            .hash_length(32)
            .personal(DS_TRANSCRIPT)
            .to_state()
            .update(&self.state)
            .update(label)
            .finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(hash.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_framing_separate() {
        let mut a = Transcript::new(b"x");
        a.absorb_bytes(b"ab");
        a.absorb_bytes(b"c");
        let mut b = Transcript::new(b"x");
        b.absorb_bytes(b"a");
        b.absorb_bytes(b"bc");
        assert_ne!(a.challenge_bytes(b"out"), b.challenge_bytes(b"out"));
        assert_ne!(a.challenge_bytes(b"out"), a.challenge_bytes(b"other"));
        assert_eq!(a.challenge_bytes(b"out"), a.clone().challenge_bytes(b"out"));
    }
}
