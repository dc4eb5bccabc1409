//! Participant and coordinator keys over Pallas.
//!
//! A private key is a RedPallas spend-auth signing key; the public key is the
//! matching point. The same pair signs commands and performs ECDH with the
//! coordinator, whose public key is the only one able to open every message.

use ff::{Field, PrimeField};
use group::{prime::PrimeCurveAffine, Curve, GroupEncoding};
use pasta_curves::arithmetic::CurveAffine;
use pasta_curves::pallas;
use rand_core::{CryptoRng, RngCore};
use reddsa::orchard::SpendAuth;
use serde::{Deserialize, Serialize};

use crate::{fp_from_u128, fp_to_u128, Fp, PrimitiveError};

pub const SIGNATURE_LEN: usize = 64;
/// A signature travels inside a message as four 128-bit limbs.
pub const SIGNATURE_LIMBS: usize = 4;

/// Private key. Never serialized; `Debug` is redacted.
#[derive(Clone)]
pub struct PrivKey {
    scalar: pallas::Scalar,
    sk: reddsa::SigningKey<SpendAuth>,
}

impl PrivKey {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let scalar = pallas::Scalar::random(&mut *rng);
            if let Ok(key) = Self::from_bytes(scalar.to_repr()) {
                return key;
            }
        }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, PrimitiveError> {
        let scalar: pallas::Scalar =
            Option::from(pallas::Scalar::from_repr(bytes)).ok_or(PrimitiveError::MalformedPrivKey)?;
        if bool::from(scalar.is_zero()) {
            return Err(PrimitiveError::MalformedPrivKey);
        }
        let sk = reddsa::SigningKey::<SpendAuth>::try_from(bytes).map_err(|_| PrimitiveError::MalformedPrivKey)?;
        Ok(Self { scalar, sk })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.scalar.to_repr()
    }

    pub fn public_key(&self) -> Result<PubKey, PrimitiveError> {
        let vk = reddsa::VerificationKey::<SpendAuth>::from(&self.sk);
        let bytes: [u8; 32] = vk.into();
        PubKey::from_bytes(&bytes)
    }
}

impl core::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PrivKey(..)")
    }
}

/// Public key. The identity point is the blank key and encodes as `(0, 0)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PubKey(pallas::Affine);

impl PubKey {
    pub fn blank() -> Self {
        Self(pallas::Affine::identity())
    }

    pub fn is_blank(&self) -> bool {
        bool::from(self.0.is_identity())
    }

    pub fn point(&self) -> pallas::Affine {
        self.0
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, PrimitiveError> {
        Option::from(pallas::Affine::from_bytes(bytes)).map(Self).ok_or(PrimitiveError::InvalidPubKey)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Affine coordinates `[x, y]`; `[0, 0]` for the blank key.
    pub fn as_fields(&self) -> [Fp; 2] {
        Option::from(self.0.coordinates())
            .map(|c: pasta_curves::arithmetic::Coordinates<pallas::Affine>| [*c.x(), *c.y()])
            .unwrap_or([Fp::ZERO, Fp::ZERO])
    }

    pub fn from_fields(x: Fp, y: Fp) -> Result<Self, PrimitiveError> {
        if bool::from(x.is_zero() & y.is_zero()) {
            return Ok(Self::blank());
        }
        Option::from(pallas::Affine::from_xy(x, y)).map(Self).ok_or(PrimitiveError::InvalidPubKey)
    }

    /// Verify `signature` over `msg`. The blank key never verifies.
    pub fn verify(&self, msg: &[u8], signature: &Signature) -> bool {
        if self.is_blank() {
            return false;
        }
        let vk = match reddsa::VerificationKey::<SpendAuth>::try_from(self.to_bytes()) {
            Ok(vk) => vk,
            Err(_) => return false,
        };
        vk.verify(msg, &reddsa::Signature::<SpendAuth>::from(signature.0)).is_ok()
    }
}

impl Serialize for PubKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| serde::de::Error::invalid_length(raw.len(), &"32 bytes"))?;
        PubKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug)]
pub struct Keypair {
    pub priv_key: PrivKey,
    pub pub_key: PubKey,
}

impl Keypair {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let priv_key = PrivKey::random(rng);
            if let Ok(keypair) = Self::from_priv_key(priv_key) {
                return keypair;
            }
        }
    }

    pub fn from_priv_key(priv_key: PrivKey) -> Result<Self, PrimitiveError> {
        let pub_key = priv_key.public_key()?;
        Ok(Self { priv_key, pub_key })
    }

    /// ECDH: `x(priv · peer)`. Symmetric between the two parties.
    pub fn gen_ecdh_shared_key(priv_key: &PrivKey, peer: &PubKey) -> Fp {
        let shared = (peer.point().to_curve() * priv_key.scalar).to_affine();
        PubKey(shared).as_fields()[0]
    }

    pub fn sign<R: RngCore + CryptoRng>(&self, rng: &mut R, msg: &[u8]) -> Signature {
        Signature(self.priv_key.sk.sign(rng, msg).into())
    }
}

/// 64-byte RedPallas signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    /// Split into four little-endian 128-bit limbs, each a field element.
    pub fn to_fields(&self) -> [Fp; SIGNATURE_LIMBS] {
        core::array::from_fn(|i| {
            let mut limb = [0u8; 16];
            limb.copy_from_slice(&self.0[i * 16..(i + 1) * 16]);
            fp_from_u128(u128::from_le_bytes(limb))
        })
    }

    pub fn from_fields(limbs: &[Fp; SIGNATURE_LIMBS]) -> Result<Self, PrimitiveError> {
        let mut out = [0u8; SIGNATURE_LEN];
        for (i, limb) in limbs.iter().enumerate() {
            out[i * 16..(i + 1) * 16].copy_from_slice(&fp_to_u128(limb)?.to_le_bytes());
        }
        Ok(Signature(out))
    }
}

impl core::fmt::Debug for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Signature(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn ecdh_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(11);
        let alice = Keypair::random(&mut rng);
        let bob = Keypair::random(&mut rng);
        let ab = Keypair::gen_ecdh_shared_key(&alice.priv_key, &bob.pub_key);
        let ba = Keypair::gen_ecdh_shared_key(&bob.priv_key, &alice.pub_key);
        assert_eq!(ab, ba);
        let carol = Keypair::random(&mut rng);
        assert_ne!(ab, Keypair::gen_ecdh_shared_key(&carol.priv_key, &bob.pub_key));
    }

    #[test]
    fn pub_key_field_roundtrip() {
        let mut rng = StdRng::seed_from_u64(12);
        let kp = Keypair::random(&mut rng);
        let [x, y] = kp.pub_key.as_fields();
        assert_eq!(PubKey::from_fields(x, y).unwrap(), kp.pub_key);
        assert_eq!(PubKey::blank().as_fields(), [Fp::ZERO, Fp::ZERO]);
        assert!(PubKey::from_fields(Fp::ZERO, Fp::ZERO).unwrap().is_blank());
        assert!(PubKey::from_fields(Fp::ONE, Fp::ONE).is_err());
    }

    #[test]
    fn signatures_bind_key_and_message() {
        let mut rng = StdRng::seed_from_u64(13);
        let kp = Keypair::random(&mut rng);
        let other = Keypair::random(&mut rng);
        let sig = kp.sign(&mut rng, b"vote");
        assert!(kp.pub_key.verify(b"vote", &sig));
        assert!(!kp.pub_key.verify(b"veto", &sig));
        assert!(!other.pub_key.verify(b"vote", &sig));
        assert!(!PubKey::blank().verify(b"vote", &sig));
    }

    #[test]
    fn signature_limbs_roundtrip() {
        let mut rng = StdRng::seed_from_u64(14);
        let kp = Keypair::random(&mut rng);
        let sig = kp.sign(&mut rng, b"limbs");
        assert_eq!(Signature::from_fields(&sig.to_fields()).unwrap(), sig);
    }

    #[test]
    fn priv_key_bytes_roundtrip() {
        let mut rng = StdRng::seed_from_u64(15);
        let kp = Keypair::random(&mut rng);
        let again = Keypair::from_priv_key(PrivKey::from_bytes(kp.priv_key.to_bytes()).unwrap()).unwrap();
        assert_eq!(again.pub_key, kp.pub_key);
        assert!(PrivKey::from_bytes([0u8; 32]).is_err());
    }
}
