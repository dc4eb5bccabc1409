//! Canonical field encodings and serde helpers.
//!
//! Field elements travel as the hex of their 32-byte little-endian repr.

use ff::PrimeField;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Fp, PrimitiveError};

pub fn fp_to_bytes(f: &Fp) -> [u8; 32] {
    f.to_repr()
}

pub fn fp_from_bytes(bytes: &[u8; 32]) -> Result<Fp, PrimitiveError> {
    Option::from(Fp::from_repr(*bytes)).ok_or(PrimitiveError::NonCanonicalField)
}

pub fn fp_to_hex(f: &Fp) -> String {
    hex::encode(fp_to_bytes(f))
}

pub fn fp_from_hex(s: &str) -> Result<Fp, PrimitiveError> {
    let raw = hex::decode(s.trim_start_matches("0x")).map_err(|e| PrimitiveError::Hex(e.to_string()))?;
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| PrimitiveError::Hex(format!("expected 32 bytes, got {}", raw.len())))?;
    fp_from_bytes(&bytes)
}

/// Interpret a field element as an integer of at most 64 bits.
pub fn fp_to_u64(f: &Fp) -> Result<u64, PrimitiveError> {
    let repr = f.to_repr();
    if repr[8..].iter().any(|&b| b != 0) {
        return Err(PrimitiveError::FieldOverflow(64));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&repr[..8]);
    Ok(u64::from_le_bytes(buf))
}

/// Interpret a field element as an integer of at most 128 bits.
pub fn fp_to_u128(f: &Fp) -> Result<u128, PrimitiveError> {
    let repr = f.to_repr();
    if repr[16..].iter().any(|&b| b != 0) {
        return Err(PrimitiveError::FieldOverflow(128));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&repr[..16]);
    Ok(u128::from_le_bytes(buf))
}

pub fn fp_from_u128(v: u128) -> Fp {
    Fp::from_u128(v)
}

/// Serde wrapper: a field element as a hex string.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FpHex(pub Fp);

impl Serialize for FpHex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fp_to_hex(&self.0))
    }
}

impl<'de> Deserialize<'de> for FpHex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        fp_from_hex(&s).map(FpHex).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "primitives::serde_fp")]` for `Fp` fields.
pub mod serde_fp {
    use super::*;

    pub fn serialize<S: Serializer>(f: &Fp, serializer: S) -> Result<S::Ok, S::Error> {
        FpHex(*f).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fp, D::Error> {
        FpHex::deserialize(deserializer).map(|h| h.0)
    }
}

/// `#[serde(with = "primitives::serde_fp_vec")]` for `Vec<Fp>` fields.
pub mod serde_fp_vec {
    use super::*;

    pub fn serialize<S: Serializer>(v: &[Fp], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(v.iter().map(|f| FpHex(*f)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Fp>, D::Error> {
        Ok(Vec::<FpHex>::deserialize(deserializer)?.into_iter().map(|h| h.0).collect())
    }
}

/// `#[serde(with = "primitives::serde_fp_nested")]` for `Vec<Vec<Fp>>` fields.
pub mod serde_fp_nested {
    use super::*;

    pub fn serialize<S: Serializer>(v: &[Vec<Fp>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(v.iter().map(|level| level.iter().map(|f| FpHex(*f)).collect::<Vec<_>>()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<Fp>>, D::Error> {
        Ok(Vec::<Vec<FpHex>>::deserialize(deserializer)?
            .into_iter()
            .map(|level| level.into_iter().map(|h| h.0).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;

    #[test]
    fn small_integers_fit() {
        assert_eq!(fp_to_u64(&Fp::from(42u64)), Ok(42));
        assert_eq!(fp_to_u128(&fp_from_u128(u128::MAX)), Ok(u128::MAX));
        assert_eq!(fp_to_u64(&fp_from_u128(1u128 << 64)), Err(PrimitiveError::FieldOverflow(64)));
        assert_eq!(fp_to_u64(&-Fp::ONE), Err(PrimitiveError::FieldOverflow(64)));
    }

    #[test]
    fn hex_accepts_prefix_and_rejects_short_input() {
        let f = Fp::from(0xdead_beefu64);
        let h = fp_to_hex(&f);
        assert_eq!(fp_from_hex(&format!("0x{h}")), Ok(f));
        assert!(fp_from_hex("abcd").is_err());
        assert!(fp_from_hex(&"ff".repeat(32)).is_err());
    }

    #[test]
    fn fp_hex_serde_json() {
        let v = vec![Fp::from(1u64), Fp::from(2u64)];
        let json = serde_json::to_string(&v.iter().map(|f| FpHex(*f)).collect::<Vec<_>>()).unwrap();
        let back: Vec<FpHex> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_iter().map(|h| h.0).collect::<Vec<_>>(), v);
    }
}
