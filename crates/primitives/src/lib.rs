//! Cryptographic primitives for the voting engine: Poseidon hashing over the
//! Pallas base field, salted commitments, RedPallas keys with
//! ECDH, and the keystream cipher used for encrypted commands.

pub mod poseidon;
pub mod encode;
pub mod commitment;
pub mod keys;
pub mod encrypt;

use thiserror::Error;

pub use poseidon::*;
pub use encode::*;
pub use commitment::*;
pub use keys::*;
pub use encrypt::*;

/// Errors raised while decoding keys, signatures and field encodings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    #[error("malformed private key")]
    MalformedPrivKey,
    #[error("public key coordinates are not on the curve")]
    InvalidPubKey,
    #[error("field element does not fit in {0} bits")]
    FieldOverflow(u32),
    #[error("non-canonical field encoding")]
    NonCanonicalField,
    #[error("invalid hex: {0}")]
    Hex(String),
}
