//! BN254 scalar field arithmetic and domain-separated keccak hashing.
//!
//! The field, curve, and hash choice are fixed by the on-chain accumulator
//! contract (spec.md §1 Non-goals); this module only provides the reduction
//! primitive and the two hash functions every other component builds on.

use sha3::{Digest, Keccak256};
use uint::construct_uint;

use crate::error::PoolError;

construct_uint! {
    /// Plain 256-bit unsigned integer, used as the representation for field
    /// elements before and after reduction.
    pub struct U256(4);
}

/// An element of the BN254 scalar field. By convention every `Fq` that
/// escapes this module has already been reduced into `[0, P)`; the only
/// way to get an out-of-range value into one is via [`U256::from_big_endian`]
/// or raw arithmetic, which is why hash boundaries validate with
/// [`require_reduced`] rather than trusting the type alone.
pub type Fq = U256;

lazy_static::lazy_static! {
    /// `P = 21888242871839275222246405745257275088548364400416034343698204186575808495617`,
    /// the BN254 scalar field modulus.
    pub static ref P: Fq = Fq::from_dec_str(
        "21888242871839275222246405745257275088548364400416034343698204186575808495617",
    ).expect("P is a valid decimal literal");
}

/// Reduce an arbitrary 256-bit unsigned integer modulo `P`. Always succeeds
/// and always returns a value in `[0, P)` (spec.md §8 invariant 1).
pub fn to_field(x: Fq) -> Fq {
    x % *P
}

/// Reject anything that is not already inside `[0, P)`. Used at boundaries
/// where a caller hands us a value that is supposed to already be a valid
/// field element (deserialized notes, witness inputs) rather than a raw
/// hash output that we are about to reduce ourselves.
pub fn require_reduced(x: Fq) -> Result<Fq, PoolError> {
    if x < *P {
        Ok(x)
    } else {
        Err(PoolError::InvalidField)
    }
}

/// Big-endian 32-byte encoding of a field element.
pub fn pad32(x: Fq) -> [u8; 32] {
    let mut out = [0u8; 32];
    x.to_big_endian(&mut out);
    out
}

/// Parse 32 big-endian bytes into a (not yet reduced) 256-bit integer.
pub fn from_bytes_be(bytes: &[u8]) -> Fq {
    Fq::from_big_endian(bytes)
}

fn keccak32(chunks: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// `H(a, b) = keccak256(pad32(a) || pad32(b)) mod P`. Matches the on-chain
/// accumulator's pairwise hash byte for byte: both operands are padded to
/// 32 bytes big-endian before concatenation, with no length prefix.
pub fn h2(a: Fq, b: Fq) -> Fq {
    let digest = keccak32(&[&pad32(a), &pad32(b)]);
    to_field(from_bytes_be(&digest))
}

/// `H1(a) = keccak256(pad32(a)) mod P`.
pub fn h1(a: Fq) -> Fq {
    let digest = keccak32(&[&pad32(a)]);
    to_field(from_bytes_be(&digest))
}

/// keccak256 of an arbitrary byte string, reduced mod P. Used to derive the
/// tree's level-0 zero value from a domain tag, and the wallet's
/// `master_seed` from a wallet signature.
pub fn hash_bytes_to_field(bytes: &[u8]) -> Fq {
    let digest = keccak32(&[bytes]);
    to_field(from_bytes_be(&digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulus_matches_spec() {
        assert_eq!(
            P.to_string(),
            "21888242871839275222246405745257275088548364400416034343698204186575808495617"
        );
    }

    #[test]
    fn to_field_always_in_range() {
        let huge = Fq::from_big_endian(&[0xffu8; 32]);
        assert!(to_field(huge) < *P);
    }

    #[test]
    fn to_field_is_idempotent_on_reduced_values() {
        let x = Fq::from(42u64);
        assert_eq!(to_field(x), x);
    }

    #[test]
    fn require_reduced_rejects_values_at_or_above_p() {
        assert!(require_reduced(*P).is_err());
        assert!(require_reduced(*P + Fq::from(1u64)).is_err());
        assert!(require_reduced(*P - Fq::from(1u64)).is_ok());
    }

    #[test]
    fn h2_is_deterministic_and_order_sensitive() {
        let a = Fq::from(1u64);
        let b = Fq::from(2u64);
        assert_eq!(h2(a, b), h2(a, b));
        assert_ne!(h2(a, b), h2(b, a));
    }

    #[test]
    fn h1_differs_from_h2_with_matching_operand() {
        let a = Fq::from(7u64);
        assert_ne!(h1(a), h2(a, Fq::zero()));
    }

    #[test]
    fn pad32_roundtrips_through_from_bytes_be() {
        let x = Fq::from(123456789u64);
        let bytes = pad32(x);
        assert_eq!(from_bytes_be(&bytes), x);
    }
}
