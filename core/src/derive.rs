//! Deterministic note and claim-credential derivation from a wallet
//! signature (spec.md §4.D).
//!
//! Everything here is a pure function of `(master_seed, tag, index)`: the
//! same seed and index always reproduce the same secrets, bit-exact across
//! restarts, which is what lets the chain scanner (§4.E) recover a wallet
//! from nothing but the signature.

use crate::field::{h2, hash_bytes_to_field, pad32, Fq};
use crate::note::Note;

/// `derive(seed, tag, index) = H(H(seed, H1(tag)), index)`: chains the
/// master seed through a domain tag and a numeric path segment. Two calls
/// with different tags (e.g. `"secret"` vs `"nullifier"`) at the same index
/// are unrelated field elements by construction.
pub fn derive(seed: Fq, tag: &str, index: u64) -> Fq {
    let tag_field = hash_bytes_to_field(tag.as_bytes());
    let tagged = h2(seed, tag_field);
    h2(tagged, Fq::from(index))
}

/// `secret_i = derive(seed, "secret", i)`.
pub fn derive_secret(seed: Fq, index: u64) -> Fq {
    derive(seed, "secret", index)
}

/// `nullifier_i = derive(seed, "nullifier", i)`.
pub fn derive_nullifier(seed: Fq, index: u64) -> Fq {
    derive(seed, "nullifier", index)
}

/// The `i`th note for `amount`, with commitment `commit(secret_i,
/// nullifier_i, amount)` (spec.md §4.D).
pub fn derive_note(seed: Fq, index: u64, amount: u128) -> Note {
    let secret = derive_secret(seed, index);
    let nullifier = derive_nullifier(seed, index);
    Note::from_parts(secret, nullifier, amount)
}

/// A `(claim_secret, claim_commitment)` pair for an auction slot, letting
/// an operator create a new note payable to the bidder without learning
/// their identity (spec.md §3, §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimCredential {
    pub claim_secret: Fq,
    pub claim_commitment: Fq,
}

/// `claim_secret = derive(seed, "claim", slot_id)`,
/// `claim_commitment = derive(seed, "claim_commitment", slot_id)`.
pub fn derive_claim_credential(seed: Fq, slot_id: u64) -> ClaimCredential {
    ClaimCredential {
        claim_secret: derive(seed, "claim", slot_id),
        claim_commitment: derive(seed, "claim_commitment", slot_id),
    }
}

/// `master_seed = keccak256(signature) mod P` (spec.md §4.D). `signature`
/// is the raw bytes of a wallet signature over a fixed, application-defined
/// prompt; this function treats it as opaque entropy.
pub fn master_seed_from_signature(signature: &[u8]) -> Fq {
    hash_bytes_to_field(signature)
}

/// Big-endian encoding of a numeric path segment, matching the padding the
/// on-chain hash primitive expects everywhere else (exposed for callers
/// building a custom derivation path outside `derive`).
pub fn pad_segment(index: u64) -> [u8; 32] {
    pad32(Fq::from(index))
}
