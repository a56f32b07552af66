//! A note is a hiding commitment to `(secret, nullifier, amount)` — the
//! logical coin primitive every other component operates on (spec.md §3,
//! §4.B).

use base64::Engine;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::field::{self, h1, h2, pad32, Fq};

/// A single spendable (or change, or withdrawal) note.
///
/// `secret` and `nullifier` are private; `commitment` is the public value
/// posted on-chain. `leaf_index` is `None` until the note has been absorbed
/// into the Merkle tree ("unplaced" per spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub secret: Fq,
    pub nullifier: Fq,
    pub amount: u128,
    pub commitment: Fq,
    pub leaf_index: Option<u64>,
    pub timestamp: Option<u64>,
}

impl Note {
    /// Build a note from its private components, computing the commitment.
    pub fn from_parts(secret: Fq, nullifier: Fq, amount: u128) -> Self {
        let commitment = commit(secret, nullifier, amount);
        Note {
            secret,
            nullifier,
            amount,
            commitment,
            leaf_index: None,
            timestamp: None,
        }
    }

    /// This note's nullifier hash, the one-time spend marker published
    /// on-chain when the note is consumed.
    pub fn nullifier_hash(&self) -> Fq {
        nullifier_hash(self.nullifier)
    }

    /// `true` once this note has been absorbed into the Merkle tree.
    pub fn is_placed(&self) -> bool {
        self.leaf_index.is_some()
    }
}

/// `commit(secret, nullifier, amount) = H(H(secret, nullifier), amount)`
/// (spec.md §4.B). The amount MUST be bound inside the outer hash — an
/// amount-less commitment is a deprecated, explicitly out-of-spec path
/// (spec.md §9).
pub fn commit(secret: Fq, nullifier: Fq, amount: u128) -> Fq {
    let inner = h2(secret, nullifier);
    h2(inner, Fq::from(amount))
}

/// `nullifier_hash(nullifier) = H1(nullifier)` (spec.md §4.B).
pub fn nullifier_hash(nullifier: Fq) -> Fq {
    h1(nullifier)
}

/// Draw a fresh random note for `amount`. 31 random bytes for `secret` and
/// `nullifier` guarantees a value strictly less than `P` without a masking
/// or rejection step, since `P` is a ~254-bit prime and 31 bytes is at most
/// 248 bits (spec.md §4.B).
pub fn generate_note<R: RngCore + CryptoRng>(rng: &mut R, amount: u128) -> Note {
    let secret = random_field_element(rng);
    let nullifier = random_field_element(rng);
    Note::from_parts(secret, nullifier, amount)
}

fn random_field_element<R: RngCore + CryptoRng>(rng: &mut R) -> Fq {
    let mut bytes = [0u8; 31];
    rng.fill_bytes(&mut bytes);
    let mut padded = [0u8; 32];
    padded[1..].copy_from_slice(&bytes);
    field::from_bytes_be(&padded)
}

/// Decimal-string wire form of a note (spec.md §3 "Serialized note").
/// `serialize(deserialize(x)) == x` exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedNote {
    pub secret: String,
    pub nullifier: String,
    pub amount: String,
    pub commitment: String,
    pub leaf_index: Option<u64>,
    pub timestamp: Option<u64>,
}

pub fn serialize_note(note: &Note) -> SerializedNote {
    SerializedNote {
        secret: note.secret.to_string(),
        nullifier: note.nullifier.to_string(),
        amount: note.amount.to_string(),
        commitment: note.commitment.to_string(),
        leaf_index: note.leaf_index,
        timestamp: note.timestamp,
    }
}

pub fn deserialize_note(s: &SerializedNote) -> Result<Note, PoolError> {
    let secret = parse_decimal_field(&s.secret)?;
    let nullifier = parse_decimal_field(&s.nullifier)?;
    let amount: u128 = s.amount.parse().map_err(|_| PoolError::AmountOutOfRange)?;
    let commitment = parse_decimal_field(&s.commitment)?;

    // A tampered or corrupted blob won't reproduce its own commitment.
    if commit(secret, nullifier, amount) != commitment {
        return Err(PoolError::InvalidField);
    }

    Ok(Note {
        secret,
        nullifier,
        amount,
        commitment,
        leaf_index: s.leaf_index,
        timestamp: s.timestamp,
    })
}

fn parse_decimal_field(s: &str) -> Result<Fq, PoolError> {
    let x = Fq::from_dec_str(s).map_err(|_| PoolError::InvalidField)?;
    field::require_reduced(x)
}

/// Base64 envelope over the JSON serialized note, for manual backup/export
/// (spec.md §4.B: "not required for correctness of the core").
pub fn to_backup_envelope(note: &Note) -> Result<String, PoolError> {
    let json = serde_json::to_vec(&serialize_note(note))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

pub fn from_backup_envelope(envelope: &str) -> Result<Note, PoolError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(envelope)
        .map_err(|_| PoolError::InvalidField)?;
    let serialized: SerializedNote = serde_json::from_slice(&bytes)?;
    deserialize_note(&serialized)
}

/// Pad the commitment to 32 big-endian bytes: the Merkle leaf representation.
pub fn commitment_bytes(note: &Note) -> [u8; 32] {
    pad32(note.commitment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn commit_is_deterministic() {
        let s = Fq::from(1u64);
        let n = Fq::from(2u64);
        assert_eq!(commit(s, n, 10), commit(s, n, 10));
    }

    #[test]
    fn commit_binds_amount() {
        let s = Fq::from(1u64);
        let n = Fq::from(2u64);
        assert_ne!(commit(s, n, 10), commit(s, n, 11));
    }

    #[test]
    fn distinct_notes_do_not_collide() {
        let mut rng = OsRng;
        let a = generate_note(&mut rng, 10);
        let b = generate_note(&mut rng, 10);
        assert_ne!(a.commitment, b.commitment);
    }

    #[test]
    fn generated_note_amount_is_preserved() {
        let mut rng = OsRng;
        let note = generate_note(&mut rng, 42);
        assert_eq!(note.amount, 42);
        assert!(!note.is_placed());
    }

    #[test]
    fn serialize_deserialize_round_trips() {
        let mut rng = OsRng;
        let mut note = generate_note(&mut rng, 7);
        note.leaf_index = Some(3);
        note.timestamp = Some(1_690_000_000);

        let serialized = serialize_note(&note);
        let restored = deserialize_note(&serialized).unwrap();
        assert_eq!(restored, note);

        let serialized_again = serialize_note(&restored);
        assert_eq!(serialized, serialized_again);
    }

    #[test]
    fn deserialize_rejects_tampered_commitment() {
        let mut rng = OsRng;
        let note = generate_note(&mut rng, 7);
        let mut serialized = serialize_note(&note);
        serialized.commitment =
            (Fq::from_dec_str(&serialized.commitment).unwrap() + Fq::from(1u64)).to_string();
        assert!(deserialize_note(&serialized).is_err());
    }

    #[test]
    fn backup_envelope_round_trips() {
        let mut rng = OsRng;
        let note = generate_note(&mut rng, 99);
        let envelope = to_backup_envelope(&note).unwrap();
        let restored = from_backup_envelope(&envelope).unwrap();
        assert_eq!(restored, note);
    }
}
