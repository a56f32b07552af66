//! Wallet state machine (spec.md §4.F): the set of notes a seed owns,
//! their lifecycle `{pending, confirmed, spent}`, and persistence.

use std::collections::HashMap;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::derive::{derive_note, master_seed_from_signature};
use crate::error::PoolError;
use crate::field::Fq;
use crate::note::{deserialize_note, serialize_note, Note, SerializedNote};

/// Lifecycle stage of a note the wallet knows about (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    /// Generated locally, not yet observed on-chain.
    Pending,
    /// Matched against an on-chain event and absorbed into the local tree.
    Confirmed,
    /// Spent: its nullifier has been observed on-chain, or a local spend
    /// was applied. Monotonic — spec.md §3 says this never reverts except
    /// via an explicit resync that proves a reorg (left unimplemented here
    /// per spec.md §9's "never demote spent" default).
    Spent,
}

/// A note plus its wallet-tracked lifecycle metadata (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub note: Note,
    pub status: NoteStatus,
    pub deposit_tx: Option<String>,
    pub spend_tx: Option<String>,
}

/// The wallet's full state: master seed, next derivation index, the note
/// map keyed by commitment, and scan progress (spec.md §3 "Wallet state").
#[derive(Debug, Clone)]
pub struct WalletState {
    pub master_seed: Fq,
    pub note_index: u32,
    notes: HashMap<Fq, NoteRecord>,
    pub last_scanned_block: u64,
}

impl WalletState {
    /// A fresh wallet with zero notes, seeded from `master_seed` directly.
    pub fn new(master_seed: Fq) -> Self {
        WalletState {
            master_seed,
            note_index: 0,
            notes: HashMap::new(),
            last_scanned_block: 0,
        }
    }

    /// A fresh wallet derived from a wallet signature (spec.md §4.D, §4.F).
    pub fn from_signature(signature: &[u8]) -> Self {
        Self::new(master_seed_from_signature(signature))
    }

    /// Derive the next note for `amount`, record it as `pending`, and
    /// advance `note_index`. Deterministic derivation (spec.md §4.D) is
    /// used rather than fresh randomness so the note is recoverable from
    /// the signature alone after the wallet state is lost (spec.md §5).
    pub fn generate_note(&mut self, amount: u128) -> Result<Note, PoolError> {
        let index = self.note_index as u64;
        let note = derive_note(self.master_seed, index, amount);
        self.insert_pending(note.clone())?;
        self.note_index = self.note_index.saturating_add(1);
        Ok(note)
    }

    /// Insert a freshly generated note as `pending`. Fails with
    /// [`PoolError::DuplicateCommitment`] if the commitment is already
    /// tracked — under deterministic derivation this should not happen
    /// (spec.md §7).
    pub fn insert_pending(&mut self, note: Note) -> Result<(), PoolError> {
        if self.notes.contains_key(&note.commitment) {
            return Err(PoolError::DuplicateCommitment);
        }
        self.notes.insert(
            note.commitment,
            NoteRecord {
                note,
                status: NoteStatus::Pending,
                deposit_tx: None,
                spend_tx: None,
            },
        );
        Ok(())
    }

    /// Mark a note confirmed once the scanner has matched it against an
    /// on-chain event and it has been absorbed into the local tree.
    pub fn mark_confirmed(&mut self, commitment: Fq, leaf_index: u64, deposit_tx: Option<String>) {
        if let Some(record) = self.notes.get_mut(&commitment) {
            record.note.leaf_index = Some(leaf_index);
            if record.status != NoteStatus::Spent {
                record.status = NoteStatus::Confirmed;
            }
            if deposit_tx.is_some() {
                record.deposit_tx = deposit_tx;
            }
        }
    }

    /// Mark a confirmed note spent, locally (after a spend this wallet
    /// prepared) or upon discovering its nullifier on-chain during a scan.
    /// Monotonic: never demotes an already-spent note.
    pub fn mark_spent(&mut self, commitment: Fq, spend_tx: Option<String>) {
        if let Some(record) = self.notes.get_mut(&commitment) {
            record.status = NoteStatus::Spent;
            if spend_tx.is_some() {
                record.spend_tx = spend_tx;
            }
        }
    }

    pub fn record(&self, commitment: Fq) -> Option<&NoteRecord> {
        self.notes.get(&commitment)
    }

    pub fn records(&self) -> impl Iterator<Item = &NoteRecord> {
        self.notes.values()
    }

    pub fn contains(&self, commitment: Fq) -> bool {
        self.notes.contains_key(&commitment)
    }

    pub fn confirmed_notes(&self) -> impl Iterator<Item = &Note> {
        self.notes
            .values()
            .filter(|r| r.status == NoteStatus::Confirmed)
            .map(|r| &r.note)
    }

    /// Σ amounts of `confirmed` notes (spec.md §4.F).
    pub fn available(&self) -> u128 {
        self.confirmed_notes().map(|n| n.amount).sum()
    }

    /// Σ amounts of `pending` notes (spec.md §4.F).
    pub fn pending(&self) -> u128 {
        self.notes
            .values()
            .filter(|r| r.status == NoteStatus::Pending)
            .map(|r| r.note.amount)
            .sum()
    }

    /// `available + pending` (spec.md §4.F).
    pub fn total(&self) -> u128 {
        self.available() + self.pending()
    }

    /// Serialize the full wallet state into the persisted blob shape
    /// (spec.md §6 "Persisted wallet blob").
    pub fn to_blob(&self) -> WalletBlob {
        WalletBlob {
            master_seed: self.master_seed.to_string(),
            note_index: self.note_index,
            notes: self
                .notes
                .values()
                .map(|r| SerializedNoteRecord {
                    note: serialize_note(&r.note),
                    status: r.status,
                    deposit_tx: r.deposit_tx.clone(),
                    spend_tx: r.spend_tx.clone(),
                })
                .collect(),
            last_scanned_block: self.last_scanned_block,
        }
    }

    /// Reconstruct wallet state from a persisted blob, validating every
    /// note's commitment as it deserializes (spec.md §4.F "merge scan
    /// results with the persisted state" happens at the caller, via
    /// [`WalletState::mark_confirmed`]/[`WalletState::mark_spent`] after
    /// this load, driven by a fresh scan).
    pub fn from_blob(blob: &WalletBlob) -> Result<Self, PoolError> {
        let master_seed =
            Fq::from_dec_str(&blob.master_seed).map_err(|_| PoolError::InvalidField)?;
        let mut notes = HashMap::with_capacity(blob.notes.len());
        for record in &blob.notes {
            let note = deserialize_note(&record.note)?;
            notes.insert(
                note.commitment,
                NoteRecord {
                    note,
                    status: record.status,
                    deposit_tx: record.deposit_tx.clone(),
                    spend_tx: record.spend_tx.clone(),
                },
            );
        }
        Ok(WalletState {
            master_seed,
            note_index: blob.note_index,
            notes,
            last_scanned_block: blob.last_scanned_block,
        })
    }

    /// Base64-over-JSON backup envelope for the whole wallet (spec.md §4.B:
    /// "a base64 envelope for backup").
    pub fn export_backup(&self) -> Result<String, PoolError> {
        let json = serde_json::to_vec(&self.to_blob())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    pub fn import_backup(envelope: &str) -> Result<Self, PoolError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(envelope)
            .map_err(|_| PoolError::InvalidField)?;
        let blob: WalletBlob = serde_json::from_slice(&bytes)?;
        Self::from_blob(&blob)
    }
}

/// The wire/persisted shape of [`WalletState`] (spec.md §6). Field order
/// and presence match spec.md exactly; unknown fields are ignored by
/// `serde` by default so forward-compatible readers need no extra work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBlob {
    pub master_seed: String,
    pub note_index: u32,
    pub notes: Vec<SerializedNoteRecord>,
    pub last_scanned_block: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedNoteRecord {
    pub note: SerializedNote,
    pub status: NoteStatus,
    pub deposit_tx: Option<String>,
    pub spend_tx: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_note_is_pending_and_advances_index() {
        let mut wallet = WalletState::new(Fq::from(1u64));
        let note = wallet.generate_note(10).unwrap();
        assert_eq!(wallet.note_index, 1);
        assert_eq!(wallet.record(note.commitment).unwrap().status, NoteStatus::Pending);
        assert_eq!(wallet.pending(), 10);
        assert_eq!(wallet.available(), 0);
    }

    #[test]
    fn confirm_then_spend_updates_balances() {
        let mut wallet = WalletState::new(Fq::from(1u64));
        let note = wallet.generate_note(10).unwrap();
        wallet.mark_confirmed(note.commitment, 0, Some("0xdeposit".into()));
        assert_eq!(wallet.available(), 10);
        assert_eq!(wallet.pending(), 0);

        wallet.mark_spent(note.commitment, Some("0xspend".into()));
        assert_eq!(wallet.available(), 0);
        assert_eq!(wallet.record(note.commitment).unwrap().status, NoteStatus::Spent);
    }

    #[test]
    fn spent_never_demotes_to_confirmed() {
        let mut wallet = WalletState::new(Fq::from(1u64));
        let note = wallet.generate_note(10).unwrap();
        wallet.mark_confirmed(note.commitment, 0, None);
        wallet.mark_spent(note.commitment, None);
        // A later re-confirmation attempt (e.g. a rescan re-observing the
        // deposit event) must not revert the spent status.
        wallet.mark_confirmed(note.commitment, 0, None);
        assert_eq!(wallet.record(note.commitment).unwrap().status, NoteStatus::Spent);
    }

    #[test]
    fn duplicate_commitment_is_rejected() {
        let mut wallet = WalletState::new(Fq::from(1u64));
        let note = wallet.generate_note(10).unwrap();
        assert!(matches!(
            wallet.insert_pending(note),
            Err(PoolError::DuplicateCommitment)
        ));
    }

    #[test]
    fn blob_round_trips() {
        let mut wallet = WalletState::new(Fq::from(42u64));
        let note = wallet.generate_note(5).unwrap();
        wallet.mark_confirmed(note.commitment, 2, Some("0xabc".into()));
        wallet.last_scanned_block = 100;

        let blob = wallet.to_blob();
        let restored = WalletState::from_blob(&blob).unwrap();

        assert_eq!(restored.master_seed, wallet.master_seed);
        assert_eq!(restored.note_index, wallet.note_index);
        assert_eq!(restored.last_scanned_block, wallet.last_scanned_block);
        assert_eq!(restored.available(), wallet.available());
        assert_eq!(
            restored.record(note.commitment).unwrap().status,
            NoteStatus::Confirmed
        );
    }

    #[test]
    fn backup_envelope_round_trips() {
        let mut wallet = WalletState::new(Fq::from(7u64));
        wallet.generate_note(3).unwrap();
        let envelope = wallet.export_backup().unwrap();
        let restored = WalletState::import_backup(&envelope).unwrap();
        assert_eq!(restored.total(), wallet.total());
    }
}
