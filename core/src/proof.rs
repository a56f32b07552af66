//! The witness schema and proof-producer contract shared by the two
//! interchangeable backends (spec.md §4.H). This module defines the
//! contract only; `anonpool-prover-local` and `anonpool-prover-remote`
//! implement [`ProofProducer`] against it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::field::Fq;
use crate::note::{nullifier_hash, Note};

/// Raw proof byte length the circuit declares (a Groth16 BN254 proof: two
/// 64-byte G1 points plus one 128-byte G2 point). Both backends must
/// produce proofs of exactly this length (spec.md §4.H); any mismatch is a
/// hard failure, never silently accepted.
pub const EXPECTED_PROOF_BYTES: usize = 256;

/// The binder data distinguishing a withdraw, transfer, or consolidation
/// spend — the part of the witness that is specific to the operation
/// rather than common to every spend (input note + merkle co-path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessKind {
    Withdraw { amount: u128, recipient: Fq },
    Transfer {
        output_amount: u128,
        output_commitment: Fq,
        change_amount: u128,
        change_commitment: Fq,
    },
    Consolidate { output_amount: u128, output_commitment: Fq },
}

/// Decimal-string wire form of [`WitnessKind`] (spec.md §6: field elements
/// as decimal strings on the wire to the remote prover).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WitnessKindWire {
    Withdraw { amount: String, recipient: String },
    Transfer {
        output_amount: String,
        output_commitment: String,
        change_amount: String,
        change_commitment: String,
    },
    Consolidate { output_amount: String, output_commitment: String },
}

impl From<&WitnessKind> for WitnessKindWire {
    fn from(kind: &WitnessKind) -> Self {
        match kind {
            WitnessKind::Withdraw { amount, recipient } => WitnessKindWire::Withdraw {
                amount: amount.to_string(),
                recipient: recipient.to_string(),
            },
            WitnessKind::Transfer {
                output_amount,
                output_commitment,
                change_amount,
                change_commitment,
            } => WitnessKindWire::Transfer {
                output_amount: output_amount.to_string(),
                output_commitment: output_commitment.to_string(),
                change_amount: change_amount.to_string(),
                change_commitment: change_commitment.to_string(),
            },
            WitnessKind::Consolidate { output_amount, output_commitment } => WitnessKindWire::Consolidate {
                output_amount: output_amount.to_string(),
                output_commitment: output_commitment.to_string(),
            },
        }
    }
}

impl WitnessKindWire {
    fn into_kind(self) -> Result<WitnessKind, PoolError> {
        Ok(match self {
            WitnessKindWire::Withdraw { amount, recipient } => WitnessKind::Withdraw {
                amount: amount.parse().map_err(|_| PoolError::AmountOutOfRange)?,
                recipient: parse_field(&recipient)?,
            },
            WitnessKindWire::Transfer {
                output_amount,
                output_commitment,
                change_amount,
                change_commitment,
            } => WitnessKind::Transfer {
                output_amount: output_amount.parse().map_err(|_| PoolError::AmountOutOfRange)?,
                output_commitment: parse_field(&output_commitment)?,
                change_amount: change_amount.parse().map_err(|_| PoolError::AmountOutOfRange)?,
                change_commitment: parse_field(&change_commitment)?,
            },
            WitnessKindWire::Consolidate { output_amount, output_commitment } => WitnessKind::Consolidate {
                output_amount: output_amount.parse().map_err(|_| PoolError::AmountOutOfRange)?,
                output_commitment: parse_field(&output_commitment)?,
            },
        })
    }
}

/// A typed circuit witness: the input note being spent, its merkle
/// co-path, the root it was proven against, and the operation-specific
/// binders (spec.md §4.H).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub input_note: Note,
    pub merkle_path: Vec<Fq>,
    pub merkle_indices: Vec<u8>,
    pub merkle_root: Fq,
    pub kind: WitnessKind,
}

impl Witness {
    /// `nullifier_hash(input.nullifier)` (spec.md §8 invariant 7).
    pub fn nullifier_hash(&self) -> Fq {
        nullifier_hash(self.input_note.nullifier)
    }

    /// Public inputs in the fixed order spec.md §4.H and §8's scenarios
    /// specify: `[nullifier_hash, merkle_root, amount, recipient]` for a
    /// withdraw, and the six-element transfer ordering from scenario 2.
    pub fn public_inputs(&self) -> Vec<Fq> {
        let nh = self.nullifier_hash();
        match &self.kind {
            WitnessKind::Withdraw { amount, recipient } => {
                vec![nh, self.merkle_root, Fq::from(*amount), *recipient]
            }
            WitnessKind::Transfer {
                output_amount,
                output_commitment,
                change_amount,
                change_commitment,
            } => vec![
                nh,
                self.merkle_root,
                Fq::from(*output_amount),
                *change_commitment,
                Fq::from(*change_amount),
                *output_commitment,
            ],
            WitnessKind::Consolidate {
                output_amount,
                output_commitment,
            } => vec![nh, self.merkle_root, Fq::from(*output_amount), *output_commitment],
        }
    }
}

/// Wire form of [`Witness`] sent to the remote prover (spec.md §6 "Witness
/// serialization"): field elements as decimal strings, indices as
/// `{0, 1}` integers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessWire {
    pub note: WireNote,
    pub merkle_path: Vec<String>,
    pub merkle_indices: Vec<u8>,
    pub merkle_root: String,
    pub kind: WitnessKindWire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireNote {
    pub secret: String,
    pub nullifier: String,
    pub amount: String,
}

impl From<&Witness> for WitnessWire {
    fn from(w: &Witness) -> Self {
        WitnessWire {
            note: WireNote {
                secret: w.input_note.secret.to_string(),
                nullifier: w.input_note.nullifier.to_string(),
                amount: w.input_note.amount.to_string(),
            },
            merkle_path: w.merkle_path.iter().map(|f| f.to_string()).collect(),
            merkle_indices: w.merkle_indices.clone(),
            merkle_root: w.merkle_root.to_string(),
            kind: WitnessKindWire::from(&w.kind),
        }
    }
}

impl WitnessWire {
    /// Reconstruct a [`Witness`] from the wire form, re-deriving the
    /// input note's commitment rather than trusting a transmitted one
    /// (spec.md §8 invariant 8: exact round-trip for all Fq in `[0, P)`).
    pub fn into_witness(self) -> Result<Witness, PoolError> {
        let secret = parse_field(&self.note.secret)?;
        let nullifier = parse_field(&self.note.nullifier)?;
        let amount: u128 = self
            .note
            .amount
            .parse()
            .map_err(|_| PoolError::AmountOutOfRange)?;
        let merkle_root = parse_field(&self.merkle_root)?;
        let merkle_path = self
            .merkle_path
            .iter()
            .map(|s| parse_field(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Witness {
            input_note: Note::from_parts(secret, nullifier, amount),
            merkle_path,
            merkle_indices: self.merkle_indices,
            merkle_root,
            kind: self.kind.into_kind()?,
        })
    }
}

fn parse_field(s: &str) -> Result<Fq, PoolError> {
    let x = Fq::from_dec_str(s).map_err(|_| PoolError::InvalidField)?;
    crate::field::require_reduced(x)
}

/// Result of a single proof-generation call: the raw bytes to submit
/// verbatim to the contract, the public inputs in circuit order, and a
/// timing measurement for benchmarking (spec.md §4.H).
#[derive(Debug, Clone)]
pub struct ProofResult {
    pub raw_proof: Vec<u8>,
    pub public_inputs: Vec<Fq>,
    pub timing: Duration,
}

/// A minimal channel-backed cancellation token (spec.md §5: proof
/// generation must accept cancellation, leaking no partial proof and
/// leaving wallet state unchanged). Deliberately not `tokio_util`'s
/// `CancellationToken` so `anonpool-core` stays runtime-agnostic.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A proof producer: accepts a typed witness and returns `(raw_proof,
/// public_inputs, timing)` (spec.md §4.H). Implemented by the in-process
/// and remote backends with an identical contract; no inheritance, a
/// free-standing trait per spec.md §9's redesign note.
pub trait ProofProducer {
    fn prove(&self, witness: &Witness, cancel: &CancellationToken) -> Result<ProofResult, PoolError>;
}

/// Chooses a backend by caller preference and enforces the invariants both
/// backends must share (spec.md §4.H). Retries a remote backend once on a
/// transient failure but never silently falls back to the other backend
/// (spec.md §7): a caller that wants that must construct a new
/// orchestrator with the other backend explicitly.
pub struct Orchestrator {
    backend: Box<dyn ProofProducer + Send + Sync>,
    max_retries: u8,
}

impl Orchestrator {
    pub fn new(backend: Box<dyn ProofProducer + Send + Sync>) -> Self {
        Orchestrator { backend, max_retries: 1 }
    }

    /// Generate a proof and validate it against [`check_proof_result`]
    /// before returning. Retries once on [`PoolError::ProverUnavailable`].
    pub fn prove(&self, witness: &Witness, cancel: &CancellationToken) -> Result<ProofResult, PoolError> {
        let mut attempts = 0;
        loop {
            match self.backend.prove(witness, cancel) {
                Ok(result) => {
                    check_proof_result(witness, &result)?;
                    return Ok(result);
                }
                Err(PoolError::ProverUnavailable(msg)) if attempts < self.max_retries => {
                    log::warn!("prover unavailable ({msg}), retrying once");
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Verify a backend's output against the shared invariants both backends
/// must uphold (spec.md §4.H): exact proof length, and public inputs that
/// match what the witness itself would produce.
pub fn check_proof_result(witness: &Witness, result: &ProofResult) -> Result<(), PoolError> {
    if result.raw_proof.len() != EXPECTED_PROOF_BYTES {
        return Err(PoolError::ProofSizeMismatch {
            got: result.raw_proof.len(),
            expected: EXPECTED_PROOF_BYTES,
        });
    }
    if result.public_inputs != witness.public_inputs() {
        return Err(PoolError::ProofSizeMismatch {
            got: result.public_inputs.len(),
            expected: witness.public_inputs().len(),
        });
    }
    Ok(())
}
