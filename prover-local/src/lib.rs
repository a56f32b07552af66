//! In-process proof backend (spec.md §4.H): computes a proof in the
//! caller's address space. Carries an initialization cost (loading circuit
//! artifacts and a verification key) that is amortized across calls behind
//! a process-wide singleton, mirroring the teacher's `ProverClient::setup`
//! pattern — one-time circuit setup, many `prove` calls — but modeled as an
//! explicit init/teardown pair per spec.md §9's redesign note rather than
//! ambient module-global state.

use std::sync::Mutex;
use std::time::Instant;

use anonpool_core::error::PoolError;
use anonpool_core::proof::{CancellationToken, ProofResult, ProofProducer, Witness, EXPECTED_PROOF_BYTES};
use sha3::{Digest, Keccak256};

/// Stand-in for the loaded circuit's proving/verifying key material. The
/// real circuit internals are out of scope (spec.md §1); this crate only
/// needs to reproduce the *shape* of the backend contract — a one-time
/// load, a deterministic output of the declared byte length.
#[derive(Debug, Clone)]
struct CircuitArtifacts {
    verifying_key_hash: [u8; 32],
}

lazy_static::lazy_static! {
    static ref ARTIFACTS: Mutex<Option<CircuitArtifacts>> = Mutex::new(None);
}

fn load_artifacts() -> CircuitArtifacts {
    log::info!("local backend: loading circuit artifacts and verifying key");
    let mut hasher = Keccak256::new();
    hasher.update(b"anonpool circuit v1");
    let digest = hasher.finalize();
    let mut verifying_key_hash = [0u8; 32];
    verifying_key_hash.copy_from_slice(&digest);
    CircuitArtifacts { verifying_key_hash }
}

/// Ensure the singleton is initialized, loading it on first use. Returns
/// the elapsed time spent loading (zero if already warm).
fn ensure_initialized() -> std::time::Duration {
    let start = Instant::now();
    let mut guard = ARTIFACTS.lock().expect("artifacts mutex poisoned");
    if guard.is_none() {
        *guard = Some(load_artifacts());
    }
    start.elapsed()
}

/// Explicitly drop the loaded artifacts, forcing the next call to pay
/// initialization cost again. Exposed for benchmarking a cold start.
pub fn teardown() {
    log::debug!("local backend: tearing down circuit artifacts");
    let mut guard = ARTIFACTS.lock().expect("artifacts mutex poisoned");
    *guard = None;
}

/// The in-process proof backend (spec.md §4.H).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend {
    /// When set, [`LocalBackend::prove`] tears down the singleton first so
    /// the returned timing includes the full cold-start cost — used by the
    /// benchmark harness (spec.md §4.H: "the caller may request a cold
    /// start to measure it").
    pub cold_start: bool,
}

impl LocalBackend {
    pub fn new() -> Self {
        LocalBackend { cold_start: false }
    }

    pub fn with_cold_start() -> Self {
        LocalBackend { cold_start: true }
    }
}

impl ProofProducer for LocalBackend {
    fn prove(&self, witness: &Witness, cancel: &CancellationToken) -> Result<ProofResult, PoolError> {
        if cancel.is_cancelled() {
            return Err(PoolError::Cancelled);
        }

        if self.cold_start {
            teardown();
        }

        let start = Instant::now();
        let init_cost = ensure_initialized();
        let _ = init_cost; // folded into `start`'s elapsed below

        if cancel.is_cancelled() {
            return Err(PoolError::Cancelled);
        }

        let public_inputs = witness.public_inputs();
        let raw_proof = synthesize_proof(witness, &public_inputs);

        if cancel.is_cancelled() {
            // No partial proof leaks: the computed bytes are simply dropped.
            return Err(PoolError::Cancelled);
        }

        Ok(ProofResult {
            raw_proof,
            public_inputs,
            timing: start.elapsed(),
        })
    }
}

/// Deterministic stand-in for the real circuit's proof bytes: a keccak
/// expansion of the witness's public binders, padded to
/// [`EXPECTED_PROOF_BYTES`]. Never incorporates the private note secret or
/// nullifier directly, matching the real circuit's property that a proof
/// reveals nothing about the spent note beyond its nullifier hash.
fn synthesize_proof(witness: &Witness, public_inputs: &[anonpool_core::field::Fq]) -> Vec<u8> {
    let guard = ARTIFACTS.lock().expect("artifacts mutex poisoned");
    let vk_hash = guard.as_ref().map(|a| a.verifying_key_hash).unwrap_or([0u8; 32]);
    drop(guard);

    let mut out = Vec::with_capacity(EXPECTED_PROOF_BYTES);
    let mut counter: u32 = 0;
    while out.len() < EXPECTED_PROOF_BYTES {
        let mut hasher = Keccak256::new();
        hasher.update(vk_hash);
        hasher.update(counter.to_be_bytes());
        for input in public_inputs {
            hasher.update(anonpool_core::field::pad32(*input));
        }
        hasher.update(anonpool_core::field::pad32(witness.merkle_root));
        out.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    out.truncate(EXPECTED_PROOF_BYTES);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anonpool_core::field::Fq;
    use anonpool_core::note::{commit, Note};
    use anonpool_core::proof::WitnessKind;

    fn sample_witness() -> Witness {
        let secret = Fq::from(1u64);
        let nullifier = Fq::from(2u64);
        let amount = 10u128;
        Witness {
            input_note: Note {
                secret,
                nullifier,
                amount,
                commitment: commit(secret, nullifier, amount),
                leaf_index: Some(0),
                timestamp: None,
            },
            merkle_path: vec![Fq::from(0u64); anonpool_core::merkle::DEPTH],
            merkle_indices: vec![0u8; anonpool_core::merkle::DEPTH],
            merkle_root: Fq::from(42u64),
            kind: WitnessKind::Withdraw { amount: 10, recipient: Fq::from(0xABu64) },
        }
    }

    #[test]
    fn proof_has_expected_length_and_matches_public_inputs() {
        teardown();
        let backend = LocalBackend::new();
        let witness = sample_witness();
        let token = CancellationToken::new();
        let result = backend.prove(&witness, &token).unwrap();
        assert_eq!(result.raw_proof.len(), EXPECTED_PROOF_BYTES);
        assert_eq!(result.public_inputs, witness.public_inputs());
    }

    #[test]
    fn proof_is_deterministic_for_the_same_witness() {
        teardown();
        let backend = LocalBackend::new();
        let witness = sample_witness();
        let token = CancellationToken::new();
        let a = backend.prove(&witness, &token).unwrap();
        let b = backend.prove(&witness, &token).unwrap();
        assert_eq!(a.raw_proof, b.raw_proof);
    }

    #[test]
    fn cancelled_token_yields_no_proof() {
        teardown();
        let backend = LocalBackend::new();
        let witness = sample_witness();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(backend.prove(&witness, &token), Err(PoolError::Cancelled)));
    }

    #[test]
    fn cold_start_reinitializes_artifacts() {
        let backend = LocalBackend::with_cold_start();
        let witness = sample_witness();
        let token = CancellationToken::new();
        // Warm the cache first, then force a cold start and confirm it
        // still succeeds (teardown + reinit happens transparently).
        LocalBackend::new().prove(&witness, &token).unwrap();
        let result = backend.prove(&witness, &token).unwrap();
        assert_eq!(result.raw_proof.len(), EXPECTED_PROOF_BYTES);
    }
}
