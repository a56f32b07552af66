//! Remote proof backend (spec.md §4.H): serializes the witness as JSON and
//! posts it to an external prover endpoint, parsing back `(proof_bytes,
//! public_inputs, timing)`. Uses `reqwest`'s blocking client rather than
//! an async one so [`anonpool_core::proof::ProofProducer`] stays a plain
//! synchronous trait shared with the in-process backend — the caller
//! decides whether to run either backend on a worker thread (spec.md §5).

use std::time::{Duration, Instant};

use anonpool_core::error::PoolError;
use anonpool_core::field::Fq;
use anonpool_core::proof::{CancellationToken, ProofProducer, ProofResult, Witness, WitnessWire};
use serde::{Deserialize, Serialize};

/// Default request timeout. Remote proof generation is network I/O on top
/// of a real prover's compute time, so this is generous relative to a
/// typical HTTP call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Serialize)]
struct ProveRequest<'a> {
    witness: &'a WitnessWire,
}

#[derive(Debug, Deserialize)]
struct ProveResponse {
    #[serde(default)]
    proof_hex: Option<String>,
    #[serde(default)]
    public_inputs: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

/// The remote proof backend (spec.md §4.H).
pub struct RemoteBackend {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl RemoteBackend {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, PoolError> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PoolError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolError::ProverUnavailable(e.to_string()))?;
        Ok(RemoteBackend { endpoint: endpoint.into(), client })
    }
}

impl ProofProducer for RemoteBackend {
    fn prove(&self, witness: &Witness, cancel: &CancellationToken) -> Result<ProofResult, PoolError> {
        if cancel.is_cancelled() {
            return Err(PoolError::Cancelled);
        }

        let wire = WitnessWire::from(witness);
        let start = Instant::now();

        log::debug!("remote backend: posting witness to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProveRequest { witness: &wire })
            .send()
            .map_err(|e| PoolError::ProverUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PoolError::ProverUnavailable(format!(
                "prover endpoint returned status {}",
                response.status()
            )));
        }

        let body: ProveResponse = response
            .json()
            .map_err(|e| PoolError::ProverUnavailable(e.to_string()))?;

        if let Some(err) = body.error {
            return Err(PoolError::ProverUnavailable(err));
        }

        if cancel.is_cancelled() {
            return Err(PoolError::Cancelled);
        }

        let proof_hex = body
            .proof_hex
            .ok_or_else(|| PoolError::ProverUnavailable("response missing proof_hex".into()))?;
        let raw_proof = hex::decode(proof_hex.trim_start_matches("0x"))
            .map_err(|e| PoolError::ProverUnavailable(format!("invalid proof hex: {e}")))?;

        let public_inputs = body
            .public_inputs
            .iter()
            .map(|s| {
                Fq::from_dec_str(s).map_err(|_| PoolError::ProverUnavailable(format!("invalid public input {s}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProofResult {
            raw_proof,
            public_inputs,
            timing: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anonpool_core::merkle::DEPTH;
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
            merkle_path: vec![Fq::from(0u64); DEPTH],
            merkle_indices: vec![0u8; DEPTH],
            merkle_root: Fq::from(42u64),
            kind: WitnessKind::Withdraw { amount: 10, recipient: Fq::from(0xABu64) },
        }
    }

    #[test]
    fn cancelled_token_short_circuits_before_any_request() {
        let backend = RemoteBackend::new("http://127.0.0.1:0/prove").unwrap();
        let witness = sample_witness();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(backend.prove(&witness, &token), Err(PoolError::Cancelled)));
    }

    #[test]
    fn unreachable_endpoint_is_prover_unavailable() {
        // Port 0 never accepts connections; this exercises the transport
        // error path without depending on external network access.
        let backend = RemoteBackend::with_timeout("http://127.0.0.1:0/prove", Duration::from_millis(200)).unwrap();
        let witness = sample_witness();
        let token = CancellationToken::new();
        assert!(matches!(backend.prove(&witness, &token), Err(PoolError::ProverUnavailable(_))));
    }
}
