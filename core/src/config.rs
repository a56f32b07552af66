//! Environment/configuration surface (spec.md §6) plus the scan-margin
//! tunable spec.md §9 calls out as an open question.

use crate::error::PoolError;

/// Default candidate-index margin the chain scanner searches beyond
/// `note_index` (spec.md §4.E / §9: `max(note_index + margin, 1000)`).
pub const DEFAULT_SCAN_MARGIN: u32 = 100;

/// Minimum number of candidate indices the scanner always searches, even
/// for a freshly created wallet whose `note_index` is still small.
pub const MIN_SCAN_HORIZON: u32 = 1000;

/// The external collaborators and operational knobs every wallet surface
/// (deposit UI, withdrawal UI, auction bidder, benchmark harness) needs to
/// agree on. None of these fields affect the cryptography; they only say
/// where to find the contract, the RPC node, and the prover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub contract_address: String,
    pub rpc_url: String,
    pub prover_url: Option<String>,
    pub chain_id: u64,
    /// spec.md §9: "A production implementation should expose this margin
    /// as a tunable and document the trade-off between scan cost and
    /// recovery horizon." A larger margin recovers notes derived further
    /// ahead of `note_index` (e.g. after a crash mid-generation) at the
    /// cost of more candidate hashes per unmatched event.
    pub scan_margin: u32,
}

impl PoolConfig {
    pub fn new(contract_address: impl Into<String>, rpc_url: impl Into<String>, chain_id: u64) -> Self {
        PoolConfig {
            contract_address: contract_address.into(),
            rpc_url: rpc_url.into(),
            prover_url: None,
            chain_id,
            scan_margin: DEFAULT_SCAN_MARGIN,
        }
    }

    /// Build from `ANONPOOL_CONTRACT_ADDRESS`, `ANONPOOL_RPC_URL`,
    /// `ANONPOOL_PROVER_URL` (optional), `ANONPOOL_CHAIN_ID`, and
    /// `ANONPOOL_SCAN_MARGIN` (optional, defaults to [`DEFAULT_SCAN_MARGIN`]).
    pub fn from_env() -> Result<Self, PoolError> {
        let contract_address = env_var("ANONPOOL_CONTRACT_ADDRESS")?;
        let rpc_url = env_var("ANONPOOL_RPC_URL")?;
        let prover_url = std::env::var("ANONPOOL_PROVER_URL").ok();
        let chain_id = env_var("ANONPOOL_CHAIN_ID")?
            .parse()
            .map_err(|_| PoolError::PersistenceFailure("ANONPOOL_CHAIN_ID is not a u64".into()))?;
        let scan_margin = match std::env::var("ANONPOOL_SCAN_MARGIN") {
            Ok(v) => v
                .parse()
                .map_err(|_| PoolError::PersistenceFailure("ANONPOOL_SCAN_MARGIN is not a u32".into()))?,
            Err(_) => DEFAULT_SCAN_MARGIN,
        };

        Ok(PoolConfig {
            contract_address,
            rpc_url,
            prover_url,
            chain_id,
            scan_margin,
        })
    }

    /// `max(note_index + scan_margin, MIN_SCAN_HORIZON)`, the candidate
    /// index ceiling the scanner searches up to (spec.md §4.E).
    pub fn scan_horizon(&self, note_index: u32) -> u32 {
        (note_index.saturating_add(self.scan_margin)).max(MIN_SCAN_HORIZON)
    }
}

fn env_var(name: &str) -> Result<String, PoolError> {
    std::env::var(name).map_err(|_| PoolError::PersistenceFailure(format!("missing env var {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_horizon_respects_minimum() {
        let mut cfg = PoolConfig::new("0xabc", "http://localhost:8545", 1);
        cfg.scan_margin = 100;
        assert_eq!(cfg.scan_horizon(0), MIN_SCAN_HORIZON);
        assert_eq!(cfg.scan_horizon(950), MIN_SCAN_HORIZON);
        assert_eq!(cfg.scan_horizon(1000), 1100);
    }
}
