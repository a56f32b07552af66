//! A file-backed [`ChainView`] standing in for the real contract RPC
//! client (spec.md §1: "the on-chain contract itself... the HTTP/REST
//! surface" are external collaborators, out of scope for this engine).
//! Reads a JSON fixture of deposit events, spent nullifiers, and known
//! roots — the shape a real indexer/RPC client would otherwise supply.

use std::fs;
use std::path::Path;

use anonpool_core::chain::{ChainView, DepositEvent as CoreDepositEvent};
use anonpool_core::field::Fq;
use anonpool_core::freshness::RootStatus;
use anonpool_core::PoolError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEvent {
    pub commitment: String,
    pub amount: u128,
    pub leaf_index: u64,
    pub block_number: u64,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainFixture {
    #[serde(default)]
    pub events: Vec<FileEvent>,
    #[serde(default)]
    pub spent_nullifiers: Vec<String>,
    #[serde(default)]
    pub known_roots: Vec<String>,
}

pub struct FileChainView {
    fixture: ChainFixture,
}

impl FileChainView {
    pub fn load(path: &Path) -> Result<Self, PoolError> {
        let fixture = if path.exists() {
            let bytes = fs::read(path)
                .map_err(|e| PoolError::PersistenceFailure(format!("reading chain fixture: {e}")))?;
            serde_json::from_slice(&bytes)?
        } else {
            ChainFixture::default()
        };
        Ok(FileChainView { fixture })
    }

    fn parse_field(s: &str) -> Result<Fq, PoolError> {
        Fq::from_dec_str(s).map_err(|_| PoolError::InvalidField)
    }
}

impl ChainView for FileChainView {
    fn events_since(&self, from_block: u64) -> Result<Vec<CoreDepositEvent>, PoolError> {
        self.fixture
            .events
            .iter()
            .filter(|e| e.block_number > from_block)
            .map(|e| {
                Ok(CoreDepositEvent {
                    commitment: Self::parse_field(&e.commitment)?,
                    amount: e.amount,
                    leaf_index: e.leaf_index,
                    block_number: e.block_number,
                    tx_hash: e.tx_hash.clone(),
                })
            })
            .collect()
    }

    fn commitment_data(&self, commitment: Fq) -> Result<Option<u64>, PoolError> {
        for event in &self.fixture.events {
            if Self::parse_field(&event.commitment)? == commitment {
                return Ok(Some(event.leaf_index));
            }
        }
        Ok(None)
    }

    fn nullifier_spent(&self, nullifier_hash: Fq) -> Result<bool, PoolError> {
        for raw in &self.fixture.spent_nullifiers {
            if Self::parse_field(raw)? == nullifier_hash {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn root_status(&self, root: Fq) -> Result<RootStatus, PoolError> {
        for raw in &self.fixture.known_roots {
            if Self::parse_field(raw)? == root {
                return Ok(RootStatus { exists: true, deposits_ago: 0, deposits_until_expiry: 1000 });
            }
        }
        Ok(RootStatus { exists: false, deposits_ago: 0, deposits_until_expiry: 0 })
    }
}
