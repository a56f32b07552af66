//! The contract view/mutation surface the core depends on (spec.md §6),
//! expressed as a trait so the scanner and orchestrator can be driven by
//! any transport (JSON-RPC, an indexer, a test fixture) without this crate
//! knowing about HTTP or websockets.

use crate::field::Fq;
use crate::freshness::RootStatus;
use crate::PoolError;

/// A deposit or note-creation event emitted by the contract (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositEvent {
    pub commitment: Fq,
    pub amount: u128,
    pub leaf_index: u64,
    pub block_number: u64,
    pub tx_hash: String,
}

/// Read-only view of the contract's state that the chain scanner and
/// freshness classifier depend on. The contract itself, the RPC transport,
/// and the event stream plumbing are external collaborators (spec.md §1);
/// this trait is the seam between them and the core.
pub trait ChainView {
    /// Deposit/note-creation events observed strictly after `from_block`.
    fn events_since(&self, from_block: u64) -> Result<Vec<DepositEvent>, PoolError>;

    /// `(exists, leaf_index)` for a commitment (spec.md §6 `commitment_data`).
    fn commitment_data(&self, commitment: Fq) -> Result<Option<u64>, PoolError>;

    /// Whether `nullifier_hash` has already been spent on-chain.
    fn nullifier_spent(&self, nullifier_hash: Fq) -> Result<bool, PoolError>;

    /// Batched form of [`ChainView::nullifier_spent`] (spec.md §4.E: "may
    /// be issued in batch where the contract exposes a batch view"). The
    /// default folds over the single-item call so a minimal collaborator
    /// only needs to implement that one.
    fn nullifier_spent_batch(&self, hashes: &[Fq]) -> Result<Vec<bool>, PoolError> {
        hashes.iter().map(|&h| self.nullifier_spent(h)).collect()
    }

    /// `(exists, deposits_ago, deposits_until_expiry)` for `root` (spec.md
    /// §6 `root_status`).
    fn root_status(&self, root: Fq) -> Result<RootStatus, PoolError>;

    /// Membership test over the contract's own circular root history
    /// (spec.md §6 `is_known_root`).
    fn is_known_root(&self, root: Fq) -> Result<bool, PoolError> {
        Ok(self.root_status(root)?.exists)
    }
}

/// In-memory [`ChainView`] fixtures for tests. Exposed outside this crate
/// behind the `test-support` feature so integration tests in
/// `anonpool-core/tests/` and the sibling prover crates' test suites can
/// reuse it instead of hand-rolling their own fake.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// A fully in-memory [`ChainView`] for unit/integration tests: holds a
    /// fixed event list and a mutable spent-nullifier set.
    #[derive(Default)]
    pub struct FakeChain {
        pub events: Vec<DepositEvent>,
        pub spent: RefCell<HashSet<Fq>>,
        pub known_roots: RefCell<HashSet<Fq>>,
    }

    impl ChainView for FakeChain {
        fn events_since(&self, from_block: u64) -> Result<Vec<DepositEvent>, PoolError> {
            Ok(self
                .events
                .iter()
                .filter(|e| e.block_number > from_block)
                .cloned()
                .collect())
        }

        fn commitment_data(&self, commitment: Fq) -> Result<Option<u64>, PoolError> {
            Ok(self
                .events
                .iter()
                .find(|e| e.commitment == commitment)
                .map(|e| e.leaf_index))
        }

        fn nullifier_spent(&self, nullifier_hash: Fq) -> Result<bool, PoolError> {
            Ok(self.spent.borrow().contains(&nullifier_hash))
        }

        fn root_status(&self, root: Fq) -> Result<RootStatus, PoolError> {
            let exists = self.known_roots.borrow().contains(&root);
            Ok(RootStatus {
                exists,
                deposits_ago: 0,
                deposits_until_expiry: if exists { 1000 } else { 0 },
            })
        }
    }
}
