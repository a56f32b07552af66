//! Error taxonomy (spec.md §7). The spend planner and chain scanner never
//! recover locally; they return one of these typed failures and leave
//! recovery policy to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("value is not a reduced field element (>= P)")]
    InvalidField,

    #[error("amount is out of range (must be < 2^128, and non-negative after change)")]
    AmountOutOfRange,

    #[error("tree is full: no more leaves can be appended at this depth")]
    TreeFull,

    #[error("no leaf at index {0}: not yet inserted, or scan hasn't matched it")]
    NotInTree(u64),

    #[error("root is no longer in the on-chain history window; regenerate the proof")]
    RootExpired,

    #[error("no single confirmed note covers the requested amount")]
    InsufficientBalance,

    #[error("derived commitment already present locally")]
    DuplicateCommitment,

    #[error("remote prover backend is unavailable: {0}")]
    ProverUnavailable(String),

    #[error("proof has unexpected byte length: got {got}, expected {expected}")]
    ProofSizeMismatch { got: usize, expected: usize },

    #[error("could not persist wallet state: {0}")]
    PersistenceFailure(String),

    #[error("proof generation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
