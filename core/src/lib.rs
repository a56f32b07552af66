//! Cryptographic and state-management core for a client-side privacy pool
//! wallet: field arithmetic, note commitments, the incremental Merkle
//! accumulator, deterministic note derivation, chain scanning, wallet
//! bookkeeping, spend planning, and the proof-producer contract shared by
//! the in-process and remote backends.
//!
//! This crate deliberately has no networking or async runtime dependency
//! so it stays embeddable in contexts (a browser/wasm wallet, a server-side
//! signer) that cannot drag in `reqwest`/`tokio`. The two proof backends
//! live in sibling crates (`anonpool-prover-local`, `anonpool-prover-remote`)
//! and implement the [`proof::ProofProducer`] trait defined here.

pub mod chain;
pub mod config;
pub mod derive;
pub mod error;
pub mod field;
pub mod freshness;
pub mod merkle;
pub mod note;
pub mod planner;
pub mod proof;
pub mod scanner;
pub mod wallet;

pub use error::PoolError;
pub use field::Fq;
