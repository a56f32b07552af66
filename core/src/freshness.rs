//! Root freshness classification (spec.md §4.I): turns the contract's
//! `root_status` view into a decision the spend planner and orchestrator
//! can act on without constructing prose themselves (spec.md §7).

use serde::{Deserialize, Serialize};

/// The `(exists, deposits_ago, deposits_until_expiry)` triple returned by
/// the contract's `root_status` view (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootStatus {
    pub exists: bool,
    pub deposits_ago: u64,
    pub deposits_until_expiry: u64,
}

/// Classification of a root's remaining lifetime in the on-chain history
/// window (spec.md §3, §4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// `deposits_until_expiry > 100`. Submit freely.
    Safe,
    /// `50 < deposits_until_expiry <= 100`. Prefer regeneration if latency allows.
    Warning,
    /// `10 < deposits_until_expiry <= 50`. Regenerate before submission.
    Urgent,
    /// `deposits_until_expiry <= 10`. Must regenerate now.
    Critical,
    /// Root no longer known to the contract. Proof invalid; regenerate.
    Expired,
}

impl Freshness {
    /// Whether a proof prepared against this root may still be submitted
    /// as-is, or must be regenerated against a fresher root first.
    pub fn may_submit(self) -> bool {
        matches!(self, Freshness::Safe | Freshness::Warning)
    }

    /// A short, user-facing label derived from the taxonomy (spec.md §7:
    /// "the core does not construct prose" beyond this kind of label).
    pub fn message(self) -> &'static str {
        match self {
            Freshness::Safe => "root is fresh; submit freely",
            Freshness::Warning => "root still valid; regenerate if latency allows",
            Freshness::Urgent => "root nearing expiry; regenerate before submission",
            Freshness::Critical => "root about to expire; regenerate now",
            Freshness::Expired => "root expired; regenerate proof",
        }
    }
}

/// Classify a `root_status` result per spec.md §4.I's table.
pub fn classify(status: RootStatus) -> Freshness {
    if !status.exists {
        return Freshness::Expired;
    }
    match status.deposits_until_expiry {
        n if n > 100 => Freshness::Safe,
        n if n > 50 => Freshness::Warning,
        n if n > 10 => Freshness::Urgent,
        _ => Freshness::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(exists: bool, deposits_until_expiry: u64) -> RootStatus {
        RootStatus {
            exists,
            deposits_ago: 0,
            deposits_until_expiry,
        }
    }

    #[test]
    fn nonexistent_root_is_expired() {
        assert_eq!(classify(status(false, 5000)), Freshness::Expired);
    }

    #[test]
    fn boundaries_match_table() {
        assert_eq!(classify(status(true, 101)), Freshness::Safe);
        assert_eq!(classify(status(true, 100)), Freshness::Warning);
        assert_eq!(classify(status(true, 51)), Freshness::Warning);
        assert_eq!(classify(status(true, 50)), Freshness::Urgent);
        assert_eq!(classify(status(true, 11)), Freshness::Urgent);
        assert_eq!(classify(status(true, 10)), Freshness::Critical);
        assert_eq!(classify(status(true, 0)), Freshness::Critical);
    }

    #[test]
    fn may_submit_only_for_safe_or_warning() {
        assert!(Freshness::Safe.may_submit());
        assert!(Freshness::Warning.may_submit());
        assert!(!Freshness::Urgent.may_submit());
        assert!(!Freshness::Critical.may_submit());
        assert!(!Freshness::Expired.may_submit());
    }
}
