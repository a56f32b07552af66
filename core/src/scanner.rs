//! Chain scanner (spec.md §4.E): recovers owned notes from on-chain
//! deposit/transfer events by re-deriving candidate commitments, since the
//! wallet cannot know the amount of a restored note a priori but the chain
//! can tell it.

use log::{debug, info};

use crate::chain::{ChainView, DepositEvent};
use crate::config::PoolConfig;
use crate::derive::derive_note;
use crate::error::PoolError;
use crate::field::Fq;
use crate::merkle::MerkleTree;
use crate::note::nullifier_hash;
use crate::wallet::WalletState;

/// Summary of a single scan pass, useful for logging/telemetry at the
/// call site (the core itself does not log to the user, spec.md §7).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub events_seen: usize,
    pub newly_confirmed: Vec<Fq>,
    pub newly_spent: Vec<Fq>,
    pub last_scanned_block: u64,
}

/// Scan every event since `wallet.last_scanned_block`, absorbing matched
/// commitments into `tree` and updating `wallet` in place. Idempotent:
/// running it again over the same events re-derives the same matches and
/// makes no further changes (spec.md §5).
pub fn scan(
    wallet: &mut WalletState,
    tree: &mut MerkleTree,
    chain: &dyn ChainView,
    config: &PoolConfig,
) -> Result<ScanReport, PoolError> {
    let events = chain.events_since(wallet.last_scanned_block)?;
    debug!("scanner: {} event(s) since block {}", events.len(), wallet.last_scanned_block);

    let mut report = ScanReport {
        events_seen: events.len(),
        last_scanned_block: wallet.last_scanned_block,
        ..Default::default()
    };

    let horizon = config.scan_horizon(wallet.note_index);

    for event in &events {
        report.last_scanned_block = report.last_scanned_block.max(event.block_number);
        match_event(wallet, tree, chain, event, horizon, &mut report)?;
    }

    wallet.last_scanned_block = report.last_scanned_block;
    info!(
        "scanner: {} newly confirmed, {} newly spent, scanned through block {}",
        report.newly_confirmed.len(),
        report.newly_spent.len(),
        wallet.last_scanned_block
    );
    Ok(report)
}

fn match_event(
    wallet: &mut WalletState,
    tree: &mut MerkleTree,
    chain: &dyn ChainView,
    event: &DepositEvent,
    horizon: u32,
    report: &mut ScanReport,
) -> Result<(), PoolError> {
    if wallet.contains(event.commitment) {
        // Already tracked (our own generate_note predicted it, or an
        // earlier scan already matched it); just make sure it's absorbed
        // and re-check its spent status.
        absorb_and_mark(wallet, tree, event)?;
        check_spent(wallet, chain, event.commitment, report)?;
        return Ok(());
    }

    let Some(index) = find_deriving_index(wallet.master_seed, event.commitment, event.amount, horizon) else {
        // Not derivable from this seed within the search horizon: not ours.
        return Ok(());
    };

    let note = derive_note(wallet.master_seed, index as u64, event.amount);
    wallet.insert_pending(note)?;
    wallet.note_index = wallet.note_index.max(index + 1);
    absorb_and_mark(wallet, tree, event)?;
    report.newly_confirmed.push(event.commitment);
    check_spent(wallet, chain, event.commitment, report)?;
    Ok(())
}

fn find_deriving_index(seed: Fq, announced_commitment: Fq, amount: u128, horizon: u32) -> Option<u32> {
    (0..horizon).find(|&i| derive_note(seed, i as u64, amount).commitment == announced_commitment)
}

fn absorb_and_mark(wallet: &mut WalletState, tree: &mut MerkleTree, event: &DepositEvent) -> Result<(), PoolError> {
    if tree.count() <= event.leaf_index {
        // The leaf hasn't been locally absorbed yet; append in event order.
        // Events are expected to arrive in leaf order since the contract
        // assigns `leaf_index` monotonically at deposit time.
        tree.append(event.commitment)?;
    }
    wallet.mark_confirmed(event.commitment, event.leaf_index, Some(event.tx_hash.clone()));
    Ok(())
}

fn check_spent(
    wallet: &mut WalletState,
    chain: &dyn ChainView,
    commitment: Fq,
    report: &mut ScanReport,
) -> Result<(), PoolError> {
    let Some(record) = wallet.record(commitment) else {
        return Ok(());
    };
    let hash = nullifier_hash(record.note.nullifier);
    if chain.nullifier_spent(hash)? {
        wallet.mark_spent(commitment, None);
        report.newly_spent.push(commitment);
    }
    Ok(())
}
