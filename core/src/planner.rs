//! Spend planner (spec.md §4.G): selects an input note, generates change,
//! and assembles the merkle proof + nullifier hash for a transfer,
//! withdraw, or N→1 consolidation.

use crate::error::PoolError;
use crate::field::Fq;
use crate::merkle::{MerkleProof, MerkleTree};
use crate::note::{nullifier_hash, Note};
use crate::wallet::{NoteStatus, WalletState};

/// Inputs for a withdraw spend: the entire note is redeemed, no change.
#[derive(Debug, Clone)]
pub struct WithdrawInputs {
    pub input: Note,
    pub merkle_proof: MerkleProof,
    pub root: Fq,
    pub nullifier_hash: Fq,
    pub amount: u128,
    pub recipient: Fq,
}

/// Inputs for a transfer spend: `output_amount` goes to `output_commitment`,
/// the remainder becomes a freshly derived change note.
#[derive(Debug, Clone)]
pub struct TransferInputs {
    pub input: Note,
    pub change: Option<Note>,
    pub merkle_proof: MerkleProof,
    pub root: Fq,
    pub nullifier_hash: Fq,
    pub output_amount: u128,
    pub output_commitment: Fq,
}

/// Per-input data for one leg of an N→1 consolidation, plus the single
/// output note the circuit must show `Σ inputs == output` for.
#[derive(Debug, Clone)]
pub struct ConsolidationInputs {
    pub inputs: Vec<ConsolidationLeg>,
    pub root: Fq,
    pub output: Note,
}

#[derive(Debug, Clone)]
pub struct ConsolidationLeg {
    pub note: Note,
    pub merkle_proof: MerkleProof,
    pub nullifier_hash: Fq,
}

/// Choose the smallest confirmed note whose amount covers `requested`,
/// tie-breaking by ascending `leaf_index` for determinism (spec.md §4.G).
fn select_input(wallet: &WalletState, requested: u128) -> Result<Note, PoolError> {
    wallet
        .confirmed_notes()
        .filter(|n| n.amount >= requested)
        .min_by(|a, b| {
            a.amount
                .cmp(&b.amount)
                .then_with(|| a.leaf_index.cmp(&b.leaf_index))
        })
        .cloned()
        .ok_or(PoolError::InsufficientBalance)
}

fn membership_proof(tree: &MerkleTree, note: &Note) -> Result<MerkleProof, PoolError> {
    let leaf_index = note.leaf_index.ok_or(PoolError::NotInTree(0))?;
    tree.proof(leaf_index)
}

/// `prepare_withdraw(amount) -> WithdrawInputs` (spec.md §4.G). The entire
/// selected note is redeemed to `recipient`; no change note is emitted.
pub fn prepare_withdraw(
    wallet: &WalletState,
    tree: &MerkleTree,
    amount: u128,
    recipient: Fq,
) -> Result<WithdrawInputs, PoolError> {
    let input = select_input(wallet, amount)?;
    let merkle_proof = membership_proof(tree, &input)?;
    let redeemed = input.amount;
    Ok(WithdrawInputs {
        nullifier_hash: nullifier_hash(input.nullifier),
        root: tree.root(),
        merkle_proof,
        input,
        amount: redeemed,
        recipient,
    })
}

/// `prepare_transfer(output_amount, output_commitment) -> TransferInputs`
/// (spec.md §4.G). Generates a change note for `input.amount -
/// output_amount` via the wallet's deterministic derivation, skipping it
/// when the change would be zero. `input.amount == output_amount +
/// change.amount` holds by construction (spec.md §8 invariant 7).
pub fn prepare_transfer(
    wallet: &mut WalletState,
    tree: &MerkleTree,
    output_amount: u128,
    output_commitment: Fq,
) -> Result<TransferInputs, PoolError> {
    let input = select_input(wallet, output_amount)?;
    let merkle_proof = membership_proof(tree, &input)?;
    let root = tree.root();
    let nh = nullifier_hash(input.nullifier);

    let change_amount = input.amount - output_amount;
    let change = if change_amount > 0 {
        Some(wallet.generate_note(change_amount)?)
    } else {
        None
    };

    Ok(TransferInputs {
        input,
        change,
        merkle_proof,
        root,
        nullifier_hash: nh,
        output_amount,
        output_commitment,
    })
}

/// `prepare_consolidation(notes) -> ConsolidationInputs` (spec.md §4.G):
/// merges `k >= 2` confirmed notes into one freshly derived output note for
/// the summed amount. Every per-input proof is taken against the same
/// current root.
pub fn prepare_consolidation(
    wallet: &mut WalletState,
    tree: &MerkleTree,
    commitments: &[Fq],
) -> Result<ConsolidationInputs, PoolError> {
    if commitments.len() < 2 {
        return Err(PoolError::InsufficientBalance);
    }

    let root = tree.root();
    let mut inputs = Vec::with_capacity(commitments.len());
    let mut total: u128 = 0;

    for &commitment in commitments {
        let record = wallet
            .record(commitment)
            .ok_or(PoolError::NotInTree(0))?;
        if record.status != NoteStatus::Confirmed {
            return Err(PoolError::InsufficientBalance);
        }
        let note = record.note.clone();
        let merkle_proof = membership_proof(tree, &note)?;
        total += note.amount;
        inputs.push(ConsolidationLeg {
            nullifier_hash: nullifier_hash(note.nullifier),
            merkle_proof,
            note,
        });
    }

    let output = wallet.generate_note(total)?;

    Ok(ConsolidationInputs { inputs, root, output })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed_wallet_with_notes(amounts: &[u128]) -> (WalletState, MerkleTree) {
        let mut wallet = WalletState::new(Fq::from(1u64));
        let mut tree = MerkleTree::new();
        for &amount in amounts {
            let note = wallet.generate_note(amount).unwrap();
            let idx = tree.append(note.commitment).unwrap();
            wallet.mark_confirmed(note.commitment, idx, None);
        }
        (wallet, tree)
    }

    #[test]
    fn withdraw_selects_smallest_covering_note() {
        let (wallet, tree) = confirmed_wallet_with_notes(&[10, 3, 7]);
        let inputs = prepare_withdraw(&wallet, &tree, 5, Fq::from(0xABu64)).unwrap();
        assert_eq!(inputs.input.amount, 7);
        // The whole note is redeemed, not just the requested amount: a
        // requested amount of 5 against a covering note of 7 must still
        // bind the proof's public amount to 7, never to the request.
        assert_eq!(inputs.amount, 7);
        assert!(crate::merkle::verify(inputs.input.commitment, &inputs.merkle_proof, inputs.root));
    }

    #[test]
    fn withdraw_fails_when_no_note_covers_amount() {
        let (wallet, tree) = confirmed_wallet_with_notes(&[1, 2]);
        assert!(matches!(
            prepare_withdraw(&wallet, &tree, 10, Fq::from(1u64)),
            Err(PoolError::InsufficientBalance)
        ));
    }

    #[test]
    fn transfer_produces_conserving_change() {
        let (mut wallet, tree) = confirmed_wallet_with_notes(&[10]);
        let inputs = prepare_transfer(&mut wallet, &tree, 3, Fq::from(0xDEADu64)).unwrap();
        let change = inputs.change.clone().unwrap();
        assert_eq!(change.amount, 7);
        assert_eq!(inputs.input.amount, inputs.output_amount + change.amount);
        assert_eq!(inputs.nullifier_hash, nullifier_hash(inputs.input.nullifier));
    }

    #[test]
    fn transfer_skips_change_when_exact() {
        let (mut wallet, tree) = confirmed_wallet_with_notes(&[10]);
        let inputs = prepare_transfer(&mut wallet, &tree, 10, Fq::from(1u64)).unwrap();
        assert!(inputs.change.is_none());
    }

    #[test]
    fn consolidation_sums_three_notes_into_one() {
        let (mut wallet, tree) = confirmed_wallet_with_notes(&[1, 2, 4]);
        let commitments: Vec<Fq> = wallet.confirmed_notes().map(|n| n.commitment).collect();
        let inputs = prepare_consolidation(&mut wallet, &tree, &commitments).unwrap();
        assert_eq!(inputs.inputs.len(), 3);
        assert_eq!(inputs.output.amount, 7);
        for leg in &inputs.inputs {
            assert!(crate::merkle::verify(leg.note.commitment, &leg.merkle_proof, inputs.root));
        }
    }

    #[test]
    fn consolidation_requires_at_least_two_notes() {
        let (mut wallet, tree) = confirmed_wallet_with_notes(&[1]);
        let commitments: Vec<Fq> = wallet.confirmed_notes().map(|n| n.commitment).collect();
        assert!(matches!(
            prepare_consolidation(&mut wallet, &tree, &commitments),
            Err(PoolError::InsufficientBalance)
        ));
    }
}
