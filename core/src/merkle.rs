//! Fixed-depth incremental Merkle accumulator (spec.md §4.C).
//!
//! Byte-exact parity with the on-chain accumulator matters more than raw
//! speed here: every hash goes through [`crate::field::h2`], the same
//! keccak-based pairwise hash the contract uses, so a golden-vector test can
//! assert the local root matches a known-good on-chain root after any
//! sequence of deposits.

use std::collections::{HashMap, VecDeque};

use crate::error::PoolError;
use crate::field::{h2, hash_bytes_to_field, Fq};

/// Tree depth. Fixed by the on-chain contract (spec.md §3); not
/// runtime-selectable (spec.md §1 Non-goals).
pub const DEPTH: usize = 20;

/// Leaf capacity: `2^DEPTH`.
pub const CAPACITY: u64 = 1 << DEPTH;

/// Size of the root history ring buffer (spec.md §3).
pub const HISTORY_SIZE: usize = 1000;

lazy_static::lazy_static! {
    /// `Z[0] = keccak256("anon_pool") mod P`, `Z[i+1] = H(Z[i], Z[i])`.
    /// `ZEROS[DEPTH]` is the root of a fully empty tree.
    pub static ref ZEROS: [Fq; DEPTH + 1] = {
        let mut zeros = [Fq::zero(); DEPTH + 1];
        zeros[0] = hash_bytes_to_field(b"anon_pool");
        for i in 0..DEPTH {
            zeros[i + 1] = h2(zeros[i], zeros[i]);
        }
        zeros
    };
}

/// A co-path from a leaf to the root: `DEPTH` siblings plus the left/right
/// bit at each level (spec.md §4.C).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf_index: u64,
    /// `siblings[i]` is the sibling hash at level `i`, len == DEPTH.
    pub siblings: Vec<Fq>,
    /// `indices[i] == 1` iff the node at level `i` is a right child, len == DEPTH.
    pub indices: Vec<u8>,
}

/// Recompute upward from `leaf` using `siblings`/`indices` and compare to `root`.
pub fn verify(leaf: Fq, proof: &MerkleProof, root: Fq) -> bool {
    if proof.siblings.len() != DEPTH || proof.indices.len() != DEPTH {
        return false;
    }
    let mut h = leaf;
    for level in 0..DEPTH {
        h = if proof.indices[level] == 1 {
            h2(proof.siblings[level], h)
        } else {
            h2(h, proof.siblings[level])
        };
    }
    h == root
}

/// Append-only Merkle accumulator of fixed depth [`DEPTH`].
///
/// Mirrors the on-chain contract's frontier representation: `filled[i]` is
/// the hash of the leftmost completed subtree at level `i`, so appending a
/// leaf costs exactly `DEPTH` hashes with no tree traversal.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    leaves: Vec<Fq>,
    filled: [Fq; DEPTH],
    count: u64,
    root: Fq,
    history_order: VecDeque<Fq>,
    /// Multiset of roots currently in the history window. A `HashMap<_, usize>`
    /// rather than a `HashSet` because two appends could in principle (with
    /// negligible probability) produce the same root; the counter keeps
    /// eviction correct either way.
    history_members: HashMap<Fq, usize>,
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MerkleTree {
    pub fn new() -> Self {
        let empty_root = ZEROS[DEPTH];
        let mut tree = MerkleTree {
            leaves: Vec::new(),
            filled: std::array::from_fn(|i| ZEROS[i]),
            count: 0,
            root: empty_root,
            history_order: VecDeque::with_capacity(HISTORY_SIZE),
            history_members: HashMap::new(),
        };
        tree.record_root(empty_root);
        tree
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn root(&self) -> Fq {
        self.root
    }

    /// Insert `leaf` at position `count`, updating `filled` and `root`, and
    /// record the new root in the history window. Returns the leaf's index.
    pub fn append(&mut self, leaf: Fq) -> Result<u64, PoolError> {
        if self.count >= CAPACITY {
            return Err(PoolError::TreeFull);
        }
        let index = self.count;
        self.leaves.push(leaf);

        let mut h = leaf;
        let mut current_index = index;
        for level in 0..DEPTH {
            if current_index % 2 == 0 {
                self.filled[level] = h;
                h = h2(h, ZEROS[level]);
            } else {
                h = h2(self.filled[level], h);
            }
            current_index /= 2;
        }

        self.count += 1;
        self.root = h;
        self.record_root(h);
        Ok(index)
    }

    fn record_root(&mut self, root: Fq) {
        self.history_order.push_back(root);
        *self.history_members.entry(root).or_insert(0) += 1;
        if self.history_order.len() > HISTORY_SIZE {
            if let Some(evicted) = self.history_order.pop_front() {
                if let Some(count) = self.history_members.get_mut(&evicted) {
                    *count -= 1;
                    if *count == 0 {
                        self.history_members.remove(&evicted);
                    }
                }
            }
        }
    }

    /// O(1) membership test over the last [`HISTORY_SIZE`] roots.
    pub fn root_exists(&self, root: Fq) -> bool {
        self.history_members.contains_key(&root)
    }

    /// Build a membership proof for the leaf at `leaf_index` against the
    /// *current* root. Fails with [`PoolError::NotInTree`] if the index
    /// hasn't been appended yet.
    pub fn proof(&self, leaf_index: u64) -> Result<MerkleProof, PoolError> {
        if leaf_index >= self.count {
            return Err(PoolError::NotInTree(leaf_index));
        }

        let mut siblings = Vec::with_capacity(DEPTH);
        let mut indices = Vec::with_capacity(DEPTH);
        let mut level_nodes = self.leaves.clone();
        let mut idx = leaf_index as usize;

        for level in 0..DEPTH {
            let is_right = idx % 2 == 1;
            indices.push(is_right as u8);
            let sibling_idx = if is_right { idx - 1 } else { idx + 1 };
            siblings.push(
                level_nodes
                    .get(sibling_idx)
                    .copied()
                    .unwrap_or(ZEROS[level]),
            );

            let mut next_level = Vec::with_capacity(level_nodes.len() / 2 + 1);
            let mut i = 0;
            while i < level_nodes.len() {
                let left = level_nodes[i];
                let right = level_nodes.get(i + 1).copied().unwrap_or(ZEROS[level]);
                next_level.push(h2(left, right));
                i += 2;
            }
            level_nodes = next_level;
            idx /= 2;
        }

        Ok(MerkleProof {
            leaf_index,
            siblings,
            indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_root_is_top_level_zero() {
        let tree = MerkleTree::new();
        assert_eq!(tree.root(), ZEROS[DEPTH]);
    }

    #[test]
    fn zeros_chain_is_self_consistent() {
        for i in 1..=DEPTH {
            assert_eq!(ZEROS[i], h2(ZEROS[i - 1], ZEROS[i - 1]));
        }
    }

    #[test]
    fn append_returns_sequential_indices() {
        let mut tree = MerkleTree::new();
        assert_eq!(tree.append(Fq::from(1u64)).unwrap(), 0);
        assert_eq!(tree.append(Fq::from(2u64)).unwrap(), 1);
        assert_eq!(tree.append(Fq::from(3u64)).unwrap(), 2);
    }

    #[test]
    fn root_matches_fresh_tree_over_same_leaves() {
        let leaves: Vec<Fq> = (1..=5u64).map(Fq::from).collect();

        let mut a = MerkleTree::new();
        for &leaf in &leaves {
            a.append(leaf).unwrap();
        }

        let mut b = MerkleTree::new();
        for &leaf in leaves.iter().rev() {
            // inserted in a different order, should NOT match a's root
            b.append(leaf).unwrap();
        }
        assert_ne!(a.root(), b.root());

        let mut c = MerkleTree::new();
        for &leaf in &leaves {
            c.append(leaf).unwrap();
        }
        assert_eq!(a.root(), c.root());
    }

    #[test]
    fn proof_verifies_for_every_inserted_leaf() {
        let mut tree = MerkleTree::new();
        let leaves: Vec<Fq> = (1..=7u64).map(Fq::from).collect();
        for &leaf in &leaves {
            tree.append(leaf).unwrap();
        }
        let root = tree.root();
        for (i, &leaf) in leaves.iter().enumerate() {
            let proof = tree.proof(i as u64).unwrap();
            assert!(verify(leaf, &proof, root));
        }
    }

    #[test]
    fn proof_rejects_wrong_leaf() {
        let mut tree = MerkleTree::new();
        tree.append(Fq::from(1u64)).unwrap();
        tree.append(Fq::from(2u64)).unwrap();
        let root = tree.root();
        let proof = tree.proof(0).unwrap();
        assert!(!verify(Fq::from(99u64), &proof, root));
    }

    #[test]
    fn proof_for_unknown_leaf_fails() {
        let tree = MerkleTree::new();
        assert!(matches!(tree.proof(0), Err(PoolError::NotInTree(0))));
    }

    #[test]
    fn tree_full_after_capacity_appends() {
        // DEPTH=20 makes an exhaustive fill too slow for a unit test; instead
        // poke `count` to the boundary through repeated small appends is
        // infeasible too, so this test only exercises the guard directly by
        // constructing a tree whose `count` field we can't reach normally —
        // covered instead by asserting the check fires for a tree at count==CAPACITY.
        let mut tree = MerkleTree::new();
        tree.count = CAPACITY;
        assert!(matches!(tree.append(Fq::from(1u64)), Err(PoolError::TreeFull)));
    }

    #[test]
    fn history_evicts_oldest_root_past_window() {
        let mut tree = MerkleTree::new();
        let first_root = tree.root();
        assert!(tree.root_exists(first_root));

        for i in 0..HISTORY_SIZE {
            tree.append(Fq::from(i as u64)).unwrap();
        }
        // the empty-tree root should have been evicted by now
        assert!(!tree.root_exists(first_root));

        let recent_root = tree.root();
        assert!(tree.root_exists(recent_root));
    }

    #[test]
    fn root_just_inside_window_is_known_one_older_is_not() {
        let mut tree = MerkleTree::new();
        // roots recorded: [empty, r_1, r_2, ..., r_HISTORY_SIZE] after the loop below,
        // HISTORY_SIZE + 1 total distinct append events (including the initial empty root).
        let mut roots = vec![tree.root()];
        for i in 0..HISTORY_SIZE {
            tree.append(Fq::from(i as u64)).unwrap();
            roots.push(tree.root());
        }
        // roots[0] (empty tree) is now HISTORY_SIZE+1 entries old: evicted.
        assert!(!tree.root_exists(roots[0]));
        // roots[1] is exactly HISTORY_SIZE entries old: still known.
        assert!(tree.root_exists(roots[1]));
    }
}
