//! Binary keccak Merkle tree over session and operation leaves.
//!
//! Leaves keep insertion order; parent hashing sorts each pair so inclusion
//! proofs are plain `bytes32[]` sibling lists with no position flags, matching
//! what the verifying contracts expect. An unpaired node at the end of a level
//! is promoted to the next level unchanged.

use alloy_primitives::{B256, keccak256};

/// Append-only commitment tree.
///
/// The root and proofs are computed from the live leaf set on every call, so
/// a proof is always consistent with the root at the moment it is requested.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: Vec<B256>,
}

impl MerkleTree {
    /// Create an empty tree.
    pub const fn new() -> Self {
        Self { leaves: Vec::new() }
    }

    /// Build a tree over an existing leaf set, preserving order.
    pub fn from_leaves(leaves: Vec<B256>) -> Self {
        Self { leaves }
    }

    /// Append one leaf at the next position.
    pub fn append(&mut self, leaf: B256) {
        self.leaves.push(leaf);
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns true if no leaf has been inserted.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// The leaves in insertion order.
    pub fn leaves(&self) -> &[B256] {
        &self.leaves
    }

    /// Position of the first occurrence of `leaf`, if present.
    pub fn position_of(&self, leaf: B256) -> Option<usize> {
        self.leaves.iter().position(|l| *l == leaf)
    }

    /// Current root. `B256::ZERO` for an empty tree.
    pub fn root(&self) -> B256 {
        if self.leaves.is_empty() {
            return B256::ZERO;
        }

        let mut level = self.leaves.clone();
        while level.len() > 1 {
            level = next_level(&level);
        }
        level[0]
    }

    /// Inclusion proof for the leaf at `index`, or `None` if out of bounds.
    ///
    /// The proof verifies only against the root of the tree as it stands now;
    /// it must be regenerated after any append.
    pub fn proof(&self, index: usize) -> Option<Vec<B256>> {
        if index >= self.leaves.len() {
            return None;
        }

        let mut proof = Vec::new();
        let mut level = self.leaves.clone();
        let mut idx = index;

        while level.len() > 1 {
            let sibling = idx ^ 1;
            if sibling < level.len() {
                proof.push(level[sibling]);
            }
            // else: unpaired tail node, promoted without a sibling

            level = next_level(&level);
            idx /= 2;
        }

        Some(proof)
    }
}

fn next_level(level: &[B256]) -> Vec<B256> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    for pair in level.chunks(2) {
        next.push(if pair.len() == 2 { hash_pair(pair[0], pair[1]) } else { pair[0] });
    }
    next
}

/// Commutative parent hash: the pair is sorted before hashing.
fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    keccak256([lo.as_slice(), hi.as_slice()].concat())
}

/// Verify an inclusion proof against an expected root.
pub fn verify_proof(leaf: B256, proof: &[B256], root: B256) -> bool {
    let computed = proof.iter().fold(leaf, |acc, sibling| hash_pair(acc, *sibling));
    computed == root
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf(byte: u8) -> B256 {
        keccak256([byte])
    }

    #[test]
    fn empty_tree_root_is_zero() {
        assert_eq!(MerkleTree::new().root(), B256::ZERO);
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let mut tree = MerkleTree::new();
        tree.append(leaf(1));
        assert_eq!(tree.root(), leaf(1));

        let proof = tree.proof(0).unwrap();
        assert!(proof.is_empty());
        assert!(verify_proof(leaf(1), &proof, tree.root()));
    }

    #[test]
    fn proof_verifies_for_each_index() {
        for n in 1..=9usize {
            let leaves: Vec<B256> = (0..n as u8).map(leaf).collect();
            let tree = MerkleTree::from_leaves(leaves.clone());
            let root = tree.root();

            for (i, l) in leaves.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert!(verify_proof(*l, &proof, root), "proof failed for index {i} of {n}");
            }
        }
    }

    #[test]
    fn pair_hash_is_order_independent() {
        let tree = MerkleTree::from_leaves(vec![leaf(1), leaf(2)]);
        assert_eq!(tree.root(), hash_pair(leaf(2), leaf(1)));
    }

    #[test]
    fn proof_out_of_bounds_is_none() {
        let tree = MerkleTree::from_leaves(vec![leaf(1)]);
        assert!(tree.proof(5).is_none());
        assert!(MerkleTree::new().proof(0).is_none());
    }

    #[test]
    fn stale_proof_fails_against_advanced_root() {
        let mut tree = MerkleTree::new();
        tree.append(leaf(1));
        tree.append(leaf(2));
        let old_proof = tree.proof(0).unwrap();
        let old_root = tree.root();

        tree.append(leaf(3));
        let new_root = tree.root();
        assert_ne!(old_root, new_root);

        // The pre-append proof references the old root only.
        assert!(verify_proof(leaf(1), &old_proof, old_root));
        assert!(!verify_proof(leaf(1), &old_proof, new_root));
    }

    #[test]
    fn appending_keeps_earlier_leaves_provable() {
        let mut tree = MerkleTree::new();
        for b in 0..7u8 {
            tree.append(leaf(b));
            let root = tree.root();
            // Every leaf inserted so far stays at its position and regenerated
            // proofs verify under the new root.
            for (i, l) in tree.leaves().to_vec().iter().enumerate() {
                assert_eq!(tree.position_of(*l), Some(i));
                let proof = tree.proof(i).unwrap();
                assert!(verify_proof(*l, &proof, root));
            }
        }
    }

    #[test]
    fn wrong_sibling_fails_verification() {
        let tree = MerkleTree::from_leaves(vec![leaf(1), leaf(2)]);
        let wrong = vec![leaf(9)];
        assert!(!verify_proof(leaf(1), &wrong, tree.root()));
    }

    proptest! {
        #[test]
        fn proofs_verify_for_random_leaf_sets(seed in proptest::collection::vec(any::<[u8; 32]>(), 1..32)) {
            let leaves: Vec<B256> = seed.into_iter().map(B256::from).collect();
            let tree = MerkleTree::from_leaves(leaves.clone());
            let root = tree.root();

            for (i, l) in leaves.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                prop_assert!(verify_proof(*l, &proof, root));
            }
        }

        #[test]
        fn foreign_leaf_never_verifies(seed in proptest::collection::vec(any::<[u8; 32]>(), 2..16)) {
            let leaves: Vec<B256> = seed.into_iter().map(B256::from).collect();
            let tree = MerkleTree::from_leaves(leaves.clone());
            let root = tree.root();
            let foreign = keccak256(b"not a member");
            prop_assume!(!leaves.contains(&foreign));

            for i in 0..leaves.len() {
                let proof = tree.proof(i).unwrap();
                prop_assert!(!verify_proof(foreign, &proof, root));
            }
        }
    }
}
