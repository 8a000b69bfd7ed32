use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::commitment::CommitmentStore;
use crate::tree::MAX_DEPTH;
use crate::{AuthenticationPath, Hash32, Result, StateError};

/// A requested leaf overwrite, proven against the committed root by `path`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transition {
    pub path: AuthenticationPath,
    pub old_leaf: Hash32,
    pub new_leaf: Hash32,
}

/// Stateless verifier for single-leaf transitions.
///
/// Both the old and the new root are folded from the same siblings, so a
/// transition can be checked and applied without reading the off-chain tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionEngine {
    depth: u8,
}

impl TransitionEngine {
    pub fn new(depth: u8) -> Result<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(StateError::InvalidDepth(depth));
        }
        Ok(Self { depth })
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Check `old_leaf` against `committed_root` and return the root after
    /// replacing it with `new_leaf`.
    ///
    /// Malformed paths and root mismatches both report
    /// `StaleOrInvalidWitness`.
    pub fn verify_and_transition(
        &self,
        committed_root: Hash32,
        path: &AuthenticationPath,
        old_leaf: Hash32,
        new_leaf: Hash32,
    ) -> Result<Hash32> {
        if !path.is_well_formed() || path.depth() != self.depth as usize {
            return Err(StateError::StaleOrInvalidWitness);
        }
        if path.calculate_root(old_leaf) != committed_root {
            return Err(StateError::StaleOrInvalidWitness);
        }
        Ok(path.calculate_root(new_leaf))
    }

    /// Verify against the store's current root and commit by compare-and-set.
    pub fn apply<C: CommitmentStore + ?Sized>(&self, store: &C, transition: &Transition) -> Result<Hash32> {
        let committed = store.read();
        let new_root = self.verify_and_transition(
            committed,
            &transition.path,
            transition.old_leaf,
            transition.new_leaf,
        )?;

        if !store.compare_and_set(committed, new_root) {
            warn!(index = transition.path.leaf_index(), "transition lost compare-and-set race");
            return Err(StateError::StaleOrInvalidWitness);
        }
        Ok(new_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::InMemoryCommitmentStore;
    use crate::crypto::{hash_record, EMPTY_LEAF};
    use crate::tree::MerkleTree;

    #[test]
    fn new_root_matches_direct_update() {
        let mut tree = MerkleTree::new(8).unwrap();
        tree.set_leaf(0, hash_record(b"t", b"a")).unwrap();
        tree.set_leaf(1, hash_record(b"t", b"b")).unwrap();

        let engine = TransitionEngine::new(8).unwrap();
        let path = tree.witness(2).unwrap();
        let new_leaf = hash_record(b"t", b"c");
        let new_root = engine
            .verify_and_transition(tree.root(), &path, EMPTY_LEAF, new_leaf)
            .unwrap();

        tree.set_leaf(2, new_leaf).unwrap();
        assert_eq!(new_root, tree.root());
    }

    #[test]
    fn wrong_old_leaf_rejected() {
        let tree = MerkleTree::new(4).unwrap();
        let engine = TransitionEngine::new(4).unwrap();
        let path = tree.witness(3).unwrap();
        let err = engine
            .verify_and_transition(tree.root(), &path, [5u8; 32], [6u8; 32])
            .unwrap_err();
        assert!(matches!(err, StateError::StaleOrInvalidWitness));
    }

    #[test]
    fn wrong_depth_path_rejected() {
        let tree = MerkleTree::new(4).unwrap();
        let engine = TransitionEngine::new(8).unwrap();
        let path = tree.witness(0).unwrap();
        assert!(engine
            .verify_and_transition(tree.root(), &path, EMPTY_LEAF, [1u8; 32])
            .is_err());
    }

    #[test]
    fn apply_commits_once() {
        let tree = MerkleTree::new(4).unwrap();
        let store = InMemoryCommitmentStore::new(tree.root());
        let engine = TransitionEngine::new(4).unwrap();
        let t = Transition {
            path: tree.witness(7).unwrap(),
            old_leaf: EMPTY_LEAF,
            new_leaf: [1u8; 32],
        };

        let new_root = engine.apply(&store, &t).unwrap();
        assert_eq!(store.read(), new_root);

        // same transition again: old leaf no longer matches
        assert!(matches!(engine.apply(&store, &t), Err(StateError::StaleOrInvalidWitness)));
        assert_eq!(store.read(), new_root);
    }
}
