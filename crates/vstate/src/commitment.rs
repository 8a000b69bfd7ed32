//! Commitment store: the single tamper-evident root value

use std::sync::{Arc, RwLock};

use crate::Hash32;

/// Holds exactly one root and replaces it only by compare-and-set.
pub trait CommitmentStore: Send + Sync {
    fn read(&self) -> Hash32;

    /// Replace the root with `new_root` iff it still equals `expected`.
    fn compare_and_set(&self, expected: Hash32, new_root: Hash32) -> bool;
}

/// In-memory commitment (for tests and demos). Clones share the same root.
#[derive(Clone, Debug)]
pub struct InMemoryCommitmentStore {
    root: Arc<RwLock<Hash32>>,
}

impl InMemoryCommitmentStore {
    pub fn new(initial_root: Hash32) -> Self {
        Self {
            root: Arc::new(RwLock::new(initial_root)),
        }
    }
}

impl CommitmentStore for InMemoryCommitmentStore {
    fn read(&self) -> Hash32 {
        // a poisoned lock still guards a valid Copy value
        *self.root.read().unwrap_or_else(|e| e.into_inner())
    }

    fn compare_and_set(&self, expected: Hash32, new_root: Hash32) -> bool {
        let mut root = self.root.write().unwrap_or_else(|e| e.into_inner());
        if *root != expected {
            return false;
        }
        *root = new_root;
        true
    }
}
