//! Sparse node storage for the tree, keyed by level and position

use crate::Hash32;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct NodeId {
    /// 0 = leaf, depth = root
    pub height: u8,
    /// Position within the level, counted from the left
    pub index: u64,
}

/// Backing store for the off-chain tree. Only non-empty nodes are kept.
pub trait TreeStore: Send + Sync {
    fn get(&self, id: &NodeId) -> Option<Hash32>;
    fn insert(&mut self, id: NodeId, hash: Hash32);
    fn remove(&mut self, id: &NodeId);
}

/// Simple in-memory store
#[derive(Default, Clone)]
pub struct InMemoryTreeStore {
    nodes: HashMap<NodeId, Hash32>,
}

impl InMemoryTreeStore {
    pub fn new() -> Self {
        Self { nodes: HashMap::new() }
    }

    /// Only for tests / debugging
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl TreeStore for InMemoryTreeStore {
    fn get(&self, id: &NodeId) -> Option<Hash32> {
        self.nodes.get(id).copied()
    }

    fn insert(&mut self, id: NodeId, hash: Hash32) {
        self.nodes.insert(id, hash);
    }

    fn remove(&mut self, id: &NodeId) {
        self.nodes.remove(id);
    }
}
