//! Fixed-depth binary Merkle tree over leaf hashes

use crate::crypto;
use crate::treestore::{InMemoryTreeStore, NodeId, TreeStore};
use crate::{AuthenticationPath, Hash32, Result, StateError};

/// Deepest supported tree (2^32 leaves)
pub const MAX_DEPTH: u8 = 32;

/// Fixed-depth binary Merkle tree over leaf hashes.
///
/// The root is cached and kept equal to the hash-reduction of the current
/// leaf set: every `set_leaf` rehashes the path from that leaf upward,
/// reading siblings from the store.
pub struct MerkleTree<N: TreeStore = InMemoryTreeStore> {
    depth: u8,
    root: Hash32,
    zero_hashes: Vec<Hash32>,
    store: N,
}

impl MerkleTree<InMemoryTreeStore> {
    pub fn new(depth: u8) -> Result<Self> {
        Self::with_store(depth, InMemoryTreeStore::new())
    }

    /// Build a tree from `(index, leaf)` pairs.
    pub fn from_leaves(depth: u8, leaves: &[(u64, Hash32)]) -> Result<Self> {
        let mut tree = Self::new(depth)?;
        for (index, leaf) in leaves {
            tree.set_leaf(*index, *leaf)?;
        }
        Ok(tree)
    }
}

impl<N: TreeStore> MerkleTree<N> {
    /// Open a tree over an existing node store (empty or previously written
    /// at the same depth).
    pub fn with_store(depth: u8, store: N) -> Result<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(StateError::InvalidDepth(depth));
        }
        let zero_hashes = crypto::zero_hashes(depth);
        let root = store
            .get(&NodeId { height: depth, index: 0 })
            .unwrap_or(zero_hashes[depth as usize]);
        Ok(Self { depth, root, zero_hashes, store })
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Number of leaf slots (2^depth)
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn root(&self) -> Hash32 {
        self.root
    }

    pub fn zero_hashes(&self) -> &[Hash32] {
        &self.zero_hashes
    }

    /// Root of a tree of this depth with every leaf empty
    pub fn empty_root(&self) -> Hash32 {
        self.zero_hashes[self.depth as usize]
    }

    pub fn leaf(&self, index: u64) -> Result<Hash32> {
        self.check_index(index)?;
        Ok(self.node_or_zero(0, index))
    }

    /// Overwrite leaf `index` and return the new root.
    pub fn set_leaf(&mut self, index: u64, leaf: Hash32) -> Result<Hash32> {
        self.check_index(index)?;

        let mut current = leaf;
        let mut idx = index;
        self.put_node(NodeId { height: 0, index: idx }, current);

        for h in 0..self.depth {
            let sibling = self.node_or_zero(h, idx ^ 1);
            current = if idx & 1 == 0 {
                crypto::hash_internal(current, sibling)
            } else {
                crypto::hash_internal(sibling, current)
            };
            idx >>= 1;
            self.put_node(NodeId { height: h + 1, index: idx }, current);
        }

        self.root = current;
        Ok(current)
    }

    /// Authentication path for `index` against the current state.
    pub fn witness(&self, index: u64) -> Result<AuthenticationPath> {
        self.check_index(index)?;

        let mut siblings = Vec::with_capacity(self.depth as usize);
        let mut is_left = Vec::with_capacity(self.depth as usize);
        let mut idx = index;
        for h in 0..self.depth {
            siblings.push(self.node_or_zero(h, idx ^ 1));
            is_left.push(idx & 1 == 0);
            idx >>= 1;
        }
        Ok(AuthenticationPath { siblings, is_left })
    }

    pub fn verify(path: &AuthenticationPath, leaf: Hash32, root: Hash32) -> bool {
        path.verify(leaf, root)
    }

    fn check_index(&self, index: u64) -> Result<()> {
        if index >= self.capacity() {
            return Err(StateError::IndexOutOfRange { index, capacity: self.capacity() });
        }
        Ok(())
    }

    fn node_or_zero(&self, height: u8, index: u64) -> Hash32 {
        self.store
            .get(&NodeId { height, index })
            .unwrap_or(self.zero_hashes[height as usize])
    }

    fn put_node(&mut self, id: NodeId, hash: Hash32) {
        if hash == self.zero_hashes[id.height as usize] {
            self.store.remove(&id);
        } else {
            self.store.insert(id, hash);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> Hash32 {
        crypto::hash_record(b"test", &[n])
    }

    /// Reference root by full pairwise reduction
    fn naive_root(depth: u8, leaves: &[(u64, Hash32)]) -> Hash32 {
        let mut level = vec![crypto::EMPTY_LEAF; 1usize << depth];
        for (i, l) in leaves {
            level[*i as usize] = *l;
        }
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| crypto::hash_internal(pair[0], pair[1]))
                .collect();
        }
        level[0]
    }

    #[test]
    fn empty_tree_root_is_zero_hash() {
        let tree = MerkleTree::new(8).unwrap();
        assert_eq!(tree.capacity(), 256);
        assert_eq!(tree.root(), naive_root(8, &[]));
    }

    #[test]
    fn incremental_root_matches_full_reduction() {
        let leaves = vec![(0, leaf(1)), (5, leaf(2)), (255, leaf(3)), (5, leaf(4))];
        let tree = MerkleTree::from_leaves(8, &leaves).unwrap();
        let last_write = vec![(0, leaf(1)), (255, leaf(3)), (5, leaf(4))];
        assert_eq!(tree.root(), naive_root(8, &last_write));
    }

    #[test]
    fn out_of_range_index_rejected() {
        let mut tree = MerkleTree::new(4).unwrap();
        assert!(matches!(
            tree.set_leaf(16, leaf(1)),
            Err(StateError::IndexOutOfRange { index: 16, capacity: 16 })
        ));
        assert!(tree.witness(16).is_err());
        assert!(tree.leaf(99).is_err());
    }

    #[test]
    fn invalid_depth_rejected() {
        assert!(matches!(MerkleTree::new(0), Err(StateError::InvalidDepth(0))));
        assert!(matches!(MerkleTree::new(33), Err(StateError::InvalidDepth(33))));
    }

    #[test]
    fn witness_encodes_index() {
        let tree = MerkleTree::new(8).unwrap();
        for i in [0u64, 1, 2, 77, 255] {
            assert_eq!(tree.witness(i).unwrap().leaf_index(), i);
        }
    }

    #[test]
    fn resetting_leaf_to_empty_prunes_store() {
        let mut tree = MerkleTree::new(6).unwrap();
        let empty = tree.root();
        tree.set_leaf(9, leaf(9)).unwrap();
        tree.set_leaf(9, crypto::EMPTY_LEAF).unwrap();
        assert_eq!(tree.root(), empty);
        assert!(tree.store.is_empty());
    }

    #[test]
    fn reopen_over_existing_store_keeps_root() {
        let mut tree = MerkleTree::new(5).unwrap();
        tree.set_leaf(3, leaf(3)).unwrap();
        let root = tree.root();
        let reopened = MerkleTree::with_store(5, tree.store.clone()).unwrap();
        assert_eq!(reopened.root(), root);
        assert_eq!(reopened.leaf(3).unwrap(), leaf(3));
    }
}
