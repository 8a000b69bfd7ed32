//! Core types for the authenticated state ledger

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::tree::MAX_DEPTH;

/// 32-byte hash
pub type Hash32 = [u8; 32];

/// Authentication path (witness) for a single leaf.
///
/// Both vectors are ordered leaf-to-root and have one entry per tree level.
/// A path is a snapshot: it only verifies against the tree state it was
/// taken from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticationPath {
    /// Sibling hashes from leaf to root
    pub siblings: Vec<Hash32>,
    /// `true` when the node on the path is the left child at that level
    pub is_left: Vec<bool>,
}

impl AuthenticationPath {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_well_formed(&self) -> bool {
        self.siblings.len() == self.is_left.len() && self.siblings.len() <= MAX_DEPTH as usize
    }

    /// Leaf index encoded by the direction bits.
    ///
    /// Bits past the 64th are ignored; only a well-formed path encodes a
    /// real index.
    pub fn leaf_index(&self) -> u64 {
        self.is_left
            .iter()
            .take(u64::BITS as usize)
            .enumerate()
            .filter(|(_, left)| !**left)
            .fold(0u64, |acc, (h, _)| acc | (1u64 << h))
    }

    /// Fold `leaf` with the siblings bottom-up.
    pub fn calculate_root(&self, leaf: Hash32) -> Hash32 {
        self.siblings
            .iter()
            .zip(&self.is_left)
            .fold(leaf, |current, (sibling, left)| {
                if *left {
                    crypto::hash_internal(current, *sibling)
                } else {
                    crypto::hash_internal(*sibling, current)
                }
            })
    }

    pub fn verify(&self, leaf: Hash32, root: Hash32) -> bool {
        self.is_well_formed() && self.calculate_root(leaf) == root
    }
}

/// Receipt for a committed transition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionReceipt {
    pub index: u64,
    pub old_leaf: Hash32,
    pub new_leaf: Hash32,
    pub old_root: Hash32,
    pub new_root: Hash32,
    pub event_hash: Hash32,
    pub signature: Vec<u8>,
}

/// Off-chain copy of a committed leaf and the record it hashes
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredLeaf {
    pub leaf: Hash32,
    pub record: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    pub state_root: Hash32,
    pub latest_event_hash: Hash32,
}

/// Authentication path with empty-subtree siblings elided
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompressedPath {
    pub depth: u8,
    pub index: u64,
    pub bitmap: Vec<u8>,       // bit h set => siblings carries level h
    pub siblings: Vec<Hash32>, // only non-empty siblings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_index_from_direction_bits() {
        let path = AuthenticationPath {
            siblings: vec![[0u8; 32]; 4],
            is_left: vec![true, false, true, false],
        };
        assert_eq!(path.leaf_index(), 0b1010);
    }

    #[test]
    fn mismatched_lengths_never_verify() {
        let path = AuthenticationPath {
            siblings: vec![[0u8; 32]; 3],
            is_left: vec![true, true],
        };
        let root = path.calculate_root([7u8; 32]);
        assert!(!path.verify([7u8; 32], root));
    }

    #[test]
    fn oversized_direction_bits_do_not_overflow() {
        let path = AuthenticationPath {
            siblings: vec![[0u8; 32]; 8],
            is_left: vec![false; 70],
        };
        assert!(!path.is_well_formed());
        assert_eq!(path.leaf_index(), u64::MAX);
    }
}
