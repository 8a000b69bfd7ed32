//! Domain-separated hashing for leaves, nodes and events

use crate::Hash32;

const DOMAIN_RECORD: u8 = 0x00;
const DOMAIN_INTERNAL: u8 = 0x01;

/// Canonical empty leaf (an unoccupied index)
pub const EMPTY_LEAF: Hash32 = [0u8; 32];

/// Record leaf hash
/// leaf = H(0x00 || len(tag) || tag || record_bytes)
///
/// The tag keeps records of different kinds with identical encodings apart.
pub fn hash_record(tag: &[u8], record: &[u8]) -> Hash32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[DOMAIN_RECORD]);
    hasher.update(&(tag.len() as u32).to_le_bytes());
    hasher.update(tag);
    hasher.update(record);
    hasher.finalize().into()
}

/// Internal node hash
/// node = H(0x01 || left || right)
pub fn hash_internal(left: Hash32, right: Hash32) -> Hash32 {
    let mut data = [0u8; 1 + 32 + 32];
    data[0] = DOMAIN_INTERNAL;
    data[1..33].copy_from_slice(&left);
    data[33..].copy_from_slice(&right);
    blake3::hash(&data).into()
}

/// Hash of serialized event bytes
pub fn hash_event(event_bytes: &[u8]) -> Hash32 {
    blake3::hash(event_bytes).into()
}

/// Roots of all-empty subtrees; entry `h` is the empty subtree of height `h`.
pub fn zero_hashes(depth: u8) -> Vec<Hash32> {
    let mut zeros = Vec::with_capacity(depth as usize + 1);
    zeros.push(EMPTY_LEAF);
    for h in 0..depth as usize {
        let prev = zeros[h];
        zeros.push(hash_internal(prev, prev));
    }
    zeros
}
