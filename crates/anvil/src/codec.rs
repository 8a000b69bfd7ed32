use serde::{de::DeserializeOwned, Serialize};
use vstate::{crypto, Hash32};

use crate::{AnvilError, Result};

/// A record committed as one tree leaf.
///
/// Canonical bytes are bincode; the leaf is `hash_record(TAG, bytes)`.
pub trait LeafRecord: Serialize + DeserializeOwned {
    /// Domain tag separating record kinds
    const TAG: &'static [u8];

    fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| AnvilError::Codec(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| AnvilError::Codec(e.to_string()))
    }

    fn leaf_hash(&self) -> Result<Hash32> {
        Ok(crypto::hash_record(Self::TAG, &self.encode()?))
    }
}
