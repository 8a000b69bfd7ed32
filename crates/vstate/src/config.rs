use serde::{Deserialize, Serialize};

use crate::tree::MAX_DEPTH;
use crate::{Result, StateError};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Tree depth; capacity is 2^depth leaves
    pub depth: u8,
    /// Number of committed roots kept for lookup
    pub history_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { depth: 8, history_size: 100 }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 || self.depth > MAX_DEPTH {
            return Err(StateError::InvalidDepth(self.depth));
        }
        Ok(())
    }
}
