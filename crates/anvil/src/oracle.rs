//! Outcome oracle for item upgrades
//!
//! The outcome is a pure function of a caller-supplied counter (typically a
//! timestamp). It is deterministic and predictable, not a source of
//! randomness.

use serde::{Deserialize, Serialize};

use crate::{AnvilError, Item, Result};

/// Residues of `counter % 10` that count as success (40%)
pub const SUCCESS_RESIDUES: [u64; 4] = [0, 3, 5, 7];

pub trait OutcomeOracle: Send + Sync {
    fn decide(&self, counter: u64) -> bool;
}

/// The 4-of-10 residue rule
#[derive(Clone, Copy, Debug, Default)]
pub struct ResidueOracle;

impl OutcomeOracle for ResidueOracle {
    fn decide(&self, counter: u64) -> bool {
        decide(counter)
    }
}

pub fn decide(counter: u64) -> bool {
    SUCCESS_RESIDUES.contains(&(counter % 10))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeOutcome {
    pub success: bool,
    pub item: Item,
}

/// Success raises the upgrade level by one; failure destroys the item.
pub fn upgrade_outcome(oracle: &dyn OutcomeOracle, item: Item, counter: u64) -> Result<UpgradeOutcome> {
    if oracle.decide(counter) {
        let upgrade = item.upgrade.checked_add(1).ok_or(AnvilError::Overflow)?;
        Ok(UpgradeOutcome { success: true, item: Item::new(item.id, upgrade) })
    } else {
        Ok(UpgradeOutcome { success: false, item: Item::EMPTY })
    }
}
