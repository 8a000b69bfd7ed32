//! Ledger facades over the authenticated state core
//!
//! Every operation has the same shape: authorize the caller, hash the old
//! record, derive the new record, hash it, and commit the pair through the
//! transition engine using the caller's authentication path.

pub mod codec;
pub mod records;
pub mod items;
pub mod oracle;
pub mod treasury;
pub mod ledger;
pub mod zkanvil;
pub mod points;
pub mod whitelist;
pub mod retry;

pub use codec::*;
pub use records::*;
pub use items::*;
pub use oracle::*;
pub use treasury::*;
pub use ledger::*;
pub use zkanvil::*;
pub use points::*;
pub use whitelist::*;
pub use retry::*;

use ownable::OwnershipError;
use thiserror::Error;
use vstate::StateError;

#[derive(Debug, Error)]
pub enum AnvilError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error("Inventory slot {slot} is occupied")]
    SlotOccupied { slot: usize },

    #[error("Inventory slot {slot} is empty")]
    SlotEmpty { slot: usize },

    #[error("Invalid inventory slot {slot}")]
    InvalidSlot { slot: usize },

    #[error("Unknown item id {0}")]
    UnknownItem(u32),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Codec error: {0}")]
    Codec(String),
}

impl AnvilError {
    /// The committed root moved or the path was wrong; refetch and resubmit.
    pub fn is_stale_witness(&self) -> bool {
        matches!(self, AnvilError::State(StateError::StaleOrInvalidWitness))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AnvilError::Ownership(OwnershipError::Unauthorized))
    }
}

pub type Result<T> = std::result::Result<T, AnvilError>;
