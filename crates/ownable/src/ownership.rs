//! Two-phase ownership transfer
//!
//! `owner -> pending owner -> owner`, with renounce and cancel paths.
//! The empty principal never passes a check, so once ownership is
//! renounced no owner-gated operation can succeed again.

use serde::{Deserialize, Serialize};

use crate::{OwnershipError, Principal, Result};

/// Derived view of [`Ownable`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnershipPhase {
    Owned(Principal),
    TransferPending { owner: Principal, pending_owner: Principal },
    Renounced,
}

/// Notification emitted by every successful transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipEvent {
    Renounced { previous_owner: Principal },
    TransferStarted { pending_owner: Principal },
    Accepted { new_owner: Principal },
    TransferCancelled { canceller: Principal },
}

impl OwnershipEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            OwnershipEvent::Renounced { .. } => "renounce-ownership",
            OwnershipEvent::TransferStarted { .. } => "transfer-ownership",
            OwnershipEvent::Accepted { .. } => "accept-ownership",
            OwnershipEvent::TransferCancelled { .. } => "cancel-ownership-transfer",
        }
    }

    pub fn principal(&self) -> Principal {
        match *self {
            OwnershipEvent::Renounced { previous_owner } => previous_owner,
            OwnershipEvent::TransferStarted { pending_owner } => pending_owner,
            OwnershipEvent::Accepted { new_owner } => new_owner,
            OwnershipEvent::TransferCancelled { canceller } => canceller,
        }
    }
}

/// Ownership state. Invariant: a non-empty `pending_owner` implies
/// `transfer_in_flight`, and an empty `owner` means renounced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Principal,
    pending_owner: Principal,
    transfer_in_flight: bool,
}

impl Ownable {
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            pending_owner: Principal::EMPTY,
            transfer_in_flight: false,
        }
    }

    pub fn owner(&self) -> Principal {
        self.owner
    }

    pub fn pending_owner(&self) -> Principal {
        self.pending_owner
    }

    pub fn transfer_in_flight(&self) -> bool {
        self.transfer_in_flight
    }

    pub fn phase(&self) -> OwnershipPhase {
        if self.owner.is_empty() {
            OwnershipPhase::Renounced
        } else if self.transfer_in_flight {
            OwnershipPhase::TransferPending {
                owner: self.owner,
                pending_owner: self.pending_owner,
            }
        } else {
            OwnershipPhase::Owned(self.owner)
        }
    }

    /// Gate for owner-only operations
    pub fn require_owner(&self, caller: Principal) -> Result<()> {
        crate::require_principal(caller, self.owner)
    }

    pub fn renounce_ownership(&mut self, caller: Principal) -> Result<OwnershipEvent> {
        self.require_owner(caller)?;

        let previous_owner = self.owner;
        self.owner = Principal::EMPTY;
        // a pending owner must not be able to revive a renounced ledger
        self.pending_owner = Principal::EMPTY;
        self.transfer_in_flight = false;

        Ok(OwnershipEvent::Renounced { previous_owner })
    }

    pub fn transfer_ownership(&mut self, caller: Principal, new_owner: Principal) -> Result<OwnershipEvent> {
        self.require_owner(caller)?;
        if self.transfer_in_flight || !self.pending_owner.is_empty() {
            return Err(OwnershipError::TransferAlreadyPending);
        }
        if new_owner.is_empty() {
            return Err(OwnershipError::InvalidNewOwner);
        }

        self.pending_owner = new_owner;
        self.transfer_in_flight = true;

        Ok(OwnershipEvent::TransferStarted { pending_owner: new_owner })
    }

    pub fn accept_ownership(&mut self, caller: Principal) -> Result<OwnershipEvent> {
        crate::require_principal(caller, self.pending_owner)?;
        if !self.transfer_in_flight {
            return Err(OwnershipError::NoTransferPending);
        }

        self.owner = caller;
        self.pending_owner = Principal::EMPTY;
        self.transfer_in_flight = false;

        Ok(OwnershipEvent::Accepted { new_owner: caller })
    }

    /// Either side of a pending transfer may cancel it.
    pub fn cancel_ownership_transfer(&mut self, caller: Principal) -> Result<OwnershipEvent> {
        let is_party = !caller.is_empty() && (caller == self.owner || caller == self.pending_owner);
        if !is_party {
            return Err(OwnershipError::Unauthorized);
        }
        if !self.transfer_in_flight {
            return Err(OwnershipError::NoTransferPending);
        }

        self.pending_owner = Principal::EMPTY;
        self.transfer_in_flight = false;

        Ok(OwnershipEvent::TransferCancelled { canceller: caller })
    }
}
