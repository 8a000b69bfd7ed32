use ownable::{Ownable, OwnershipEvent, Principal};
use tracing::info;
use vstate::{
    AuthenticationPath, CommitmentStore, Hash32, InMemoryCommitmentStore, LedgerConfig, Notice, StateLedger, Storage,
    TransitionReceipt,
};

use crate::{LeafRecord, Result};

/// Off-chain state, the committed root and the owner that governs them.
///
/// The facades build on this: it performs the hash/verify/commit steps and
/// the ownership transitions, and records a signed notice for each.
pub struct CommittedLedger<S: Storage, C: CommitmentStore> {
    state: StateLedger<S>,
    commitment: C,
    ownership: Ownable,
}

impl<S: Storage> CommittedLedger<S, InMemoryCommitmentStore> {
    /// Fresh ledger whose commitment starts at the empty-tree root
    pub fn in_memory(owner: Principal, storage: S, config: LedgerConfig) -> Result<Self> {
        let state = StateLedger::new(storage, config)?;
        let commitment = InMemoryCommitmentStore::new(state.root());
        Ok(Self::new(owner, state, commitment))
    }
}

impl<S: Storage, C: CommitmentStore> CommittedLedger<S, C> {
    pub fn new(owner: Principal, state: StateLedger<S>, commitment: C) -> Self {
        Self {
            state,
            commitment,
            ownership: Ownable::new(owner),
        }
    }

    /// Current committed root
    pub fn root(&self) -> Hash32 {
        self.commitment.read()
    }

    pub fn witness(&self, index: u64) -> Result<AuthenticationPath> {
        Ok(self.state.witness(index)?)
    }

    /// Decoded record at `index`, if one was committed
    pub fn record<R: LeafRecord>(&self, index: u64) -> Result<Option<R>> {
        match self.state.record(index)? {
            Some(bytes) => Ok(Some(R::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn state(&self) -> &StateLedger<S> {
        &self.state
    }

    pub fn commitment(&self) -> &C {
        &self.commitment
    }

    pub fn ownership(&self) -> &Ownable {
        &self.ownership
    }

    pub fn require_owner(&self, caller: Principal) -> Result<()> {
        Ok(self.ownership.require_owner(caller)?)
    }

    /// Hash `next`, then commit `old_leaf -> hash(next)` under `path`.
    ///
    /// `notice`, if any, is logged with the transition or not at all.
    pub fn apply<R: LeafRecord>(
        &mut self,
        operation: &str,
        path: &AuthenticationPath,
        old_leaf: Hash32,
        next: &R,
        notice: Option<Notice>,
    ) -> Result<TransitionReceipt> {
        let bytes = next.encode()?;
        let new_leaf = vstate::crypto::hash_record(R::TAG, &bytes);
        Ok(self.state.commit_with_notice(
            &self.commitment,
            operation,
            path,
            old_leaf,
            new_leaf,
            &bytes,
            notice.as_ref(),
        )?)
    }

    pub fn notify(&mut self, topic: &str, principal: Principal, amount: Option<u64>) -> Result<Hash32> {
        Ok(self.state.notify(topic, principal.0, amount)?)
    }

    pub fn renounce_ownership(&mut self, caller: Principal) -> Result<OwnershipEvent> {
        self.transition_ownership(|o| o.renounce_ownership(caller))
    }

    pub fn transfer_ownership(&mut self, caller: Principal, new_owner: Principal) -> Result<OwnershipEvent> {
        self.transition_ownership(|o| o.transfer_ownership(caller, new_owner))
    }

    pub fn accept_ownership(&mut self, caller: Principal) -> Result<OwnershipEvent> {
        self.transition_ownership(|o| o.accept_ownership(caller))
    }

    pub fn cancel_ownership_transfer(&mut self, caller: Principal) -> Result<OwnershipEvent> {
        self.transition_ownership(|o| o.cancel_ownership_transfer(caller))
    }

    fn transition_ownership<F>(&mut self, f: F) -> Result<OwnershipEvent>
    where
        F: FnOnce(&mut Ownable) -> ownable::Result<OwnershipEvent>,
    {
        // apply to a copy so a failed notice leaves ownership unchanged
        let mut next = self.ownership.clone();
        let event = f(&mut next)?;
        self.notify(event.topic(), event.principal(), None)?;
        self.ownership = next;

        info!(topic = event.topic(), principal = %event.principal(), "ownership transition");
        Ok(event)
    }
}
