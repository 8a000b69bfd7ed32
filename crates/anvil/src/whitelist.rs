use ownable::Principal;
use vstate::{crypto::EMPTY_LEAF, AuthenticationPath, CommitmentStore, Hash32, Notice, Storage, TransitionReceipt};

use crate::{CommittedLedger, LeafRecord, Result, WhitelistEntry};

/// Set of admitted addresses, one per leaf.
pub struct Whitelist<S: Storage, C: CommitmentStore> {
    ledger: CommittedLedger<S, C>,
}

impl<S: Storage, C: CommitmentStore> Whitelist<S, C> {
    pub fn new(ledger: CommittedLedger<S, C>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &CommittedLedger<S, C> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut CommittedLedger<S, C> {
        &mut self.ledger
    }

    pub fn root(&self) -> Hash32 {
        self.ledger.root()
    }

    pub fn witness(&self, index: u64) -> Result<AuthenticationPath> {
        self.ledger.witness(index)
    }

    /// Admit `address` at the empty leaf `path` points to. Owner only.
    pub fn add_address(
        &mut self,
        caller: Principal,
        address: Principal,
        path: &AuthenticationPath,
    ) -> Result<TransitionReceipt> {
        self.ledger.require_owner(caller)?;

        let entry = WhitelistEntry { address };
        let notice = Notice::new("add-address", address.0, None);
        self.ledger.apply("add-address", path, EMPTY_LEAF, &entry, Some(notice))
    }

    /// Membership check against the committed root
    pub fn is_whitelisted(&self, address: Principal, path: &AuthenticationPath) -> Result<bool> {
        let leaf = WhitelistEntry { address }.leaf_hash()?;
        Ok(path.verify(leaf, self.ledger.root()))
    }
}
