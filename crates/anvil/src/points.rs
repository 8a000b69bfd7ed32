use ownable::Principal;
use vstate::{crypto::EMPTY_LEAF, AuthenticationPath, CommitmentStore, Hash32, Storage, TransitionReceipt};

use crate::{Account, CommittedLedger, LeafRecord, Result};

/// Points awarded per `increase_points`
pub const POINT_STEP: u32 = 1;

/// Per-account point balances, awarded by the ledger owner.
pub struct PointsLedger<S: Storage, C: CommitmentStore> {
    ledger: CommittedLedger<S, C>,
}

impl<S: Storage, C: CommitmentStore> PointsLedger<S, C> {
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

    pub fn account(&self, index: u64) -> Result<Option<Account>> {
        self.ledger.record(index)
    }

    /// Register `account` at an empty leaf.
    pub fn add_account(
        &mut self,
        caller: Principal,
        account: &Account,
        path: &AuthenticationPath,
    ) -> Result<TransitionReceipt> {
        self.ledger.require_owner(caller)?;
        self.ledger.apply("add-account", path, EMPTY_LEAF, account, None)
    }

    pub fn increase_points(
        &mut self,
        caller: Principal,
        account: &Account,
        path: &AuthenticationPath,
    ) -> Result<TransitionReceipt> {
        self.ledger.require_owner(caller)?;

        let old_leaf = account.leaf_hash()?;
        let next = account.with_added_points(POINT_STEP)?;
        self.ledger.apply("increase-points", path, old_leaf, &next, None)
    }
}
