//! Item shop and forge: users buy items into inventory slots and gamble
//! on upgrading them.

use ownable::{require_principal, OwnershipError, Principal};
use serde::{Deserialize, Serialize};
use tracing::info;
use vstate::{crypto::EMPTY_LEAF, AuthenticationPath, CommitmentStore, Hash32, Notice, Storage, TransitionReceipt};

use crate::{
    upgrade_outcome, AnvilError, CommittedLedger, ItemCatalog, LeafRecord, OutcomeOracle, ResidueOracle,
    Result, Treasury, UpgradeOutcome, User,
};

/// Charged per purchase and per upgrade attempt
pub const PRICE: u64 = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpgradeReceipt {
    pub outcome: UpgradeOutcome,
    pub transition: TransitionReceipt,
}

pub struct ZkAnvil<S: Storage, C: CommitmentStore> {
    ledger: CommittedLedger<S, C>,
    treasury: Treasury,
    catalog: ItemCatalog,
    oracle: Box<dyn OutcomeOracle>,
}

impl<S: Storage, C: CommitmentStore> ZkAnvil<S, C> {
    pub fn new(ledger: CommittedLedger<S, C>) -> Self {
        Self {
            ledger,
            treasury: Treasury::default(),
            catalog: ItemCatalog::default(),
            oracle: Box::new(ResidueOracle),
        }
    }

    pub fn with_catalog(mut self, catalog: ItemCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_oracle(mut self, oracle: Box<dyn OutcomeOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn ledger(&self) -> &CommittedLedger<S, C> {
        &self.ledger
    }

    /// Ownership operations go through the underlying ledger
    pub fn ledger_mut(&mut self) -> &mut CommittedLedger<S, C> {
        &mut self.ledger
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn root(&self) -> Hash32 {
        self.ledger.root()
    }

    pub fn witness(&self, index: u64) -> Result<AuthenticationPath> {
        self.ledger.witness(index)
    }

    pub fn user(&self, index: u64) -> Result<Option<User>> {
        self.ledger.record(index)
    }

    pub fn balance(&self) -> u64 {
        self.treasury.balance()
    }

    /// Register `user` at the empty leaf `path` points to. Owner only.
    pub fn add_user(&mut self, caller: Principal, user: &User, path: &AuthenticationPath) -> Result<TransitionReceipt> {
        self.ledger.require_owner(caller)?;

        let notice = Notice::new("add-user", user.public_key.0, None);
        self.ledger.apply("add-user", path, EMPTY_LEAF, user, Some(notice))
    }

    /// Buy catalog item `item_id` into a free slot of the caller's inventory.
    pub fn buy_item(
        &mut self,
        caller: Principal,
        user: &User,
        slot: usize,
        item_id: u32,
        path: &AuthenticationPath,
    ) -> Result<TransitionReceipt> {
        require_principal(caller, user.public_key)?;

        let item = self.catalog.get(item_id)?;
        if !user.slot_check(slot)? {
            return Err(AnvilError::SlotOccupied { slot });
        }
        let balance = self.treasury.check_deposit(PRICE)?;

        let old_leaf = user.leaf_hash()?;
        let next = user.with_item(slot, item)?;
        let notice = Notice::new("buy-item", caller.0, Some(PRICE));
        let receipt = self.ledger.apply("buy-item", path, old_leaf, &next, Some(notice))?;

        self.treasury = Treasury::new(balance);
        info!(principal = %caller, slot, item_id, "item bought");
        Ok(receipt)
    }

    /// Attempt to upgrade the item in `slot`.
    ///
    /// `counter` decides the outcome; on failure the slot is emptied.
    pub fn upgrade_item(
        &mut self,
        caller: Principal,
        user: &User,
        slot: usize,
        path: &AuthenticationPath,
        counter: u64,
    ) -> Result<UpgradeReceipt> {
        require_principal(caller, user.public_key)?;

        let item = user.item(slot)?;
        if item.is_empty() {
            return Err(AnvilError::SlotEmpty { slot });
        }
        let balance = self.treasury.check_deposit(PRICE)?;

        let outcome = upgrade_outcome(self.oracle.as_ref(), item, counter)?;
        let old_leaf = user.leaf_hash()?;
        let next = user.with_item(slot, outcome.item)?;
        let notice = Notice::new("upgrade-item", caller.0, Some(PRICE));
        let transition = self.ledger.apply("upgrade-item", path, old_leaf, &next, Some(notice))?;

        self.treasury = Treasury::new(balance);
        info!(principal = %caller, slot, counter, success = outcome.success, "upgrade attempted");
        Ok(UpgradeReceipt { outcome, transition })
    }

    pub fn deposit(&mut self, caller: Principal, amount: u64) -> Result<u64> {
        if caller.is_empty() {
            return Err(OwnershipError::Unauthorized.into());
        }
        let balance = self.treasury.check_deposit(amount)?;
        self.ledger.notify("deposit", caller, Some(amount))?;
        self.treasury = Treasury::new(balance);
        info!(principal = %caller, amount, balance, "deposit");
        Ok(balance)
    }

    /// Owner only.
    pub fn withdraw(&mut self, caller: Principal, amount: u64) -> Result<u64> {
        self.ledger.require_owner(caller)?;

        let mut next = self.treasury.clone();
        let balance = next.withdraw(amount)?;
        self.ledger.notify("withdraw", caller, Some(amount))?;
        self.treasury = next;
        info!(principal = %caller, amount, balance, "withdraw");
        Ok(balance)
    }
}
