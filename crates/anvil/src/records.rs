use ownable::Principal;
use serde::{Deserialize, Serialize};

use crate::{AnvilError, LeafRecord, Result};

/// Inventory slots per user
pub const SLOT_COUNT: usize = 6;

/// An inventory item. `id == 0` is the empty slot, never a real item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub upgrade: u32,
}

impl Item {
    pub const EMPTY: Item = Item { id: 0, upgrade: 0 };

    pub fn new(id: u32, upgrade: u32) -> Self {
        Self { id, upgrade }
    }

    pub fn is_empty(&self) -> bool {
        self.id == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub public_key: Principal,
    pub items: [Item; SLOT_COUNT],
}

impl User {
    pub fn new(public_key: Principal) -> Self {
        Self {
            public_key,
            items: [Item::EMPTY; SLOT_COUNT],
        }
    }

    pub fn item(&self, slot: usize) -> Result<Item> {
        self.items.get(slot).copied().ok_or(AnvilError::InvalidSlot { slot })
    }

    /// `true` when `slot` holds no item
    pub fn slot_check(&self, slot: usize) -> Result<bool> {
        Ok(self.item(slot)?.is_empty())
    }

    /// Copy of this user with `slot` replaced; `self` is left untouched.
    pub fn with_item(&self, slot: usize, item: Item) -> Result<User> {
        let mut next = self.clone();
        let entry = next.items.get_mut(slot).ok_or(AnvilError::InvalidSlot { slot })?;
        *entry = item;
        Ok(next)
    }
}

impl LeafRecord for User {
    const TAG: &'static [u8] = b"anvil:user";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub public_key: Principal,
    pub points: u32,
}

impl Account {
    pub fn new(public_key: Principal) -> Self {
        Self { public_key, points: 0 }
    }

    pub fn with_added_points(&self, points: u32) -> Result<Account> {
        Ok(Account {
            public_key: self.public_key,
            points: self.points.checked_add(points).ok_or(AnvilError::Overflow)?,
        })
    }
}

impl LeafRecord for Account {
    const TAG: &'static [u8] = b"points:account";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub address: Principal,
}

impl LeafRecord for WhitelistEntry {
    const TAG: &'static [u8] = b"whitelist:entry";
}
