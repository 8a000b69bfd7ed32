use std::collections::BTreeMap;

use crate::{AnvilError, Item, Result};

pub const RAPTOR: u32 = 1001;
pub const SHARD: u32 = 2001;
pub const ELIXIR_STAFF: u32 = 3001;
pub const DREAD_SHIELD: u32 = 4001;

#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub name: String,
    pub item: Item,
}

/// Items offered by the shop, keyed by id
#[derive(Clone, Debug)]
pub struct ItemCatalog {
    entries: BTreeMap<u32, CatalogEntry>,
}

impl ItemCatalog {
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Register an item; id 0 is reserved for the empty slot.
    pub fn insert(&mut self, name: impl Into<String>, item: Item) -> Result<()> {
        if item.is_empty() {
            return Err(AnvilError::UnknownItem(item.id));
        }
        self.entries.insert(item.id, CatalogEntry { name: name.into(), item });
        Ok(())
    }

    pub fn get(&self, id: u32) -> Result<Item> {
        self.entries.get(&id).map(|e| e.item).ok_or(AnvilError::UnknownItem(id))
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}

impl Default for ItemCatalog {
    /// The four shop items, each sold at upgrade level 1
    fn default() -> Self {
        let entries = [
            (RAPTOR, "Raptor"),
            (SHARD, "Shard"),
            (ELIXIR_STAFF, "Elixir Staff"),
            (DREAD_SHIELD, "Dread Shield"),
        ]
        .into_iter()
        .map(|(id, name)| (id, CatalogEntry { name: name.to_string(), item: Item::new(id, 1) }))
        .collect();
        Self { entries }
    }
}
