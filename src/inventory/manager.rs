//! Inventories for every entity

use crate::core::types::{ContentKey, EntityId};
use crate::inventory::stockpile::Inventory;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Quantity before and after an inventory write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemChange {
    pub old: u32,
    pub new: u32,
}

#[derive(Debug, Default)]
pub struct InventoryManager {
    inventories: AHashMap<EntityId, Inventory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub inventories: Vec<(EntityId, Inventory)>,
}

impl InventoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: EntityId) -> Option<&Inventory> {
        self.inventories.get(&owner)
    }

    pub fn quantity(&self, owner: EntityId, item: &str) -> u32 {
        self.inventories.get(&owner).map(|inv| inv.get(item)).unwrap_or(0)
    }

    pub fn set_capacity(&mut self, owner: EntityId, item: &ContentKey, capacity: Option<u32>) {
        self.inventories
            .entry(owner)
            .or_default()
            .set_capacity(item, capacity);
    }

    /// Returns the change if anything was added
    pub fn add(&mut self, owner: EntityId, item: &ContentKey, amount: u32) -> Option<ItemChange> {
        let inv = self.inventories.entry(owner).or_default();
        let old = inv.get(item.as_str());
        let added = inv.add(item, amount);
        (added > 0).then_some(ItemChange { old, new: old + added })
    }

    /// Returns the change if anything was removed
    pub fn remove(&mut self, owner: EntityId, item: &ContentKey, amount: u32) -> Option<ItemChange> {
        let inv = self.inventories.get_mut(&owner)?;
        let old = inv.get(item.as_str());
        let removed = inv.remove(item.as_str(), amount);
        (removed > 0).then_some(ItemChange { old, new: old - removed })
    }

    pub fn remove_owner(&mut self, owner: EntityId) -> Option<Inventory> {
        self.inventories.remove(&owner)
    }

    pub fn clear(&mut self) {
        self.inventories.clear();
    }

    pub fn create_snapshot(&self) -> InventorySnapshot {
        let mut inventories: Vec<(EntityId, Inventory)> = self
            .inventories
            .iter()
            .map(|(id, inv)| (*id, inv.clone()))
            .collect();
        inventories.sort_by_key(|(id, _)| *id);
        InventorySnapshot { inventories }
    }

    pub fn restore_from_snapshot(&mut self, snapshot: &InventorySnapshot) {
        self.inventories = snapshot.inventories.iter().cloned().collect();
    }
}
