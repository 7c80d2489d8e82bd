//! Stockpile - a single entity's item storage

use crate::core::types::ContentKey;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Items held by one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Items stored: key -> (current, capacity); no capacity means unlimited
    items: AHashMap<ContentKey, (u32, Option<u32>)>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set capacity for an item
    pub fn set_capacity(&mut self, item: &ContentKey, capacity: Option<u32>) {
        let entry = self.items.entry(item.clone()).or_insert((0, None));
        entry.1 = capacity;
        if let Some(cap) = capacity {
            entry.0 = entry.0.min(cap);
        }
    }

    /// Get current quantity of an item
    pub fn get(&self, item: &str) -> u32 {
        self.items.get(item).map(|(c, _)| *c).unwrap_or(0)
    }

    pub fn capacity(&self, item: &str) -> Option<u32> {
        self.items.get(item).and_then(|(_, cap)| *cap)
    }

    /// Try to add items, returns amount actually added
    pub fn add(&mut self, item: &ContentKey, amount: u32) -> u32 {
        let entry = self.items.entry(item.clone()).or_insert((0, None));
        let space = match entry.1 {
            Some(cap) => cap.saturating_sub(entry.0),
            None => u32::MAX - entry.0,
        };
        let added = amount.min(space);
        entry.0 += added;
        added
    }

    /// Try to remove items, returns amount actually removed
    pub fn remove(&mut self, item: &str, amount: u32) -> u32 {
        if let Some(entry) = self.items.get_mut(item) {
            let removed = amount.min(entry.0);
            entry.0 -= removed;
            removed
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.values().all(|(c, _)| *c == 0)
    }

    /// Non-empty stacks
    pub fn items(&self) -> impl Iterator<Item = (&ContentKey, u32)> {
        self.items
            .iter()
            .filter(|(_, (c, _))| *c > 0)
            .map(|(k, (c, _))| (k, *c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wood() -> ContentKey {
        ContentKey::new("wood")
    }

    #[test]
    fn test_inventory_add_remove() {
        let mut inv = Inventory::new();
        inv.set_capacity(&wood(), Some(50));

        assert_eq!(inv.add(&wood(), 30), 30);
        assert_eq!(inv.get("wood"), 30);

        // Can't exceed capacity
        assert_eq!(inv.add(&wood(), 30), 20);
        assert_eq!(inv.get("wood"), 50);

        assert_eq!(inv.remove("wood", 20), 20);
        assert_eq!(inv.get("wood"), 30);

        // Never below zero
        assert_eq!(inv.remove("wood", 100), 30);
        assert_eq!(inv.get("wood"), 0);
        assert!(inv.is_empty());
    }

    #[test]
    fn test_unlimited_by_default() {
        let mut inv = Inventory::new();
        assert_eq!(inv.add(&wood(), 10_000), 10_000);
        assert_eq!(inv.capacity("wood"), None);
    }
}
