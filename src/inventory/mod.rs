//! Per-entity item storage

pub mod manager;
pub mod stockpile;

pub use manager::{InventoryManager, InventorySnapshot, ItemChange};
pub use stockpile::Inventory;
