//! Spatial collaborator interface
//!
//! The kernel never moves anything itself. Movement/physics writes positions
//! through [`SpatialIndex::set_position`] (via `World::move_entity`) and the
//! kernel reads them back for range checks and area conditions.

pub mod index;
pub mod sparse_hash;

use crate::core::types::{ContentKey, EntityId, Vec2};

pub use index::{AreaShape, GridSpatialIndex};
pub use sparse_hash::SparseHashGrid;

/// Area membership change caused by a position update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaTransition {
    Entered(ContentKey),
    Exited(ContentKey),
}

/// Opaque spatial index the kernel queries
pub trait SpatialIndex {
    fn position(&self, id: EntityId) -> Option<Vec2>;

    /// Distance between two entities, if both have positions
    fn distance(&self, a: EntityId, b: EntityId) -> Option<f32> {
        Some(self.position(a)?.distance(&self.position(b)?))
    }

    fn is_in_area(&self, id: EntityId, area: &str) -> bool;

    /// Entities within `radius` of `center`, ascending by id
    fn entities_in_range(&self, center: Vec2, radius: f32) -> Vec<EntityId>;

    /// Record a new position and report area transitions
    fn set_position(&mut self, id: EntityId, pos: Vec2) -> Vec<AreaTransition>;

    fn remove(&mut self, id: EntityId);

    fn clear(&mut self);
}
