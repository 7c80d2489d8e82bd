//! Bundled spatial index: positions, range queries and named areas

use crate::core::types::{ContentKey, EntityId, Vec2};
use crate::spatial::sparse_hash::SparseHashGrid;
use crate::spatial::{AreaTransition, SpatialIndex};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Geometry of a named area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AreaShape {
    Circle { center: Vec2, radius: f32 },
    Rect { min: Vec2, max: Vec2 },
}

impl AreaShape {
    pub fn contains(&self, pos: Vec2) -> bool {
        match self {
            AreaShape::Circle { center, radius } => center.distance(&pos) <= *radius,
            AreaShape::Rect { min, max } => {
                pos.x >= min.x && pos.x <= max.x && pos.y >= min.y && pos.y <= max.y
            }
        }
    }
}

/// Grid-backed [`SpatialIndex`]
#[derive(Debug, Clone)]
pub struct GridSpatialIndex {
    grid: SparseHashGrid,
    positions: AHashMap<EntityId, Vec2>,
    areas: Vec<(ContentKey, AreaShape)>,
}

impl GridSpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            grid: SparseHashGrid::new(cell_size),
            positions: AHashMap::new(),
            areas: Vec::new(),
        }
    }

    /// Define or redefine a named area
    pub fn define_area(&mut self, key: &str, shape: AreaShape) {
        if let Some(slot) = self.areas.iter_mut().find(|(k, _)| k.as_str() == key) {
            slot.1 = shape;
        } else {
            self.areas.push((ContentKey::new(key), shape));
        }
    }

    fn area_contains(&self, area: &str, pos: Vec2) -> bool {
        self.areas
            .iter()
            .any(|(k, shape)| k.as_str() == area && shape.contains(pos))
    }
}

impl SpatialIndex for GridSpatialIndex {
    fn position(&self, id: EntityId) -> Option<Vec2> {
        self.positions.get(&id).copied()
    }

    fn is_in_area(&self, id: EntityId, area: &str) -> bool {
        self.position(id)
            .is_some_and(|pos| self.area_contains(area, pos))
    }

    fn entities_in_range(&self, center: Vec2, radius: f32) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .grid
            .query_candidates(center, radius)
            .filter(|id| {
                self.positions
                    .get(id)
                    .is_some_and(|pos| center.distance(pos) <= radius)
            })
            .collect();
        found.sort();
        found
    }

    fn set_position(&mut self, id: EntityId, pos: Vec2) -> Vec<AreaTransition> {
        let old = self.positions.insert(id, pos);
        if let Some(old_pos) = old {
            self.grid.remove(id, old_pos);
        }
        self.grid.insert(id, pos);

        let mut transitions = Vec::new();
        for (key, shape) in &self.areas {
            let was_in = old.is_some_and(|p| shape.contains(p));
            let is_in = shape.contains(pos);
            match (was_in, is_in) {
                (false, true) => transitions.push(AreaTransition::Entered(key.clone())),
                (true, false) => transitions.push(AreaTransition::Exited(key.clone())),
                _ => {}
            }
        }
        transitions
    }

    fn remove(&mut self, id: EntityId) {
        if let Some(pos) = self.positions.remove(&id) {
            self.grid.remove(id, pos);
        }
    }

    fn clear(&mut self) {
        self.positions.clear();
        self.grid.clear();
    }
}
