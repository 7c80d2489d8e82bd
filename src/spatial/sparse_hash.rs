//! Sparse hash grid for efficient spatial queries

use ahash::AHashMap;
use crate::core::types::{EntityId, Vec2};

/// Sparse hash grid bucketing entity ids by cell
#[derive(Debug, Clone)]
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<EntityId>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            cells: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, entity: EntityId, pos: Vec2) {
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push(entity);
    }

    pub fn remove(&mut self, entity: EntityId, pos: Vec2) {
        let coord = self.cell_coord(pos);
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.retain(|&e| e != entity);
            if cell.is_empty() {
                self.cells.remove(&coord);
            }
        }
    }

    /// Candidates in every cell overlapping the radius' bounding box
    pub fn query_candidates(&self, center: Vec2, radius: f32) -> impl Iterator<Item = EntityId> + '_ {
        let r = radius.max(0.0);
        let (min_x, min_y) = self.cell_coord(Vec2::new(center.x - r, center.y - r));
        let (max_x, max_y) = self.cell_coord(Vec2::new(center.x + r, center.y + r));

        (min_x..=max_x).flat_map(move |cx| {
            (min_y..=max_y).flat_map(move |cy| {
                self.cells.get(&(cx, cy))
                    .into_iter()
                    .flatten()
                    .copied()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_cover_radius() {
        let mut grid = SparseHashGrid::new(10.0);
        grid.insert(EntityId(1), Vec2::new(5.0, 5.0));
        grid.insert(EntityId(2), Vec2::new(35.0, 5.0));
        grid.insert(EntityId(3), Vec2::new(-15.0, 5.0));

        let near: Vec<EntityId> = grid.query_candidates(Vec2::new(0.0, 0.0), 20.0).collect();
        assert!(near.contains(&EntityId(1)));
        assert!(near.contains(&EntityId(3)));
        assert!(!near.contains(&EntityId(2)));
    }

    #[test]
    fn test_remove() {
        let mut grid = SparseHashGrid::new(10.0);
        grid.insert(EntityId(1), Vec2::new(5.0, 5.0));
        grid.remove(EntityId(1), Vec2::new(5.0, 5.0));
        assert_eq!(grid.query_candidates(Vec2::new(5.0, 5.0), 1.0).count(), 0);
    }
}
