//! 2D spatial hash grid over the world's horizontal plane, giving O(1)
//! amortized neighbor queries. Cells are indexed by integer `(cellX, cellZ)`
//! coordinates; entities are tracked in fixed-point world units.

use std::collections::HashMap;

use crate::entity::EntityId;

pub const DEFAULT_CELL_SIZE: i32 = 10_000; // 10 m in fixed-point units (1 unit = 1 mm)

/// Reserve capacity for the scratch query buffer so repeated queries don't
/// reallocate every tick.
const QUERY_BUFFER_RESERVE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

#[derive(Debug, Default)]
struct Cell {
    entities: Vec<EntityId>,
}

/// 2D grid of cells mapping `(cellX, cellZ) -> entity handles`.
#[derive(Debug)]
pub struct SpatialHash {
    cell_size: i32,
    cells: HashMap<CellCoord, Cell>,
    /// entity -> its current cell, so `update`/`remove` don't need a scan.
    locations: HashMap<EntityId, CellCoord>,
    query_buffer: Vec<EntityId>,
}

impl SpatialHash {
    pub fn new(cell_size: i32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            locations: HashMap::new(),
            query_buffer: Vec::with_capacity(QUERY_BUFFER_RESERVE),
        }
    }

    pub fn cell_coord(&self, x: i32, z: i32) -> CellCoord {
        CellCoord {
            x: x.div_euclid(self.cell_size),
            z: z.div_euclid(self.cell_size),
        }
    }

    /// O(1) amortized. Idempotent: re-inserting an entity already in its
    /// cell is a no-op.
    pub fn insert(&mut self, e: EntityId, x: i32, z: i32) {
        let coord = self.cell_coord(x, z);
        if let Some(existing) = self.locations.get(&e) {
            if *existing == coord {
                return;
            }
        }
        self.remove(e);
        let cell = self.cells.entry(coord).or_default();
        if !cell.entities.contains(&e) {
            cell.entities.push(e);
        }
        self.locations.insert(e, coord);
    }

    pub fn remove(&mut self, e: EntityId) {
        if let Some(coord) = self.locations.remove(&e) {
            if let Some(cell) = self.cells.get_mut(&coord) {
                cell.entities.retain(|&id| id != e);
            }
        }
    }

    /// O(1) when the cell is unchanged; otherwise one removal + one insertion.
    pub fn update(&mut self, e: EntityId, new_x: i32, new_z: i32) {
        self.insert(e, new_x, new_z);
    }

    /// Returns entities in all cells intersecting the disc of radius `r`,
    /// in cell-iteration order (not distance-sorted — sort is the caller's
    /// job). The hash does not re-verify that returned entities still
    /// exist; the caller must do so.
    pub fn query(&mut self, x: i32, z: i32, r: i32) -> &[EntityId] {
        self.query_buffer.clear();
        let min = self.cell_coord(x - r, z - r);
        let max = self.cell_coord(x + r, z + r);
        for cx in min.x..=max.x {
            for cz in min.z..=max.z {
                if let Some(cell) = self.cells.get(&CellCoord { x: cx, z: cz }) {
                    self.query_buffer.extend_from_slice(&cell.entities);
                }
            }
        }
        &self.query_buffer
    }

    /// Empties cells but preserves the cell map to amortize allocations
    /// across ticks.
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.entities.clear();
        }
        self.locations.clear();
    }

    pub fn cell_count(&self) -> usize {
        self.cells.iter().filter(|(_, c)| !c.entities.is_empty()).count()
    }

    pub fn total_entity_count(&self) -> usize {
        self.locations.len()
    }

    pub fn average_entities_per_cell(&self) -> f32 {
        let occupied = self.cell_count();
        if occupied == 0 {
            return 0.0;
        }
        self.total_entity_count() as f32 / occupied as f32
    }

    /// Budget check: a 1000-entity zone must keep this under 16 after
    /// tuning `cellSize`.
    pub fn is_within_budget(&self, max_avg_per_cell: f32) -> bool {
        self.average_entities_per_cell() < max_avg_per_cell
    }

    pub fn location_of(&self, e: EntityId) -> Option<CellCoord> {
        self.locations.get(&e).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut hash = SpatialHash::new(1000);
        hash.insert(1, 0, 0);
        hash.insert(1, 0, 0);
        assert_eq!(hash.total_entity_count(), 1);
        assert_eq!(hash.query(0, 0, 500).len(), 1);
    }

    #[test]
    fn update_moves_between_cells() {
        let mut hash = SpatialHash::new(1000);
        hash.insert(1, 0, 0);
        hash.update(1, 10_000, 10_000);
        assert_eq!(hash.query(0, 0, 400), &[] as &[EntityId]);
        assert_eq!(hash.query(10_000, 10_000, 400), &[1]);
    }

    #[test]
    fn query_returns_neighbors_within_radius() {
        let mut hash = SpatialHash::new(1000);
        hash.insert(1, 0, 0);
        hash.insert(2, 500, 500);
        hash.insert(3, 50_000, 50_000);
        let found = hash.query(0, 0, 2000).to_vec();
        assert!(found.contains(&1));
        assert!(found.contains(&2));
        assert!(!found.contains(&3));
    }

    #[test]
    fn clear_preserves_cell_map_but_empties_entities() {
        let mut hash = SpatialHash::new(1000);
        hash.insert(1, 0, 0);
        hash.clear();
        assert_eq!(hash.total_entity_count(), 0);
        assert_eq!(hash.query(0, 0, 500).len(), 0);
    }

    #[test]
    fn every_entity_in_exactly_one_cell() {
        let mut hash = SpatialHash::new(1000);
        hash.insert(1, 0, 0);
        hash.update(1, 100, 100);
        hash.update(1, 5000, 5000);
        let loc = hash.location_of(1).unwrap();
        assert_eq!(loc, hash.cell_coord(5000, 5000));
    }

    #[test]
    fn budget_check_against_average() {
        let mut hash = SpatialHash::new(10_000);
        // All 100 entities packed into one cell: average is 100, over budget.
        for i in 0..100 {
            hash.insert(i, 0, 0);
        }
        assert!(!hash.is_within_budget(16.0));
    }
}
