//! Zone rectangles and the world partition grid: position → owning-zone
//! lookup used by the handoff controller's target-zone projection.

use crate::fixed::FixedVec3;

pub type ZoneId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Rect {
    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new((self.min_x + self.max_x) / 2.0, (self.min_z + self.max_z) / 2.0)
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    pub fn contains_with_buffer(&self, x: f32, z: f32, buffer: f32) -> bool {
        x >= self.min_x - buffer && x <= self.max_x + buffer && z >= self.min_z - buffer && z <= self.max_z + buffer
    }

    /// Distance from `(x, z)` to the nearest edge; negative if inside.
    pub fn distance_to_edge(&self, x: f32, z: f32) -> f32 {
        let dx = (self.min_x - x).max(x - self.max_x);
        let dz = (self.min_z - z).max(z - self.max_z);
        if dx <= 0.0 && dz <= 0.0 {
            dx.max(dz) // inside: negative, magnitude is distance to nearest edge
        } else {
            (dx.max(0.0).powi(2) + dz.max(0.0).powi(2)).sqrt()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZoneDefinition {
    pub zone_id: ZoneId,
    pub name: String,
    pub bounds: Rect,
    pub adjacent_zones: Vec<ZoneId>,
    pub host: String,
    pub port: u16,
}

impl ZoneDefinition {
    pub fn contains_position(&self, pos: FixedVec3) -> bool {
        self.bounds.contains(crate::fixed::to_float(pos.x), crate::fixed::to_float(pos.z))
    }

    pub fn is_in_aura_buffer(&self, pos: FixedVec3, aura_buffer: f32) -> bool {
        let x = crate::fixed::to_float(pos.x);
        let z = crate::fixed::to_float(pos.z);
        self.bounds.contains_with_buffer(x, z, aura_buffer) && !self.bounds.contains(x, z)
    }
}

/// A rectangular grid of zones covering the world, built so adjacent cells
/// share an edge. Used to answer "which zone owns this point" in O(1).
#[derive(Debug, Clone)]
pub struct WorldPartition {
    zones: Vec<ZoneDefinition>,
}

impl WorldPartition {
    /// Builds a `cols x rows` grid of equal-size zones covering `world`.
    pub fn create_grid(world: Rect, cols: u32, rows: u32, base_port: u16) -> Self {
        let width = (world.max_x - world.min_x) / cols as f32;
        let height = (world.max_z - world.min_z) / rows as f32;
        let mut zones = Vec::with_capacity((cols * rows) as usize);

        for row in 0..rows {
            for col in 0..cols {
                let zone_id = row * cols + col;
                let min_x = world.min_x + col as f32 * width;
                let min_z = world.min_z + row as f32 * height;
                let bounds = Rect { min_x, max_x: min_x + width, min_z, max_z: min_z + height };

                let mut adjacent = Vec::new();
                if col > 0 {
                    adjacent.push(zone_id - 1);
                }
                if col + 1 < cols {
                    adjacent.push(zone_id + 1);
                }
                if row > 0 {
                    adjacent.push(zone_id - cols);
                }
                if row + 1 < rows {
                    adjacent.push(zone_id + cols);
                }

                zones.push(ZoneDefinition {
                    zone_id,
                    name: format!("zone-{row}-{col}"),
                    bounds,
                    adjacent_zones: adjacent,
                    host: "127.0.0.1".to_string(),
                    port: base_port + zone_id as u16,
                });
            }
        }

        Self { zones }
    }

    pub fn zone(&self, id: ZoneId) -> Option<&ZoneDefinition> {
        self.zones.iter().find(|z| z.zone_id == id)
    }

    pub fn find_zone_for_position(&self, pos: FixedVec3) -> Option<ZoneId> {
        self.zones.iter().find(|z| z.contains_position(pos)).map(|z| z.zone_id)
    }

    pub fn find_zones_with_aura_overlap(&self, pos: FixedVec3, aura_buffer: f32) -> Vec<ZoneId> {
        self.zones.iter().filter(|z| z.is_in_aura_buffer(pos, aura_buffer)).map(|z| z.zone_id).collect()
    }

    pub fn zones(&self) -> &[ZoneDefinition] {
        &self.zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> Rect {
        Rect { min_x: -100.0, max_x: 100.0, min_z: -100.0, max_z: 100.0 }
    }

    #[test]
    fn grid_partitions_cover_whole_world() {
        let partition = WorldPartition::create_grid(world(), 2, 2, 8000);
        assert_eq!(partition.zones().len(), 4);
        let id = partition.find_zone_for_position(FixedVec3::from_float(-50.0, 0.0, -50.0));
        assert_eq!(id, Some(0));
        let id = partition.find_zone_for_position(FixedVec3::from_float(50.0, 0.0, 50.0));
        assert_eq!(id, Some(3));
    }

    #[test]
    fn adjacent_zones_share_an_edge() {
        let partition = WorldPartition::create_grid(world(), 2, 2, 8000);
        let zone0 = partition.zone(0).unwrap();
        assert!(zone0.adjacent_zones.contains(&1));
        assert!(zone0.adjacent_zones.contains(&2));
    }

    #[test]
    fn aura_overlap_detected_near_boundary() {
        let partition = WorldPartition::create_grid(world(), 2, 1, 8000);
        // boundary between zone 0 (x in [-100,0]) and zone 1 (x in [0,100]) is x=0.
        let overlapping = partition.find_zones_with_aura_overlap(FixedVec3::from_float(5.0, 0.0, 0.0), 10.0);
        assert!(overlapping.contains(&0));
    }
}
