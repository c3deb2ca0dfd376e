//! Replication optimizer: per-viewer prioritized, distance-tiered,
//! rate-gated visibility lists feeding the delta snapshot codec.

use std::collections::HashMap;

use crate::config::ReplicationConfig;
use crate::entity::EntityId;
use crate::fixed::FixedVec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Near = 0,
    Mid = 1,
    Far = 2,
}

impl Tier {
    pub fn rate_hz(self, cfg: &ReplicationConfig) -> u32 {
        match self {
            Tier::Near => cfg.near_rate_hz,
            Tier::Mid => cfg.mid_rate_hz,
            Tier::Far => cfg.far_rate_hz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityEntry {
    pub entity: EntityId,
    pub tier: Tier,
    pub distance_sq: i64,
}

/// Assigns a tier by distance, or `None` if beyond `far_radius` (boundary:
/// exactly at `far_radius` is visible, `far_radius + ε` is not).
pub fn tier_for_distance(distance: f32, cfg: &ReplicationConfig) -> Option<Tier> {
    if distance <= cfg.near_radius {
        Some(Tier::Near)
    } else if distance <= cfg.mid_radius {
        Some(Tier::Mid)
    } else if distance <= cfg.far_radius {
        Some(Tier::Far)
    } else {
        None
    }
}

/// Builds the viewer's prioritized visibility list from spatial-hash query
/// results: assigns tiers, sorts by `(tier, distance²)`, truncates to
/// `max_entities_per_snapshot`.
pub fn calculate_priorities(
    viewer_pos: FixedVec3,
    candidates: &[(EntityId, FixedVec3)],
    cfg: &ReplicationConfig,
) -> Vec<PriorityEntry> {
    let far_fixed = (cfg.far_radius * crate::fixed::FLOAT_TO_FIXED as f32) as i64;
    let mut entries: Vec<PriorityEntry> = candidates
        .iter()
        .filter_map(|&(id, pos)| {
            let dist_sq = viewer_pos.distance_squared_xz(pos);
            if dist_sq > far_fixed * far_fixed {
                return None;
            }
            let dist = (dist_sq as f64).sqrt() as f32 / crate::fixed::FLOAT_TO_FIXED as f32;
            tier_for_distance(dist, cfg).map(|tier| PriorityEntry { entity: id, tier, distance_sq: dist_sq })
        })
        .collect();
    entries.sort_by(|a, b| a.tier.cmp(&b.tier).then(a.distance_sq.cmp(&b.distance_sq)));
    entries.truncate(cfg.max_entities_per_snapshot);
    entries
}

/// Which of a tier's fields are culled from the payload (spec §4.7 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCulling {
    pub include_animation: bool,
    pub include_rotation: bool,
    pub position_and_health_only: bool,
}

pub fn field_culling_for_tier(tier: Tier) -> FieldCulling {
    match tier {
        Tier::Near => FieldCulling { include_animation: true, include_rotation: true, position_and_health_only: false },
        Tier::Mid => FieldCulling { include_animation: false, include_rotation: true, position_and_health_only: false },
        Tier::Far => FieldCulling { include_animation: false, include_rotation: false, position_and_health_only: true },
    }
}

/// Per-(connection, entity) last-update-tick tracking, so the rate filter
/// can suppress redundant sends beyond the raw `tick % (rate_divisor)`
/// check.
#[derive(Debug, Default)]
pub struct ReplicationTracker {
    last_update_tick: HashMap<(u32, EntityId), u64>,
}

impl ReplicationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `tick % (tick_rate_hz / tier_rate_hz) == 0` honors the tier's rate.
    pub fn needs_update(&self, connection_id: u32, entity: EntityId, tier: Tier, tick: u64, tick_rate_hz: u32, cfg: &ReplicationConfig) -> bool {
        let rate = tier.rate_hz(cfg).max(1);
        let divisor = (tick_rate_hz / rate).max(1) as u64;
        if tick % divisor != 0 {
            return false;
        }
        match self.last_update_tick.get(&(connection_id, entity)) {
            Some(&last) => last != tick,
            None => true,
        }
    }

    pub fn mark_updated(&mut self, connection_id: u32, entity: EntityId, tick: u64) {
        self.last_update_tick.insert((connection_id, entity), tick);
    }

    /// Purges all of one client's tracking entries on disconnect.
    pub fn remove_client(&mut self, connection_id: u32) {
        self.last_update_tick.retain(|(conn, _), _| *conn != connection_id);
    }

    /// Purges every client's entry for a destroyed entity.
    pub fn remove_entity(&mut self, entity: EntityId) {
        self.last_update_tick.retain(|(_, e), _| *e != entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn far_boundary_visible_exactly_at_radius() {
        let cfg = ReplicationConfig::default();
        assert_eq!(tier_for_distance(cfg.far_radius, &cfg), Some(Tier::Far));
        assert_eq!(tier_for_distance(cfg.far_radius + 0.01, &cfg), None);
    }

    #[test]
    fn priorities_sorted_by_tier_then_distance() {
        let cfg = ReplicationConfig::default();
        let viewer = FixedVec3::ZERO;
        let candidates = [
            (1, FixedVec3::from_float(90.0, 0.0, 0.0)), // mid
            (2, FixedVec3::from_float(10.0, 0.0, 0.0)), // near
            (3, FixedVec3::from_float(40.0, 0.0, 0.0)), // near, farther than 2
        ];
        let priorities = calculate_priorities(viewer, &candidates, &cfg);
        assert_eq!(priorities[0].entity, 2);
        assert_eq!(priorities[1].entity, 3);
        assert_eq!(priorities[2].entity, 1);
    }

    #[test]
    fn tracker_rate_gates_and_suppresses_duplicate_send() {
        let cfg = ReplicationConfig::default();
        let mut tracker = ReplicationTracker::new();
        // near tier: 20Hz at 60Hz tick rate -> divisor 3
        assert!(tracker.needs_update(1, 7, Tier::Near, 0, 60, &cfg));
        tracker.mark_updated(1, 7, 0);
        assert!(!tracker.needs_update(1, 7, Tier::Near, 0, 60, &cfg));
        assert!(!tracker.needs_update(1, 7, Tier::Near, 1, 60, &cfg));
        assert!(tracker.needs_update(1, 7, Tier::Near, 3, 60, &cfg));
    }

    #[test]
    fn disconnect_purges_only_that_client() {
        let mut tracker = ReplicationTracker::new();
        tracker.mark_updated(1, 5, 0);
        tracker.mark_updated(2, 5, 0);
        tracker.remove_client(1);
        assert!(tracker.last_update_tick.contains_key(&(2, 5)));
        assert!(!tracker.last_update_tick.contains_key(&(1, 5)));
    }
}
