//! Aura projection: the border overlap buffer where entities owned by
//! adjacent zones appear as read-only ghost copies.

use std::collections::HashMap;

use crate::entity::EntityId;
use crate::fixed::FixedVec3;
use crate::zone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuraEntityState {
    pub position: FixedVec3,
    pub velocity: FixedVec3,
    pub owner_zone: ZoneId,
    pub last_update_tick: u64,
}

#[derive(Debug, Default)]
pub struct AuraProjectionManager {
    my_zone: ZoneId,
    aura_buffer_meters: f32,
    /// Entities we own that currently sit in our aura (to be published).
    owned_in_aura: HashMap<EntityId, AuraEntityState>,
    /// Ghost copies of entities owned by adjacent zones.
    ghosts: HashMap<EntityId, AuraEntityState>,
}

impl AuraProjectionManager {
    pub fn new(my_zone: ZoneId, aura_buffer_meters: f32) -> Self {
        Self { my_zone, aura_buffer_meters, owned_in_aura: HashMap::new(), ghosts: HashMap::new() }
    }

    pub fn is_in_aura_buffer(&self, core: crate::zone::Rect, pos: FixedVec3) -> bool {
        let x = crate::fixed::to_float(pos.x);
        let z = crate::fixed::to_float(pos.z);
        core.contains_with_buffer(x, z, self.aura_buffer_meters) && !core.contains(x, z)
    }

    pub fn is_in_core_zone(&self, core: crate::zone::Rect, pos: FixedVec3) -> bool {
        core.contains(crate::fixed::to_float(pos.x), crate::fixed::to_float(pos.z))
    }

    /// Entity (owned by us) enters our own aura ring: register for
    /// publishing outward.
    pub fn on_entity_entering_aura(&mut self, e: EntityId, pos: FixedVec3, velocity: FixedVec3, tick: u64) {
        self.owned_in_aura.insert(e, AuraEntityState { position: pos, velocity, owner_zone: self.my_zone, last_update_tick: tick });
    }

    pub fn on_entity_leaving_aura(&mut self, e: EntityId) {
        self.owned_in_aura.remove(&e);
    }

    pub fn update_entity_state(&mut self, e: EntityId, pos: FixedVec3, velocity: FixedVec3, tick: u64) {
        if let Some(state) = self.owned_in_aura.get_mut(&e) {
            state.position = pos;
            state.velocity = velocity;
            state.last_update_tick = tick;
        }
    }

    /// Refreshes (or creates) a ghost copy from an adjacent zone's publish.
    pub fn on_entity_state_from_adjacent_zone(&mut self, zone: ZoneId, e: EntityId, pos: FixedVec3, velocity: FixedVec3, tick: u64) {
        self.ghosts.insert(e, AuraEntityState { position: pos, velocity, owner_zone: zone, last_update_tick: tick });
    }

    pub fn remove_entity(&mut self, e: EntityId) {
        self.owned_in_aura.remove(&e);
        self.ghosts.remove(&e);
    }

    pub fn is_entity_in_aura(&self, e: EntityId) -> bool {
        self.owned_in_aura.contains_key(&e) || self.ghosts.contains_key(&e)
    }

    pub fn entity_owner_zone(&self, e: EntityId) -> Option<ZoneId> {
        self.ghosts.get(&e).map(|g| g.owner_zone).or(self.owned_in_aura.get(&e).map(|_| self.my_zone))
    }

    /// True iff `e` is closer to our center than to any adjacent zone's
    /// center and at least `ownership_transfer_threshold` inside our core.
    pub fn should_take_ownership(
        &self,
        my_core: crate::zone::Rect,
        adjacent_cores: &[crate::zone::Rect],
        pos: FixedVec3,
        ownership_transfer_threshold: f32,
    ) -> bool {
        let p = glam::Vec2::new(crate::fixed::to_float(pos.x), crate::fixed::to_float(pos.z));
        let my_dist = p.distance(my_core.center());
        let closer_than_all = adjacent_cores.iter().all(|c| my_dist < p.distance(c.center()));
        let depth_into_core = -my_core.distance_to_edge(p.x, p.y);
        closer_than_all && depth_into_core >= ownership_transfer_threshold
    }

    pub fn on_ownership_transferred(&mut self, e: EntityId, new_owner: ZoneId) {
        if new_owner == self.my_zone {
            self.ghosts.remove(&e);
        } else if let Some(state) = self.owned_in_aura.remove(&e) {
            self.ghosts.insert(e, AuraEntityState { owner_zone: new_owner, ..state });
        }
    }

    /// Entities we own that are in aura — published every sync tick.
    pub fn entities_to_sync(&self) -> impl Iterator<Item = (&EntityId, &AuraEntityState)> {
        self.owned_in_aura.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::Rect;

    fn core() -> Rect {
        Rect { min_x: 0.0, max_x: 100.0, min_z: 0.0, max_z: 100.0 }
    }

    #[test]
    fn aura_buffer_excludes_core_interior() {
        let manager = AuraProjectionManager::new(0, 50.0);
        assert!(!manager.is_in_aura_buffer(core(), FixedVec3::from_float(50.0, 0.0, 50.0)));
        assert!(manager.is_in_aura_buffer(core(), FixedVec3::from_float(120.0, 0.0, 50.0)));
    }

    #[test]
    fn ghost_lifecycle() {
        let mut manager = AuraProjectionManager::new(0, 50.0);
        manager.on_entity_state_from_adjacent_zone(1, 42, FixedVec3::ZERO, FixedVec3::ZERO, 5);
        assert!(manager.is_entity_in_aura(42));
        assert_eq!(manager.entity_owner_zone(42), Some(1));
        manager.remove_entity(42);
        assert!(!manager.is_entity_in_aura(42));
    }

    #[test]
    fn owned_entities_in_aura_are_listed_for_sync() {
        let mut manager = AuraProjectionManager::new(0, 50.0);
        manager.on_entity_entering_aura(7, FixedVec3::ZERO, FixedVec3::ZERO, 1);
        let synced: Vec<_> = manager.entities_to_sync().map(|(id, _)| *id).collect();
        assert_eq!(synced, vec![7]);
        manager.on_entity_leaving_aura(7);
        assert_eq!(manager.entities_to_sync().count(), 0);
    }

    #[test]
    fn ownership_transfer_flips_owned_to_ghost() {
        let mut manager = AuraProjectionManager::new(0, 50.0);
        manager.on_entity_entering_aura(7, FixedVec3::ZERO, FixedVec3::ZERO, 1);
        manager.on_ownership_transferred(7, 2);
        assert_eq!(manager.entity_owner_zone(7), Some(2));
    }
}
