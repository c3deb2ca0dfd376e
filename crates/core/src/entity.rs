//! Entity handles and component tables. An entity is an opaque handle into
//! a set of sparse component maps; destruction marks components absent and
//! lets dependent subsystems react via the returned ids rather than pointers.

use std::collections::HashMap;

use crate::fixed::{FixedVec3, Rotation};

pub type EntityId = u32;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InputFlags: u16 {
        const FORWARD  = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT     = 1 << 2;
        const RIGHT    = 1 << 3;
        const JUMP     = 1 << 4;
        const ATTACK   = 1 << 5;
        const BLOCK    = 1 << 6;
        const SPRINT   = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub pos: FixedVec3,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity(pub FixedVec3);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    pub flags: InputFlags,
    pub yaw: f32,
    pub pitch: f32,
    pub sequence: u32,
    pub timestamp_ms: u64,
}

impl Default for InputFlags {
    fn default() -> Self {
        InputFlags::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatState {
    pub health: i32,
    pub max_health: i32,
    pub team_id: u8,
    pub last_attack_time: u64,
    pub last_attacker: Option<EntityId>,
    pub is_dead: bool,
}

impl CombatState {
    pub fn new(max_health: i32, team_id: u8) -> Self {
        Self {
            health: max_health,
            max_health,
            team_id,
            last_attack_time: 0,
            last_attacker: None,
            is_dead: false,
        }
    }

    /// Applies damage, clamping health to `[0, max_health]` and flipping
    /// `is_dead` exactly when health reaches zero.
    pub fn apply_damage(&mut self, damage: i32, attacker: Option<EntityId>, now_ms: u64) {
        self.health = (self.health - damage).max(0).min(self.max_health);
        self.last_attacker = attacker.or(self.last_attacker);
        self.last_attack_time = now_ms;
        self.is_dead = self.health == 0;
    }

    pub fn respawn(&mut self) {
        self.health = self.max_health;
        self.is_dead = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetworkState {
    pub rtt_ms: u32,
    pub last_input_sequence: u32,
    pub last_input_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AntiCheatState {
    pub last_valid_position: FixedVec3,
    pub last_validation_time: u64,
    pub suspicious_movements: u32,
    pub max_recorded_speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub player_id: u64,
    pub connection_id: u32,
    pub username: String,
    pub session_start_ms: u64,
}

/// All component tables for one entity, stored together for cheap
/// construction/teardown; sparse fields model "entity does not have this
/// component".
#[derive(Debug, Clone, Default)]
pub struct Entity {
    pub position: Option<Position>,
    pub velocity: Option<Velocity>,
    pub rotation: Option<Rotation>,
    pub input: Option<InputState>,
    pub combat: Option<CombatState>,
    pub network: Option<NetworkState>,
    pub anticheat: Option<AntiCheatState>,
    pub player: Option<PlayerInfo>,
}

/// Entity store: opaque handles plus component tables, iteration by
/// component set. Owned exclusively by the simulation thread.
#[derive(Debug, Default)]
pub struct World {
    pub tick: u64,
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
    removed_this_tick: Vec<EntityId>,
}

impl World {
    pub fn new() -> Self {
        Self {
            tick: 0,
            entities: HashMap::new(),
            next_id: 1,
            removed_this_tick: Vec::new(),
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(id, entity);
        id
    }

    pub fn spawn_with_id(&mut self, id: EntityId, entity: Entity) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
        self.entities.insert(id, entity);
    }

    /// Removes all components and records the id so dependent subsystems
    /// (replication tracker, lag history, aura, migration) can purge state.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.entities.remove(&id);
        if removed.is_some() {
            self.removed_this_tick.push(id);
        }
        removed
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&EntityId, &mut Entity)> {
        self.entities.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drains the ids removed since the last call; the tick loop uses this
    /// to notify replication/aura/migration of destructions.
    pub fn drain_removed(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.removed_this_tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_despawn_roundtrip() {
        let mut world = World::new();
        let id = world.spawn(Entity::default());
        assert!(world.contains(id));
        world.despawn(id);
        assert!(!world.contains(id));
        assert_eq!(world.drain_removed(), vec![id]);
    }

    #[test]
    fn combat_state_death_invariant() {
        let mut combat = CombatState::new(100, 0);
        combat.apply_damage(100, None, 10);
        assert!(combat.is_dead);
        assert_eq!(combat.health, 0);
        combat.respawn();
        assert!(!combat.is_dead);
        assert_eq!(combat.health, 100);
    }

    #[test]
    fn combat_state_health_never_negative() {
        let mut combat = CombatState::new(50, 0);
        combat.apply_damage(999, None, 1);
        assert_eq!(combat.health, 0);
    }

    #[test]
    fn ids_are_never_reused_after_despawn() {
        let mut world = World::new();
        let a = world.spawn(Entity::default());
        world.despawn(a);
        let b = world.spawn(Entity::default());
        assert_ne!(a, b);
    }
}
