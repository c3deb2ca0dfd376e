//! Entity migration state machine: the entity-level mechanism that
//! transfers authoritative state between zones, with exactly-once
//! semantics keyed by `(sourceZone, sequence)`.

use std::collections::{HashMap, HashSet};

use crate::entity::{AntiCheatState, CombatState, EntityId, InputState, NetworkState};
use crate::error::MigrationError;
use crate::fixed::{FixedVec3, Rotation};
use crate::zone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    None,
    Preparing,
    Transferring,
    Syncing,
    Completing,
    Completed,
    Failed,
}

/// The full component snapshot carried across zone boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub entity: EntityId,
    pub player_id: u64,
    pub connection_id: u32,
    pub position: FixedVec3,
    pub velocity: FixedVec3,
    pub rotation: Rotation,
    pub combat: CombatState,
    pub network: NetworkState,
    pub last_input: InputState,
    pub anticheat: AntiCheatState,
    pub source_zone: ZoneId,
    pub target_zone: ZoneId,
    pub timestamp_ms: u64,
    pub sequence: u64,
}

#[derive(Debug, Clone)]
pub struct ActiveMigration {
    pub entity: EntityId,
    pub state: MigrationState,
    pub snapshot: EntitySnapshot,
    pub started_at_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MigrationStats {
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub duplicates_dropped: u64,
}

#[derive(Debug, Default)]
pub struct EntityMigrationManager {
    active: HashMap<EntityId, ActiveMigration>,
    seen_sequences: HashSet<(ZoneId, u64)>,
    next_sequence: u64,
    default_timeout_ms: u64,
    stats: MigrationStats,
}

impl EntityMigrationManager {
    pub fn new(default_timeout_ms: u64) -> Self {
        Self { active: HashMap::new(), seen_sequences: HashSet::new(), next_sequence: 1, default_timeout_ms, stats: MigrationStats::default() }
    }

    pub fn is_migrating(&self, entity: EntityId) -> bool {
        self.active.contains_key(&entity)
    }

    pub fn migration_state(&self, entity: EntityId) -> MigrationState {
        self.active.get(&entity).map(|m| m.state).unwrap_or(MigrationState::None)
    }

    /// `initiateMigration`: snapshots the entity and transitions to
    /// `PREPARING`. Rejects if a migration for this entity is already
    /// active — the state machine allows only one active state at a time.
    pub fn initiate_migration(&mut self, mut snapshot: EntitySnapshot, now_ms: u64) -> Result<u64, MigrationError> {
        if self.active.contains_key(&snapshot.entity) {
            return Err(MigrationError::AlreadyInProgress(snapshot.entity));
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        snapshot.sequence = sequence;
        snapshot.timestamp_ms = now_ms;

        self.active.insert(
            snapshot.entity,
            ActiveMigration { entity: snapshot.entity, state: MigrationState::Preparing, snapshot, started_at_ms: now_ms, timeout_ms: self.default_timeout_ms },
        );
        Ok(sequence)
    }

    /// `PREPARING -> TRANSFERRING`: call once the snapshot has been
    /// published to the target zone over pub/sub.
    pub fn mark_transferring(&mut self, entity: EntityId) -> Result<(), MigrationError> {
        self.transition(entity, MigrationState::Preparing, MigrationState::Transferring)
    }

    /// Target zone receiving a snapshot: idempotently drops duplicate
    /// `(sourceZone, sequence)` arrivals.
    pub fn on_migration_request_received(&mut self, snapshot: &EntitySnapshot) -> bool {
        let key = (snapshot.source_zone, snapshot.sequence);
        if self.seen_sequences.contains(&key) {
            self.stats.duplicates_dropped += 1;
            return false;
        }
        self.seen_sequences.insert(key);
        true
    }

    /// `TRANSFERRING -> SYNCING` once the target has replied.
    pub fn mark_syncing(&mut self, entity: EntityId) -> Result<(), MigrationError> {
        self.transition(entity, MigrationState::Transferring, MigrationState::Syncing)
    }

    /// `SYNCING -> COMPLETING`: source issues the final handoff.
    pub fn mark_completing(&mut self, entity: EntityId) -> Result<(), MigrationError> {
        self.transition(entity, MigrationState::Syncing, MigrationState::Completing)
    }

    /// `COMPLETING -> COMPLETED`: source destroys its copy; caller is
    /// expected to then clean up lag history / replication tracking and
    /// emit the connection-redirect event.
    pub fn mark_completed(&mut self, entity: EntityId) -> Result<EntitySnapshot, MigrationError> {
        let migration = self.active.get_mut(&entity).ok_or(MigrationError::NoActiveMigration(entity))?;
        if migration.state != MigrationState::Completing {
            return Err(MigrationError::NoActiveMigration(entity));
        }
        migration.state = MigrationState::Completed;
        self.stats.completed += 1;
        let migration = self.active.remove(&entity).unwrap();
        Ok(migration.snapshot)
    }

    pub fn cancel_migration(&mut self, entity: EntityId) -> Result<(), MigrationError> {
        self.active.remove(&entity).ok_or(MigrationError::NoActiveMigration(entity))?;
        Ok(())
    }

    fn transition(&mut self, entity: EntityId, from: MigrationState, to: MigrationState) -> Result<(), MigrationError> {
        let migration = self.active.get_mut(&entity).ok_or(MigrationError::NoActiveMigration(entity))?;
        if migration.state != from {
            return Err(MigrationError::NoActiveMigration(entity));
        }
        migration.state = to;
        Ok(())
    }

    /// Per-tick sweep: any migration whose elapsed time exceeds its
    /// timeout transitions to `FAILED`; the source entity is retained.
    pub fn update(&mut self, now_ms: u64) -> Vec<EntityId> {
        let mut timed_out = Vec::new();
        self.active.retain(|&entity, migration| {
            if migration.state != MigrationState::Completed
                && now_ms.saturating_sub(migration.started_at_ms) > migration.timeout_ms
            {
                timed_out.push(entity);
                self.stats.timed_out += 1;
                self.stats.failed += 1;
                false
            } else {
                true
            }
        });
        timed_out
    }

    pub fn active_migration_count(&self) -> usize {
        self.active.len()
    }

    pub fn stats(&self) -> MigrationStats {
        self.stats
    }

    pub fn channel_name(zone: ZoneId) -> String {
        format!("zone:{zone}:migration")
    }

    pub fn state_channel_name(zone: ZoneId) -> String {
        format!("zone:{zone}:migration:state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entity: EntityId, source: ZoneId, target: ZoneId) -> EntitySnapshot {
        EntitySnapshot {
            entity,
            player_id: 1,
            connection_id: 1,
            position: FixedVec3::ZERO,
            velocity: FixedVec3::ZERO,
            rotation: Rotation::default(),
            combat: CombatState::new(100, 0),
            network: NetworkState::default(),
            last_input: InputState::default(),
            anticheat: AntiCheatState::default(),
            source_zone: source,
            target_zone: target,
            timestamp_ms: 0,
            sequence: 0,
        }
    }

    #[test]
    fn happy_path_through_all_states() {
        let mut manager = EntityMigrationManager::new(5000);
        manager.initiate_migration(snapshot(1, 0, 1), 0).unwrap();
        assert_eq!(manager.migration_state(1), MigrationState::Preparing);
        manager.mark_transferring(1).unwrap();
        manager.mark_syncing(1).unwrap();
        manager.mark_completing(1).unwrap();
        let snap = manager.mark_completed(1).unwrap();
        assert_eq!(snap.entity, 1);
        assert!(!manager.is_migrating(1));
        assert_eq!(manager.stats().completed, 1);
    }

    #[test]
    fn duplicate_arrival_is_idempotently_dropped() {
        let mut manager = EntityMigrationManager::new(5000);
        let snap = snapshot(1, 7, 99);
        let mut snap_with_seq = snap.clone();
        snap_with_seq.sequence = 5;
        assert!(manager.on_migration_request_received(&snap_with_seq));
        assert!(!manager.on_migration_request_received(&snap_with_seq));
        assert_eq!(manager.stats().duplicates_dropped, 1);
    }

    #[test]
    fn only_one_active_migration_per_entity() {
        let mut manager = EntityMigrationManager::new(5000);
        manager.initiate_migration(snapshot(1, 0, 1), 0).unwrap();
        assert!(manager.initiate_migration(snapshot(1, 0, 2), 0).is_err());
    }

    #[test]
    fn migration_times_out_iff_elapsed_exceeds_timeout() {
        let mut manager = EntityMigrationManager::new(5000);
        manager.initiate_migration(snapshot(1, 0, 1), 0).unwrap();
        assert!(manager.update(5000).is_empty());
        let timed_out = manager.update(5001);
        assert_eq!(timed_out, vec![1]);
        assert!(!manager.is_migrating(1));
        assert_eq!(manager.stats().timed_out, 1);
    }
}
