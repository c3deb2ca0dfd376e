//! Persistence adapter: a hot key-value store (session/position/zone
//! status) and a cold column store (combat event log) behind best-effort,
//! fire-and-forget write queues guarded by a circuit breaker.

use std::collections::VecDeque;

use crate::config::DDoSConfig;
use crate::entity::EntityId;
use crate::error::PersistenceError;
use crate::fixed::FixedVec3;
use crate::ratelimit::CircuitBreaker;

pub fn session_key(player_id: u64) -> String {
    format!("session:{player_id}")
}

pub fn zone_players_key(zone_id: u32) -> String {
    format!("zone:{zone_id}:players")
}

pub fn zone_status_key(zone_id: u32) -> String {
    format!("zone:{zone_id}:status")
}

pub fn ban_key(player_id: u64) -> String {
    format!("ban:{player_id}")
}

pub fn position_key(player_id: u64) -> String {
    format!("pos:{player_id}")
}

#[derive(Debug, Clone)]
pub enum HotWrite {
    Session { player_id: u64, value: Vec<u8> },
    Position { player_id: u64, position: FixedVec3 },
    ZoneStatus { zone_id: u32, value: Vec<u8> },
    Ban { player_id: u64, reason: String },
}

#[derive(Debug, Clone)]
pub struct CombatEventRow {
    pub attacker: EntityId,
    pub target: EntityId,
    pub damage: i32,
    pub was_critical: bool,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone)]
pub struct PlayerCombatStatsRow {
    pub player_id: u64,
    pub damage_dealt: i64,
    pub damage_taken: i64,
    pub kills: u32,
    pub deaths: u32,
}

/// Adapter trait the server binary implements against the real Redis /
/// ScyllaDB clients; `outpost-core` only depends on this seam.
pub trait HotStore {
    fn write(&mut self, write: HotWrite) -> Result<(), PersistenceError>;
}

pub trait ColdStore {
    fn insert_combat_event(&mut self, row: CombatEventRow) -> Result<(), PersistenceError>;
    fn upsert_player_combat_stats(&mut self, row: PlayerCombatStatsRow) -> Result<(), PersistenceError>;
}

/// Bounded fire-and-forget queue: writes that can't be drained (backend
/// down, circuit open) are dropped oldest-first rather than blocking the
/// simulation thread or growing without bound.
pub struct WriteQueue<W> {
    pending: VecDeque<W>,
    capacity: usize,
    dropped: u64,
}

impl<W> WriteQueue<W> {
    pub fn new(capacity: usize) -> Self {
        Self { pending: VecDeque::new(), capacity, dropped: 0 }
    }

    pub fn enqueue(&mut self, write: W) {
        if self.pending.len() >= self.capacity {
            self.pending.pop_front();
            self.dropped += 1;
        }
        self.pending.push_back(write);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain_into(&mut self, store: &mut impl HotStore, breaker: &mut CircuitBreaker, now_ms: u64) -> usize
    where
        W: Into<HotWrite>,
    {
        let mut drained = 0;
        while let Some(write) = self.pending.pop_front() {
            if !breaker.allow_request(now_ms) {
                self.pending.push_front(write);
                break;
            }
            match store.write(write.into()) {
                Ok(()) => {
                    breaker.record_success();
                    drained += 1;
                }
                Err(_) => {
                    breaker.record_failure(now_ms);
                    break;
                }
            }
        }
        drained
    }
}

impl From<HotWrite> for HotWrite {
    fn from(w: HotWrite) -> Self {
        w
    }
}

pub fn new_circuit_breaker(cfg: &DDoSConfig) -> CircuitBreaker {
    CircuitBreaker::new(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeStore {
        writes: Vec<HotWrite>,
        fail_next: bool,
    }

    impl HotStore for FakeStore {
        fn write(&mut self, write: HotWrite) -> Result<(), PersistenceError> {
            if self.fail_next {
                return Err(PersistenceError::Serialization("boom".into()));
            }
            self.writes.push(write);
            Ok(())
        }
    }

    #[test]
    fn key_conventions_match_reference() {
        assert_eq!(session_key(7), "session:7");
        assert_eq!(zone_players_key(3), "zone:3:players");
        assert_eq!(zone_status_key(3), "zone:3:status");
        assert_eq!(ban_key(7), "ban:7");
        assert_eq!(position_key(7), "pos:7");
    }

    #[test]
    fn queue_drops_oldest_when_over_capacity() {
        let mut queue: WriteQueue<HotWrite> = WriteQueue::new(2);
        queue.enqueue(HotWrite::Session { player_id: 1, value: vec![] });
        queue.enqueue(HotWrite::Session { player_id: 2, value: vec![] });
        queue.enqueue(HotWrite::Session { player_id: 3, value: vec![] });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped_count(), 1);
    }

    #[test]
    fn drain_stops_when_circuit_opens() {
        let cfg = DDoSConfig { circuit_failure_threshold: 1, ..DDoSConfig::default() };
        let mut breaker = CircuitBreaker::new(&cfg);
        let mut store = FakeStore { fail_next: true, ..Default::default() };
        let mut queue: WriteQueue<HotWrite> = WriteQueue::new(10);
        queue.enqueue(HotWrite::Session { player_id: 1, value: vec![] });
        queue.enqueue(HotWrite::Session { player_id: 2, value: vec![] });
        let drained = queue.drain_into(&mut store, &mut breaker, 0);
        assert_eq!(drained, 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_succeeds_when_store_healthy() {
        let cfg = DDoSConfig::default();
        let mut breaker = CircuitBreaker::new(&cfg);
        let mut store = FakeStore::default();
        let mut queue: WriteQueue<HotWrite> = WriteQueue::new(10);
        queue.enqueue(HotWrite::Session { player_id: 1, value: vec![] });
        let drained = queue.drain_into(&mut store, &mut breaker, 0);
        assert_eq!(drained, 1);
        assert!(queue.is_empty());
        assert_eq!(store.writes.len(), 1);
    }
}
