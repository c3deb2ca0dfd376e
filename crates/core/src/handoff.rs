//! Zone handoff controller: player-level orchestration of the
//! aura → migration → client-redirect sequence as a player approaches a
//! zone boundary.

use std::collections::HashMap;

use rand::RngCore;

use crate::config::HandoffConfig;
use crate::entity::EntityId;
use crate::error::HandoffError;
use crate::zone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffPhase {
    None,
    Preparing,
    AuraOverlap,
    Migrating,
    Switching,
    Completed,
}

#[derive(Debug, Clone)]
pub struct ActiveHandoff {
    pub player_id: u64,
    pub entity: EntityId,
    pub phase: HandoffPhase,
    pub target_zone: ZoneId,
    pub handoff_token: Option<String>,
    pub started_at_ms: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HandoffStats {
    pub completed: u64,
    pub cancelled: u64,
    pub failed: u64,
}

/// Generates a cryptographically random 64-hex-character token (32 bytes,
/// 256 bits of entropy) — the reference implementation's non-cryptographic
/// PRNG is explicitly called out as a placeholder to replace.
pub fn generate_handoff_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Default)]
pub struct ZoneHandoffController {
    active: HashMap<u64, ActiveHandoff>,
    stats: HandoffStats,
}

impl ZoneHandoffController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_phase(&self, player_id: u64) -> HandoffPhase {
        self.active.get(&player_id).map(|h| h.phase).unwrap_or(HandoffPhase::None)
    }

    pub fn is_handoff_in_progress(&self, player_id: u64) -> bool {
        self.active.contains_key(&player_id)
    }

    /// Drives phase transitions from `distance_to_edge` (meters, positive
    /// when inside the zone approaching its boundary) and a target-zone
    /// resolver the caller supplies (world partition lookup).
    pub fn check_player_position(
        &mut self,
        player_id: u64,
        entity: EntityId,
        distance_to_edge: f32,
        resolve_target_zone: impl FnOnce() -> Option<ZoneId>,
        cfg: &HandoffConfig,
        now_ms: u64,
    ) -> HandoffPhase {
        let current_phase = self.player_phase(player_id);

        if distance_to_edge > cfg.preparation_distance {
            // Turning back out of range: cancel in PREPARING/AURA_OVERLAP; once
            // MIGRATING has begun, cancellation is best-effort (left to the caller).
            if matches!(current_phase, HandoffPhase::Preparing | HandoffPhase::AuraOverlap) {
                self.active.remove(&player_id);
                self.stats.cancelled += 1;
            }
            return self.player_phase(player_id);
        }

        let target = match self.active.get(&player_id) {
            Some(h) => Some(h.target_zone),
            None => resolve_target_zone(),
        };
        let Some(target_zone) = target else {
            return current_phase;
        };

        let next_phase = if distance_to_edge <= cfg.handoff_distance {
            HandoffPhase::Switching
        } else if distance_to_edge <= cfg.migration_distance {
            HandoffPhase::Migrating
        } else if distance_to_edge <= cfg.aura_enter_distance {
            HandoffPhase::AuraOverlap
        } else {
            HandoffPhase::Preparing
        };

        let entry = self.active.entry(player_id).or_insert_with(|| ActiveHandoff {
            player_id,
            entity,
            phase: HandoffPhase::None,
            target_zone,
            handoff_token: None,
            started_at_ms: now_ms,
        });

        // Phases only advance forward here; regression while still within
        // preparation_distance is handled by the turn-back branch above.
        if phase_rank(next_phase) > phase_rank(entry.phase) {
            entry.phase = next_phase;
            if next_phase == HandoffPhase::Switching && entry.handoff_token.is_none() {
                entry.handoff_token = Some(generate_handoff_token());
            }
        }

        entry.phase
    }

    pub fn validate_handoff_token(&self, player_id: u64, token: &str) -> Result<(), HandoffError> {
        let handoff = self.active.get(&player_id).ok_or(HandoffError::NotInProgress(player_id))?;
        match &handoff.handoff_token {
            Some(expected) if expected == token => Ok(()),
            _ => Err(HandoffError::InvalidToken(handoff.entity)),
        }
    }

    pub fn complete_handoff(&mut self, player_id: u64) -> Result<(), HandoffError> {
        self.active.remove(&player_id).ok_or(HandoffError::NotInProgress(player_id))?;
        self.stats.completed += 1;
        Ok(())
    }

    pub fn cancel_handoff(&mut self, player_id: u64) {
        if self.active.remove(&player_id).is_some() {
            self.stats.cancelled += 1;
        }
    }

    pub fn active_handoffs(&self) -> impl Iterator<Item = &ActiveHandoff> {
        self.active.values()
    }

    pub fn stats(&self) -> HandoffStats {
        self.stats
    }
}

fn phase_rank(phase: HandoffPhase) -> u8 {
    match phase {
        HandoffPhase::None => 0,
        HandoffPhase::Preparing => 1,
        HandoffPhase::AuraOverlap => 2,
        HandoffPhase::Migrating => 3,
        HandoffPhase::Switching => 4,
        HandoffPhase::Completed => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enters_preparing_at_threshold() {
        let mut controller = ZoneHandoffController::new();
        let cfg = HandoffConfig::default();
        let phase = controller.check_player_position(1, 1, 60.0, || Some(2), &cfg, 0);
        assert_eq!(phase, HandoffPhase::Preparing);
    }

    #[test]
    fn handoff_turn_back_matches_spec_scenario() {
        let mut controller = ZoneHandoffController::new();
        let cfg = HandoffConfig::default();
        controller.check_player_position(1, 1, 60.0, || Some(2), &cfg, 0);
        assert_eq!(controller.player_phase(1), HandoffPhase::Preparing);

        // Player reverses before reaching aura_enter_distance; distance rises to 80m.
        controller.check_player_position(1, 1, 80.0, || Some(2), &cfg, 100);
        assert_eq!(controller.player_phase(1), HandoffPhase::None);
        assert_eq!(controller.active_handoffs().count(), 0);
    }

    #[test]
    fn progresses_through_all_phases_and_generates_token() {
        let mut controller = ZoneHandoffController::new();
        let cfg = HandoffConfig::default();
        controller.check_player_position(1, 1, 70.0, || Some(2), &cfg, 0);
        controller.check_player_position(1, 1, 45.0, || Some(2), &cfg, 10);
        assert_eq!(controller.player_phase(1), HandoffPhase::AuraOverlap);
        controller.check_player_position(1, 1, 20.0, || Some(2), &cfg, 20);
        assert_eq!(controller.player_phase(1), HandoffPhase::Migrating);
        controller.check_player_position(1, 1, 5.0, || Some(2), &cfg, 30);
        assert_eq!(controller.player_phase(1), HandoffPhase::Switching);

        let handoff = controller.active.get(&1).unwrap();
        let token = handoff.handoff_token.clone().unwrap();
        assert_eq!(token.len(), 64);
        assert!(controller.validate_handoff_token(1, &token).is_ok());
    }

    #[test]
    fn invalid_token_rejected() {
        let mut controller = ZoneHandoffController::new();
        let cfg = HandoffConfig::default();
        controller.check_player_position(1, 1, 5.0, || Some(2), &cfg, 0);
        assert!(controller.validate_handoff_token(1, "wrong").is_err());
    }
}
