//! Server-authoritative anti-cheat: independent detectors feeding a
//! per-player behavior profile and trust score. Detectors never mutate the
//! world; they return corrections that the tick loop applies.

use std::collections::VecDeque;

use crate::config::AntiCheatConfig;
use crate::fixed::FixedVec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheatType {
    SpeedHack,
    Teleport,
    FlyHack,
    NoClip,
    InputManipulation,
    PacketFlooding,
    DamageHack,
    HitboxExtension,
    CooldownViolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ViolationSeverity {
    Info,
    Warning,
    Suspicious,
    Critical,
    Ban,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResult {
    pub detected: bool,
    pub cheat_type: Option<CheatType>,
    pub severity: ViolationSeverity,
    pub confidence: f32,
    pub corrected_position: Option<FixedVec3>,
}

impl DetectionResult {
    fn clean() -> Self {
        Self {
            detected: false,
            cheat_type: None,
            severity: ViolationSeverity::Info,
            confidence: 0.0,
            corrected_position: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViolationRecord {
    pub timestamp_ms: u64,
    pub cheat_type: CheatType,
    pub severity: ViolationSeverity,
    pub confidence: f32,
}

/// Per-player history feeding trust-score computation. The violation ring
/// is bounded (default cap 20); older entries fall off as new ones arrive.
#[derive(Debug, Clone)]
pub struct BehaviorProfile {
    pub trust_score: i32,
    pub violations: VecDeque<ViolationRecord>,
    pub clean_ticks: u64,
    pub movement_samples: u64,
    pub combat_samples: u64,
    pub network_samples: u64,
    pub session_start_ms: u64,
    max_violations: usize,
    last_trust_recovery_ms: u64,
}

impl BehaviorProfile {
    pub fn new(cfg: &AntiCheatConfig, now_ms: u64) -> Self {
        Self {
            trust_score: cfg.initial_trust_score,
            violations: VecDeque::with_capacity(cfg.max_violation_history),
            clean_ticks: 0,
            movement_samples: 0,
            combat_samples: 0,
            network_samples: 0,
            session_start_ms: now_ms,
            max_violations: cfg.max_violation_history,
            last_trust_recovery_ms: now_ms,
        }
    }

    pub fn is_new_player(&self, now_ms: u64, cfg: &AntiCheatConfig) -> bool {
        now_ms.saturating_sub(self.session_start_ms) < cfg.new_player_grace_period_ms
    }

    pub fn record_violation(&mut self, record: ViolationRecord) {
        if self.violations.len() >= self.max_violations {
            self.violations.pop_front();
        }
        self.violations.push_back(record);
        let penalty = match record.severity {
            ViolationSeverity::Info => 1,
            ViolationSeverity::Warning => 3,
            ViolationSeverity::Suspicious => 8,
            ViolationSeverity::Critical => 20,
            ViolationSeverity::Ban => 100,
        };
        self.trust_score = (self.trust_score - penalty).max(0);
        self.clean_ticks = 0;
    }

    pub fn record_clean_tick(&mut self, now_ms: u64, cfg: &AntiCheatConfig) {
        self.clean_ticks += 1;
        if now_ms.saturating_sub(self.last_trust_recovery_ms) >= 60_000 {
            self.trust_score = (self.trust_score + cfg.trust_recovery_per_minute).min(100);
            self.last_trust_recovery_ms = now_ms;
        }
    }

    pub fn is_trusted(&self, cfg: &AntiCheatConfig) -> bool {
        self.trust_score >= cfg.min_trust_for_lenient_checks
    }

    pub fn is_suspicious(&self, cfg: &AntiCheatConfig) -> bool {
        self.trust_score < cfg.suspicious_trust_threshold
    }

    pub fn recent_violation_count(&self, window_ms: u64, now_ms: u64) -> usize {
        self.violations
            .iter()
            .filter(|v| now_ms.saturating_sub(v.timestamp_ms) <= window_ms)
            .count()
    }
}

/// Severity escalation from recent-violation count in a sliding window.
pub fn determine_severity(recent_count: usize) -> ViolationSeverity {
    match recent_count {
        0 => ViolationSeverity::Info,
        1 => ViolationSeverity::Warning,
        2 => ViolationSeverity::Suspicious,
        3..=4 => ViolationSeverity::Critical,
        _ => ViolationSeverity::Ban,
    }
}

/// Speed-hack detector: is implied speed over `maxSpeed * tolerance`?
pub fn detect_speed_hack(
    old: FixedVec3,
    new: FixedVec3,
    dt_ms: u64,
    max_speed: f32,
    cfg: &AntiCheatConfig,
) -> DetectionResult {
    if dt_ms == 0 {
        return DetectionResult::clean();
    }
    let dist = (old.distance_squared_xz(new) as f64).sqrt() / crate::fixed::FLOAT_TO_FIXED as f64;
    let implied_speed = dist / (dt_ms as f64 / 1000.0);
    let limit = (max_speed * cfg.speed_tolerance) as f64;
    if implied_speed > limit {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::SpeedHack),
            severity: ViolationSeverity::Warning,
            confidence: ((implied_speed / limit).min(3.0) / 3.0) as f32,
            corrected_position: Some(old),
        }
    } else {
        DetectionResult::clean()
    }
}

/// Teleport detector: displacement exceeding `max_teleport_distance`
/// outside the new-connection grace period.
pub fn detect_teleport(old: FixedVec3, new: FixedVec3, cfg: &AntiCheatConfig) -> DetectionResult {
    let dist = ((old.distance_squared_xz(new) as f64).sqrt()) / crate::fixed::FLOAT_TO_FIXED as f64;
    if dist > cfg.max_teleport_distance as f64 {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::Teleport),
            severity: if cfg.instant_ban_on_teleport { ViolationSeverity::Ban } else { ViolationSeverity::Critical },
            confidence: 0.95,
            corrected_position: Some(old),
        }
    } else {
        DetectionResult::clean()
    }
}

/// Fly-hack detector: sustained vertical speed without a jump flag, beyond
/// `max_air_time_ms`.
pub fn detect_fly_hack(vertical_speed: f32, airborne_ms: u64, jumped: bool, cfg: &AntiCheatConfig) -> DetectionResult {
    if !jumped && vertical_speed.abs() > cfg.max_vertical_speed_no_jump && airborne_ms > cfg.max_air_time_ms {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::FlyHack),
            severity: ViolationSeverity::Suspicious,
            confidence: 0.8,
            corrected_position: None,
        }
    } else {
        DetectionResult::clean()
    }
}

/// No-clip detector: position change implies passing through solid
/// geometry the movement system should have resolved as a collision.
pub fn detect_no_clip(penetrated_geometry: bool) -> DetectionResult {
    if penetrated_geometry {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::NoClip),
            severity: ViolationSeverity::Critical,
            confidence: 0.9,
            corrected_position: None,
        }
    } else {
        DetectionResult::clean()
    }
}

/// Input-manipulation detector: NaN/infinite fields, out-of-range
/// yaw/pitch, or a non-monotone sequence number.
pub fn detect_input_manipulation(yaw: f32, pitch: f32, sequence: u32, last_sequence: u32, cfg: &AntiCheatConfig) -> DetectionResult {
    let bad_numeric = !yaw.is_finite() || !pitch.is_finite();
    let bad_range = yaw.abs() > cfg.max_yaw || pitch.abs() > cfg.max_pitch;
    let bad_sequence = sequence <= last_sequence && last_sequence != 0;
    if bad_numeric || bad_range || bad_sequence {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::InputManipulation),
            severity: ViolationSeverity::Warning,
            confidence: 0.7,
            corrected_position: None,
        }
    } else {
        DetectionResult::clean()
    }
}

/// Packet-flood detector: more inputs than `max_inputs_per_second`
/// arrived within `input_window_ms`, beyond the burst allowance.
pub fn detect_packet_flooding(inputs_in_window: u32, cfg: &AntiCheatConfig) -> DetectionResult {
    let allowed = cfg.max_inputs_per_second + cfg.input_burst_allowance;
    if inputs_in_window > allowed {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::PacketFlooding),
            severity: ViolationSeverity::Warning,
            confidence: 0.85,
            corrected_position: None,
        }
    } else {
        DetectionResult::clean()
    }
}

/// Damage-hack detector: claimed damage exceeds the configured per-hit cap.
pub fn detect_damage_hack(damage: i32, cfg: &AntiCheatConfig) -> DetectionResult {
    if damage > cfg.max_damage_per_hit {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::DamageHack),
            severity: ViolationSeverity::Critical,
            confidence: 0.95,
            corrected_position: None,
        }
    } else {
        DetectionResult::clean()
    }
}

/// Hitbox-extension detector: claimed hit at a range beyond the weapon's
/// configured max range plus tolerance.
pub fn detect_hitbox_extension(claimed_range: f32, max_range: f32, cfg: &AntiCheatConfig) -> DetectionResult {
    if claimed_range > max_range + cfg.position_tolerance {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::HitboxExtension),
            severity: ViolationSeverity::Critical,
            confidence: 0.9,
            corrected_position: None,
        }
    } else {
        DetectionResult::clean()
    }
}

/// Cooldown-violation detector: attack attempted before
/// `min_attack_interval_ms` has elapsed since the previous attack.
pub fn detect_cooldown_violation(last_attack_ms: u64, now_ms: u64, cfg: &AntiCheatConfig) -> DetectionResult {
    if now_ms.saturating_sub(last_attack_ms) < cfg.min_attack_interval_ms {
        DetectionResult {
            detected: true,
            cheat_type: Some(CheatType::CooldownViolation),
            severity: ViolationSeverity::Warning,
            confidence: 1.0,
            corrected_position: None,
        }
    } else {
        DetectionResult::clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_escalation_matches_table() {
        assert_eq!(determine_severity(0), ViolationSeverity::Info);
        assert_eq!(determine_severity(1), ViolationSeverity::Warning);
        assert_eq!(determine_severity(2), ViolationSeverity::Suspicious);
        assert_eq!(determine_severity(3), ViolationSeverity::Critical);
        assert_eq!(determine_severity(4), ViolationSeverity::Critical);
        assert_eq!(determine_severity(5), ViolationSeverity::Ban);
        assert_eq!(determine_severity(50), ViolationSeverity::Ban);
    }

    #[test]
    fn speed_hack_matches_spec_scenario() {
        let cfg = AntiCheatConfig::default();
        let old = FixedVec3::new(0, 0, 0);
        let new = FixedVec3::from_float(20.0, 0.0, 0.0);
        let result = detect_speed_hack(old, new, 50, 6.0, &cfg);
        assert!(result.detected);
        assert_eq!(result.cheat_type, Some(CheatType::SpeedHack));
        assert_eq!(result.corrected_position, Some(old));
    }

    #[test]
    fn violation_ring_is_bounded() {
        let cfg = AntiCheatConfig { max_violation_history: 3, ..AntiCheatConfig::default() };
        let mut profile = BehaviorProfile::new(&cfg, 0);
        for i in 0..5 {
            profile.record_violation(ViolationRecord {
                timestamp_ms: i,
                cheat_type: CheatType::SpeedHack,
                severity: ViolationSeverity::Info,
                confidence: 0.5,
            });
        }
        assert_eq!(profile.violations.len(), 3);
    }

    #[test]
    fn trust_score_falls_on_violation_and_recovers_over_time() {
        let cfg = AntiCheatConfig::default();
        let mut profile = BehaviorProfile::new(&cfg, 0);
        let start = profile.trust_score;
        profile.record_violation(ViolationRecord {
            timestamp_ms: 0,
            cheat_type: CheatType::Teleport,
            severity: ViolationSeverity::Critical,
            confidence: 0.9,
        });
        assert!(profile.trust_score < start);
        profile.record_clean_tick(60_001, &cfg);
        assert!(profile.trust_score > start - 20);
    }

    #[test]
    fn new_player_grace_period() {
        let cfg = AntiCheatConfig::default();
        let profile = BehaviorProfile::new(&cfg, 1000);
        assert!(profile.is_new_player(1500, &cfg));
        assert!(!profile.is_new_player(1000 + cfg.new_player_grace_period_ms + 1, &cfg));
    }
}
