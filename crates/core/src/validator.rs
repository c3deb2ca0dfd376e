//! Packet and input validation: the gate every inbound packet passes
//! through before it can touch simulation state. Numeric bounds clamp;
//! identity/text fields reject outright.

use crate::config::PacketValidatorConfig;
use crate::error::ValidationError;
use crate::fixed::FixedVec3;

const SUSPICIOUS_STRINGS: &[&str] = &["DROP TABLE", "<script", "../", "\0", "%00"];

/// Clamps `pos` into `[min, max]` per axis; returns whether it was already
/// in bounds (false means the caller's value was just corrected).
pub fn clamp_position(pos: &mut FixedVec3, min: FixedVec3, max: FixedVec3) -> bool {
    let clamped = FixedVec3 { x: pos.x.clamp(min.x, max.x), y: pos.y.clamp(min.y, max.y), z: pos.z.clamp(min.z, max.z) };
    let in_bounds = clamped == *pos;
    *pos = clamped;
    in_bounds
}

pub fn validate_speed(speed: f32, max_speed: f32, tolerance: f32) -> bool {
    speed <= max_speed * tolerance
}

pub fn clamp_rotation(yaw: &mut f32, pitch: &mut f32) {
    *yaw = yaw.rem_euclid(std::f32::consts::TAU);
    *pitch = pitch.clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
}

pub fn validate_ability_id(ability_id: u32, cfg: &PacketValidatorConfig) -> Result<(), ValidationError> {
    if ability_id >= cfg.max_ability_id {
        return Err(ValidationError::OutOfBounds(format!("ability id {ability_id} out of range")));
    }
    Ok(())
}

/// Input sequence must be strictly increasing, with a gap no larger than
/// `max_input_sequence_delta` (larger gaps drop the intervening inputs
/// rather than rejecting the packet outright — the caller treats `Ok` as
/// "apply, and note any skipped sequence numbers").
pub fn validate_input_sequence(last: u32, got: u32, cfg: &PacketValidatorConfig) -> Result<(), ValidationError> {
    if got <= last {
        return Err(ValidationError::SequenceNotMonotone { last, got });
    }
    let delta = got - last;
    if delta < cfg.min_input_sequence_delta || delta > cfg.max_input_sequence_delta {
        return Err(ValidationError::SequenceDeltaOutOfRange(delta));
    }
    Ok(())
}

pub fn validate_packet_size(size: usize, cfg: &PacketValidatorConfig) -> Result<(), ValidationError> {
    if size < cfg.min_packet_size || size > cfg.max_packet_size {
        return Err(ValidationError::OutOfBounds(format!("packet size {size} outside [{}, {}]", cfg.min_packet_size, cfg.max_packet_size)));
    }
    Ok(())
}

fn has_suspicious_pattern(text: &str) -> bool {
    if SUSPICIOUS_STRINGS.iter().any(|needle| text.contains(needle)) {
        return true;
    }
    // Three or more identical characters in a row.
    let bytes = text.as_bytes();
    if bytes.windows(3).any(|w| w[0] == w[1] && w[1] == w[2]) {
        return true;
    }
    // More than 70% uppercase alphabetic characters among a non-trivial run.
    let alpha: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if alpha.len() >= 6 {
        let upper = alpha.iter().filter(|c| c.is_uppercase()).count();
        if upper as f32 / alpha.len() as f32 > 0.7 {
            return true;
        }
    }
    false
}

fn is_whitelisted_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == ' '
}

pub fn validate_player_name(name: &str, cfg: &PacketValidatorConfig) -> Result<(), ValidationError> {
    if name.is_empty() || name.chars().count() > cfg.max_player_name_len {
        return Err(ValidationError::StringRejected("player name length out of range".to_string()));
    }
    if !name.chars().all(is_whitelisted_char) {
        return Err(ValidationError::StringRejected("player name contains disallowed characters".to_string()));
    }
    if has_suspicious_pattern(name) {
        return Err(ValidationError::StringRejected("player name matches a suspicious pattern".to_string()));
    }
    Ok(())
}

pub fn validate_chat_message(message: &str, cfg: &PacketValidatorConfig) -> Result<(), ValidationError> {
    if message.is_empty() || message.chars().count() > cfg.max_chat_message_len {
        return Err(ValidationError::StringRejected("chat message length out of range".to_string()));
    }
    if has_suspicious_pattern(message) {
        return Err(ValidationError::StringRejected("chat message matches a suspicious pattern".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PacketValidatorConfig {
        PacketValidatorConfig::default()
    }

    #[test]
    fn position_clamps_rather_than_rejects() {
        let mut pos = FixedVec3::from_float(99999.0, 0.0, 0.0);
        let min = FixedVec3::from_float(-5000.0, -1000.0, -5000.0);
        let max = FixedVec3::from_float(5000.0, 1000.0, 5000.0);
        let was_in_bounds = clamp_position(&mut pos, min, max);
        assert!(!was_in_bounds);
        assert_eq!(pos.x, max.x);
    }

    #[test]
    fn speed_tolerance_allows_small_overshoot() {
        assert!(validate_speed(6.5, 6.0, 1.2));
        assert!(!validate_speed(8.0, 6.0, 1.2));
    }

    #[test]
    fn sequence_gap_within_window_accepted_outside_rejected() {
        let cfg = cfg();
        assert!(validate_input_sequence(10, 11, &cfg).is_ok());
        assert!(validate_input_sequence(10, 20, &cfg).is_ok());
        assert!(validate_input_sequence(10, 21, &cfg).is_err());
        assert!(validate_input_sequence(10, 10, &cfg).is_err());
    }

    #[test]
    fn packet_size_bounds_enforced() {
        let cfg = cfg();
        assert!(validate_packet_size(0, &cfg).is_err());
        assert!(validate_packet_size(1400, &cfg).is_ok());
        assert!(validate_packet_size(1401, &cfg).is_err());
    }

    #[test]
    fn player_name_rejects_bad_characters_and_exploit_strings() {
        let cfg = cfg();
        assert!(validate_player_name("Aldric", &cfg).is_ok());
        assert!(validate_player_name("<script>alert(1)", &cfg).is_err());
        assert!(validate_player_name(&"a".repeat(64), &cfg).is_err());
    }

    #[test]
    fn chat_message_flags_repeated_characters_as_suspicious() {
        let cfg = cfg();
        assert!(validate_chat_message("hello there", &cfg).is_ok());
        assert!(validate_chat_message("aaaaaaaaaa", &cfg).is_err());
    }
}
