//! Per-subsystem tunable configuration. Each struct is `Default`-able with
//! the reference implementation's numeric defaults and `serde`-deserializable
//! so the server binary can load overrides from a TOML file.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub tick_rate_hz: u32,
    pub snapshot_rate_hz: u32,
    pub world_min_x: f32,
    pub world_max_x: f32,
    pub world_min_z: f32,
    pub world_max_z: f32,
    pub world_min_y: f32,
    pub world_max_y: f32,
    pub spatial_hash_cell_size: i32,
    pub aura_buffer_meters: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            snapshot_rate_hz: 20,
            world_min_x: -5000.0,
            world_max_x: 5000.0,
            world_min_z: -5000.0,
            world_max_z: 5000.0,
            world_min_y: -1000.0,
            world_max_y: 1000.0,
            spatial_hash_cell_size: crate::spatial::DEFAULT_CELL_SIZE,
            aura_buffer_meters: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub max_speed: f32,
    pub sprint_multiplier: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub rotation_speed: f32,
    pub speed_tolerance: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: 6.0,
            sprint_multiplier: 1.5,
            acceleration: 10.0,
            deceleration: 8.0,
            rotation_speed: 720.0,
            speed_tolerance: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AntiCheatConfig {
    pub speed_tolerance: f32,
    pub speed_violation_threshold: u32,
    pub speed_violation_window_ms: u64,
    pub max_air_time_ms: u64,
    pub max_teleport_distance: f32,
    pub instant_ban_on_teleport: bool,
    pub teleport_grace_period_ms: u64,
    pub max_inputs_per_second: u32,
    pub input_window_ms: u64,
    pub input_burst_allowance: u32,
    pub max_vertical_speed_no_jump: f32,
    pub fly_violation_threshold: u32,
    pub max_yaw: f32,
    pub max_pitch: f32,
    pub min_attack_interval_ms: u64,
    pub initial_trust_score: i32,
    pub min_trust_for_lenient_checks: i32,
    pub suspicious_trust_threshold: i32,
    pub trust_recovery_per_minute: i32,
    pub position_tolerance: f32,
    pub max_damage_per_hit: i32,
    pub max_melee_range: f32,
    pub max_ranged_range: f32,
    pub max_aim_deviation_deg: f32,
    pub damage_cooldown_ms: u64,
    pub new_player_grace_period_ms: u64,
    pub max_violation_history: usize,
}

impl Default for AntiCheatConfig {
    fn default() -> Self {
        Self {
            speed_tolerance: 1.2,
            speed_violation_threshold: 3,
            speed_violation_window_ms: 5000,
            max_air_time_ms: 500,
            max_teleport_distance: 100.0,
            instant_ban_on_teleport: true,
            teleport_grace_period_ms: 2000,
            max_inputs_per_second: 60,
            input_window_ms: 1000,
            input_burst_allowance: 5,
            max_vertical_speed_no_jump: 0.5,
            fly_violation_threshold: 3,
            max_yaw: std::f32::consts::TAU,
            max_pitch: std::f32::consts::FRAC_PI_2,
            min_attack_interval_ms: 500,
            initial_trust_score: 50,
            min_trust_for_lenient_checks: 70,
            suspicious_trust_threshold: 30,
            trust_recovery_per_minute: 5,
            position_tolerance: 0.5,
            max_damage_per_hit: 5000,
            max_melee_range: 3.0,
            max_ranged_range: 50.0,
            max_aim_deviation_deg: 30.0,
            damage_cooldown_ms: 100,
            new_player_grace_period_ms: 60_000,
            max_violation_history: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub melee_angle_deg: f32,
    pub ranged_angle_deg: f32,
    pub melee_range: f32,
    pub ranged_range: f32,
    pub base_damage: i32,
    pub damage_variance: f32,
    pub critical_chance: f32,
    pub critical_multiplier: f32,
    pub attack_cooldown_ms: u64,
    pub health_regen_per_second: i32,
    pub regen_suppression_ms: u64,
    /// Open question in the original design resolved as configuration:
    /// caps how far lag compensation may rewind a target's position.
    pub max_rewind_ms: u64,
    pub hit_tolerance: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            melee_angle_deg: 60.0,
            ranged_angle_deg: 15.0,
            melee_range: 3.0,
            ranged_range: 50.0,
            base_damage: 20,
            damage_variance: 0.15,
            critical_chance: 0.1,
            critical_multiplier: 2.0,
            attack_cooldown_ms: 500,
            health_regen_per_second: 2,
            regen_suppression_ms: 5000,
            max_rewind_ms: 500,
            hit_tolerance: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    pub near_radius: f32,
    pub mid_radius: f32,
    pub far_radius: f32,
    pub near_rate_hz: u32,
    pub mid_rate_hz: u32,
    pub far_rate_hz: u32,
    pub max_entities_per_snapshot: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            near_radius: 50.0,
            mid_radius: 100.0,
            far_radius: 200.0,
            near_rate_hz: 20,
            mid_rate_hz: 10,
            far_rate_hz: 5,
            max_entities_per_snapshot: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DDoSConfig {
    pub max_connections_per_ip: u32,
    pub max_connection_attempts: u32,
    pub connection_window_secs: u64,
    pub connection_block_duration_secs: u64,
    pub packet_bucket_max_tokens: u32,
    pub packet_bucket_tokens_per_second: u32,
    pub baseline_window_ms: u64,
    pub spike_threshold_percent: u32,
    pub min_baseline_samples: u32,
    pub circuit_failure_threshold: u32,
    pub circuit_success_threshold: u32,
    pub circuit_timeout_ms: u64,
}

impl Default for DDoSConfig {
    fn default() -> Self {
        Self {
            max_connections_per_ip: 5,
            max_connection_attempts: 10,
            connection_window_secs: 60,
            connection_block_duration_secs: 300,
            packet_bucket_max_tokens: 120,
            packet_bucket_tokens_per_second: 60,
            baseline_window_ms: 60_000,
            spike_threshold_percent: 300,
            min_baseline_samples: 100,
            circuit_failure_threshold: 5,
            circuit_success_threshold: 3,
            circuit_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    pub preparation_distance: f32,
    pub aura_enter_distance: f32,
    pub migration_distance: f32,
    pub handoff_distance: f32,
    pub migration_timeout_ms: u64,
    pub sync_overlap_ms: u64,
    pub ownership_transfer_threshold: f32,
    pub aura_sync_interval_ms: u64,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            preparation_distance: 75.0,
            aura_enter_distance: 50.0,
            migration_distance: 25.0,
            handoff_distance: 10.0,
            migration_timeout_ms: 5000,
            sync_overlap_ms: 500,
            ownership_transfer_threshold: 25.0,
            aura_sync_interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PacketValidatorConfig {
    pub min_packet_size: usize,
    pub max_packet_size: usize,
    pub max_ability_id: u32,
    pub max_attack_range: f32,
    pub max_player_name_len: usize,
    pub max_chat_message_len: usize,
    pub min_input_sequence_delta: u32,
    pub max_input_sequence_delta: u32,
}

impl Default for PacketValidatorConfig {
    fn default() -> Self {
        Self {
            min_packet_size: 1,
            max_packet_size: 1400,
            max_ability_id: 1000,
            max_attack_range: 50.0,
            max_player_name_len: 32,
            max_chat_message_len: 256,
            min_input_sequence_delta: 1,
            max_input_sequence_delta: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub tick_rate_hz: u32,
    pub degraded_update_rate_hz: u32,
    pub qos_trigger_consecutive_overruns: u32,
    pub qos_recovery_consecutive_clean: u32,
    pub max_snapshot_entities_degraded: usize,
    /// Capacity of the per-tick scratch arena reset at the start of every
    /// tick. Sized for the attack-rewind and replication-candidate scratch
    /// buffers a busy zone builds per tick.
    pub tick_arena_bytes: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            degraded_update_rate_hz: 10,
            qos_trigger_consecutive_overruns: 5,
            qos_recovery_consecutive_clean: 30,
            max_snapshot_entities_degraded: 50,
            tick_arena_bytes: 65_536,
        }
    }
}

/// Aggregate configuration bundle, the single object the server binary
/// loads from TOML and threads down into every subsystem constructor.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct ZoneConfig {
    pub world: WorldConfig,
    pub movement: MovementConfig,
    pub anticheat: AntiCheatConfig,
    pub combat: CombatConfig,
    pub replication: ReplicationConfig,
    pub ddos: DDoSConfig,
    pub handoff: HandoffConfig,
    pub validator: PacketValidatorConfig,
    pub tick: TickConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let cfg = ZoneConfig::default();
        assert_eq!(cfg.world.tick_rate_hz, 60);
        assert_eq!(cfg.combat.max_rewind_ms, 500);
        assert_eq!(cfg.handoff.ownership_transfer_threshold, 25.0);
    }
}
