pub mod anticheat;
pub mod aura;
pub mod combat;
pub mod config;
pub mod entity;
pub mod error;
pub mod fixed;
pub mod handoff;
pub mod history;
pub mod memory;
pub mod messenger;
pub mod metrics;
pub mod migration;
pub mod movement;
pub mod packet;
pub mod persistence;
pub mod ratelimit;
pub mod replication;
pub mod snapshot;
pub mod spatial;
pub mod tick;
pub mod validator;
pub mod zone;

pub use anticheat::{
    detect_cooldown_violation, detect_damage_hack, detect_fly_hack, detect_hitbox_extension,
    detect_input_manipulation, detect_no_clip, detect_packet_flooding, detect_speed_hack,
    detect_teleport, determine_severity, BehaviorProfile, CheatType, DetectionResult,
    ViolationRecord, ViolationSeverity,
};
pub use aura::{AuraEntityState, AuraProjectionManager};
pub use combat::{
    accept_lag_compensated_hit, apply_regen, process_attack, roll_damage, select_targets,
    AttackRejection, Hit, HitResult, TargetCandidate, WeaponKind,
};
pub use config::{
    AntiCheatConfig, CombatConfig, DDoSConfig, HandoffConfig, MovementConfig,
    PacketValidatorConfig, ReplicationConfig, TickConfig, WorldConfig, ZoneConfig,
};
pub use entity::{
    AntiCheatState, CombatState, Entity, EntityId, InputFlags, InputState, NetworkState,
    PlayerInfo, Position, Velocity, World,
};
pub use error::{
    HandoffError, MigrationError, PacketError as CorePacketError, PersistenceError,
    SnapshotError, ValidationError,
};
pub use fixed::{to_fixed, to_float, FixedVec3, Rotation, FLOAT_TO_FIXED};
pub use handoff::{generate_handoff_token, ActiveHandoff, HandoffPhase, HandoffStats, ZoneHandoffController};
pub use history::{PositionHistory, PositionHistoryEntry, HISTORY_CAPACITY, HISTORY_WINDOW_MS};
pub use memory::{BlockPool, BoundedVec, TickArena};
pub use messenger::{
    decode_message, directed_channel, encode_message, CrossZoneMessage, MessageType,
    SequenceGuard, BROADCAST_CHANNEL,
};
pub use metrics::{Counter, Gauge, Histogram, ZoneMetrics, TICK_DURATION_BUCKETS_US};
pub use migration::{EntityMigrationManager, EntitySnapshot, MigrationState, MigrationStats};
pub use movement::{approach, clamp_to_world_bounds, integrate, target_velocity, validate_movement, MovementResult};
pub use packet::{frame_packet, negotiate_handshake, split_packet, HandshakeRequest, HandshakeResponse, PacketType as ClientPacketType, ProtocolVersion};
pub use persistence::{
    ban_key, new_circuit_breaker, position_key, session_key, zone_players_key, zone_status_key,
    ColdStore, CombatEventRow, HotStore, HotWrite, PlayerCombatStatsRow, WriteQueue,
};
pub use ratelimit::{CircuitBreaker, CircuitState, ConnectionThrottler, IpAddr, IpAllowList, TokenBucket, TrafficAnalyzer};
pub use replication::{FieldCulling, PriorityEntry, ReplicationTracker, Tier};
pub use snapshot::{apply_delta, decode_snapshot, encode_delta_snapshot, encode_full_snapshot, DecodedEntity, DecodedSnapshot, EntitySnapshotState};
pub use spatial::{SpatialHash, DEFAULT_CELL_SIZE};
pub use tick::{FixedTimestep, QosController, QosLevel};
pub use validator::{
    clamp_position, clamp_rotation, validate_ability_id, validate_chat_message,
    validate_input_sequence, validate_packet_size, validate_player_name, validate_speed,
};
pub use zone::{Rect, WorldPartition, ZoneDefinition, ZoneId};
