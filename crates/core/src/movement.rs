//! Input-to-velocity integration and server-authoritative movement
//! validation. Movement is resolved every tick for every entity carrying
//! `{Position, Velocity, InputState}`.

use crate::config::{MovementConfig, WorldConfig};
use crate::entity::InputFlags;
use crate::fixed::FixedVec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementResult {
    pub valid: bool,
    pub corrected_position: FixedVec3,
    pub corrected_velocity: FixedVec3,
    pub anticheat_triggered: bool,
    pub reason: Option<&'static str>,
}

/// Derives a target horizontal velocity from input flags projected onto
/// `yaw`, magnitude `maxSpeed * (sprint ? sprintMult : 1)`.
pub fn target_velocity(flags: InputFlags, yaw: f32, cfg: &MovementConfig) -> glam::Vec2 {
    let mut dir = glam::Vec2::ZERO;
    let forward = glam::Vec2::new(yaw.sin(), yaw.cos());
    let right = glam::Vec2::new(forward.y, -forward.x);

    if flags.contains(InputFlags::FORWARD) {
        dir += forward;
    }
    if flags.contains(InputFlags::BACKWARD) {
        dir -= forward;
    }
    if flags.contains(InputFlags::RIGHT) {
        dir += right;
    }
    if flags.contains(InputFlags::LEFT) {
        dir -= right;
    }

    if dir.length_squared() < 1e-6 {
        return glam::Vec2::ZERO;
    }

    let speed = if flags.contains(InputFlags::SPRINT) {
        cfg.max_speed * cfg.sprint_multiplier
    } else {
        cfg.max_speed
    };
    dir.normalize() * speed
}

/// Approaches `current` toward `target` at `rate` units/s² over `dt`
/// seconds; when `target` is zero, this is friction deceleration.
pub fn approach(current: glam::Vec2, target: glam::Vec2, rate: f32, dt: f32) -> glam::Vec2 {
    let delta = target - current;
    let max_step = rate * dt;
    if delta.length() <= max_step {
        target
    } else {
        current + delta.normalize() * max_step
    }
}

pub fn clamp_to_world_bounds(pos: glam::Vec3, world: &WorldConfig) -> glam::Vec3 {
    glam::Vec3::new(
        pos.x.clamp(world.world_min_x - world_aura(world), world.world_max_x + world_aura(world)),
        pos.y.clamp(world.world_min_y, world.world_max_y),
        pos.z.clamp(world.world_min_z - world_aura(world), world.world_max_z + world_aura(world)),
    )
}

fn world_aura(world: &WorldConfig) -> f32 {
    world.aura_buffer_meters
}

/// One tick of movement for a single entity: integrate velocity, clamp to
/// world bounds. Horizontal velocity already reflects the approach toward
/// `target_velocity`; vertical velocity (gravity/jump) is left to the
/// caller's physics step and passed through unchanged here.
pub fn integrate(
    position: glam::Vec3,
    horizontal_velocity: glam::Vec2,
    vertical_velocity: f32,
    dt: f32,
    world: &WorldConfig,
) -> (glam::Vec3, glam::Vec3) {
    let velocity = glam::Vec3::new(horizontal_velocity.x, vertical_velocity, horizontal_velocity.y);
    let next = position + velocity * dt;
    (clamp_to_world_bounds(next, world), velocity)
}

/// Answers: is the straight-line displacement from `old` to `new`
/// achievable within `dt_ms` at `max_speed * tolerance`? On failure,
/// returns a correction to `last_valid_position`.
pub fn validate_movement(
    old: FixedVec3,
    new: FixedVec3,
    dt_ms: u32,
    max_speed: f32,
    tolerance: f32,
    last_valid_position: FixedVec3,
) -> MovementResult {
    let dist_sq = old.distance_squared_xz(new);
    let dt_secs = dt_ms as f32 / 1000.0;
    let max_distance = max_speed * tolerance * dt_secs;
    let max_distance_fixed = (max_distance * crate::fixed::FLOAT_TO_FIXED as f32) as i64;

    if dist_sq <= max_distance_fixed * max_distance_fixed {
        MovementResult {
            valid: true,
            corrected_position: new,
            corrected_velocity: FixedVec3::ZERO,
            anticheat_triggered: false,
            reason: None,
        }
    } else {
        MovementResult {
            valid: false,
            corrected_position: last_valid_position,
            corrected_velocity: FixedVec3::ZERO,
            anticheat_triggered: true,
            reason: Some("speed_exceeds_max"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_velocity_zero_when_no_input() {
        let cfg = MovementConfig::default();
        let v = target_velocity(InputFlags::empty(), 0.0, &cfg);
        assert_eq!(v, glam::Vec2::ZERO);
    }

    #[test]
    fn target_velocity_sprint_scales_speed() {
        let cfg = MovementConfig::default();
        let walk = target_velocity(InputFlags::FORWARD, 0.0, &cfg);
        let sprint = target_velocity(InputFlags::FORWARD | InputFlags::SPRINT, 0.0, &cfg);
        assert!((sprint.length() - walk.length() * cfg.sprint_multiplier).abs() < 1e-4);
    }

    #[test]
    fn approach_does_not_overshoot() {
        let result = approach(glam::Vec2::ZERO, glam::Vec2::new(1.0, 0.0), 100.0, 0.1);
        assert_eq!(result, glam::Vec2::new(1.0, 0.0));
    }

    #[test]
    fn clamp_respects_aura_buffer() {
        let world = WorldConfig::default();
        let clamped = clamp_to_world_bounds(glam::Vec3::new(10_000.0, 0.0, 0.0), &world);
        assert_eq!(clamped.x, world.world_max_x + world.aura_buffer_meters);
    }

    #[test]
    fn validate_movement_accepts_reasonable_displacement() {
        let old = FixedVec3::new(0, 0, 0);
        let new = FixedVec3::from_float(0.1, 0.0, 0.0);
        let result = validate_movement(old, new, 16, 6.0, 1.2, old);
        assert!(result.valid);
    }

    #[test]
    fn validate_movement_rejects_speed_hack() {
        let old = FixedVec3::new(0, 0, 0);
        let new = FixedVec3::from_float(20.0, 0.0, 0.0);
        let result = validate_movement(old, new, 50, 6.0, 1.2, old);
        assert!(!result.valid);
        assert_eq!(result.corrected_position, old);
        assert!(result.anticheat_triggered);
    }
}
