//! Fixed-point world math: positions, velocities, and distances as integers
//! so simulation results are bit-identical across platforms.

/// 1 fixed-point unit ≈ 1 mm.
pub const FLOAT_TO_FIXED: i64 = 1000;

#[inline]
pub fn to_fixed(v: f32) -> i32 {
    (v as f64 * FLOAT_TO_FIXED as f64).round() as i32
}

#[inline]
pub fn to_float(v: i32) -> f32 {
    (v as f64 / FLOAT_TO_FIXED as f64) as f32
}

/// A fixed-point 3D vector, `(x, y, z)` in 1/1000-unit increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedVec3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl FixedVec3 {
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn from_float(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: to_fixed(x),
            y: to_fixed(y),
            z: to_fixed(z),
        }
    }

    pub fn to_glam(self) -> glam::Vec3 {
        glam::Vec3::new(to_float(self.x), to_float(self.y), to_float(self.z))
    }

    pub fn from_glam(v: glam::Vec3) -> Self {
        Self::from_float(v.x, v.y, v.z)
    }

    /// Squared distance, staying entirely in fixed-point (i64 to avoid overflow).
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance_squared_xz(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, dt_secs: f32) -> Self {
        Self::new(
            (self.x as f32 * dt_secs) as i32,
            (self.y as f32 * dt_secs) as i32,
            (self.z as f32 * dt_secs) as i32,
        )
    }

    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self::new(
            a.x + ((b.x - a.x) as f32 * t) as i32,
            a.y + ((b.y - a.y) as f32 * t) as i32,
            a.z + ((b.z - a.z) as f32 * t) as i32,
        )
    }
}

/// `(yaw, pitch)` in radians. `yaw ∈ [0, 2π)`, `pitch ∈ [-π/2, π/2]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Rotation {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        let mut r = Self { yaw, pitch };
        r.normalize();
        r
    }

    pub fn normalize(&mut self) {
        let two_pi = std::f32::consts::TAU;
        self.yaw = self.yaw.rem_euclid(two_pi);
        self.pitch = self.pitch.clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
    }

    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self::new(a.yaw + (b.yaw - a.yaw) * t, a.pitch + (b.pitch - a.pitch) * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_roundtrip() {
        let v = to_fixed(1.234);
        assert_eq!(v, 1234);
        assert!((to_float(v) - 1.234).abs() < 1e-3);
    }

    #[test]
    fn distance_squared_matches_pythagoras() {
        let a = FixedVec3::new(0, 0, 0);
        let b = FixedVec3::new(3000, 0, 4000);
        assert_eq!(a.distance_squared(b), 25_000_000);
    }

    #[test]
    fn lerp_midpoint() {
        let a = FixedVec3::new(0, 0, 0);
        let b = FixedVec3::new(1000, 0, 0);
        let mid = FixedVec3::lerp(a, b, 0.5);
        assert_eq!(mid.x, 500);
    }

    #[test]
    fn rotation_wraps_yaw() {
        let r = Rotation::new(-0.1, 0.0);
        assert!(r.yaw >= 0.0 && r.yaw < std::f32::consts::TAU);
    }

    #[test]
    fn rotation_clamps_pitch() {
        let r = Rotation::new(0.0, 10.0);
        assert!((r.pitch - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
