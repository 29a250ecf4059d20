//! Danmaku Motion - movement core for bullet-hell shooting games
//!
//! Core modules:
//! - `motion`: Per-frame kinematics (movement patterns, scheduler, parent transforms)
//! - `scenario`: Data-driven scenario files and a headless runner
//! - `error`: Error type for operations that can be diagnosed by the caller

pub mod error;
pub mod motion;
pub mod scenario;

pub use error::{MotionError, Result};
pub use scenario::{Scenario, Trajectory};

use glam::DVec2;

/// Motion configuration constants
pub mod consts {
    /// Command value meaning "leave this field as it is"
    pub const NO_CHANGE: f64 = -16_777_216.0;
    /// Default maximum for speeds and angular velocities (effectively no cap)
    pub const UNCAPPED: f64 = 16_777_216.0;
    /// Remaining distances at or below this count as arrived for line patterns
    pub const ARRIVAL_EPSILON: f64 = 1e-9;
    /// Parent scale of a freshly spawned object
    pub const DEFAULT_PARENT_SCALE: f64 = 1.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    angle = (angle + PI).rem_euclid(TAU) - PI;
    if angle >= PI {
        angle -= TAU;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: DVec2) -> (f64, f64) {
    (pos.length(), pos.y.atan2(pos.x))
}

/// Rotate a vector counter-clockwise by `angle` radians
#[inline]
pub fn rotate(v: DVec2, angle: f64) -> DVec2 {
    let (sin, cos) = angle.sin_cos();
    DVec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Clamp `value` to `[-|bound|, |bound|]`. A NaN bound leaves `value` alone.
#[inline]
pub fn clamp_magnitude(value: f64, bound: f64) -> f64 {
    if bound.is_nan() {
        return value;
    }
    let bound = bound.abs();
    value.clamp(-bound, bound)
}
