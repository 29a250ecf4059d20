//! Interpolation curves for frame-timed line movement
//!
//! Each curve maps progress `t` in [0, 1] to a fraction of the way travelled,
//! with `value(0) == 0` and `value(1) == 1`, and provides its derivative so a
//! pattern can report its instantaneous speed.

use serde::{Deserialize, Serialize};

/// Signature of a caller-supplied curve or derivative
pub type EaseFn = fn(f64) -> f64;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    /// Smoothstep: 3t² - 2t³
    Smooth,
    /// Smootherstep: 6t⁵ - 15t⁴ + 10t³
    Smoother,
    /// Starts slow: t²
    Accelerate,
    /// Ends slow: 1 - (1 - t)²
    Decelerate,
    /// Caller-supplied curve and derivative (not serialisable)
    #[serde(skip)]
    Custom { value: EaseFn, rate: EaseFn },
}

impl Easing {
    /// Built-in curve by script index: linear, smooth, smoother, accelerate, decelerate
    pub fn from_index(index: f64) -> Option<Easing> {
        if index.fract() != 0.0 {
            return None;
        }
        match index as i64 {
            0 => Some(Easing::Linear),
            1 => Some(Easing::Smooth),
            2 => Some(Easing::Smoother),
            3 => Some(Easing::Accelerate),
            4 => Some(Easing::Decelerate),
            _ => None,
        }
    }

    pub fn value(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::Smooth => t * t * (3.0 - 2.0 * t),
            Easing::Smoother => t * t * t * (t * (t * 6.0 - 15.0) + 10.0),
            Easing::Accelerate => t * t,
            Easing::Decelerate => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::Custom { value, .. } => value(t),
        }
    }

    /// d(value)/dt at `t`
    pub fn rate(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => 1.0,
            Easing::Smooth => 6.0 * t * (1.0 - t),
            Easing::Smoother => 30.0 * t * t * (t - 1.0) * (t - 1.0),
            Easing::Accelerate => 2.0 * t,
            Easing::Decelerate => 2.0 * (1.0 - t),
            Easing::Custom { rate, .. } => rate(t),
        }
    }
}
