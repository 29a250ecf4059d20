//! Parent-relative rigid transform
//!
//! A child's relative position lives in its parent's local frame, which is
//! rotated by `rotation` degrees and uniformly scaled by `scale`:
//!
//! ```text
//! absolute = parent + R * relative        R    = scale * Rot(rotation)
//! relative = R⁻¹ * (absolute - parent)    R⁻¹  = (1 / scale) * Rot(-rotation)
//! ```
//!
//! Both matrices are stored as two row vectors and only rebuilt when the
//! rotation or scale changes.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_PARENT_SCALE;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParentTransform {
    /// Rotation in degrees
    rotation: f64,
    scale: f64,
    /// Relative -> absolute rows
    r2a_x: DVec2,
    r2a_y: DVec2,
    /// Absolute -> relative rows (zero when the scale is degenerate)
    a2r_x: DVec2,
    a2r_y: DVec2,
}

impl Default for ParentTransform {
    fn default() -> Self {
        Self::new(0.0, DEFAULT_PARENT_SCALE)
    }
}

impl ParentTransform {
    pub fn new(rotation_deg: f64, scale: f64) -> Self {
        let (sin, cos) = rotation_deg.to_radians().sin_cos();
        let (a2r_x, a2r_y) = if scale != 0.0 && scale.is_finite() {
            (
                DVec2::new(cos / scale, sin / scale),
                DVec2::new(-sin / scale, cos / scale),
            )
        } else {
            (DVec2::ZERO, DVec2::ZERO)
        };
        Self {
            rotation: rotation_deg,
            scale,
            r2a_x: DVec2::new(cos * scale, -sin * scale),
            r2a_y: DVec2::new(sin * scale, cos * scale),
            a2r_x,
            a2r_y,
        }
    }

    #[inline]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whether absolute positions can be mapped back into the parent frame
    #[inline]
    pub fn is_invertible(&self) -> bool {
        self.scale != 0.0 && self.scale.is_finite()
    }

    /// Map a relative offset to an absolute position
    #[inline]
    pub fn to_absolute(&self, parent: DVec2, relative: DVec2) -> DVec2 {
        parent + DVec2::new(self.r2a_x.dot(relative), self.r2a_y.dot(relative))
    }

    /// Map an absolute position back to a relative offset.
    ///
    /// Returns `None` for a zero scale: every relative offset maps onto the
    /// parent, so there is no single answer.
    #[inline]
    pub fn to_relative(&self, parent: DVec2, absolute: DVec2) -> Option<DVec2> {
        if !self.is_invertible() {
            return None;
        }
        let d = absolute - parent;
        Some(DVec2::new(self.a2r_x.dot(d), self.a2r_y.dot(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quarter_turn_maps_x_to_y() {
        let t = ParentTransform::new(90.0, 1.0);
        let abs = t.to_absolute(DVec2::ZERO, DVec2::new(1.0, 0.0));
        assert!(abs.x.abs() < 1e-12);
        assert!((abs.y - 1.0).abs() < 1e-12);

        let rel = t.to_relative(DVec2::ZERO, abs).unwrap();
        assert!((rel.x - 1.0).abs() < 1e-12);
        assert!(rel.y.abs() < 1e-12);
    }

    #[test]
    fn test_scale_and_offset() {
        let t = ParentTransform::new(0.0, 2.0);
        let abs = t.to_absolute(DVec2::new(10.0, 5.0), DVec2::new(1.0, -1.0));
        assert_eq!(abs, DVec2::new(12.0, 3.0));
    }

    #[test]
    fn test_zero_scale_has_no_inverse() {
        let t = ParentTransform::new(30.0, 0.0);
        assert!(!t.is_invertible());
        assert_eq!(t.to_relative(DVec2::ZERO, DVec2::ONE), None);
        assert_eq!(t.to_absolute(DVec2::ONE, DVec2::new(4.0, 4.0)), DVec2::ONE);
    }

    proptest! {
        #[test]
        fn prop_relative_absolute_roundtrip(
            rot in -720.0f64..720.0,
            scale in 0.05f64..20.0,
            px in -500.0f64..500.0,
            py in -500.0f64..500.0,
            rx in -500.0f64..500.0,
            ry in -500.0f64..500.0,
        ) {
            let t = ParentTransform::new(rot, scale);
            let parent = DVec2::new(px, py);
            let rel = DVec2::new(rx, ry);
            let back = t.to_relative(parent, t.to_absolute(parent, rel)).unwrap();
            prop_assert!((back - rel).length() < 1e-6);
        }
    }
}
