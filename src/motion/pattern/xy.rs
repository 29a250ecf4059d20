//! Component-wise movement
//!
//! `XyPattern` integrates X and Y velocity independently. `XyAnglePattern`
//! does the same in a local basis that is itself rotated by an animated
//! angle offset, so a whole X/Y trajectory can be spun around.
//!
//! Speed and direction are derived from the components. When both
//! components are exactly zero the last meaningful direction is kept, so an
//! object coming to rest does not snap to angle 0.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::PatternHeader;
use crate::consts::UNCAPPED;
use crate::motion::command::{CommandQueue, XyAngleTag, XyTag};
use crate::{clamp_magnitude, normalize_angle, rotate};

/// Add `accel` to each component and clamp each to its own magnitude bound
fn integrate_components(velocity: DVec2, accel: DVec2, max: DVec2) -> DVec2 {
    DVec2::new(
        clamp_magnitude(velocity.x + accel.x, max.x),
        clamp_magnitude(velocity.y + accel.y, max.y),
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XyPattern {
    pub(crate) header: PatternHeader,
    acceleration: DVec2,
    max_speed: DVec2,
    pub(crate) commands: CommandQueue<XyTag>,
}

impl Default for XyPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl XyPattern {
    pub fn new() -> Self {
        Self {
            header: PatternHeader::default(),
            acceleration: DVec2::ZERO,
            max_speed: DVec2::splat(UNCAPPED),
            commands: CommandQueue::default(),
        }
    }

    /// Queue a command (builder style)
    pub fn with(mut self, tag: XyTag, value: f64) -> Self {
        self.commands.push(tag, value);
        self
    }

    pub fn push_command(&mut self, tag: XyTag, value: f64) {
        self.commands.push(tag, value);
    }

    pub(crate) fn add_command(&mut self, tag: u8, value: f64) -> bool {
        match XyTag::try_from(tag) {
            Ok(tag) => {
                self.commands.push(tag, value);
                true
            }
            Err(_) => false,
        }
    }

    pub fn velocity(&self) -> DVec2 {
        self.header.velocity
    }

    pub fn speed(&self) -> f64 {
        self.header.velocity.length()
    }

    pub fn direction_angle(&self) -> f64 {
        let v = self.header.velocity;
        if v != DVec2::ZERO {
            v.y.atan2(v.x)
        } else {
            self.header.direction
        }
    }

    pub fn acceleration(&self) -> DVec2 {
        self.acceleration
    }

    pub fn max_speed(&self) -> DVec2 {
        self.max_speed
    }

    pub fn set_speed_x(&mut self, value: f64) {
        self.header.velocity.x = value;
        self.cache_direction();
    }

    pub fn set_speed_y(&mut self, value: f64) {
        self.header.velocity.y = value;
        self.cache_direction();
    }

    pub fn set_acceleration_x(&mut self, value: f64) {
        self.acceleration.x = value;
    }

    pub fn set_acceleration_y(&mut self, value: f64) {
        self.acceleration.y = value;
    }

    pub fn set_max_speed_x(&mut self, value: f64) {
        self.max_speed.x = value;
    }

    pub fn set_max_speed_y(&mut self, value: f64) {
        self.max_speed.y = value;
    }

    pub(crate) fn inherit(&mut self, old: &XyPattern) {
        self.header.velocity = old.header.velocity;
        self.header.direction = old.header.direction;
        self.acceleration = old.acceleration;
        self.max_speed = old.max_speed;
        self.cache_direction();
    }

    pub(crate) fn inherit_motion(&mut self, velocity: DVec2, direction: f64) {
        self.header.velocity = velocity;
        self.header.direction = direction;
        self.cache_direction();
    }

    fn cache_direction(&mut self) {
        self.header.direction = self.direction_angle();
    }

    fn apply_commands(&mut self) {
        for (tag, value) in self.commands.take() {
            match tag {
                XyTag::SetSpeedX => self.header.velocity.x = value,
                XyTag::SetSpeedY => self.header.velocity.y = value,
                XyTag::SetAccelX => self.acceleration.x = value,
                XyTag::SetAccelY => self.acceleration.y = value,
                XyTag::SetMaxSpeedX => self.max_speed.x = value,
                XyTag::SetMaxSpeedY => self.max_speed.y = value,
            }
        }
    }

    pub(crate) fn advance(&mut self, position: &mut DVec2) {
        self.apply_commands();
        self.header.velocity =
            integrate_components(self.header.velocity, self.acceleration, self.max_speed);
        self.cache_direction();
        *position += self.header.velocity;
    }
}

/// X/Y movement in a basis rotated by `angle_offset`.
///
/// `header.velocity` holds the local (unrotated) components. Everything
/// reported to the outside (`velocity`, `speed_x`, `direction_angle`) and
/// `set_speed_xy` work in world space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XyAnglePattern {
    pub(crate) header: PatternHeader,
    acceleration: DVec2,
    max_speed: DVec2,
    angle_offset: f64,
    angle_offset_velocity: f64,
    angle_offset_acceleration: f64,
    angle_offset_max_velocity: f64,
    pub(crate) commands: CommandQueue<XyAngleTag>,
}

impl Default for XyAnglePattern {
    fn default() -> Self {
        Self::new()
    }
}

impl XyAnglePattern {
    pub fn new() -> Self {
        Self {
            header: PatternHeader::default(),
            acceleration: DVec2::ZERO,
            max_speed: DVec2::splat(UNCAPPED),
            angle_offset: 0.0,
            angle_offset_velocity: 0.0,
            angle_offset_acceleration: 0.0,
            angle_offset_max_velocity: UNCAPPED,
            commands: CommandQueue::default(),
        }
    }

    /// Queue a command (builder style)
    pub fn with(mut self, tag: XyAngleTag, value: f64) -> Self {
        self.commands.push(tag, value);
        self
    }

    pub fn push_command(&mut self, tag: XyAngleTag, value: f64) {
        self.commands.push(tag, value);
    }

    pub(crate) fn add_command(&mut self, tag: u8, value: f64) -> bool {
        match XyAngleTag::try_from(tag) {
            Ok(tag) => {
                self.commands.push(tag, value);
                true
            }
            Err(_) => false,
        }
    }

    /// World-space velocity
    pub fn velocity(&self) -> DVec2 {
        rotate(self.header.velocity, self.angle_offset)
    }

    /// Velocity in the pattern's own (unrotated) basis
    pub fn local_velocity(&self) -> DVec2 {
        self.header.velocity
    }

    pub fn speed(&self) -> f64 {
        self.header.velocity.length()
    }

    pub fn speed_x(&self) -> f64 {
        self.velocity().x
    }

    pub fn speed_y(&self) -> f64 {
        self.velocity().y
    }

    pub fn direction_angle(&self) -> f64 {
        let v = self.header.velocity;
        if v != DVec2::ZERO {
            v.y.atan2(v.x) + self.angle_offset
        } else {
            self.header.direction
        }
    }

    pub fn angle_offset(&self) -> f64 {
        self.angle_offset
    }

    pub fn angle_offset_velocity(&self) -> f64 {
        self.angle_offset_velocity
    }

    /// Set the world-space velocity. The input is de-rotated by the current
    /// offset, so reading it straight back yields `(x, y)`.
    pub fn set_speed_xy(&mut self, x: f64, y: f64) {
        self.header.velocity = rotate(DVec2::new(x, y), -self.angle_offset);
        self.cache_direction();
    }

    pub fn set_speed_x(&mut self, x: f64) {
        let y = self.speed_y();
        self.set_speed_xy(x, y);
    }

    pub fn set_speed_y(&mut self, y: f64) {
        let x = self.speed_x();
        self.set_speed_xy(x, y);
    }

    pub fn set_local_velocity(&mut self, velocity: DVec2) {
        self.header.velocity = velocity;
        self.cache_direction();
    }

    pub fn set_acceleration_x(&mut self, value: f64) {
        self.acceleration.x = value;
    }

    pub fn set_acceleration_y(&mut self, value: f64) {
        self.acceleration.y = value;
    }

    pub fn set_max_speed_x(&mut self, value: f64) {
        self.max_speed.x = value;
    }

    pub fn set_max_speed_y(&mut self, value: f64) {
        self.max_speed.y = value;
    }

    pub fn set_angle_offset(&mut self, offset: f64) {
        self.angle_offset = normalize_angle(offset);
        self.cache_direction();
    }

    pub fn set_angular_velocity(&mut self, av: f64) {
        self.angle_offset_velocity = av;
    }

    pub fn set_angular_acceleration(&mut self, aa: f64) {
        self.angle_offset_acceleration = aa;
    }

    pub fn set_angular_max_velocity(&mut self, am: f64) {
        self.angle_offset_max_velocity = am;
    }

    pub(crate) fn inherit(&mut self, old: &XyAnglePattern) {
        self.header.velocity = old.header.velocity;
        self.header.direction = old.header.direction;
        self.acceleration = old.acceleration;
        self.max_speed = old.max_speed;
        self.angle_offset = old.angle_offset;
        self.angle_offset_velocity = old.angle_offset_velocity;
        self.angle_offset_acceleration = old.angle_offset_acceleration;
        self.angle_offset_max_velocity = old.angle_offset_max_velocity;
        self.cache_direction();
    }

    pub(crate) fn inherit_motion(&mut self, velocity: DVec2, direction: f64) {
        self.angle_offset = 0.0;
        self.header.velocity = velocity;
        self.header.direction = direction;
        self.cache_direction();
    }

    fn cache_direction(&mut self) {
        self.header.direction = self.direction_angle();
    }

    fn apply_commands(&mut self) {
        for (tag, value) in self.commands.take() {
            match tag {
                XyAngleTag::SetSpeedX => self.header.velocity.x = value,
                XyAngleTag::SetSpeedY => self.header.velocity.y = value,
                XyAngleTag::SetAccelX => self.acceleration.x = value,
                XyAngleTag::SetAccelY => self.acceleration.y = value,
                XyAngleTag::SetMaxSpeedX => self.max_speed.x = value,
                XyAngleTag::SetMaxSpeedY => self.max_speed.y = value,
                XyAngleTag::SetAngleOffset => self.angle_offset = normalize_angle(value),
                XyAngleTag::SetAngularVelocity => self.angle_offset_velocity = value,
                XyAngleTag::SetAngularAcceleration => self.angle_offset_acceleration = value,
                XyAngleTag::SetAngularMaxVelocity => self.angle_offset_max_velocity = value,
            }
        }
    }

    pub(crate) fn advance(&mut self, position: &mut DVec2) {
        self.apply_commands();

        self.header.velocity =
            integrate_components(self.header.velocity, self.acceleration, self.max_speed);
        self.angle_offset_velocity = clamp_magnitude(
            self.angle_offset_velocity + self.angle_offset_acceleration,
            self.angle_offset_max_velocity,
        );
        if self.angle_offset_velocity != 0.0 {
            self.angle_offset = normalize_angle(self.angle_offset + self.angle_offset_velocity);
        }

        self.cache_direction();
        *position += self.velocity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_xy_components_integrate_independently() {
        let mut p = XyPattern::new()
            .with(XyTag::SetSpeedX, 1.0)
            .with(XyTag::SetAccelY, 0.5)
            .with(XyTag::SetMaxSpeedY, 1.0);
        let mut pos = DVec2::ZERO;
        for _ in 0..4 {
            p.advance(&mut pos);
        }
        assert_eq!(p.velocity(), DVec2::new(1.0, 1.0));
        // y speeds: 0.5, 1.0, 1.0, 1.0
        assert_eq!(pos, DVec2::new(4.0, 3.5));
    }

    #[test]
    fn test_xy_negative_component_clamps_symmetrically() {
        let mut p = XyPattern::new()
            .with(XyTag::SetAccelX, -2.0)
            .with(XyTag::SetMaxSpeedX, 3.0);
        let mut pos = DVec2::ZERO;
        p.advance(&mut pos);
        p.advance(&mut pos);
        assert_eq!(p.velocity().x, -3.0);
    }

    #[test]
    fn test_xy_direction_held_at_rest() {
        let mut p = XyPattern::new()
            .with(XyTag::SetSpeedX, 0.0)
            .with(XyTag::SetSpeedY, 2.0);
        let mut pos = DVec2::ZERO;
        p.advance(&mut pos);
        assert!((p.direction_angle() - FRAC_PI_2).abs() < 1e-12);

        p.push_command(XyTag::SetSpeedY, 0.0);
        for _ in 0..5 {
            p.advance(&mut pos);
            assert_eq!(p.speed(), 0.0);
            assert!((p.direction_angle() - FRAC_PI_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_xy_decelerating_through_zero_keeps_last_heading() {
        let mut p = XyPattern::new();
        p.set_speed_x(-1.0);
        p.set_speed_x(0.0);
        assert!((p.direction_angle() - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_xy_angle_rotates_motion() {
        let mut p = XyAnglePattern::new()
            .with(XyAngleTag::SetSpeedX, 1.0)
            .with(XyAngleTag::SetAngleOffset, FRAC_PI_2);
        let mut pos = DVec2::ZERO;
        p.advance(&mut pos);
        assert!(pos.x.abs() < 1e-12);
        assert!((pos.y - 1.0).abs() < 1e-12);
        assert!((p.direction_angle() - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_xy_angle_offset_spins() {
        let mut p = XyAnglePattern::new()
            .with(XyAngleTag::SetSpeedX, 1.0)
            .with(XyAngleTag::SetAngularVelocity, FRAC_PI_4);
        let mut pos = DVec2::ZERO;
        p.advance(&mut pos);
        p.advance(&mut pos);
        assert!((p.angle_offset() - FRAC_PI_2).abs() < 1e-12);
        assert!(p.speed_x().abs() < 1e-12);
        assert!((p.speed_y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_xy_angle_single_component_setter_is_world_space() {
        let mut p = XyAnglePattern::new();
        p.set_angle_offset(FRAC_PI_4);
        p.set_speed_xy(1.0, 2.0);
        p.set_speed_x(3.0);
        assert!((p.speed_x() - 3.0).abs() < 1e-12);
        assert!((p.speed_y() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_xy_angle_direction_held_at_rest() {
        let mut p = XyAnglePattern::new();
        p.set_angle_offset(0.5);
        p.set_speed_xy(0.0, 1.0);
        let held = p.direction_angle();
        p.set_speed_xy(0.0, 0.0);
        let mut pos = DVec2::ZERO;
        p.advance(&mut pos);
        assert!((p.direction_angle() - held).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_set_speed_xy_roundtrip(
            x in -1000.0f64..1000.0,
            y in -1000.0f64..1000.0,
            offset in -10.0f64..10.0,
        ) {
            let mut p = XyAnglePattern::new();
            p.set_angle_offset(offset);
            p.set_speed_xy(x, y);
            let tol = 1e-9 * x.abs().max(y.abs()).max(1.0);
            prop_assert!((p.speed_x() - x).abs() <= tol);
            prop_assert!((p.speed_y() - y).abs() <= tol);
        }
    }
}
