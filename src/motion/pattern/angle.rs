//! Speed + heading movement

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::{PatternHeader, StepContext};
use crate::consts::UNCAPPED;
use crate::motion::command::{AngleTag, CommandQueue};
use crate::motion::id::ObjectId;
use crate::{clamp_magnitude, normalize_angle, polar_to_cartesian};

/// Another object whose orientation biases this pattern's heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativeHeading {
    /// Add the other object's own direction angle
    Facing(ObjectId),
    /// Add the bearing from this object to the other one
    Aim(ObjectId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnglePattern {
    pub(crate) header: PatternHeader,
    speed: f64,
    acceleration: f64,
    /// Magnitude bound on `speed`, either sign
    max_speed: f64,
    angular_velocity: f64,
    angular_acceleration: f64,
    angular_max_velocity: f64,
    relative: Option<RelativeHeading>,
    /// Heading bias applied on the last step
    bias: f64,
    pub(crate) commands: CommandQueue<AngleTag>,
}

impl Default for AnglePattern {
    fn default() -> Self {
        Self::new()
    }
}

impl AnglePattern {
    pub fn new() -> Self {
        Self {
            header: PatternHeader::default(),
            speed: 0.0,
            acceleration: 0.0,
            max_speed: UNCAPPED,
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            angular_max_velocity: UNCAPPED,
            relative: None,
            bias: 0.0,
            commands: CommandQueue::default(),
        }
    }

    /// Queue a command (builder style)
    pub fn with(mut self, tag: AngleTag, value: f64) -> Self {
        self.commands.push(tag, value);
        self
    }

    pub fn with_relative(mut self, relative: RelativeHeading) -> Self {
        self.relative = Some(relative);
        self
    }

    pub fn push_command(&mut self, tag: AngleTag, value: f64) {
        self.commands.push(tag, value);
    }

    pub(crate) fn add_command(&mut self, tag: u8, value: f64) -> bool {
        match AngleTag::try_from(tag) {
            Ok(tag) => {
                self.commands.push(tag, value);
                true
            }
            Err(_) => false,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Effective heading: own direction plus the last relative bias
    pub fn direction_angle(&self) -> f64 {
        self.header.direction + self.bias
    }

    pub fn velocity(&self) -> DVec2 {
        polar_to_cartesian(self.speed, self.direction_angle())
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    pub fn angular_acceleration(&self) -> f64 {
        self.angular_acceleration
    }

    pub fn angular_max_velocity(&self) -> f64 {
        self.angular_max_velocity
    }

    pub fn relative(&self) -> Option<RelativeHeading> {
        self.relative
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
        self.sync_velocity();
    }

    pub fn set_direction_angle(&mut self, angle: f64) {
        self.header.direction = normalize_angle(angle);
        self.sync_velocity();
    }

    pub fn set_acceleration(&mut self, accel: f64) {
        self.acceleration = accel;
    }

    pub fn set_max_speed(&mut self, max: f64) {
        self.max_speed = max;
    }

    pub fn set_angular_velocity(&mut self, av: f64) {
        self.angular_velocity = av;
    }

    pub fn set_angular_acceleration(&mut self, aa: f64) {
        self.angular_acceleration = aa;
    }

    pub fn set_angular_max_velocity(&mut self, am: f64) {
        self.angular_max_velocity = am;
    }

    pub fn set_relative(&mut self, relative: Option<RelativeHeading>) {
        self.relative = relative;
        if relative.is_none() {
            self.bias = 0.0;
        }
    }

    pub(crate) fn inherit(&mut self, old: &AnglePattern) {
        self.speed = old.speed;
        self.header.direction = old.header.direction;
        self.acceleration = old.acceleration;
        self.max_speed = old.max_speed;
        self.angular_velocity = old.angular_velocity;
        self.angular_acceleration = old.angular_acceleration;
        self.angular_max_velocity = old.angular_max_velocity;
        if self.relative.is_none() {
            self.relative = old.relative;
            self.bias = old.bias;
        }
        self.sync_velocity();
    }

    pub(crate) fn inherit_motion(&mut self, speed: f64, direction: f64) {
        self.speed = speed;
        self.header.direction = normalize_angle(direction);
        self.sync_velocity();
    }

    fn apply_commands(&mut self) {
        for (tag, value) in self.commands.take() {
            match tag {
                AngleTag::SetSpeed => self.speed = value,
                AngleTag::SetAngle => self.header.direction = normalize_angle(value),
                AngleTag::SetAccel => self.acceleration = value,
                AngleTag::SetAngularVelocity => self.angular_velocity = value,
                AngleTag::SetMaxSpeed | AngleTag::SetMaxSpeed2 => self.max_speed = value,
                AngleTag::SetAngularAcceleration => self.angular_acceleration = value,
                AngleTag::SetAngularMaxVelocity => self.angular_max_velocity = value,
                AngleTag::AddSpeed => self.speed += value,
                AngleTag::AddAngle => {
                    self.header.direction = normalize_angle(self.header.direction + value)
                }
                AngleTag::AddAccel => self.acceleration += value,
                AngleTag::AddAngularVelocity => self.angular_velocity += value,
                AngleTag::AddMaxSpeed => self.max_speed += value,
                AngleTag::AddAngularAcceleration => self.angular_acceleration += value,
                AngleTag::AddAngularMaxVelocity => self.angular_max_velocity += value,
                AngleTag::SetZero => {
                    self.acceleration = 0.0;
                    self.angular_velocity = 0.0;
                    self.angular_acceleration = 0.0;
                }
            }
        }
    }

    /// Heading bias from the relative object in the motion frame, `None`
    /// when it is gone
    fn resolve_bias(&self, ctx: &StepContext<'_>) -> Option<f64> {
        let world = match self.relative? {
            RelativeHeading::Facing(id) => ctx.directory.heading(id)?,
            RelativeHeading::Aim(id) => {
                let d = ctx.directory.position(id)? - ctx.absolute;
                if d == DVec2::ZERO {
                    return Some(self.bias);
                }
                d.y.atan2(d.x)
            }
        };
        Some(normalize_angle(world - ctx.frame_rotation))
    }

    fn sync_velocity(&mut self) {
        self.header.velocity = self.velocity();
    }

    pub(crate) fn advance(&mut self, position: &mut DVec2, ctx: &StepContext<'_>) {
        self.apply_commands();

        self.speed = clamp_magnitude(self.speed + self.acceleration, self.max_speed);
        self.angular_velocity = clamp_magnitude(
            self.angular_velocity + self.angular_acceleration,
            self.angular_max_velocity,
        );
        if self.angular_velocity != 0.0 {
            self.header.direction = normalize_angle(self.header.direction + self.angular_velocity);
        }

        self.bias = match self.relative {
            Some(_) => self.resolve_bias(ctx).unwrap_or(0.0),
            None => 0.0,
        };

        self.sync_velocity();
        *position += self.header.velocity;
    }
}
