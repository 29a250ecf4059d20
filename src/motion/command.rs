//! Deferred property mutations
//!
//! Scripts never poke kinematic fields mid-frame. They queue `(tag, value)`
//! pairs which the pattern applies, in submission order, at the start of its
//! next `advance`. Several changes issued during one tick therefore land
//! together on the next integration step.
//!
//! Tags are numeric on the script side; each pattern family has its own tag
//! space, decoded here.

use serde::{Deserialize, Serialize};

use crate::consts::NO_CHANGE;

macro_rules! command_tags {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(tag: u8) -> Result<Self, u8> {
                match tag {
                    $($value => Ok($name::$variant),)+
                    other => Err(other),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(tag: $name) -> u8 {
                tag as u8
            }
        }
    };
}

command_tags! {
    /// Angle pattern commands
    AngleTag {
        SetSpeed = 0,
        SetAngle = 1,
        SetAccel = 2,
        SetAngularVelocity = 3,
        SetMaxSpeed = 4,
        /// Second spelling of `SetMaxSpeed`, kept so script tag numbers line up
        SetMaxSpeed2 = 5,
        SetAngularAcceleration = 6,
        SetAngularMaxVelocity = 7,
        AddSpeed = 8,
        AddAngle = 9,
        AddAccel = 10,
        AddAngularVelocity = 11,
        AddMaxSpeed = 12,
        AddAngularAcceleration = 13,
        AddAngularMaxVelocity = 14,
        /// Zero acceleration, angular velocity and angular acceleration
        SetZero = 255,
    }
}

command_tags! {
    /// XY pattern commands
    XyTag {
        SetSpeedX = 0,
        SetSpeedY = 1,
        SetAccelX = 2,
        SetAccelY = 3,
        SetMaxSpeedX = 4,
        SetMaxSpeedY = 5,
    }
}

command_tags! {
    /// XY + angle offset pattern commands
    XyAngleTag {
        SetSpeedX = 0,
        SetSpeedY = 1,
        SetAccelX = 2,
        SetAccelY = 3,
        SetMaxSpeedX = 4,
        SetMaxSpeedY = 5,
        SetAngleOffset = 6,
        SetAngularVelocity = 7,
        SetAngularAcceleration = 8,
        SetAngularMaxVelocity = 9,
    }
}

command_tags! {
    /// Line pattern commands
    LineTag {
        SetTargetX = 0,
        SetTargetY = 1,
        SetSpeed = 2,
        SetFrame = 3,
        SetWeight = 4,
        SetMaxSpeed = 5,
        /// Frame-mode easing curve by index, see [`Easing::from_index`]
        ///
        /// [`Easing::from_index`]: crate::motion::Easing::from_index
        SetEasing = 6,
    }
}

/// Ordered list of commands waiting for the next `advance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandQueue<T> {
    pending: Vec<(T, f64)>,
}

impl<T> Default for CommandQueue<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<T: Copy> CommandQueue<T> {
    pub fn push(&mut self, tag: T, value: f64) {
        self.pending.push((tag, value));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every queued command in submission order, leaving the queue empty.
    /// Commands carrying [`NO_CHANGE`] are dropped here.
    pub fn take(&mut self) -> Vec<(T, f64)> {
        let mut pending = std::mem::take(&mut self.pending);
        pending.retain(|&(_, value)| value != NO_CHANGE);
        pending
    }
}
