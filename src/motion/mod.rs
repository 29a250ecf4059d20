//! Entity kinematics: objects, patterns, parent transforms and scheduling

pub mod command;
pub mod easing;
pub mod id;
pub mod object;
pub mod pattern;
pub mod schedule;
pub mod transform;
pub mod world;

pub use command::{AngleTag, CommandQueue, LineTag, XyAngleTag, XyTag};
pub use easing::{EaseFn, Easing};
pub use id::ObjectId;
pub use object::MoveObject;
pub use pattern::{
    AnglePattern, EmptyDirectory, LineMode, LinePattern, MovePattern, ObjectDirectory,
    PatternHeader, PatternKind, RelativeHeading, StepContext, XyAnglePattern, XyPattern,
};
pub use schedule::PatternSchedule;
pub use transform::ParentTransform;
pub use world::MoveWorld;
