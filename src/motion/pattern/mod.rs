//! Movement patterns
//!
//! A pattern decides how an object's velocity evolves from one frame to the
//! next. Patterns are a closed set, dispatched by `match`:
//! - `Angle`: speed + heading, with acceleration and angular velocity
//! - `Xy`: independent X/Y velocity components
//! - `XyAngle`: X/Y components rotated by an animated angle offset
//! - `Line`: point-to-point travel timed by speed, frame count or weight
//!
//! When a pattern replaces another one, [`MovePattern::activate`] carries the
//! outgoing motion over (current speed, heading, velocity) so the object does
//! not stop dead between patterns.

pub mod angle;
pub mod line;
pub mod xy;

pub use angle::{AnglePattern, RelativeHeading};
pub use line::{LineMode, LinePattern};
pub use xy::{XyAnglePattern, XyPattern};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::id::ObjectId;

/// Pattern family, for introspection and compatibility checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PatternKind {
    /// No pattern: the object stands still
    #[default]
    None,
    Angle,
    Xy,
    XyAngle,
    Line,
}

/// Read-only view of other objects, supplied by whoever owns the objects
pub trait ObjectDirectory {
    /// Absolute position of `id`, if it still exists
    fn position(&self, id: ObjectId) -> Option<DVec2>;
    /// World-space direction angle of `id` (radians), if it still exists
    fn heading(&self, id: ObjectId) -> Option<f64>;
}

/// Directory that knows no objects, for patterns stepped on their own
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDirectory;

impl ObjectDirectory for EmptyDirectory {
    fn position(&self, _id: ObjectId) -> Option<DVec2> {
        None
    }

    fn heading(&self, _id: ObjectId) -> Option<f64> {
        None
    }
}

/// What a pattern may look at while stepping
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// Absolute position of the moving object before this step
    pub absolute: DVec2,
    /// World-space angle (radians) of the motion frame's x axis; zero for roots
    pub frame_rotation: f64,
    pub directory: &'a dyn ObjectDirectory,
}

impl<'a> StepContext<'a> {
    pub fn new(absolute: DVec2, directory: &'a dyn ObjectDirectory) -> Self {
        Self {
            absolute,
            frame_rotation: 0.0,
            directory,
        }
    }

    pub fn with_frame_rotation(mut self, radians: f64) -> Self {
        self.frame_rotation = radians;
        self
    }
}

/// State shared by every pattern family
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternHeader {
    /// Object this pattern drives (non-owning)
    pub(crate) owner: Option<ObjectId>,
    /// Frames since activation
    pub(crate) frame_work: u32,
    /// Opaque payload for rendering/scripting; `None` inherits on activation
    pub(crate) shot_data_id: Option<i32>,
    /// Cached Cartesian velocity (c, s)
    pub(crate) velocity: DVec2,
    /// Last meaningful direction angle (radians)
    pub(crate) direction: f64,
    /// Kind of the pattern this one replaced when it was activated
    pub(crate) previous_kind: PatternKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MovePattern {
    Angle(AnglePattern),
    Xy(XyPattern),
    XyAngle(XyAnglePattern),
    Line(LinePattern),
}

impl From<AnglePattern> for MovePattern {
    fn from(p: AnglePattern) -> Self {
        MovePattern::Angle(p)
    }
}

impl From<XyPattern> for MovePattern {
    fn from(p: XyPattern) -> Self {
        MovePattern::Xy(p)
    }
}

impl From<XyAnglePattern> for MovePattern {
    fn from(p: XyAnglePattern) -> Self {
        MovePattern::XyAngle(p)
    }
}

impl From<LinePattern> for MovePattern {
    fn from(p: LinePattern) -> Self {
        MovePattern::Line(p)
    }
}

impl MovePattern {
    pub fn kind(&self) -> PatternKind {
        match self {
            MovePattern::Angle(_) => PatternKind::Angle,
            MovePattern::Xy(_) => PatternKind::Xy,
            MovePattern::XyAngle(_) => PatternKind::XyAngle,
            MovePattern::Line(_) => PatternKind::Line,
        }
    }

    pub fn header(&self) -> &PatternHeader {
        match self {
            MovePattern::Angle(p) => &p.header,
            MovePattern::Xy(p) => &p.header,
            MovePattern::XyAngle(p) => &p.header,
            MovePattern::Line(p) => &p.header,
        }
    }

    fn header_mut(&mut self) -> &mut PatternHeader {
        match self {
            MovePattern::Angle(p) => &mut p.header,
            MovePattern::Xy(p) => &mut p.header,
            MovePattern::XyAngle(p) => &mut p.header,
            MovePattern::Line(p) => &mut p.header,
        }
    }

    pub fn owner(&self) -> Option<ObjectId> {
        self.header().owner
    }

    pub(crate) fn set_owner(&mut self, owner: ObjectId) {
        self.header_mut().owner = Some(owner);
    }

    /// Frames since this pattern became active
    pub fn frame_work(&self) -> u32 {
        self.header().frame_work
    }

    pub fn shot_data_id(&self) -> Option<i32> {
        self.header().shot_data_id
    }

    pub fn set_shot_data_id(&mut self, id: i32) {
        self.header_mut().shot_data_id = Some(id);
    }

    /// Kind of the pattern that was active right before this one
    pub fn previous_kind(&self) -> PatternKind {
        self.header().previous_kind
    }

    pub fn speed(&self) -> f64 {
        match self {
            MovePattern::Angle(p) => p.speed(),
            MovePattern::Xy(p) => p.speed(),
            MovePattern::XyAngle(p) => p.speed(),
            MovePattern::Line(p) => p.speed(),
        }
    }

    /// Direction of travel in radians. Families that are momentarily at rest
    /// report the last direction they had.
    pub fn direction_angle(&self) -> f64 {
        match self {
            MovePattern::Angle(p) => p.direction_angle(),
            MovePattern::Xy(p) => p.direction_angle(),
            MovePattern::XyAngle(p) => p.direction_angle(),
            MovePattern::Line(p) => p.direction_angle(),
        }
    }

    /// Velocity in the object's motion space
    pub fn velocity(&self) -> DVec2 {
        match self {
            MovePattern::Angle(p) => p.velocity(),
            MovePattern::Xy(p) => p.velocity(),
            MovePattern::XyAngle(p) => p.velocity(),
            MovePattern::Line(p) => p.velocity(),
        }
    }

    pub fn speed_x(&self) -> f64 {
        self.velocity().x
    }

    pub fn speed_y(&self) -> f64 {
        self.velocity().y
    }

    /// Queue a numeric `(tag, value)` command as the scripting layer sends it.
    ///
    /// Returns `false` (and queues nothing) when `tag` does not exist for this
    /// pattern's family.
    pub fn add_command(&mut self, tag: u8, value: f64) -> bool {
        let accepted = match self {
            MovePattern::Angle(p) => p.add_command(tag, value),
            MovePattern::Xy(p) => p.add_command(tag, value),
            MovePattern::XyAngle(p) => p.add_command(tag, value),
            MovePattern::Line(p) => p.add_command(tag, value),
        };
        if !accepted {
            log::warn!(
                "Dropping command tag {} for {:?} pattern (value {})",
                tag,
                self.kind(),
                value
            );
        }
        accepted
    }

    pub fn pending_commands(&self) -> usize {
        match self {
            MovePattern::Angle(p) => p.commands.len(),
            MovePattern::Xy(p) => p.commands.len(),
            MovePattern::XyAngle(p) => p.commands.len(),
            MovePattern::Line(p) => p.commands.len(),
        }
    }

    /// Deep copy bound to a different object
    pub fn create_copy(&self, target: ObjectId) -> MovePattern {
        let mut copy = self.clone();
        copy.set_owner(target);
        copy
    }

    /// Make this pattern the active one, taking over from `previous`.
    ///
    /// `position` is the object's position in motion space (relative to its
    /// parent when it has one); line patterns start from there.
    pub fn activate(&mut self, previous: Option<&MovePattern>, position: DVec2) {
        let header = self.header_mut();
        header.frame_work = 0;
        header.previous_kind = previous.map_or(PatternKind::None, MovePattern::kind);

        if let Some(previous) = previous {
            if self.header().shot_data_id.is_none() {
                self.header_mut().shot_data_id = previous.shot_data_id();
            }
            self.carry_over(previous);
        }

        if let MovePattern::Line(line) = self {
            line.start(position);
        }

        log::debug!(
            "Activated {:?} pattern (replacing {:?}) at ({:.2}, {:.2})",
            self.kind(),
            self.previous_kind(),
            position.x,
            position.y
        );
    }

    /// Continuity transfer from the outgoing pattern, one arm per (new, old) pair
    fn carry_over(&mut self, old: &MovePattern) {
        use MovePattern::{Angle, Line, Xy, XyAngle};

        match (self, old) {
            (Angle(new), Angle(old)) => new.inherit(old),
            (Angle(new), old @ (Xy(_) | XyAngle(_) | Line(_))) => {
                new.inherit_motion(old.speed(), old.direction_angle())
            }

            (Xy(new), Xy(old)) => new.inherit(old),
            (Xy(new), old @ (Angle(_) | XyAngle(_) | Line(_))) => {
                new.inherit_motion(old.velocity(), old.direction_angle())
            }

            (XyAngle(new), XyAngle(old)) => new.inherit(old),
            (XyAngle(new), old @ (Angle(_) | Xy(_) | Line(_))) => {
                new.inherit_motion(old.velocity(), old.direction_angle())
            }

            (Line(new), old @ (Angle(_) | Xy(_) | XyAngle(_) | Line(_))) => {
                new.inherit_direction(old.direction_angle())
            }
        }
    }

    /// Advance one frame: apply queued commands, integrate, and move
    /// `position` (motion space) by this frame's displacement.
    pub fn advance(&mut self, position: &mut DVec2, ctx: &StepContext<'_>) {
        match self {
            MovePattern::Angle(p) => p.advance(position, ctx),
            MovePattern::Xy(p) => p.advance(position),
            MovePattern::XyAngle(p) => p.advance(position),
            MovePattern::Line(p) => p.advance(position),
        }
        let header = self.header_mut();
        header.frame_work = header.frame_work.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::command::{AngleTag, XyTag};
    use std::f64::consts::FRAC_PI_2;

    fn step(pattern: &mut MovePattern, position: &mut DVec2) {
        pattern.advance(position, &StepContext::new(*position, &EmptyDirectory));
    }

    #[test]
    fn test_angle_to_xy_keeps_velocity() {
        let mut angle: MovePattern = AnglePattern::new()
            .with(AngleTag::SetSpeed, 2.0)
            .with(AngleTag::SetAngle, FRAC_PI_2)
            .into();
        let mut pos = DVec2::ZERO;
        step(&mut angle, &mut pos);

        let mut xy: MovePattern = XyPattern::new().into();
        xy.activate(Some(&angle), pos);
        assert_eq!(xy.previous_kind(), PatternKind::Angle);
        assert!((xy.speed_x()).abs() < 1e-12);
        assert!((xy.speed_y() - 2.0).abs() < 1e-12);

        step(&mut xy, &mut pos);
        assert!((pos.y - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_xy_to_angle_keeps_speed_and_heading() {
        let mut xy: MovePattern = XyPattern::new()
            .with(XyTag::SetSpeedX, 3.0)
            .with(XyTag::SetSpeedY, 4.0)
            .into();
        let mut pos = DVec2::ZERO;
        step(&mut xy, &mut pos);

        let mut angle: MovePattern = AnglePattern::new().into();
        angle.activate(Some(&xy), pos);
        assert!((angle.speed() - 5.0).abs() < 1e-12);
        assert!((angle.direction_angle() - 4.0f64.atan2(3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_queued_commands_override_carried_state() {
        let mut old: MovePattern = AnglePattern::new().with(AngleTag::SetSpeed, 5.0).into();
        let mut pos = DVec2::ZERO;
        step(&mut old, &mut pos);

        let mut new: MovePattern = AnglePattern::new().with(AngleTag::SetSpeed, 1.0).into();
        new.activate(Some(&old), pos);
        // Carried over until the new pattern's own commands land
        assert_eq!(new.speed(), 5.0);
        step(&mut new, &mut pos);
        assert_eq!(new.speed(), 1.0);
        assert_eq!(pos.x, 6.0);
    }

    #[test]
    fn test_shot_data_inherited_only_when_unset() {
        let mut old: MovePattern = AnglePattern::new().into();
        old.set_shot_data_id(7);

        let mut inherits: MovePattern = XyPattern::new().into();
        inherits.activate(Some(&old), DVec2::ZERO);
        assert_eq!(inherits.shot_data_id(), Some(7));

        let mut own: MovePattern = XyPattern::new().into();
        own.set_shot_data_id(9);
        own.activate(Some(&old), DVec2::ZERO);
        assert_eq!(own.shot_data_id(), Some(9));
    }

    #[test]
    fn test_invalid_command_tag_is_rejected() {
        let mut xy: MovePattern = XyPattern::new().into();
        assert!(!xy.add_command(42, 1.0));
        assert_eq!(xy.pending_commands(), 0);
        assert!(xy.add_command(0, 1.0));
        assert_eq!(xy.pending_commands(), 1);
    }

    #[test]
    fn test_create_copy_rebinds_owner() {
        let mut p: MovePattern = AnglePattern::new().with(AngleTag::SetSpeed, 2.0).into();
        p.set_owner(ObjectId::from_parts(1, 0));
        let copy = p.create_copy(ObjectId::from_parts(2, 0));
        assert_eq!(copy.owner(), Some(ObjectId::from_parts(2, 0)));
        assert_eq!(copy.pending_commands(), 1);
        assert_eq!(p.owner(), Some(ObjectId::from_parts(1, 0)));
    }
}
