//! Per-entity motion state
//!
//! Everything here is local to one object. Operations that have to look at
//! another object (parent position, descendants) live on
//! [`MoveWorld`](super::MoveWorld).

use std::collections::BTreeSet;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::id::ObjectId;
use super::pattern::{AnglePattern, MovePattern, PatternKind, XyPattern};
use super::schedule::PatternSchedule;
use super::transform::ParentTransform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveObject {
    id: ObjectId,
    /// Absolute position
    pub(crate) position: DVec2,
    /// Offset in the parent's frame; mirrors `position` without a parent
    pub(crate) relative_position: DVec2,
    transform: ParentTransform,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: BTreeSet<ObjectId>,
    pub(crate) pattern: Option<MovePattern>,
    schedule: PatternSchedule,
    frame_pattern: u32,
    frame_move: u32,
    movement_enabled: bool,
}

impl MoveObject {
    pub(crate) fn new(id: ObjectId, position: DVec2) -> Self {
        Self {
            id,
            position,
            relative_position: position,
            transform: ParentTransform::default(),
            parent: None,
            children: BTreeSet::new(),
            pattern: None,
            schedule: PatternSchedule::new(),
            frame_pattern: 0,
            frame_move: 0,
            movement_enabled: true,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn relative_position(&self) -> DVec2 {
        self.relative_position
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &BTreeSet<ObjectId> {
        &self.children
    }

    pub fn pattern(&self) -> Option<&MovePattern> {
        self.pattern.as_ref()
    }

    pub fn pattern_mut(&mut self) -> Option<&mut MovePattern> {
        self.pattern.as_mut()
    }

    pub fn pattern_kind(&self) -> PatternKind {
        self.pattern.as_ref().map_or(PatternKind::None, MovePattern::kind)
    }

    pub fn schedule(&self) -> &PatternSchedule {
        &self.schedule
    }

    /// Scheduler frame counter
    pub fn frame_pattern(&self) -> u32 {
        self.frame_pattern
    }

    /// Number of ticks on which movement actually ran
    pub fn move_frame(&self) -> u32 {
        self.frame_move
    }

    pub fn is_movement_enabled(&self) -> bool {
        self.movement_enabled
    }

    pub fn set_movement_enabled(&mut self, enabled: bool) {
        self.movement_enabled = enabled;
    }

    pub fn transform(&self) -> &ParentTransform {
        &self.transform
    }

    /// Parent frame rotation in degrees
    pub fn parent_rotation(&self) -> f64 {
        self.transform.rotation()
    }

    pub fn parent_scale(&self) -> f64 {
        self.transform.scale()
    }

    /// Rebuild the parent transform. The absolute position is not re-derived
    /// here; call [`MoveWorld::update_relative_position`](super::MoveWorld::update_relative_position)
    /// to apply the new transform immediately.
    pub fn set_parent_rotation_scale(&mut self, rotation_deg: f64, scale: f64) {
        self.transform = ParentTransform::new(rotation_deg, scale);
    }

    pub fn set_parent_rotation(&mut self, rotation_deg: f64) {
        self.set_parent_rotation_scale(rotation_deg, self.transform.scale());
    }

    pub fn set_parent_scale(&mut self, scale: f64) {
        self.set_parent_rotation_scale(self.transform.rotation(), scale);
    }

    /// Activate `pattern` now (`frame_delay == 0` and not `force_map`) or
    /// queue it for `frame_pattern + frame_delay`.
    pub fn add_pattern(&mut self, frame_delay: u32, pattern: impl Into<MovePattern>, force_map: bool) {
        let mut pattern = pattern.into();
        pattern.set_owner(self.id);
        if frame_delay == 0 && !force_map {
            self.replace_pattern(pattern);
        } else {
            let frame = self.frame_pattern.saturating_add(frame_delay);
            self.schedule.push(frame, pattern);
        }
    }

    fn replace_pattern(&mut self, mut pattern: MovePattern) {
        pattern.set_owner(self.id);
        pattern.activate(self.pattern.as_ref(), self.relative_position);
        self.pattern = Some(pattern);
    }

    /// Activate everything queued for the current frame, in order
    pub(crate) fn promote_scheduled(&mut self) {
        for pattern in self.schedule.take_due(self.frame_pattern) {
            self.replace_pattern(pattern);
        }
    }

    pub(crate) fn finish_tick(&mut self, moved: bool) {
        if moved {
            self.frame_move = self.frame_move.saturating_add(1);
        }
        self.frame_pattern = self.frame_pattern.saturating_add(1);
    }

    /// Copy the kinematic state of `src`. Links, schedule and frame counters
    /// stay as they are.
    pub(crate) fn copy_kinematics_from(&mut self, src: &MoveObject) {
        self.position = src.position;
        self.relative_position = src.relative_position;
        self.transform = src.transform;
        self.movement_enabled = src.movement_enabled;
        self.pattern = src.pattern.as_ref().map(|p| p.create_copy(self.id));
    }

    pub fn speed(&self) -> f64 {
        self.pattern.as_ref().map_or(0.0, MovePattern::speed)
    }

    pub fn direction_angle(&self) -> f64 {
        self.pattern.as_ref().map_or(0.0, MovePattern::direction_angle)
    }

    pub fn speed_x(&self) -> f64 {
        self.pattern.as_ref().map_or(0.0, MovePattern::speed_x)
    }

    pub fn speed_y(&self) -> f64 {
        self.pattern.as_ref().map_or(0.0, MovePattern::speed_y)
    }

    /// Run `f` on the active angle pattern, switching to one first
    fn with_angle(&mut self, f: impl FnOnce(&mut AnglePattern)) {
        if !matches!(self.pattern, Some(MovePattern::Angle(_))) {
            self.replace_pattern(AnglePattern::new().into());
        }
        if let Some(MovePattern::Angle(p)) = &mut self.pattern {
            f(p);
        }
    }

    /// Run `f` on the active XY pattern, switching to one first
    fn with_xy(&mut self, f: impl FnOnce(&mut XyPattern)) {
        if !matches!(self.pattern, Some(MovePattern::Xy(_))) {
            self.replace_pattern(XyPattern::new().into());
        }
        if let Some(MovePattern::Xy(p)) = &mut self.pattern {
            f(p);
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.with_angle(|p| p.set_speed(speed));
    }

    pub fn set_direction_angle(&mut self, angle: f64) {
        self.with_angle(|p| p.set_direction_angle(angle));
    }

    pub fn set_speed_x(&mut self, value: f64) {
        if let Some(MovePattern::XyAngle(p)) = &mut self.pattern {
            p.set_speed_x(value);
        } else {
            self.with_xy(|p| p.set_speed_x(value));
        }
    }

    pub fn set_speed_y(&mut self, value: f64) {
        if let Some(MovePattern::XyAngle(p)) = &mut self.pattern {
            p.set_speed_y(value);
        } else {
            self.with_xy(|p| p.set_speed_y(value));
        }
    }

    pub fn set_acceleration_x(&mut self, value: f64) {
        if let Some(MovePattern::XyAngle(p)) = &mut self.pattern {
            p.set_acceleration_x(value);
        } else {
            self.with_xy(|p| p.set_acceleration_x(value));
        }
    }

    pub fn set_acceleration_y(&mut self, value: f64) {
        if let Some(MovePattern::XyAngle(p)) = &mut self.pattern {
            p.set_acceleration_y(value);
        } else {
            self.with_xy(|p| p.set_acceleration_y(value));
        }
    }

    pub fn set_max_speed_x(&mut self, value: f64) {
        if let Some(MovePattern::XyAngle(p)) = &mut self.pattern {
            p.set_max_speed_x(value);
        } else {
            self.with_xy(|p| p.set_max_speed_x(value));
        }
    }

    pub fn set_max_speed_y(&mut self, value: f64) {
        if let Some(MovePattern::XyAngle(p)) = &mut self.pattern {
            p.set_max_speed_y(value);
        } else {
            self.with_xy(|p| p.set_max_speed_y(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::command::AngleTag;
    use crate::motion::pattern::XyAnglePattern;
    use std::f64::consts::FRAC_PI_2;

    fn object() -> MoveObject {
        MoveObject::new(ObjectId::from_parts(1, 0), DVec2::ZERO)
    }

    #[test]
    fn test_immediate_pattern_is_active() {
        let mut obj = object();
        obj.add_pattern(0, AnglePattern::new(), false);
        assert_eq!(obj.pattern_kind(), PatternKind::Angle);
        assert_eq!(obj.pattern().and_then(MovePattern::owner), Some(obj.id()));
        assert!(obj.schedule().is_empty());
    }

    #[test]
    fn test_force_map_queues_for_current_frame() {
        let mut obj = object();
        obj.add_pattern(0, AnglePattern::new(), true);
        assert_eq!(obj.pattern_kind(), PatternKind::None);
        assert_eq!(obj.schedule().next_frame(), Some(0));

        obj.promote_scheduled();
        assert_eq!(obj.pattern_kind(), PatternKind::Angle);
    }

    #[test]
    fn test_delay_is_relative_to_frame_counter() {
        let mut obj = object();
        obj.finish_tick(false);
        obj.finish_tick(false);
        obj.add_pattern(3, XyPattern::new(), false);
        assert_eq!(obj.schedule().next_frame(), Some(5));
        assert_eq!(obj.frame_pattern(), 2);
        assert_eq!(obj.move_frame(), 0);
    }

    #[test]
    fn test_set_speed_switches_to_angle_keeping_heading() {
        let mut obj = object();
        obj.set_speed_y(2.0);
        assert_eq!(obj.pattern_kind(), PatternKind::Xy);

        obj.set_speed(3.0);
        assert_eq!(obj.pattern_kind(), PatternKind::Angle);
        assert!((obj.direction_angle() - FRAC_PI_2).abs() < 1e-12);
        assert!((obj.speed_y() - 3.0).abs() < 1e-12);
        assert_eq!(obj.pattern().map(MovePattern::previous_kind), Some(PatternKind::Xy));
    }

    #[test]
    fn test_set_speed_x_keeps_xy_angle_pattern() {
        let mut obj = object();
        let mut p = XyAnglePattern::new();
        p.set_angle_offset(FRAC_PI_2);
        obj.add_pattern(0, p, false);

        obj.set_speed_x(2.0);
        assert_eq!(obj.pattern_kind(), PatternKind::XyAngle);
        assert!((obj.speed_x() - 2.0).abs() < 1e-12);
        assert!(obj.speed_y().abs() < 1e-12);
    }

    #[test]
    fn test_parent_rotation_scale_setters() {
        let mut obj = object();
        obj.set_parent_rotation(45.0);
        obj.set_parent_scale(2.0);
        assert_eq!(obj.parent_rotation(), 45.0);
        assert_eq!(obj.parent_scale(), 2.0);
    }

    #[test]
    fn test_copy_kinematics_rebinds_pattern() {
        let mut src = object();
        src.position = DVec2::new(3.0, 4.0);
        src.relative_position = src.position;
        src.add_pattern(0, AnglePattern::new().with(AngleTag::SetSpeed, 1.0), false);
        src.add_pattern(10, XyPattern::new(), false);

        let mut dst = MoveObject::new(ObjectId::from_parts(2, 0), DVec2::ZERO);
        dst.copy_kinematics_from(&src);
        assert_eq!(dst.position(), DVec2::new(3.0, 4.0));
        assert_eq!(dst.pattern().and_then(MovePattern::owner), Some(dst.id()));
        assert_eq!(dst.pattern().map(MovePattern::pending_commands), Some(1));
        assert!(dst.schedule().is_empty());
    }
}
