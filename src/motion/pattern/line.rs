//! Point-to-point movement
//!
//! A line runs from the position its object had when the pattern was
//! activated to a fixed target, timed one of three ways (see [`LineMode`]).
//! Once the target is reached the line is finished: it reports speed 0 and
//! stops moving the object, but stays the active pattern until replaced.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::PatternHeader;
use crate::consts::{ARRIVAL_EPSILON, UNCAPPED};
use crate::motion::command::{CommandQueue, LineTag};
use crate::motion::easing::Easing;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LineMode {
    /// Constant speed, snapping onto the target on the last step
    Speed { speed: f64 },
    /// Arrive in exactly `max_frame` ticks along an easing curve
    Frame { max_frame: u32, easing: Easing },
    /// Cover `1 - weight` of the remaining distance per tick, at most
    /// `max_speed`
    Weight { weight: f64, max_speed: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinePattern {
    pub(crate) header: PatternHeader,
    mode: LineMode,
    target: DVec2,
    initial_position: DVec2,
    /// Distance from `initial_position` to `target`
    distance: f64,
    /// Frame count at which the current leg started
    base_frame: u32,
    speed: f64,
    started: bool,
    finished: bool,
    pub(crate) commands: CommandQueue<LineTag>,
}

impl LinePattern {
    pub fn new(target: DVec2, mode: LineMode) -> Self {
        Self {
            header: PatternHeader::default(),
            mode,
            target,
            initial_position: DVec2::ZERO,
            distance: 0.0,
            base_frame: 0,
            speed: 0.0,
            started: false,
            finished: false,
            commands: CommandQueue::default(),
        }
    }

    pub fn at_speed(target: DVec2, speed: f64) -> Self {
        Self::new(target, LineMode::Speed { speed })
    }

    pub fn at_frame(target: DVec2, max_frame: u32, easing: Easing) -> Self {
        Self::new(target, LineMode::Frame { max_frame, easing })
    }

    pub fn at_weight(target: DVec2, weight: f64, max_speed: f64) -> Self {
        Self::new(target, LineMode::Weight { weight, max_speed })
    }

    /// Queue a command (builder style)
    pub fn with(mut self, tag: LineTag, value: f64) -> Self {
        self.commands.push(tag, value);
        self
    }

    pub fn push_command(&mut self, tag: LineTag, value: f64) {
        self.commands.push(tag, value);
    }

    pub(crate) fn add_command(&mut self, tag: u8, value: f64) -> bool {
        match LineTag::try_from(tag) {
            Ok(tag) => {
                self.commands.push(tag, value);
                true
            }
            Err(_) => false,
        }
    }

    pub fn mode(&self) -> LineMode {
        self.mode
    }

    pub fn target(&self) -> DVec2 {
        self.target
    }

    pub fn initial_position(&self) -> DVec2 {
        self.initial_position
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn velocity(&self) -> DVec2 {
        self.header.velocity
    }

    pub fn direction_angle(&self) -> f64 {
        self.header.direction
    }

    /// Begin a leg from `position`
    pub(crate) fn start(&mut self, position: DVec2) {
        self.started = true;
        self.finished = false;
        self.initial_position = position;
        self.base_frame = self.header.frame_work;

        let delta = self.target - position;
        self.distance = delta.length();
        // A degenerate leg keeps the inherited direction
        if self.distance > ARRIVAL_EPSILON {
            self.header.direction = delta.y.atan2(delta.x);
        }
    }

    pub(crate) fn inherit_direction(&mut self, direction: f64) {
        self.header.direction = direction;
    }

    fn apply_commands(&mut self) -> bool {
        let commands = self.commands.take();
        if commands.is_empty() {
            return false;
        }

        for (tag, value) in commands {
            match tag {
                LineTag::SetTargetX => self.target.x = value,
                LineTag::SetTargetY => self.target.y = value,
                LineTag::SetSpeed => self.mode = LineMode::Speed { speed: value },
                LineTag::SetFrame => {
                    let easing = match self.mode {
                        LineMode::Frame { easing, .. } => easing,
                        _ => Easing::default(),
                    };
                    self.mode = LineMode::Frame {
                        max_frame: value.max(0.0) as u32,
                        easing,
                    };
                }
                LineTag::SetWeight => {
                    let max_speed = match self.mode {
                        LineMode::Weight { max_speed, .. } => max_speed,
                        _ => UNCAPPED,
                    };
                    self.mode = LineMode::Weight {
                        weight: value,
                        max_speed,
                    };
                }
                LineTag::SetMaxSpeed => match &mut self.mode {
                    LineMode::Weight { max_speed, .. } => *max_speed = value,
                    _ => log::warn!("Line max speed only applies to weight lines, ignoring {}", value),
                },
                LineTag::SetEasing => match (&mut self.mode, Easing::from_index(value)) {
                    (LineMode::Frame { easing, .. }, Some(curve)) => *easing = curve,
                    (LineMode::Frame { .. }, None) => {
                        log::warn!("Unknown line easing index {}, ignoring", value)
                    }
                    _ => log::warn!("Line easing only applies to frame lines, ignoring {}", value),
                },
            }
        }
        true
    }

    fn finish(&mut self, position: &mut DVec2) {
        *position = self.target;
        self.finished = true;
        self.speed = 0.0;
        self.header.velocity = DVec2::ZERO;
        log::debug!(
            "Line arrived at ({:.2}, {:.2})",
            self.target.x,
            self.target.y
        );
    }

    pub(crate) fn advance(&mut self, position: &mut DVec2) {
        if !self.started {
            self.start(*position);
        }
        // Changed parameters start a new leg from where the object is now
        if self.apply_commands() {
            self.start(*position);
        }
        if self.finished {
            return;
        }

        match self.mode {
            LineMode::Speed { speed } => {
                let remaining = self.target - *position;
                let dist = remaining.length();
                let step = speed.abs();
                if dist <= step.max(ARRIVAL_EPSILON) {
                    self.finish(position);
                    return;
                }
                self.move_along(position, remaining / dist * step);
            }
            LineMode::Frame { max_frame, easing } => {
                let elapsed = self.header.frame_work.saturating_sub(self.base_frame) + 1;
                if max_frame == 0 || elapsed >= max_frame || self.distance <= ARRIVAL_EPSILON {
                    self.finish(position);
                    return;
                }
                let t = f64::from(elapsed) / f64::from(max_frame);
                let delta = self.target - self.initial_position;
                *position = self.initial_position + delta * easing.value(t);

                self.speed = self.distance * easing.rate(t) / f64::from(max_frame);
                self.header.velocity = delta / self.distance * self.speed;
            }
            LineMode::Weight { weight, max_speed } => {
                let remaining = self.target - *position;
                let dist = remaining.length();
                if dist <= ARRIVAL_EPSILON {
                    self.finish(position);
                    return;
                }
                let step = (dist * (1.0 - weight.clamp(0.0, 1.0))).min(max_speed.abs());
                self.move_along(position, remaining / dist * step);
                if (self.target - *position).length() <= ARRIVAL_EPSILON {
                    self.finish(position);
                }
            }
        }
    }

    fn move_along(&mut self, position: &mut DVec2, displacement: DVec2) {
        *position += displacement;
        self.speed = displacement.length();
        self.header.velocity = displacement;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &mut LinePattern, position: &mut DVec2, ticks: u32) {
        for _ in 0..ticks {
            line.advance(position);
            line.header.frame_work += 1;
        }
    }

    #[test]
    fn test_speed_line_arrives_exactly() {
        let mut line = LinePattern::at_speed(DVec2::new(10.0, 0.0), 5.0);
        let mut pos = DVec2::ZERO;
        line.start(pos);

        run(&mut line, &mut pos, 1);
        assert_eq!(pos, DVec2::new(5.0, 0.0));
        assert_eq!(line.speed(), 5.0);
        assert!(!line.is_finished());

        run(&mut line, &mut pos, 1);
        assert_eq!(pos, DVec2::new(10.0, 0.0));
        assert!(line.is_finished());

        run(&mut line, &mut pos, 1);
        assert_eq!(pos, DVec2::new(10.0, 0.0));
        assert_eq!(line.speed(), 0.0);
    }

    #[test]
    fn test_frame_line_linear_timing() {
        let mut line = LinePattern::at_frame(DVec2::new(100.0, 0.0), 10, Easing::Linear);
        let mut pos = DVec2::ZERO;
        line.start(pos);

        run(&mut line, &mut pos, 5);
        assert!((pos - DVec2::new(50.0, 0.0)).length() < 1e-9);
        assert!((line.speed() - 10.0).abs() < 1e-9);

        run(&mut line, &mut pos, 5);
        assert_eq!(pos, DVec2::new(100.0, 0.0));
        assert!(line.is_finished());
    }

    #[test]
    fn test_frame_line_zero_frames_snaps() {
        let mut line = LinePattern::at_frame(DVec2::new(3.0, 4.0), 0, Easing::Smooth);
        let mut pos = DVec2::ZERO;
        line.start(pos);
        run(&mut line, &mut pos, 1);
        assert_eq!(pos, DVec2::new(3.0, 4.0));
        assert!(line.is_finished());
    }

    #[test]
    fn test_weight_line_decays() {
        let mut line = LinePattern::at_weight(DVec2::new(100.0, 0.0), 0.5, UNCAPPED);
        let mut pos = DVec2::ZERO;
        line.start(pos);
        run(&mut line, &mut pos, 2);
        assert_eq!(pos, DVec2::new(75.0, 0.0));
        assert!(!line.is_finished());
    }

    #[test]
    fn test_weight_line_respects_max_speed() {
        let mut line = LinePattern::at_weight(DVec2::new(100.0, 0.0), 0.5, 10.0);
        let mut pos = DVec2::ZERO;
        line.start(pos);
        run(&mut line, &mut pos, 3);
        assert_eq!(pos, DVec2::new(30.0, 0.0));
    }

    #[test]
    fn test_degenerate_line_keeps_inherited_direction() {
        let mut line = LinePattern::at_speed(DVec2::new(1.0, 1.0), 2.0);
        line.inherit_direction(0.75);
        let mut pos = DVec2::new(1.0, 1.0);
        line.start(pos);
        assert_eq!(line.direction_angle(), 0.75);

        run(&mut line, &mut pos, 1);
        assert!(line.is_finished());
        assert_eq!(pos, DVec2::new(1.0, 1.0));
        assert!(pos.is_finite());
    }

    #[test]
    fn test_commands_start_new_leg() {
        let mut line = LinePattern::at_speed(DVec2::new(10.0, 0.0), 5.0);
        let mut pos = DVec2::ZERO;
        line.start(pos);
        run(&mut line, &mut pos, 2);
        assert!(line.is_finished());

        line.push_command(LineTag::SetTargetY, 10.0);
        run(&mut line, &mut pos, 1);
        assert_eq!(line.initial_position(), DVec2::new(10.0, 0.0));
        assert_eq!(pos, DVec2::new(10.0, 5.0));
        assert!((line.direction_angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_set_easing_command_changes_curve() {
        let mut line = LinePattern::at_frame(DVec2::new(100.0, 0.0), 10, Easing::Linear)
            .with(LineTag::SetEasing, 3.0);
        let mut pos = DVec2::ZERO;
        line.start(pos);
        run(&mut line, &mut pos, 5);
        // Accelerate: a quarter of the way at half time
        assert!((pos.x - 25.0).abs() < 1e-9);
        run(&mut line, &mut pos, 5);
        assert_eq!(pos, DVec2::new(100.0, 0.0));
    }

    #[test]
    fn test_set_frame_command_switches_mode() {
        let mut line = LinePattern::at_speed(DVec2::new(40.0, 0.0), 1.0).with(LineTag::SetFrame, 4.0);
        let mut pos = DVec2::ZERO;
        line.start(pos);
        run(&mut line, &mut pos, 2);
        assert!((pos.x - 20.0).abs() < 1e-9);
        assert!(matches!(line.mode(), LineMode::Frame { max_frame: 4, .. }));
    }
}
