//! Data-driven scenarios
//!
//! A scenario is a JSON description of a few objects, the patterns they run
//! and optional bullet emitters. [`Scenario::run`] builds a [`MoveWorld`]
//! from it, steps it headlessly and records a [`Trajectory`].
//!
//! ```json
//! {
//!   "frames": 120,
//!   "objects": [
//!     { "name": "boss", "position": [0, 0],
//!       "patterns": [{ "pattern": { "kind": "line", "target": [0, 100], "frames": 60 } }] },
//!     { "name": "option", "parent": 0, "position": [20, 0], "rotation": 90 }
//!   ],
//!   "emitters": [{ "at": [0, 0], "count": 16, "speed": 2.5 }]
//! }
//! ```

use std::f64::consts::TAU;
use std::path::Path;

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_PARENT_SCALE, UNCAPPED};
use crate::error::{MotionError, Result};
use crate::motion::{
    AnglePattern, AngleTag, Easing, LinePattern, MovePattern, MoveWorld, ObjectId,
    RelativeHeading, XyAnglePattern, XyAngleTag, XyPattern, XyTag,
};

fn uncapped() -> f64 {
    UNCAPPED
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Ticks to simulate
    pub frames: u32,
    /// Seed for emitter jitter
    pub seed: u64,
    pub objects: Vec<ObjectSpec>,
    pub emitters: Vec<EmitterSpec>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            frames: 60,
            seed: 0,
            objects: Vec::new(),
            emitters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSpec {
    pub name: Option<String>,
    /// Absolute position, or the offset from the parent when `parent` is set
    pub position: DVec2,
    /// Index of the parent in `objects`
    pub parent: Option<usize>,
    /// Parent frame rotation in degrees
    pub rotation: f64,
    pub scale: f64,
    pub movement_enabled: bool,
    pub patterns: Vec<ScheduledPattern>,
}

impl Default for ObjectSpec {
    fn default() -> Self {
        Self {
            name: None,
            position: DVec2::ZERO,
            parent: None,
            rotation: 0.0,
            scale: DEFAULT_PARENT_SCALE,
            movement_enabled: true,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPattern {
    #[serde(default)]
    pub delay: u32,
    #[serde(default)]
    pub force_map: bool,
    #[serde(default)]
    pub shot_data: Option<i32>,
    pub pattern: PatternSpec,
}

/// Raw `(tag, value)` command as a script would send it
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CommandSpec {
    pub tag: u8,
    pub value: f64,
}

/// Pattern description. Kinematic fields left out keep whatever the previous
/// pattern hands over on activation; given ones are queued as commands and
/// so land after the hand-over, ahead of the raw `commands`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternSpec {
    Angle {
        #[serde(default)]
        speed: Option<f64>,
        /// Radians
        #[serde(default)]
        angle: Option<f64>,
        #[serde(default)]
        acceleration: Option<f64>,
        #[serde(default)]
        max_speed: Option<f64>,
        #[serde(default)]
        angular_velocity: Option<f64>,
        #[serde(default)]
        angular_acceleration: Option<f64>,
        #[serde(default)]
        angular_max_velocity: Option<f64>,
        /// Object index whose direction biases the heading
        #[serde(default)]
        facing: Option<usize>,
        /// Object index to aim at
        #[serde(default)]
        aim: Option<usize>,
        #[serde(default)]
        commands: Vec<CommandSpec>,
    },
    Xy {
        #[serde(default)]
        speed: Option<DVec2>,
        #[serde(default)]
        acceleration: Option<DVec2>,
        #[serde(default)]
        max_speed: Option<DVec2>,
        #[serde(default)]
        commands: Vec<CommandSpec>,
    },
    XyAngle {
        /// Pattern-local velocity
        #[serde(default)]
        speed: Option<DVec2>,
        #[serde(default)]
        acceleration: Option<DVec2>,
        #[serde(default)]
        max_speed: Option<DVec2>,
        #[serde(default)]
        angle_offset: Option<f64>,
        #[serde(default)]
        angular_velocity: Option<f64>,
        #[serde(default)]
        angular_acceleration: Option<f64>,
        #[serde(default)]
        angular_max_velocity: Option<f64>,
        #[serde(default)]
        commands: Vec<CommandSpec>,
    },
    /// Exactly one of `speed`, `frames` or `weight` picks the timing
    Line {
        target: DVec2,
        #[serde(default)]
        speed: Option<f64>,
        #[serde(default)]
        frames: Option<u32>,
        #[serde(default)]
        easing: Easing,
        #[serde(default)]
        weight: Option<f64>,
        #[serde(default = "uncapped")]
        max_speed: f64,
        #[serde(default)]
        commands: Vec<CommandSpec>,
    },
}

fn resolve(ids: &[ObjectId], index: usize) -> Result<ObjectId> {
    ids.get(index).copied().ok_or_else(|| {
        MotionError::Scenario(format!(
            "object index {} out of range ({} objects)",
            index,
            ids.len()
        ))
    })
}

fn apply_commands(pattern: &mut MovePattern, commands: &[CommandSpec]) -> Result<()> {
    for command in commands {
        if !pattern.add_command(command.tag, command.value) {
            return Err(MotionError::InvalidCommand {
                kind: pattern.kind(),
                tag: command.tag,
            });
        }
    }
    Ok(())
}

impl PatternSpec {
    /// Build the pattern. `ids` maps object indices to live ids.
    pub fn build(&self, ids: &[ObjectId]) -> Result<MovePattern> {
        let (mut pattern, commands): (MovePattern, &[CommandSpec]) = match self {
            PatternSpec::Angle {
                speed,
                angle,
                acceleration,
                max_speed,
                angular_velocity,
                angular_acceleration,
                angular_max_velocity,
                facing,
                aim,
                commands,
            } => {
                let mut p = AnglePattern::new();
                for (tag, value) in [
                    (AngleTag::SetSpeed, *speed),
                    (AngleTag::SetAngle, *angle),
                    (AngleTag::SetAccel, *acceleration),
                    (AngleTag::SetMaxSpeed, *max_speed),
                    (AngleTag::SetAngularVelocity, *angular_velocity),
                    (AngleTag::SetAngularAcceleration, *angular_acceleration),
                    (AngleTag::SetAngularMaxVelocity, *angular_max_velocity),
                ] {
                    if let Some(value) = value {
                        p.push_command(tag, value);
                    }
                }
                let relative = match (facing, aim) {
                    (Some(_), Some(_)) => {
                        return Err(MotionError::Scenario(
                            "angle pattern cannot both face and aim".into(),
                        ));
                    }
                    (Some(i), None) => Some(RelativeHeading::Facing(resolve(ids, *i)?)),
                    (None, Some(i)) => Some(RelativeHeading::Aim(resolve(ids, *i)?)),
                    (None, None) => None,
                };
                p.set_relative(relative);
                (MovePattern::from(p), commands.as_slice())
            }
            PatternSpec::Xy {
                speed,
                acceleration,
                max_speed,
                commands,
            } => {
                let mut p = XyPattern::new();
                for (tags, value) in [
                    ((XyTag::SetSpeedX, XyTag::SetSpeedY), *speed),
                    ((XyTag::SetAccelX, XyTag::SetAccelY), *acceleration),
                    ((XyTag::SetMaxSpeedX, XyTag::SetMaxSpeedY), *max_speed),
                ] {
                    if let Some(value) = value {
                        p.push_command(tags.0, value.x);
                        p.push_command(tags.1, value.y);
                    }
                }
                (MovePattern::from(p), commands.as_slice())
            }
            PatternSpec::XyAngle {
                speed,
                acceleration,
                max_speed,
                angle_offset,
                angular_velocity,
                angular_acceleration,
                angular_max_velocity,
                commands,
            } => {
                let mut p = XyAnglePattern::new();
                for (tag, value) in [
                    (XyAngleTag::SetAngleOffset, *angle_offset),
                    (XyAngleTag::SetAngularVelocity, *angular_velocity),
                    (XyAngleTag::SetAngularAcceleration, *angular_acceleration),
                    (XyAngleTag::SetAngularMaxVelocity, *angular_max_velocity),
                ] {
                    if let Some(value) = value {
                        p.push_command(tag, value);
                    }
                }
                for (tags, value) in [
                    ((XyAngleTag::SetSpeedX, XyAngleTag::SetSpeedY), *speed),
                    ((XyAngleTag::SetAccelX, XyAngleTag::SetAccelY), *acceleration),
                    ((XyAngleTag::SetMaxSpeedX, XyAngleTag::SetMaxSpeedY), *max_speed),
                ] {
                    if let Some(value) = value {
                        p.push_command(tags.0, value.x);
                        p.push_command(tags.1, value.y);
                    }
                }
                (MovePattern::from(p), commands.as_slice())
            }
            PatternSpec::Line {
                target,
                speed,
                frames,
                easing,
                weight,
                max_speed,
                commands,
            } => {
                let p = match (speed, frames, weight) {
                    (Some(speed), None, None) => LinePattern::at_speed(*target, *speed),
                    (None, Some(frames), None) => LinePattern::at_frame(*target, *frames, *easing),
                    (None, None, Some(weight)) => {
                        LinePattern::at_weight(*target, *weight, *max_speed)
                    }
                    _ => {
                        return Err(MotionError::Scenario(
                            "line pattern needs exactly one of speed, frames or weight".into(),
                        ));
                    }
                };
                (MovePattern::from(p), commands.as_slice())
            }
        };
        apply_commands(&mut pattern, commands)?;
        Ok(pattern)
    }
}

/// A burst of bullets fired from one point with the angle pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterSpec {
    pub at: DVec2,
    pub count: u32,
    pub speed: f64,
    /// Radians
    pub base_angle: f64,
    /// Total fan width in radians; 0 spreads the bullets over a full ring
    pub spread: f64,
    /// Maximum random angle offset per bullet, radians
    pub jitter: f64,
    /// Frames before the bullets start moving
    pub delay: u32,
}

impl Default for EmitterSpec {
    fn default() -> Self {
        Self {
            at: DVec2::ZERO,
            count: 8,
            speed: 1.0,
            base_angle: 0.0,
            spread: 0.0,
            jitter: 0.0,
            delay: 0,
        }
    }
}

impl EmitterSpec {
    /// Firing angles of every bullet, jittered from `rng`
    pub fn angles(&self, rng: &mut Pcg32) -> Vec<f64> {
        let count = self.count;
        (0..count)
            .map(|i| {
                let offset = if self.spread == 0.0 {
                    TAU * f64::from(i) / f64::from(count)
                } else if count > 1 {
                    self.spread * (f64::from(i) / f64::from(count - 1) - 0.5)
                } else {
                    0.0
                };
                let jitter = if self.jitter > 0.0 {
                    rng.random_range(-self.jitter..=self.jitter)
                } else {
                    0.0
                };
                self.base_angle + offset + jitter
            })
            .collect()
    }
}

/// One recorded state of one object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub frame: u32,
    pub position: DVec2,
    pub speed: f64,
    pub direction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Opaque object id
    pub id: u64,
    pub name: String,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub frames: u32,
    pub tracks: Vec<Track>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let scenario = Self::from_json(&json)?;
        log::info!(
            "Loaded scenario {} ({} objects, {} emitters)",
            path.display(),
            scenario.objects.len(),
            scenario.emitters.len()
        );
        Ok(scenario)
    }

    /// Track names in the order [`build`](Self::build) returns ids
    fn names(&self) -> Vec<String> {
        let objects = self
            .objects
            .iter()
            .enumerate()
            .map(|(i, o)| o.name.clone().unwrap_or_else(|| format!("object{}", i)));
        let bullets = self.emitters.iter().enumerate().flat_map(|(e, emitter)| {
            (0..emitter.count).map(move |b| format!("emitter{}/{}", e, b))
        });
        objects.chain(bullets).collect()
    }

    /// Spawn every object and bullet. Ids come back as objects in file order
    /// followed by each emitter's bullets.
    pub fn build(&self) -> Result<(MoveWorld, Vec<ObjectId>)> {
        let mut world = MoveWorld::new();
        let mut ids: Vec<ObjectId> = self
            .objects
            .iter()
            .map(|o| world.spawn(o.position.x, o.position.y))
            .collect();

        for (index, spec) in self.objects.iter().enumerate() {
            let id = ids[index];
            if let Some(obj) = world.get_mut(id) {
                obj.set_parent_rotation_scale(spec.rotation, spec.scale);
                obj.set_movement_enabled(spec.movement_enabled);
            }
            if let Some(parent) = spec.parent {
                world.set_parent(id, Some(resolve(&ids, parent)?))?;
                world.set_relative_position(id, spec.position.x, spec.position.y)?;
            }
        }

        for (index, spec) in self.objects.iter().enumerate() {
            for scheduled in &spec.patterns {
                let mut pattern = scheduled.pattern.build(&ids)?;
                if let Some(shot) = scheduled.shot_data {
                    pattern.set_shot_data_id(shot);
                }
                if let Some(obj) = world.get_mut(ids[index]) {
                    obj.add_pattern(scheduled.delay, pattern, scheduled.force_map);
                }
            }
        }

        let mut rng = Pcg32::seed_from_u64(self.seed);
        for emitter in &self.emitters {
            for angle in emitter.angles(&mut rng) {
                let id = world.spawn(emitter.at.x, emitter.at.y);
                let mut pattern = AnglePattern::new();
                pattern.set_speed(emitter.speed);
                pattern.set_direction_angle(angle);
                if let Some(obj) = world.get_mut(id) {
                    obj.add_pattern(emitter.delay, pattern, false);
                }
                ids.push(id);
            }
        }

        log::debug!("Built scenario world with {} objects", world.len());
        Ok((world, ids))
    }

    pub fn run(&self) -> Result<Trajectory> {
        self.run_sampled(1)
    }

    /// Simulate and record frame 0 plus every `every`-th tick (and the last)
    pub fn run_sampled(&self, every: u32) -> Result<Trajectory> {
        let every = every.max(1);
        let (mut world, ids) = self.build()?;
        let mut tracks: Vec<Track> = ids
            .iter()
            .zip(self.names())
            .map(|(id, name)| Track {
                id: id.as_u64(),
                name,
                samples: Vec::new(),
            })
            .collect();

        let record = |world: &MoveWorld, tracks: &mut Vec<Track>, frame: u32| {
            for (track, &id) in tracks.iter_mut().zip(&ids) {
                if let Some(obj) = world.get(id) {
                    track.samples.push(Sample {
                        frame,
                        position: obj.position(),
                        speed: obj.speed(),
                        direction: obj.direction_angle(),
                    });
                }
            }
        };

        record(&world, &mut tracks, 0);
        for frame in 1..=self.frames {
            world.update_all();
            if frame % every == 0 || frame == self.frames {
                record(&world, &mut tracks, frame);
            }
        }

        log::info!(
            "Simulated {} frames for {} objects",
            self.frames,
            tracks.len()
        );
        Ok(Trajectory {
            frames: self.frames,
            tracks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last(trajectory: &Trajectory, track: usize) -> Sample {
        *trajectory.tracks[track].samples.last().unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let scenario = Scenario::from_json(r#"{ "objects": [{}] }"#).unwrap();
        assert_eq!(scenario.frames, 60);
        assert_eq!(scenario.objects[0].scale, 1.0);
        assert!(scenario.objects[0].movement_enabled);
    }

    #[test]
    fn test_angle_object_moves() {
        let scenario = Scenario::from_json(
            r#"{
                "frames": 10,
                "objects": [{
                    "position": [1, 1],
                    "patterns": [{ "pattern": { "kind": "angle", "speed": 2 } }]
                }]
            }"#,
        )
        .unwrap();
        let trajectory = scenario.run().unwrap();
        assert_eq!(trajectory.tracks[0].samples.len(), 11);
        assert_eq!(trajectory.tracks[0].name, "object0");
        assert!((last(&trajectory, 0).position - DVec2::new(21.0, 1.0)).length() < 1e-9);
    }

    #[test]
    fn test_line_and_child_in_parent_frame() {
        let scenario = Scenario::from_json(
            r#"{
                "frames": 20,
                "objects": [
                    { "name": "boss", "patterns": [{ "pattern": { "kind": "line", "target": [0, 50], "frames": 10 } }] },
                    { "name": "option", "parent": 0, "position": [5, 0], "rotation": 90 }
                ]
            }"#,
        )
        .unwrap();
        let trajectory = scenario.run().unwrap();
        assert_eq!(last(&trajectory, 0).position, DVec2::new(0.0, 50.0));
        assert!((last(&trajectory, 1).position - DVec2::new(0.0, 55.0)).length() < 1e-9);
    }

    #[test]
    fn test_delayed_pattern_and_commands() {
        let scenario = Scenario::from_json(
            r#"{
                "frames": 5,
                "objects": [{
                    "patterns": [{
                        "delay": 2,
                        "pattern": { "kind": "xy", "commands": [{ "tag": 0, "value": 1.5 }] }
                    }]
                }]
            }"#,
        )
        .unwrap();
        let trajectory = scenario.run().unwrap();
        // Active from tick 3 (frame 2) onward
        assert!((last(&trajectory, 0).position.x - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_later_pattern_fields_survive_hand_over() {
        let scenario = Scenario::from_json(
            r#"{
                "frames": 6,
                "objects": [{
                    "patterns": [
                        { "pattern": { "kind": "angle", "speed": 1 } },
                        { "delay": 3, "pattern": { "kind": "xy", "speed": [0, 3] } }
                    ]
                }]
            }"#,
        )
        .unwrap();
        let trajectory = scenario.run().unwrap();
        assert!((last(&trajectory, 0).position - DVec2::new(3.0, 9.0)).length() < 1e-9);
    }

    #[test]
    fn test_later_xy_angle_keeps_its_offset() {
        let scenario = Scenario::from_json(
            r#"{
                "frames": 4,
                "objects": [{
                    "patterns": [
                        { "pattern": { "kind": "angle", "speed": 5 } },
                        { "delay": 2, "pattern": {
                            "kind": "xy_angle", "speed": [1, 0], "angle_offset": 1.5707963267948966
                        } }
                    ]
                }]
            }"#,
        )
        .unwrap();
        let trajectory = scenario.run().unwrap();
        assert!((last(&trajectory, 0).position - DVec2::new(10.0, 2.0)).length() < 1e-9);
    }

    #[test]
    fn test_omitted_fields_keep_carried_motion() {
        let scenario = Scenario::from_json(
            r#"{
                "frames": 4,
                "objects": [{
                    "patterns": [
                        { "pattern": { "kind": "angle", "speed": 1 } },
                        { "delay": 2, "pattern": { "kind": "xy", "acceleration": [0, 1] } }
                    ]
                }]
            }"#,
        )
        .unwrap();
        let trajectory = scenario.run().unwrap();
        // x keeps the handed-over speed, y picks up the new acceleration
        assert!((last(&trajectory, 0).position - DVec2::new(4.0, 3.0)).length() < 1e-9);
    }

    #[test]
    fn test_invalid_command_tag_is_an_error() {
        let scenario = Scenario::from_json(
            r#"{ "objects": [{ "patterns": [{ "pattern": { "kind": "xy", "commands": [{ "tag": 9, "value": 1 }] } }] }] }"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.build(),
            Err(MotionError::InvalidCommand { tag: 9, .. })
        ));
    }

    #[test]
    fn test_bad_parent_index_is_an_error() {
        let scenario = Scenario::from_json(r#"{ "objects": [{ "parent": 3 }] }"#).unwrap();
        assert!(matches!(scenario.build(), Err(MotionError::Scenario(_))));
    }

    #[test]
    fn test_self_parent_is_an_error() {
        let scenario = Scenario::from_json(r#"{ "objects": [{ "parent": 0 }] }"#).unwrap();
        assert!(matches!(
            scenario.build(),
            Err(MotionError::CyclicParent { .. })
        ));
    }

    #[test]
    fn test_line_needs_one_timing() {
        let scenario = Scenario::from_json(
            r#"{ "objects": [{ "patterns": [{ "pattern": { "kind": "line", "target": [1, 1], "speed": 1, "frames": 3 } }] }] }"#,
        )
        .unwrap();
        assert!(matches!(scenario.build(), Err(MotionError::Scenario(_))));
    }

    #[test]
    fn test_emitter_ring_is_seeded() {
        let json = r#"{
            "frames": 3,
            "seed": 42,
            "emitters": [{ "count": 4, "speed": 1, "jitter": 0.1 }]
        }"#;
        let a = Scenario::from_json(json).unwrap().run().unwrap();
        let b = Scenario::from_json(json).unwrap().run().unwrap();
        assert_eq!(a.tracks.len(), 4);
        assert_eq!(a.tracks[2].name, "emitter0/2");
        for (ta, tb) in a.tracks.iter().zip(&b.tracks) {
            assert_eq!(ta.samples, tb.samples);
        }
        for track in &a.tracks {
            let s = track.samples.last().unwrap();
            assert!((s.position.length() - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_emitter_fan_angles() {
        let emitter = EmitterSpec {
            count: 3,
            spread: 1.0,
            base_angle: 0.5,
            ..EmitterSpec::default()
        };
        let angles = emitter.angles(&mut Pcg32::seed_from_u64(0));
        assert_eq!(angles, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_sampling_interval_keeps_last_frame() {
        let scenario = Scenario::from_json(r#"{ "frames": 7, "objects": [{}] }"#).unwrap();
        let trajectory = scenario.run_sampled(3).unwrap();
        let frames: Vec<u32> = trajectory.tracks[0].samples.iter().map(|s| s.frame).collect();
        assert_eq!(frames, vec![0, 3, 6, 7]);
    }
}
