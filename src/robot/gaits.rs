//! Gait parameter records and the named gait table.
//!
//! The table is configuration, not logic: the engine only ever looks gaits up by name, so a
//! tuned table (see [`crate::robot::config::ControllerConfig`]) can replace the built-in one.
use serde::Deserialize;

use super::commands::Direction;
use crate::error::GaitError;
use crate::kinematics::conversion::LegKinematics;
use crate::{GAIT_NAME_SIZE, GAIT_TABLE_SIZE};

pub const TROT: &str = "TROT";
pub const TROT_LOW: &str = "TROT_LOW";
pub const JUMP: &str = "JUMP";
pub const JUMP_FORWARD: &str = "JUMP_FORWARD";
pub const JUMP_BACKWARD: &str = "JUMP_BACKWARD";

/// Gaits the jump gestures load. Every table must carry them.
pub const JUMP_GAITS: [&str; 3] = [JUMP, JUMP_FORWARD, JUMP_BACKWARD];

pub type GaitName = heapless::String<GAIT_NAME_SIZE>;

/// Selects the trajectory-shape algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaitKind {
    Trot,
    Jump,
}

impl GaitKind {
    pub fn supports(self, direction: Direction) -> bool {
        match self {
            GaitKind::Trot => direction != Direction::InPlace,
            GaitKind::Jump => true,
        }
    }
}

/// Lengths in mm, in the hip frame (`x` forward, `y` down). Durations in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GaitSpec {
    pub kind: GaitKind,
    /// Neutral foot position.
    pub x0: f64,
    pub y0: f64,
    /// Fore-aft stride (trot) or push-off reach (jump).
    pub x_range: f64,
    /// Foot lift during swing.
    #[serde(default)]
    pub y_range: f64,
    /// Crouch depth and extension of a jump.
    #[serde(default)]
    pub y_boost: f64,
    pub swing_ticks: u32,
    pub stance_ticks: u32,
}

impl GaitSpec {
    pub const fn cycle_ticks(&self) -> u32 {
        self.swing_ticks + self.stance_ticks
    }

    pub fn validate(&self, name: &str) -> Result<(), GaitError> {
        let invalid = |reason| GaitError::InvalidSpec {
            name: name.into(),
            reason,
        };
        let lengths = [self.x0, self.y0, self.x_range, self.y_range, self.y_boost];
        if lengths.iter().any(|v| !v.is_finite()) {
            return Err(invalid("lengths must be finite"));
        }
        if self.y_range < 0.0 || self.y_boost < 0.0 {
            return Err(invalid("y_range and y_boost must not be negative"));
        }
        if self.swing_ticks == 0 || self.stance_ticks == 0 {
            return Err(invalid("swing_ticks and stance_ticks must be positive"));
        }
        Ok(())
    }
}

/// Fixed-capacity `name -> GaitSpec` table.
#[derive(Debug, Clone, PartialEq)]
pub struct GaitLibrary {
    entries: heapless::Vec<(GaitName, GaitSpec), GAIT_TABLE_SIZE>,
}

impl GaitLibrary {
    pub fn empty() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }

    /// Stock table tuned for 33/44 mm links.
    pub fn builtin() -> Self {
        let trot = GaitSpec {
            kind: GaitKind::Trot,
            x0: 15.0,
            y0: 43.36,
            x_range: 40.0,
            y_range: 20.0,
            y_boost: 0.0,
            swing_ticks: 16,
            stance_ticks: 32,
        };
        let jump = GaitSpec {
            kind: GaitKind::Jump,
            x0: 15.0,
            y0: 40.0,
            x_range: 0.0,
            y_range: 0.0,
            y_boost: 22.0,
            swing_ticks: 30,
            stance_ticks: 6,
        };
        let table = [
            (TROT, trot),
            (
                TROT_LOW,
                GaitSpec {
                    y0: 35.0,
                    x_range: 30.0,
                    y_range: 12.0,
                    ..trot
                },
            ),
            (JUMP, jump),
            (
                JUMP_FORWARD,
                GaitSpec {
                    x_range: 16.0,
                    ..jump
                },
            ),
            (
                JUMP_BACKWARD,
                GaitSpec {
                    x_range: 12.0,
                    y_boost: 18.0,
                    swing_ticks: 24,
                    ..jump
                },
            ),
        ];

        let mut library = Self::empty();
        for (name, spec) in table {
            // five entries always fit and every name is short
            let _ = library.insert(name, spec);
        }
        library
    }

    /// Adds or replaces an entry, returning the spec it replaced.
    pub fn insert(&mut self, name: &str, spec: GaitSpec) -> Result<Option<GaitSpec>, GaitError> {
        spec.validate(name)?;
        if let Some((_, existing)) = self.entries.iter_mut().find(|(n, _)| n.as_str() == name) {
            return Ok(Some(core::mem::replace(existing, spec)));
        }
        let key = GaitName::try_from(name).map_err(|_| GaitError::NameTooLong(name.into()))?;
        self.entries
            .push((key, spec))
            .map_err(|_| GaitError::TableFull)?;
        Ok(None)
    }

    pub fn get(&self, name: &str) -> Option<&GaitSpec> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, spec)| spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GaitSpec)> {
        self.entries.iter().map(|(n, spec)| (n.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks the whole table against the leg: the jump gaits are present and every neutral
    /// pose is in reach. Fails on the first offending entry.
    pub fn validate(&self, kinematics: &LegKinematics) -> Result<(), GaitError> {
        if let Some(missing) = JUMP_GAITS.into_iter().find(|name| !self.contains(name)) {
            return Err(GaitError::MissingGait(missing));
        }
        for (name, spec) in self.iter() {
            spec.validate(name)?;
            if !kinematics.is_reachable(spec.x0, spec.y0) {
                return Err(GaitError::UnreachableNeutral {
                    name: name.into(),
                    x0: spec.x0,
                    y0: spec.y0,
                });
            }
        }
        Ok(())
    }
}

impl Default for GaitLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}
