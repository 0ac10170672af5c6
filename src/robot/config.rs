//! Physical constants, scheduler settings and the optional TOML configuration file.
//!
//! Everything has a compiled-in default; the file only overrides what it names.
use std::collections::BTreeMap;
use std::path::Path;

use embassy_time::Duration;
use log::info;
use serde::Deserialize;

use super::gaits::{GaitLibrary, GaitName, GaitSpec, TROT};
use super::wiring::{SlotMap, Wiring};
use crate::error::{ConfigError, GaitError};
use crate::kinematics::conversion::LegKinematics;
use crate::JOINT_COUNT;

// ROBOT SIZE (mm)
pub const CENTER_DISTANCE: f64 = 30.0;
pub const LINK1_LENGTH: f64 = 33.0;
pub const LINK2_LENGTH: f64 = 44.0;

// SCHEDULER
pub const DEFAULT_HZ: u32 = 50;
/// A tick must stay at least a millisecond long.
pub const MAX_HZ: u32 = 1000;
/// Actuator-space angle every joint sits at in the neutral pose (RX-24F: 0..300 deg).
pub const DEFAULT_NEUTRAL_CENTER_DEG: f64 = 150.0;
pub const DEFAULT_MAX_LAG_MS: u64 = 100;
pub const DEFAULT_SETTLE_MS: u64 = 200;
pub const DEFAULT_NEUTRAL_HOLD_MS: u64 = 1000;

// ACTUATOR TUNING
pub const DEFAULT_TORQUE_LIMIT: u16 = 1023;
/// 0 means "as fast as possible" on the Dynamixel bus.
pub const DEFAULT_MOVING_SPEED: u16 = 0;

pub const DEFAULT_GAIT: &str = TROT;

/// Link lengths of one leg. All four legs are assumed identical.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegGeometry {
    /// Distance between the body center line and the hip axis. Informational only.
    pub center_distance: f64,
    pub link1_length: f64,
    pub link2_length: f64,
}

impl Default for LegGeometry {
    fn default() -> Self {
        Self {
            center_distance: CENTER_DISTANCE,
            link1_length: LINK1_LENGTH,
            link2_length: LINK2_LENGTH,
        }
    }
}

impl LegGeometry {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("geometry.link1_length", self.link1_length),
            ("geometry.link2_length", self.link2_length),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: format!("must be a positive length, got {value}"),
                });
            }
        }
        if !(self.center_distance.is_finite() && self.center_distance >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "geometry.center_distance",
                message: format!("must not be negative, got {}", self.center_distance),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub hz: u32,
    pub neutral_center: f64,
    /// Lag past the scheduled tick beyond which the schedule restarts from "now".
    pub max_lag: Duration,
    /// Neutral hold after a jump.
    pub settle: Duration,
    /// Neutral hold of the start-up and shutdown rituals.
    pub neutral_hold: Duration,
    pub torque_limit: u16,
    pub moving_speed: u16,
    pub wiring: Wiring,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            hz: DEFAULT_HZ,
            neutral_center: DEFAULT_NEUTRAL_CENTER_DEG,
            max_lag: Duration::from_millis(DEFAULT_MAX_LAG_MS),
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            neutral_hold: Duration::from_millis(DEFAULT_NEUTRAL_HOLD_MS),
            torque_limit: DEFAULT_TORQUE_LIMIT,
            moving_speed: DEFAULT_MOVING_SPEED,
            wiring: Wiring::identity(),
        }
    }
}

impl SchedulerConfig {
    /// One tick. Rounded down to whole microseconds.
    pub fn period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.hz.max(1)))
    }

    /// Ticks needed to cover `duration`, at least one.
    pub fn ticks_for(&self, duration: Duration) -> u64 {
        let ticks = duration.as_micros() * u64::from(self.hz) / 1_000_000;
        ticks.max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hz == 0 || self.hz > MAX_HZ {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.hz",
                message: format!("must be within 1..={MAX_HZ}, got {}", self.hz),
            });
        }
        if !self.neutral_center.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.neutral_center",
                message: "must be finite".into(),
            });
        }
        Ok(())
    }
}

/// Everything the binary needs to build the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub geometry: LegGeometry,
    pub scheduler: SchedulerConfig,
    pub gaits: GaitLibrary,
    pub initial_gait: GaitName,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let mut initial_gait = GaitName::new();
        // DEFAULT_GAIT is a short literal
        let _ = initial_gait.push_str(DEFAULT_GAIT);
        Self {
            geometry: LegGeometry::default(),
            scheduler: SchedulerConfig::default(),
            gaits: GaitLibrary::builtin(),
            initial_gait,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    geometry: LegGeometry,
    scheduler: SchedulerSection,
    wiring: WiringSection,
    gaits: BTreeMap<String, GaitSpec>,
    initial_gait: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SchedulerSection {
    hz: Option<u32>,
    neutral_center: Option<f64>,
    max_lag_ms: Option<u64>,
    settle_ms: Option<u64>,
    neutral_hold_ms: Option<u64>,
    torque_limit: Option<u16>,
    moving_speed: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct WiringSection {
    preset: Option<String>,
    slots: Option<Vec<SlotMap>>,
}

impl WiringSection {
    fn resolve(self) -> Result<Wiring, ConfigError> {
        match (self.preset, self.slots) {
            (Some(_), Some(_)) => Err(ConfigError::InvalidValue {
                field: "wiring",
                message: "give either a preset or a slot table, not both".into(),
            }),
            (Some(preset), None) => Ok(Wiring::preset(&preset)?),
            (None, Some(slots)) => {
                let count = slots.len();
                let slots: [SlotMap; JOINT_COUNT] =
                    slots.try_into().map_err(|_| ConfigError::InvalidValue {
                        field: "wiring.slots",
                        message: format!("expected {JOINT_COUNT} entries, got {count}"),
                    })?;
                Ok(Wiring::new(slots)?)
            }
            (None, None) => Ok(Wiring::identity()),
        }
    }
}

impl ControllerConfig {
    /// Defaults when `path` is `None`, otherwise the file layered over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(
            "[CONFIG] loaded {} ({} gaits, initial {})",
            path.display(),
            config.gaits.len(),
            config.initial_gait
        );
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text)?;
        let mut config = Self {
            geometry: file.geometry,
            ..Self::default()
        };

        let scheduler = &mut config.scheduler;
        let section = file.scheduler;
        if let Some(hz) = section.hz {
            scheduler.hz = hz;
        }
        if let Some(center) = section.neutral_center {
            scheduler.neutral_center = center;
        }
        if let Some(ms) = section.max_lag_ms {
            scheduler.max_lag = Duration::from_millis(ms);
        }
        if let Some(ms) = section.settle_ms {
            scheduler.settle = Duration::from_millis(ms);
        }
        if let Some(ms) = section.neutral_hold_ms {
            scheduler.neutral_hold = Duration::from_millis(ms);
        }
        if let Some(limit) = section.torque_limit {
            scheduler.torque_limit = limit;
        }
        if let Some(speed) = section.moving_speed {
            scheduler.moving_speed = speed;
        }
        scheduler.wiring = file.wiring.resolve()?;

        for (name, spec) in &file.gaits {
            config.gaits.insert(name, *spec)?;
        }
        if let Some(name) = file.initial_gait {
            config.set_initial_gait(&name)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn set_initial_gait(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.gaits.contains(name) {
            return Err(GaitError::UnknownGait(name.into()).into());
        }
        self.initial_gait =
            GaitName::try_from(name).map_err(|_| GaitError::NameTooLong(name.into()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry.validate()?;
        self.scheduler.validate()?;
        if !self.gaits.contains(&self.initial_gait) {
            return Err(GaitError::UnknownGait(self.initial_gait.as_str().into()).into());
        }
        self.gaits.validate(&LegKinematics::new(self.geometry))?;
        Ok(())
    }
}
