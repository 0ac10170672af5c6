//! Error types shared across the controller.
//!
//! Configuration problems are fatal at load time; per-tick problems never show up here because
//! the gait engine recovers them locally.
use thiserror::Error;

/// Errors raised while loading or editing gaits.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GaitError {
    #[error("unknown gait '{0}'")]
    UnknownGait(String),

    #[error("gait table has no '{0}' entry")]
    MissingGait(&'static str),

    #[error("neutral pose of gait '{name}' is unreachable (x0={x0}, y0={y0})")]
    UnreachableNeutral { name: String, x0: f64, y0: f64 },

    #[error("invalid gait '{name}': {reason}")]
    InvalidSpec { name: String, reason: &'static str },

    #[error("gait name '{0}' is too long")]
    NameTooLong(String),

    #[error("gait table is full")]
    TableFull,
}

/// Errors raised by an actuator sink. The scheduler logs them and keeps ticking.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("actuator i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("actuator connection is closed")]
    Closed,

    #[error("actuator rejected the command: {0}")]
    Rejected(String),
}

/// Errors raised when a wiring table does not describe a permutation of the actuator slots.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WiringError {
    #[error("slot {0} is out of range")]
    SlotOutOfRange(usize),

    #[error("slot {0} is used more than once")]
    DuplicateSlot(usize),

    #[error("unknown wiring preset '{0}'")]
    UnknownPreset(String),
}

/// Errors raised while loading the controller configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Gait(#[from] GaitError),

    #[error(transparent)]
    Wiring(#[from] WiringError),
}
