//! Core robot types and configuration.
//!
//! This module defines the main types and constants of the quadruped controller, including:
//! - [`commands`]: Gesture tokens, commands and travel directions.
//! - [`config`]: Physical constants, scheduler settings and the TOML file model.
//! - [`gaits`]: Gait parameter records and the named gait table.
//! - [`leg`]: Leg enumeration, diagonal pairs and indexing helpers.
//! - [`joint`]: Joint enumeration, the physical joint order and angle containers.
//! - [`state`]: Safety state machine and cross-thread stop requests.
//! - [`wiring`]: Logical joint order to actuator slot mapping.
//! - [`actuator`]: Actuator capability and the torque guard.
//!
//! These types are used throughout the controller for movement, configuration, and control.
pub mod actuator;
pub mod commands;
pub mod config;
pub mod gaits;
pub mod joint;
pub mod leg;
pub mod state;
pub mod wiring;
