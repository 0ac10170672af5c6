//! Kinematics algorithms and gait generation for the quadruped.
//!
//! This module provides the mathematical routines for converting between Cartesian
//! foot positions and joint angles, as well as routines for generating and sequencing
//! leg movements (gaits).
//!
//! - [`conversion`] handles forward/inverse kinematics and angle units.
//! - [`trajectory`] holds the trot and jump foot paths.
//! - [`gait_engine`] implements the state machine for coordinated leg movement.
//!
//! Used by the motion task to plan and execute robot movement.
pub mod conversion;
pub mod gait_engine;
pub mod trajectory;
