//! Runtime tasks of the gait controller.
//!
//! This module contains the pieces that run on the host, including:
//! - [`motion_task`]: The fixed-rate scheduler that drives the gait engine.
//! - [`servo_task`]: Actuator sinks (the `motor_server` pipe and a dry-run logger).
//! - [`net_task`]: TCP and keyboard gesture intake.
//!
//! Everything is wired together in `main.rs`.
pub mod motion_task;
pub mod net_task;
pub mod servo_task;
