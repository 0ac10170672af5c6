//! Library root for the quadruped gait controller.
//!
//! Re-exports all main modules: [`kinematics`], [`robot`], and [`tasks`].
//! Used by the `quad-gait` binary and by the integration tests.
pub mod error;
pub mod kinematics;
pub mod robot;
pub mod tasks;

/// Hip + knee on each of the four legs.
pub const JOINT_COUNT: usize = 8;
pub const LEG_COUNT: usize = 4;

pub const GESTURE_TOKEN_SIZE: usize = 24;
pub const GAIT_NAME_SIZE: usize = 24;
pub const GAIT_TABLE_SIZE: usize = 16;
