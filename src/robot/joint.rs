//! Joint enumeration, the physical joint order, and the 8-joint angle containers.
//!
//! [`JointAngles`] is the sample type handed from the gait engine to the scheduler, [`Pose`] the
//! named view of one actuator command. Both always hold exactly [`JOINT_COUNT`] values, indexed
//! `[FL_hip, FL_knee, FR_hip, FR_knee, RL_hip, RL_knee, RR_hip, RR_knee]`.
use core::fmt::Display;

use super::leg::Leg;
use crate::kinematics::conversion::AngleUnit;
use crate::{JOINT_COUNT, LEG_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    Hip = 0,
    Knee = 1,
}

impl Display for Joint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Joint::Hip => f.write_str("hip"),
            Joint::Knee => f.write_str("knee"),
        }
    }
}

pub const JOINT_NAMES: [&str; JOINT_COUNT] = [
    "front_left_hip",
    "front_left_knee",
    "front_right_hip",
    "front_right_knee",
    "rear_left_hip",
    "rear_left_knee",
    "rear_right_hip",
    "rear_right_knee",
];

/// Slot of a (leg, joint) pair in the physical joint order.
pub const fn joint_index(leg: Leg, joint: Joint) -> usize {
    leg as usize * 2 + joint as usize
}

/// Eight finite joint angles tagged with their unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngles {
    values: [f64; JOINT_COUNT],
    unit: AngleUnit,
}

impl JointAngles {
    /// Returns `None` when any value is NaN or infinite.
    pub fn new(values: [f64; JOINT_COUNT], unit: AngleUnit) -> Option<Self> {
        values
            .iter()
            .all(|v| v.is_finite())
            .then_some(Self { values, unit })
    }

    /// Builds the sample from per-leg `(q_hip, q_knee)` pairs.
    pub fn from_legs(legs: [(f64, f64); LEG_COUNT], unit: AngleUnit) -> Option<Self> {
        let mut values = [0.0; JOINT_COUNT];
        for leg in Leg::ALL {
            let (q_hip, q_knee) = legs[leg];
            values[joint_index(leg, Joint::Hip)] = q_hip;
            values[joint_index(leg, Joint::Knee)] = q_knee;
        }
        Self::new(values, unit)
    }

    pub fn get(&self, leg: Leg, joint: Joint) -> f64 {
        self.values[joint_index(leg, joint)]
    }

    pub fn values(&self) -> &[f64; JOINT_COUNT] {
        &self.values
    }

    pub fn unit(&self) -> AngleUnit {
        self.unit
    }
}

/// One actuator command keyed by joint name. Generated per tick, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    angles: [f64; JOINT_COUNT],
}

impl Pose {
    pub fn new(angles: [f64; JOINT_COUNT]) -> Self {
        Self { angles }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        JOINT_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.angles[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        JOINT_NAMES.iter().copied().zip(self.angles.iter().copied())
    }

    pub fn angles(&self) -> &[f64; JOINT_COUNT] {
        &self.angles
    }
}
