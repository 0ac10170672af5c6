//! Logical joint order → actuator slot mapping.
//!
//! The gait engine and the scheduler always work in the physical joint order. Boards differ in
//! how the servos are chained: the RX-24F harness puts the right legs' knee before the hip and
//! mounts them mirrored. The table captures that once, so nothing downstream swaps indices.
use serde::Deserialize;

use super::joint::{joint_index, Joint};
use super::leg::Leg;
use crate::error::WiringError;
use crate::JOINT_COUNT;

/// Where a logical joint lands on the actuator, and whether it turns the other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SlotMap {
    pub slot: usize,
    #[serde(default)]
    pub mirrored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring {
    slots: [SlotMap; JOINT_COUNT],
}

impl Wiring {
    /// Every actuator slot must be used exactly once.
    pub fn new(slots: [SlotMap; JOINT_COUNT]) -> Result<Self, WiringError> {
        let mut used = [false; JOINT_COUNT];
        for map in &slots {
            let seen = used
                .get_mut(map.slot)
                .ok_or(WiringError::SlotOutOfRange(map.slot))?;
            if *seen {
                return Err(WiringError::DuplicateSlot(map.slot));
            }
            *seen = true;
        }
        Ok(Self { slots })
    }

    pub fn identity() -> Self {
        Self {
            slots: core::array::from_fn(|slot| SlotMap {
                slot,
                mirrored: false,
            }),
        }
    }

    /// RX-24F harness: right legs chained knee-first and mounted mirrored.
    pub fn swapped_right() -> Self {
        let mut slots = Self::identity().slots;
        for leg in [Leg::FrontRight, Leg::RearRight] {
            let hip = joint_index(leg, Joint::Hip);
            let knee = joint_index(leg, Joint::Knee);
            slots[hip] = SlotMap {
                slot: knee,
                mirrored: true,
            };
            slots[knee] = SlotMap {
                slot: hip,
                mirrored: true,
            };
        }
        Self { slots }
    }

    pub fn preset(name: &str) -> Result<Self, WiringError> {
        match name {
            "identity" => Ok(Self::identity()),
            "swapped_right" => Ok(Self::swapped_right()),
            other => Err(WiringError::UnknownPreset(other.into())),
        }
    }

    /// Reorders a logical command into actuator slots. Mirrored joints reflect about `center`.
    pub fn apply(&self, logical: &[f64; JOINT_COUNT], center: f64) -> [f64; JOINT_COUNT] {
        let mut out = [center; JOINT_COUNT];
        for (value, map) in logical.iter().zip(self.slots.iter()) {
            out[map.slot] = if map.mirrored {
                2.0 * center - value
            } else {
                *value
            };
        }
        out
    }
}

impl Default for Wiring {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGICAL: [f64; JOINT_COUNT] = [151.0, 152.0, 153.0, 154.0, 155.0, 156.0, 157.0, 158.0];

    #[test]
    fn identity_is_a_no_op() {
        assert_eq!(Wiring::identity().apply(&LOGICAL, 150.0), LOGICAL);
    }

    #[test]
    fn swapped_right_reorders_and_mirrors_right_legs() {
        let out = Wiring::swapped_right().apply(&LOGICAL, 150.0);
        // left legs untouched
        assert_eq!(&out[0..2], &[151.0, 152.0]);
        assert_eq!(&out[4..6], &[155.0, 156.0]);
        // front right: knee first, both mirrored about 150
        assert_eq!(&out[2..4], &[146.0, 147.0]);
        assert_eq!(&out[6..8], &[142.0, 143.0]);
    }

    #[test]
    fn neutral_command_is_wiring_invariant() {
        let neutral = [150.0; JOINT_COUNT];
        assert_eq!(Wiring::swapped_right().apply(&neutral, 150.0), neutral);
    }

    #[test]
    fn rejects_tables_that_are_not_permutations() {
        let mut slots = [SlotMap {
            slot: 0,
            mirrored: false,
        }; JOINT_COUNT];
        assert_eq!(Wiring::new(slots), Err(WiringError::DuplicateSlot(0)));

        for (i, map) in slots.iter_mut().enumerate() {
            map.slot = i;
        }
        slots[7].slot = 8;
        assert_eq!(Wiring::new(slots), Err(WiringError::SlotOutOfRange(8)));

        slots[7].slot = 7;
        assert_eq!(Wiring::new(slots), Ok(Wiring::identity()));
        assert!(Wiring::preset("upside_down").is_err());
    }
}
