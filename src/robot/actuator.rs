//! Actuator capability consumed by the scheduler.
//!
//! The controller only ever hands over eight goal angles in degrees, in actuator-slot order.
//! Tick conversion and bus framing belong to the sink.
use core::ops::{Deref, DerefMut};

use log::{error, warn};

use crate::error::ActuatorError;
use crate::JOINT_COUNT;

pub trait ActuatorSink {
    fn write_positions_deg(&mut self, angles: &[f64; JOINT_COUNT]) -> Result<(), ActuatorError>;

    /// Optional tuning. Sinks without the register keep the default no-op.
    fn set_torque_limit_all(&mut self, _limit: u16) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn set_moving_speed_all(&mut self, _speed: u16) -> Result<(), ActuatorError> {
        Ok(())
    }

    /// Lets the joints go limp. Last call of the shutdown ritual.
    fn release_torque(&mut self) -> Result<(), ActuatorError> {
        Ok(())
    }
}

impl<S: ActuatorSink + ?Sized> ActuatorSink for &mut S {
    fn write_positions_deg(&mut self, angles: &[f64; JOINT_COUNT]) -> Result<(), ActuatorError> {
        (**self).write_positions_deg(angles)
    }

    fn set_torque_limit_all(&mut self, limit: u16) -> Result<(), ActuatorError> {
        (**self).set_torque_limit_all(limit)
    }

    fn set_moving_speed_all(&mut self, speed: u16) -> Result<(), ActuatorError> {
        (**self).set_moving_speed_all(speed)
    }

    fn release_torque(&mut self) -> Result<(), ActuatorError> {
        (**self).release_torque()
    }
}

impl<S: ActuatorSink + ?Sized> ActuatorSink for Box<S> {
    fn write_positions_deg(&mut self, angles: &[f64; JOINT_COUNT]) -> Result<(), ActuatorError> {
        (**self).write_positions_deg(angles)
    }

    fn set_torque_limit_all(&mut self, limit: u16) -> Result<(), ActuatorError> {
        (**self).set_torque_limit_all(limit)
    }

    fn set_moving_speed_all(&mut self, speed: u16) -> Result<(), ActuatorError> {
        (**self).set_moving_speed_all(speed)
    }

    fn release_torque(&mut self) -> Result<(), ActuatorError> {
        (**self).release_torque()
    }
}

/// Owns a sink for the lifetime of the controller.
///
/// If it is dropped before torque was released (early `?` return, panic unwind) it writes the
/// neutral command once and releases torque itself, so the robot never stays stiff in a random
/// pose.
pub struct TorqueGuard<S: ActuatorSink> {
    sink: S,
    neutral: [f64; JOINT_COUNT],
    released: bool,
}

impl<S: ActuatorSink> TorqueGuard<S> {
    pub fn new(sink: S, neutral: [f64; JOINT_COUNT]) -> Self {
        Self {
            sink,
            neutral,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<S: ActuatorSink> Deref for TorqueGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.sink
    }
}

impl<S: ActuatorSink> DerefMut for TorqueGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: ActuatorSink> ActuatorSink for TorqueGuard<S> {
    fn write_positions_deg(&mut self, angles: &[f64; JOINT_COUNT]) -> Result<(), ActuatorError> {
        self.sink.write_positions_deg(angles)
    }

    fn set_torque_limit_all(&mut self, limit: u16) -> Result<(), ActuatorError> {
        self.sink.set_torque_limit_all(limit)
    }

    fn set_moving_speed_all(&mut self, speed: u16) -> Result<(), ActuatorError> {
        self.sink.set_moving_speed_all(speed)
    }

    fn release_torque(&mut self) -> Result<(), ActuatorError> {
        self.sink.release_torque()?;
        self.released = true;
        Ok(())
    }
}

impl<S: ActuatorSink> Drop for TorqueGuard<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("[SERVO_TASK] controller exited without shutdown, parking the joints");
        if let Err(e) = self.sink.write_positions_deg(&self.neutral) {
            error!("[SERVO_TASK] neutral write on drop failed: {e}");
        }
        if let Err(e) = self.sink.release_torque() {
            error!("[SERVO_TASK] torque release on drop failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<[f64; JOINT_COUNT]>,
        releases: usize,
        fail_release: bool,
    }

    impl ActuatorSink for Recorder {
        fn write_positions_deg(
            &mut self,
            angles: &[f64; JOINT_COUNT],
        ) -> Result<(), ActuatorError> {
            self.writes.push(*angles);
            Ok(())
        }

        fn release_torque(&mut self) -> Result<(), ActuatorError> {
            self.releases += 1;
            if self.fail_release {
                return Err(ActuatorError::Closed);
            }
            Ok(())
        }
    }

    const NEUTRAL: [f64; JOINT_COUNT] = [150.0; JOINT_COUNT];

    #[test]
    fn drop_without_release_parks_and_releases() {
        let mut recorder = Recorder::default();
        {
            let mut guard = TorqueGuard::new(&mut recorder, NEUTRAL);
            guard.write_positions_deg(&[160.0; JOINT_COUNT]).unwrap();
        }
        assert_eq!(recorder.writes, vec![[160.0; JOINT_COUNT], NEUTRAL]);
        assert_eq!(recorder.releases, 1);
    }

    #[test]
    fn drop_after_release_is_silent() {
        let mut recorder = Recorder::default();
        {
            let mut guard = TorqueGuard::new(&mut recorder, NEUTRAL);
            guard.release_torque().unwrap();
            assert!(guard.is_released());
        }
        assert!(recorder.writes.is_empty());
        assert_eq!(recorder.releases, 1);
    }

    #[test]
    fn failed_release_is_retried_on_drop() {
        let mut recorder = Recorder {
            fail_release: true,
            ..Recorder::default()
        };
        {
            let mut guard = TorqueGuard::new(&mut recorder, NEUTRAL);
            assert!(guard.release_torque().is_err());
            assert!(!guard.is_released());
        }
        assert_eq!(recorder.writes, vec![NEUTRAL]);
        assert_eq!(recorder.releases, 2);
    }

    #[test]
    fn tuning_defaults_to_no_op() {
        let mut boxed: Box<dyn ActuatorSink> = Box::new(Recorder::default());
        assert!(boxed.set_torque_limit_all(1023).is_ok());
        assert!(boxed.set_moving_speed_all(0).is_ok());
    }
}
