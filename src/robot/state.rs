//! Robot safety state machine and the stop requests that reach it from other threads.
use core::fmt::{self, Display, Formatter};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};

use super::commands::{Command, Gesture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotState {
    Init,
    Idle,
    Moving,
    SafetyStop,
}

impl Display for RobotState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RobotState::Init => f.write_str("init"),
            RobotState::Idle => f.write_str("idle"),
            RobotState::Moving => f.write_str("moving"),
            RobotState::SafetyStop => f.write_str("safety stop"),
        }
    }
}

/// Maps `(state, gesture)` to `(next state, command)`.
///
/// From `Idle` and `SafetyStop` only the walking gestures in [`Gesture::starts_motion`] get
/// through; everything else (including jumps) is gated to `Idle`. Once `Moving`, every gesture
/// is forwarded as its command, and `stop`/`none` bring the robot back to `Idle`.
#[derive(Debug)]
pub struct RobotStateMachine {
    state: RobotState,
}

impl RobotStateMachine {
    pub fn new() -> Self {
        Self {
            state: RobotState::Init,
        }
    }

    pub fn state(&self) -> RobotState {
        self.state
    }

    pub fn update(&mut self, gesture: Gesture) -> (RobotState, Command) {
        let (next, command) = match (self.state, gesture) {
            (RobotState::Init, _) => (RobotState::Idle, Command::Idle),
            (RobotState::SafetyStop | RobotState::Idle, g) if g.starts_motion() => {
                (RobotState::Moving, g.command())
            }
            (RobotState::SafetyStop, _) => (RobotState::SafetyStop, Command::Idle),
            (RobotState::Idle, _) => (RobotState::Idle, Command::Idle),
            (RobotState::Moving, Gesture::Stop | Gesture::Rest) => {
                (RobotState::Idle, Command::Idle)
            }
            (RobotState::Moving, g) => (RobotState::Moving, g.command()),
        };

        if next != self.state {
            info!("[STATE] {} -> {} on {:?}", self.state, next, gesture);
        }
        self.state = next;
        (next, command)
    }

    /// Unconditional override, valid from every state.
    pub fn emergency_stop(&mut self) {
        if self.state != RobotState::SafetyStop {
            warn!("[STATE] {} -> safety stop (emergency)", self.state);
        }
        self.state = RobotState::SafetyStop;
    }
}

impl Default for RobotStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

struct StopSignals {
    shutdown: Signal<CriticalSectionRawMutex, ()>,
    emergency: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for StopSignals {
    fn default() -> Self {
        Self {
            shutdown: Signal::new(),
            emergency: Signal::new(),
        }
    }
}

/// Cloneable handle used by signal handlers and intake threads to reach the motion task.
///
/// Requests are serviced at tick boundaries, never in the middle of a jump.
#[derive(Clone, Default)]
pub struct StopHandle {
    signals: Arc<StopSignals>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self) {
        self.signals.shutdown.signal(());
    }

    pub fn request_emergency_stop(&self) {
        self.signals.emergency.signal(());
    }

    /// Sticky: stays set once requested.
    pub fn shutdown_requested(&self) -> bool {
        self.signals.shutdown.signaled()
    }

    /// Consumes a pending emergency stop request.
    pub fn take_emergency_stop(&self) -> bool {
        self.signals.emergency.try_take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_in(state: RobotState) -> RobotStateMachine {
        RobotStateMachine { state }
    }

    #[test]
    fn init_always_bootstraps_to_idle() {
        for gesture in [Gesture::Forward, Gesture::Stop, Gesture::Jump, Gesture::Idle] {
            let mut sm = RobotStateMachine::new();
            assert_eq!(sm.update(gesture), (RobotState::Idle, Command::Idle));
        }
    }

    #[test]
    fn idle_only_starts_on_walking_gestures() {
        let mut sm = machine_in(RobotState::Idle);
        assert_eq!(sm.update(Gesture::Backward), (RobotState::Idle, Command::Idle));
        assert_eq!(sm.update(Gesture::Jump), (RobotState::Idle, Command::Idle));
        assert_eq!(
            sm.update(Gesture::TurnLeft),
            (RobotState::Moving, Command::TurnLeft)
        );

        let mut sm = machine_in(RobotState::Idle);
        assert_eq!(
            sm.update(Gesture::Forward),
            (RobotState::Moving, Command::Forward)
        );
        let mut sm = machine_in(RobotState::Idle);
        assert_eq!(
            sm.update(Gesture::TurnRight),
            (RobotState::Moving, Command::TurnRight)
        );
    }

    #[test]
    fn moving_forwards_gestures_until_stopped() {
        let mut sm = machine_in(RobotState::Moving);
        assert_eq!(
            sm.update(Gesture::Backward),
            (RobotState::Moving, Command::Backward)
        );
        assert_eq!(
            sm.update(Gesture::JumpForward),
            (RobotState::Moving, Command::JumpForward)
        );
        assert_eq!(sm.update(Gesture::Idle), (RobotState::Moving, Command::Idle));
        assert_eq!(sm.update(Gesture::Stop), (RobotState::Idle, Command::Idle));

        let mut sm = machine_in(RobotState::Moving);
        assert_eq!(sm.update(Gesture::Rest), (RobotState::Idle, Command::Idle));
    }

    #[test]
    fn safety_stop_requires_a_walking_gesture() {
        let mut sm = machine_in(RobotState::SafetyStop);
        assert_eq!(
            sm.update(Gesture::Stop),
            (RobotState::SafetyStop, Command::Idle)
        );
        assert_eq!(
            sm.update(Gesture::Jump),
            (RobotState::SafetyStop, Command::Idle)
        );
        assert_eq!(
            sm.update(Gesture::Forward),
            (RobotState::Moving, Command::Forward)
        );
    }

    #[test]
    fn emergency_stop_from_any_state() {
        for state in [
            RobotState::Init,
            RobotState::Idle,
            RobotState::Moving,
            RobotState::SafetyStop,
        ] {
            let mut sm = machine_in(state);
            sm.emergency_stop();
            assert_eq!(sm.state(), RobotState::SafetyStop);
        }
    }

    #[test]
    fn stop_handle_requests() {
        let handle = StopHandle::new();
        let remote = handle.clone();
        assert!(!handle.shutdown_requested());
        assert!(!handle.take_emergency_stop());

        remote.request_emergency_stop();
        assert!(handle.take_emergency_stop());
        assert!(!handle.take_emergency_stop());

        std::thread::spawn(move || remote.request_shutdown())
            .join()
            .unwrap();
        assert!(handle.shutdown_requested());
        assert!(handle.shutdown_requested());
    }
}
