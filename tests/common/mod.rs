//! Fakes shared by the scheduler scenarios: a virtual clock, a recording actuator and a scripted
//! gesture source.
#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use embassy_time::{Duration, Instant};
use quad_gait::error::ActuatorError;
use quad_gait::kinematics::conversion::LegKinematics;
use quad_gait::kinematics::gait_engine::GaitEngine;
use quad_gait::robot::actuator::ActuatorSink;
use quad_gait::robot::commands::GestureToken;
use quad_gait::robot::config::{LegGeometry, SchedulerConfig};
use quad_gait::robot::gaits::GaitLibrary;
use quad_gait::robot::state::StopHandle;
use quad_gait::tasks::motion_task::{Clock, GestureSource};
use quad_gait::JOINT_COUNT;

pub const CENTER: f64 = 150.0;

/// Virtual time in microseconds. Sleeping jumps straight to the deadline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by.as_micros());
    }

    pub fn micros(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.now.get())
    }

    async fn sleep_until(&mut self, deadline: Instant) {
        if deadline.as_micros() > self.now.get() {
            self.now.set(deadline.as_micros());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Write {
    /// Virtual time of the write, in microseconds.
    pub at: u64,
    pub angles: [f64; JOINT_COUNT],
}

impl Write {
    pub fn is_neutral(&self) -> bool {
        self.angles.iter().all(|a| *a == CENTER)
    }
}

/// Records every call. Optional hooks fire on a given write index (0-based).
#[derive(Default)]
pub struct RecordingSink {
    pub clock: ManualClock,
    pub writes: Vec<Write>,
    pub torque_limits: Vec<u16>,
    pub moving_speeds: Vec<u16>,
    pub releases: usize,
    /// Extra virtual time spent inside the given write.
    pub lag_at: Option<(usize, Duration)>,
    pub fail_from: Option<usize>,
    pub estop_at: Option<(usize, StopHandle)>,
    pub shutdown_at: Option<(usize, StopHandle)>,
}

impl RecordingSink {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    pub fn timestamps(&self) -> Vec<u64> {
        self.writes.iter().map(|w| w.at).collect()
    }
}

impl ActuatorSink for RecordingSink {
    fn write_positions_deg(&mut self, angles: &[f64; JOINT_COUNT]) -> Result<(), ActuatorError> {
        let index = self.writes.len();
        self.writes.push(Write {
            at: self.clock.micros(),
            angles: *angles,
        });

        if let Some((at, lag)) = self.lag_at {
            if at == index {
                self.clock.advance(lag);
            }
        }
        if let Some((at, stop)) = &self.estop_at {
            if *at == index {
                stop.request_emergency_stop();
            }
        }
        if let Some((at, stop)) = &self.shutdown_at {
            if *at == index {
                stop.request_shutdown();
            }
        }
        match self.fail_from {
            Some(from) if index >= from => Err(ActuatorError::Closed),
            _ => Ok(()),
        }
    }

    fn set_torque_limit_all(&mut self, limit: u16) -> Result<(), ActuatorError> {
        self.torque_limits.push(limit);
        Ok(())
    }

    fn set_moving_speed_all(&mut self, speed: u16) -> Result<(), ActuatorError> {
        self.moving_speeds.push(speed);
        Ok(())
    }

    fn release_torque(&mut self) -> Result<(), ActuatorError> {
        self.releases += 1;
        Ok(())
    }
}

/// Replays one token per poll; the last entry repeats forever.
pub struct ScriptedSource {
    script: Vec<Option<&'static str>>,
    polls: usize,
}

impl ScriptedSource {
    pub fn new(script: &[Option<&'static str>]) -> Self {
        Self {
            script: script.to_vec(),
            polls: 0,
        }
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl GestureSource for ScriptedSource {
    fn poll(&mut self) {
        self.polls += 1;
    }

    fn read_gesture(&self) -> Option<GestureToken> {
        let index = self.polls.saturating_sub(1).min(self.script.len().saturating_sub(1));
        let token = self.script.get(index).copied().flatten()?;
        GestureToken::try_from(token).ok()
    }
}

pub fn engine(initial: &str) -> GaitEngine {
    GaitEngine::new(
        LegKinematics::new(LegGeometry::default()),
        GaitLibrary::builtin(),
        initial,
    )
    .unwrap()
}

/// 50 Hz, 100 ms max lag, 200 ms settle, 100 ms neutral hold.
pub fn config() -> SchedulerConfig {
    SchedulerConfig {
        neutral_hold: Duration::from_millis(100),
        ..SchedulerConfig::default()
    }
}

pub const PERIOD_US: u64 = 20_000;
