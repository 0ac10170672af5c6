//! High-level motion task for the quadruped.
//!
//! [`MotionScheduler`] owns the fixed-rate control loop: it polls the gesture source, runs the
//! safety state machine, drives the gait engine and pushes one recentered command per tick to the
//! actuator sink.
//!
//! Everything here runs on a single task. The only suspension points are the sleeps between
//! ticks, so gait and robot state need no locking.
use embassy_time::{Duration, Instant, Timer};
use log::{debug, error, info, trace, warn};

use crate::error::{ActuatorError, GaitError};
use crate::kinematics::gait_engine::GaitEngine;
use crate::robot::actuator::ActuatorSink;
use crate::robot::commands::{Command, Direction, Gesture, GestureToken};
use crate::robot::config::SchedulerConfig;
use crate::robot::joint::{JointAngles, Pose};
use crate::robot::state::{RobotState, RobotStateMachine, StopHandle};
use crate::JOINT_COUNT;

/// Time source of the control loop.
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now(&self) -> Instant;
    async fn sleep_until(&mut self, deadline: Instant);
}

/// Embassy's monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&mut self, deadline: Instant) {
        Timer::at(deadline).await;
    }
}

/// Where gestures come from. `poll` must return quickly.
pub trait GestureSource {
    fn poll(&mut self);
    /// Most recent decided gesture, `None` when nothing has been decided yet.
    fn read_gesture(&self) -> Option<GestureToken>;
}

impl<G: GestureSource + ?Sized> GestureSource for &mut G {
    fn poll(&mut self) {
        (**self).poll()
    }

    fn read_gesture(&self) -> Option<GestureToken> {
        (**self).read_gesture()
    }
}

pub struct MotionScheduler<'a, S: ActuatorSink, C: Clock = SystemClock> {
    engine: GaitEngine,
    state_machine: RobotStateMachine,
    sink: &'a mut S,
    clock: C,
    config: SchedulerConfig,
    period: Duration,
    /// Deadline of the next paced tick.
    next_tick: Instant,
    stop: StopHandle,
    last_gesture: Option<Gesture>,
}

impl<'a, S: ActuatorSink, C: Clock> MotionScheduler<'a, S, C> {
    pub fn new(
        engine: GaitEngine,
        sink: &'a mut S,
        clock: C,
        config: SchedulerConfig,
        stop: StopHandle,
    ) -> Self {
        Self {
            engine,
            state_machine: RobotStateMachine::new(),
            sink,
            next_tick: clock.now(),
            clock,
            period: config.period(),
            config,
            stop,
            last_gesture: None,
        }
    }

    pub fn engine(&self) -> &GaitEngine {
        &self.engine
    }

    pub fn robot_state(&self) -> RobotState {
        self.state_machine.state()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Physical-order pose for a sample, every joint recentered on `neutral_center`.
    fn pose_for(&self, sample: Option<&JointAngles>) -> Pose {
        let center = self.config.neutral_center;
        let Some(sample) = sample else {
            return Pose::new([center; JOINT_COUNT]);
        };
        let neutral = self.engine.neutral_angles().values();
        let mut angles = [center; JOINT_COUNT];
        for (i, angle) in angles.iter_mut().enumerate() {
            *angle = center + (sample.values()[i] - neutral[i]);
        }
        Pose::new(angles)
    }

    /// One control step: advance the engine, recenter, and write to the sink.
    ///
    /// The engine advances even when the write fails.
    pub fn tick(&mut self) -> Result<Pose, ActuatorError> {
        let sample = self.engine.tick();
        let pose = self.pose_for(sample.as_ref());
        let command = self
            .config
            .wiring
            .apply(pose.angles(), self.config.neutral_center);
        trace!("[SCHEDULER] {:?}", command);
        self.sink.write_positions_deg(&command)?;
        Ok(pose)
    }

    /// Waits for the next slot of the schedule, then ticks.
    ///
    /// When the schedule is more than `max_lag` behind, the missed slots are dropped and the
    /// schedule restarts from now. Smaller delays are caught up tick by tick.
    pub async fn paced_tick(&mut self) -> Result<Pose, ActuatorError> {
        let now = self.clock.now();
        match now.checked_duration_since(self.next_tick) {
            Some(lag) if lag > self.config.max_lag => {
                warn!(
                    "[SCHEDULER] {} ms behind, dropping missed ticks",
                    lag.as_millis()
                );
                self.next_tick = now;
            }
            Some(_) => {}
            None => self.clock.sleep_until(self.next_tick).await,
        }
        let result = self.tick();
        self.next_tick += self.period;
        result
    }

    /// Holds the neutral pose for `duration`, one write per tick.
    ///
    /// Write failures are logged and the hold goes on; the last failure is returned.
    pub async fn move_to_neutral(&mut self, duration: Duration) -> Result<(), ActuatorError> {
        self.engine.stop();
        let ticks = self.config.ticks_for(duration);
        debug!("[SCHEDULER] neutral hold for {ticks} ticks");

        let mut result = Ok(());
        for _ in 0..ticks {
            if let Err(e) = self.paced_tick().await {
                error!("[SCHEDULER] neutral write failed: {e}");
                result = Err(e);
            }
        }
        result
    }

    /// Runs `gesture` through the state machine and applies the resulting command.
    pub async fn set_gesture(&mut self, gesture: impl Into<Gesture>) -> Result<(), GaitError> {
        let gesture = gesture.into();
        let (state, command) = self.state_machine.update(gesture);
        debug!("[SCHEDULER] {gesture:?} -> {command} ({state})");
        self.apply_command(command).await
    }

    pub async fn apply_command(&mut self, command: Command) -> Result<(), GaitError> {
        if let Some((gait, direction)) = command.jump() {
            return self.run_jump(gait, direction).await;
        }
        match command.direction() {
            Some(direction) => {
                self.tune_actuator();
                if !self.engine.start_movement(direction) {
                    self.engine.stop();
                }
            }
            None => self.engine.stop(),
        }
        Ok(())
    }

    fn tune_actuator(&mut self) {
        if let Err(e) = self.sink.set_torque_limit_all(self.config.torque_limit) {
            warn!("[SCHEDULER] torque limit not applied: {e}");
        }
        if let Err(e) = self.sink.set_moving_speed_all(self.config.moving_speed) {
            warn!("[SCHEDULER] moving speed not applied: {e}");
        }
    }

    /// One full jump cycle, then back to the previous gait and a short neutral settle.
    ///
    /// Nothing can interrupt it: gestures, emergency stops and shutdown requests wait until it
    /// is over, at most `cycle_ticks / hz` seconds plus the settle time.
    pub async fn run_jump(&mut self, gait: &str, direction: Direction) -> Result<(), GaitError> {
        let previous = self.engine.loaded_gait().to_owned();
        self.engine.stop();
        self.engine.load_gait(gait)?;
        if !self.engine.start_movement(direction) {
            self.engine.load_gait(&previous)?;
            return Ok(());
        }

        let cycle = self.engine.spec().cycle_ticks();
        info!("[SCHEDULER] jump {gait} {direction:?}, {cycle} ticks");
        for _ in 0..cycle {
            if let Err(e) = self.paced_tick().await {
                error!("[SCHEDULER] jump write failed: {e}");
            }
        }

        self.engine.stop();
        self.engine.load_gait(&previous)?;
        // failures already logged per tick
        let _ = self.move_to_neutral(self.config.settle).await;
        Ok(())
    }

    pub fn emergency_stop(&mut self) {
        self.state_machine.emergency_stop();
        self.engine.stop();
    }

    /// Switches the cruise gait. Motion stops first.
    pub fn select_gait(&mut self, name: &str) -> Result<(), GaitError> {
        self.engine.stop();
        self.engine.load_gait(name)
    }

    /// Fixed-rate loop. Returns once a shutdown was requested through the [`StopHandle`].
    ///
    /// A gesture is only re-evaluated when it differs from the last one applied. Stop requests
    /// are serviced between ticks.
    pub async fn loop_forever<G: GestureSource>(&mut self, source: &mut G) {
        info!("[SCHEDULER] loop running at {} Hz", self.config.hz);
        loop {
            if self.stop.shutdown_requested() {
                info!("[SCHEDULER] shutdown requested");
                return;
            }
            if self.stop.take_emergency_stop() {
                self.emergency_stop();
            }

            source.poll();
            if let Some(token) = source.read_gesture() {
                let gesture = Gesture::parse(&token);
                if self.last_gesture != Some(gesture) {
                    self.last_gesture = Some(gesture);
                    if let Err(e) = self.set_gesture(gesture).await {
                        error!("[SCHEDULER] {gesture:?} not applied: {e}");
                    }
                }
            }

            if let Err(e) = self.paced_tick().await {
                error!("[SCHEDULER] actuator write failed: {e}");
            }
        }
    }

    /// Neutral hold followed by torque release.
    pub async fn shutdown(&mut self) -> Result<(), ActuatorError> {
        info!("[SCHEDULER] shutting down");
        if let Err(e) = self.move_to_neutral(self.config.neutral_hold).await {
            warn!("[SCHEDULER] neutral hold incomplete: {e}");
        }
        self.sink.release_torque()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::conversion::LegKinematics;
    use crate::robot::config::LegGeometry;
    use crate::robot::gaits::{GaitLibrary, TROT};
    use crate::robot::wiring::Wiring;

    #[derive(Default)]
    struct LastWrite(Option<[f64; JOINT_COUNT]>);

    impl ActuatorSink for LastWrite {
        fn write_positions_deg(
            &mut self,
            angles: &[f64; JOINT_COUNT],
        ) -> Result<(), ActuatorError> {
            self.0 = Some(*angles);
            Ok(())
        }
    }

    fn engine() -> GaitEngine {
        GaitEngine::new(
            LegKinematics::new(LegGeometry::default()),
            GaitLibrary::builtin(),
            TROT,
        )
        .unwrap()
    }

    #[test]
    fn stopped_engine_writes_the_center() {
        let mut sink = LastWrite::default();
        let mut scheduler = MotionScheduler::new(
            engine(),
            &mut sink,
            SystemClock,
            SchedulerConfig::default(),
            StopHandle::new(),
        );
        let pose = scheduler.tick().unwrap();
        assert!(pose.iter().all(|(_, angle)| angle == 150.0));
        assert_eq!(sink.0, Some([150.0; JOINT_COUNT]));
    }

    #[test]
    fn samples_are_recentered_then_wired() {
        let mut engine = engine();
        let mut reference = engine.clone();
        engine.start_movement(Direction::Forward);
        reference.start_movement(Direction::Forward);
        let sample = reference.tick().unwrap();
        let neutral = *reference.neutral_angles();

        let config = SchedulerConfig {
            wiring: Wiring::swapped_right(),
            ..SchedulerConfig::default()
        };
        let mut sink = LastWrite::default();
        let mut scheduler =
            MotionScheduler::new(engine, &mut sink, SystemClock, config, StopHandle::new());
        let pose = scheduler.tick().unwrap();

        for i in 0..JOINT_COUNT {
            let expected = 150.0 + (sample.values()[i] - neutral.values()[i]);
            assert_eq!(pose.angles()[i], expected);
        }
        let written = sink.0.unwrap();
        assert_eq!(written, Wiring::swapped_right().apply(pose.angles(), 150.0));
        assert_eq!(pose.get("front_left_hip"), Some(pose.angles()[0]));
    }
}
