//! Gait trajectory engine: turns the loaded gait and a travel direction into one joint-angle
//! sample per tick.
//!
//! The engine is stopped when it has no direction and moving otherwise. It owns the only mutable
//! gait state in the controller and is driven exclusively from the scheduler task.
use log::{info, warn};

use super::conversion::{AngleUnit, LegKinematics};
use super::trajectory::{foot_targets, FootTargets};
use crate::error::GaitError;
use crate::robot::commands::Direction;
use crate::robot::gaits::{GaitLibrary, GaitName, GaitSpec};
use crate::robot::joint::JointAngles;
use crate::robot::leg::Leg;
use crate::LEG_COUNT;

#[derive(Debug, Clone)]
struct GaitState {
    name: GaitName,
    spec: GaitSpec,
    /// Degrees, identical on all four legs.
    neutral_angles: JointAngles,
    current_direction: Option<Direction>,
    /// Always `< spec.cycle_ticks()`.
    phase_tick: u32,
}

#[derive(Debug, Clone)]
pub struct GaitEngine {
    kinematics: LegKinematics,
    library: GaitLibrary,
    state: GaitState,
}

impl GaitEngine {
    /// Fails when `initial` is missing from `library`, or when any entry of `library` is unusable
    /// with this leg (see [`GaitLibrary::validate`]).
    pub fn new(
        kinematics: LegKinematics,
        library: GaitLibrary,
        initial: &str,
    ) -> Result<Self, GaitError> {
        let (name, spec, neutral_angles) = prepare(&kinematics, &library, initial)?;
        library.validate(&kinematics)?;
        info!("[GAIT] engine ready with {name}, {} gaits", library.len());
        Ok(Self {
            kinematics,
            library,
            state: GaitState {
                name,
                spec,
                neutral_angles,
                current_direction: None,
                phase_tick: 0,
            },
        })
    }

    /// Replaces the active gait. On error the previous gait stays loaded untouched.
    ///
    /// A successful load leaves the engine stopped at phase 0.
    pub fn load_gait(&mut self, name: &str) -> Result<(), GaitError> {
        let (name, spec, neutral_angles) = prepare(&self.kinematics, &self.library, name)?;
        info!("[GAIT] loaded {name}");
        self.state = GaitState {
            name,
            spec,
            neutral_angles,
            current_direction: None,
            phase_tick: 0,
        };
        Ok(())
    }

    pub fn is_moving(&self) -> bool {
        self.state.current_direction.is_some()
    }

    pub fn current_direction(&self) -> Option<Direction> {
        self.state.current_direction
    }

    /// Returns `false` and changes nothing when the loaded gait has no path for `direction`.
    /// Repeating the current direction keeps the phase running.
    pub fn start_movement(&mut self, direction: Direction) -> bool {
        if !self.state.spec.kind.supports(direction) {
            warn!(
                "[GAIT] {} cannot move {:?}, ignoring",
                self.state.name, direction
            );
            return false;
        }
        if self.state.current_direction == Some(direction) {
            return true;
        }
        self.state.current_direction = Some(direction);
        self.state.phase_tick = 0;
        true
    }

    /// Keeps `phase_tick`; the next `start_movement` resets it anyway.
    pub fn stop(&mut self) {
        self.state.current_direction = None;
    }

    /// Next sample in degrees, or `None` while stopped.
    ///
    /// A phase with a foot out of reach replays the closest earlier reachable phase of the same
    /// cycle (wrapping around), or the neutral pose when no phase is reachable. The output only
    /// depends on the phase, so it is exactly periodic from the first cycle on.
    pub fn tick(&mut self) -> Option<JointAngles> {
        let direction = self.state.current_direction?;
        let phase = self.state.phase_tick;

        let sample = match self.sample_at(direction, phase) {
            Ok(angles) => angles,
            Err((leg, (x, y))) => {
                warn!(
                    "[GAIT] {} tick {phase}: {leg} target ({x:.2}, {y:.2}) out of reach, holding pose",
                    self.state.name
                );
                self.fallback(direction, phase)
            }
        };

        self.state.phase_tick = (phase + 1) % self.state.spec.cycle_ticks();
        Some(sample)
    }

    /// Solves all four legs at `phase`. On failure, returns the first leg out of reach and its
    /// target.
    fn sample_at(
        &self,
        direction: Direction,
        phase: u32,
    ) -> Result<JointAngles, (Leg, (f64, f64))> {
        let feet: FootTargets = foot_targets(&self.state.spec, direction, phase);
        let mut legs = [(0.0, 0.0); LEG_COUNT];
        for leg in Leg::ALL {
            let (x, y) = feet[leg];
            let (q_hip, q_knee, ok) = self.kinematics.ik_solve_with(x, y, AngleUnit::Degrees, None);
            if !ok {
                return Err((leg, (x, y)));
            }
            legs[leg] = (q_hip, q_knee);
        }
        JointAngles::from_legs(legs, AngleUnit::Degrees)
            .ok_or((Leg::FrontLeft, feet[Leg::FrontLeft]))
    }

    fn fallback(&self, direction: Direction, phase: u32) -> JointAngles {
        let cycle = self.state.spec.cycle_ticks();
        (1..cycle)
            .map(|back| (phase + cycle - back) % cycle)
            .find_map(|earlier| self.sample_at(direction, earlier).ok())
            .unwrap_or(self.state.neutral_angles)
    }

    pub fn loaded_gait(&self) -> &str {
        &self.state.name
    }

    pub fn spec(&self) -> &GaitSpec {
        &self.state.spec
    }

    pub fn neutral_angles(&self) -> &JointAngles {
        &self.state.neutral_angles
    }

    pub fn phase_tick(&self) -> u32 {
        self.state.phase_tick
    }
}

fn prepare(
    kinematics: &LegKinematics,
    library: &GaitLibrary,
    name: &str,
) -> Result<(GaitName, GaitSpec, JointAngles), GaitError> {
    let spec = *library
        .get(name)
        .ok_or_else(|| GaitError::UnknownGait(name.into()))?;
    let unreachable = || GaitError::UnreachableNeutral {
        name: name.into(),
        x0: spec.x0,
        y0: spec.y0,
    };

    let (q_hip, q_knee, ok) = kinematics.ik_solve_with(spec.x0, spec.y0, AngleUnit::Degrees, None);
    if !ok {
        return Err(unreachable());
    }
    let neutral = JointAngles::from_legs([(q_hip, q_knee); LEG_COUNT], AngleUnit::Degrees)
        .ok_or_else(unreachable)?;
    let name = GaitName::try_from(name).map_err(|_| GaitError::NameTooLong(name.into()))?;

    Ok((name, spec, neutral))
}
