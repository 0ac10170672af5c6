//! Foot-path shapes of the two gait kinds.
//!
//! Every function here is a pure function of the gait parameters, the travel direction and the
//! phase tick, which is what makes the engine's output exactly periodic.
use core::f64::consts::PI;

use crate::robot::commands::Direction;
use crate::robot::gaits::{GaitKind, GaitSpec};
use crate::robot::leg::{Diagonal, Leg};
use crate::LEG_COUNT;

/// Foot target `(x, y)` per leg, indexed by [`Leg`].
pub type FootTargets = [(f64, f64); LEG_COUNT];

/// Sign applied to a leg's fore-aft offset. Turning drives the two sides against each other.
pub fn leg_factor(leg: Leg, direction: Direction) -> f64 {
    match direction {
        Direction::Forward => 1.0,
        Direction::Backward => -1.0,
        Direction::Left if leg.is_left() => -1.0,
        Direction::Left => 1.0,
        Direction::Right if leg.is_left() => 1.0,
        Direction::Right => -1.0,
        Direction::InPlace => 0.0,
    }
}

pub fn foot_targets(spec: &GaitSpec, direction: Direction, phase_tick: u32) -> FootTargets {
    match spec.kind {
        GaitKind::Trot => trot_targets(spec, direction, phase_tick),
        GaitKind::Jump => jump_targets(spec, direction, phase_tick),
    }
}

/// Diagonal pair B runs half a cycle behind pair A.
pub fn trot_targets(spec: &GaitSpec, direction: Direction, phase_tick: u32) -> FootTargets {
    let cycle = spec.cycle_ticks();
    core::array::from_fn(|i| {
        let leg = Leg::ALL[i];
        let phase = match leg.diagonal() {
            Diagonal::A => phase_tick % cycle,
            Diagonal::B => (phase_tick + cycle / 2) % cycle,
        };
        trot_foot(spec, phase, leg_factor(leg, direction))
    })
}

fn trot_foot(spec: &GaitSpec, phase: u32, factor: f64) -> (f64, f64) {
    let (swing, stance) = (f64::from(spec.swing_ticks), f64::from(spec.stance_ticks));
    let p = f64::from(phase);

    // swing sweeps theta over [0, pi), stance over [pi, 2pi)
    let (theta, lift) = if phase < spec.swing_ticks {
        let theta = PI * p / swing;
        (theta, spec.y_range * theta.sin())
    } else {
        (PI + PI * (p - swing) / stance, 0.0)
    };
    let stride = -(spec.x_range / 2.0) * theta.cos();

    (spec.x0 + factor * stride, spec.y0 - lift)
}

/// All four legs in unison: crouch during swing, push off during stance.
pub fn jump_targets(spec: &GaitSpec, direction: Direction, phase_tick: u32) -> FootTargets {
    let phase = phase_tick % spec.cycle_ticks();
    core::array::from_fn(|i| jump_foot(spec, phase, leg_factor(Leg::ALL[i], direction)))
}

fn jump_foot(spec: &GaitSpec, phase: u32, factor: f64) -> (f64, f64) {
    let (swing, stance) = (f64::from(spec.swing_ticks), f64::from(spec.stance_ticks));
    let p = f64::from(phase);

    if phase < spec.swing_ticks {
        let s = p / swing;
        let crouch = spec.y_boost * (1.0 - (PI * s).cos()) / 2.0;
        (spec.x0, spec.y0 - crouch)
    } else {
        // r reaches 1 on the last tick of the cycle: full extension
        let r = (p - swing + 1.0) / stance;
        let y = spec.y0 - spec.y_boost + 2.0 * spec.y_boost * r;
        (spec.x0 - factor * spec.x_range * r, y)
    }
}
