//! Inverse and forward kinematics of the planar 2-link leg.
//!
//! Provides the conversion between a foot position in the hip frame (`x` forward, `y` down) and
//! the two joint angles of the leg. Pure functions, no internal state.
//!
//! Used by the gait engine to compute a gait's neutral pose and every trajectory sample.
use core::f64::consts::PI;

use crate::robot::config::LegGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Radians,
    Degrees,
}

impl AngleUnit {
    pub fn convert(self, value: f64, to: AngleUnit) -> f64 {
        match (self, to) {
            (AngleUnit::Radians, AngleUnit::Degrees) => value * 180.0 / PI,
            (AngleUnit::Degrees, AngleUnit::Radians) => value * PI / 180.0,
            _ => value,
        }
    }
}

fn round_to(value: f64, digits: Option<u32>) -> f64 {
    match digits {
        Some(digits) => {
            let scale = 10f64.powi(digits as i32);
            (value * scale).round() / scale
        }
        None => value,
    }
}

/// Solver for one leg. All four legs share the same geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegKinematics {
    geometry: LegGeometry,
}

impl LegKinematics {
    pub fn new(geometry: LegGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &LegGeometry {
        &self.geometry
    }

    /// Annulus of reachable foot distances from the hip.
    pub fn reach(&self) -> (f64, f64) {
        let (l1, l2) = (self.geometry.link1_length, self.geometry.link2_length);
        ((l1 - l2).abs(), l1 + l2)
    }

    pub fn is_reachable(&self, x: f64, y: f64) -> bool {
        let (min, max) = self.reach();
        let d = x.hypot(y);
        d.is_finite() && d >= min && d <= max
    }

    /// Returns `(q_hip, q_knee, ok)` in radians.
    ///
    /// The knee takes the principal `acos` branch, so the leg always bends the same way. When the
    /// target is outside the reachable annulus, `ok` is false and both angles are zero.
    pub fn ik_solve(&self, x: f64, y: f64) -> (f64, f64, bool) {
        if !self.is_reachable(x, y) {
            return (0.0, 0.0, false);
        }
        let (l1, l2) = (self.geometry.link1_length, self.geometry.link2_length);
        let d_squared = x.powi(2) + y.powi(2);

        // clamp: on the annulus boundary rounding can leave [-1, 1] by an ulp
        let cos_knee = ((d_squared - l1.powi(2) - l2.powi(2)) / (2.0 * l1 * l2)).clamp(-1.0, 1.0);
        let q_knee = cos_knee.acos();
        let q_hip = y.atan2(x) - (l2 * q_knee.sin()).atan2(l1 + l2 * q_knee.cos());

        (q_hip, q_knee, true)
    }

    /// [`Self::ik_solve`] with caller-selected unit and rounding.
    pub fn ik_solve_with(
        &self,
        x: f64,
        y: f64,
        unit: AngleUnit,
        digits: Option<u32>,
    ) -> (f64, f64, bool) {
        let (q_hip, q_knee, ok) = self.ik_solve(x, y);
        let out = |q| round_to(AngleUnit::Radians.convert(q, unit), digits);
        (out(q_hip), out(q_knee), ok)
    }

    /// Foot position for joint angles in radians.
    pub fn fk_solve(&self, q_hip: f64, q_knee: f64) -> (f64, f64) {
        let (l1, l2) = (self.geometry.link1_length, self.geometry.link2_length);
        let x = l1 * q_hip.cos() + l2 * (q_hip + q_knee).cos();
        let y = l1 * q_hip.sin() + l2 * (q_hip + q_knee).sin();
        (x, y)
    }
}
