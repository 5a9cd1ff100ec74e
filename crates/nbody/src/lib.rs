//! Point-mass N-body propagation for flyby studies.
//!
//! Massive bodies attract every other body; bodies with zero GM (spacecraft)
//! feel gravity but exert none. States are km and km/s, time offsets are days
//! from the system epoch, and integration can run backward as well as forward.

pub mod integrator;
pub mod scenario;

use log::debug;
use scout_core::time::days_to_seconds;
use scout_core::vector::{self, Vector3};
use scout_ephem::StateVector;
use serde::Serialize;
use thiserror::Error;

use crate::integrator::{Dopri5, OdeSystem, StepStats, Tolerances};

pub use scenario::{FlybyError, FlybyScenario, FlybySummary};

#[derive(Debug, Error)]
pub enum NBodyError {
    #[error("system has no bodies")]
    Empty,
    #[error("body `{0}` has a non-finite state or negative GM")]
    InvalidBody(String),
    #[error("unknown body `{0}`")]
    UnknownBody(String),
    #[error("output offsets must be finite and ascending")]
    UnorderedOffsets,
    #[error("state dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("step size {step:e} s underflowed at t = {t} s")]
    StepSizeUnderflow { t: f64, step: f64 },
    #[error("step limit of {steps} exceeded at t = {t} s")]
    StepLimit { steps: usize, t: f64 },
    #[error("integration produced non-finite values at t = {t} s")]
    NonFinite { t: f64 },
}

/// One participant of the integration.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    /// Zero for massless test particles.
    pub gm_km3_s2: f64,
    pub state: StateVector,
}

#[derive(Debug, Clone)]
pub struct NBodySystem {
    bodies: Vec<Body>,
}

struct Gravity<'a> {
    gms: &'a [f64],
}

impl OdeSystem for Gravity<'_> {
    fn dimension(&self) -> usize {
        6 * self.gms.len()
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let n = self.gms.len();
        for k in 0..n {
            let base = 6 * k;
            dydt[base..base + 3].copy_from_slice(&y[base + 3..base + 6]);
            let rk = [y[base], y[base + 1], y[base + 2]];
            let mut acc = [0.0; 3];
            for (m, &gm) in self.gms.iter().enumerate() {
                if m == k || gm == 0.0 {
                    continue;
                }
                let rm = [y[6 * m], y[6 * m + 1], y[6 * m + 2]];
                let d = vector::sub(&rm, &rk);
                let dist = vector::norm(&d);
                acc = vector::add(&acc, &vector::scale(&d, gm / (dist * dist * dist)));
            }
            dydt[base + 3..base + 6].copy_from_slice(&acc);
        }
    }
}

impl NBodySystem {
    pub fn new(bodies: Vec<Body>) -> Result<Self, NBodyError> {
        if bodies.is_empty() {
            return Err(NBodyError::Empty);
        }
        if let Some(body) = bodies.iter().find(|b| {
            !b.gm_km3_s2.is_finite()
                || b.gm_km3_s2 < 0.0
                || !vector::is_finite(&b.state.position_km)
                || !vector::is_finite(&b.state.velocity_km_s)
        }) {
            return Err(NBodyError::InvalidBody(body.name.clone()));
        }
        Ok(Self { bodies })
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Case-insensitive lookup.
    pub fn index_of(&self, name: &str) -> Result<usize, NBodyError> {
        self.bodies
            .iter()
            .position(|b| b.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| NBodyError::UnknownBody(name.to_string()))
    }

    /// Shift every state so the mass-weighted centre sits at rest at the origin.
    pub fn move_to_barycenter(&mut self) {
        let total: f64 = self.bodies.iter().map(|b| b.gm_km3_s2).sum();
        if total <= 0.0 {
            return;
        }
        let mut r = [0.0; 3];
        let mut v = [0.0; 3];
        for body in &self.bodies {
            r = vector::add(&r, &vector::scale(&body.state.position_km, body.gm_km3_s2 / total));
            v = vector::add(&v, &vector::scale(&body.state.velocity_km_s, body.gm_km3_s2 / total));
        }
        for body in &mut self.bodies {
            body.state.position_km = vector::sub(&body.state.position_km, &r);
            body.state.velocity_km_s = vector::sub(&body.state.velocity_km_s, &v);
        }
    }

    /// Total mechanical energy divided by G (km⁵/s²), for conservation checks.
    pub fn energy(&self) -> f64 {
        let mut kinetic = 0.0;
        let mut potential = 0.0;
        for (k, a) in self.bodies.iter().enumerate() {
            let v = vector::norm(&a.state.velocity_km_s);
            kinetic += 0.5 * a.gm_km3_s2 * v * v;
            for b in &self.bodies[k + 1..] {
                let d = vector::distance(&a.state.position_km, &b.state.position_km);
                potential -= a.gm_km3_s2 * b.gm_km3_s2 / d;
            }
        }
        kinetic + potential
    }

    fn pack(&self) -> Vec<f64> {
        self.bodies
            .iter()
            .flat_map(|b| b.state.position_km.into_iter().chain(b.state.velocity_km_s))
            .collect()
    }

    fn unpack(y: &[f64], count: usize) -> Vec<StateVector> {
        (0..count)
            .map(|k| StateVector {
                position_km: [y[6 * k], y[6 * k + 1], y[6 * k + 2]],
                velocity_km_s: [y[6 * k + 3], y[6 * k + 4], y[6 * k + 5]],
            })
            .collect()
    }

    /// States of every body at each of `offsets_days` (ascending, may straddle zero).
    ///
    /// Negative offsets are reached by integrating backward from the epoch,
    /// the rest by integrating forward.
    pub fn propagate(&self, offsets_days: &[f64], tolerance: f64) -> Result<Trajectories, NBodyError> {
        if offsets_days.iter().any(|t| !t.is_finite()) || offsets_days.windows(2).any(|w| w[1] < w[0]) {
            return Err(NBodyError::UnorderedOffsets);
        }

        let gms: Vec<f64> = self.bodies.iter().map(|b| b.gm_km3_s2).collect();
        let gravity = Gravity { gms: &gms };
        let count = self.bodies.len();
        let mut states = vec![Vec::new(); offsets_days.len()];
        let split = offsets_days.partition_point(|&t| t < 0.0);
        let mut stats = StepStats::default();

        let mut backward = Dopri5::new(Tolerances::uniform(tolerance));
        let mut y = self.pack();
        let mut t = 0.0;
        for idx in (0..split).rev() {
            let target = days_to_seconds(offsets_days[idx]);
            backward.integrate(&gravity, t, &mut y, target)?;
            t = target;
            states[idx] = Self::unpack(&y, count);
        }
        accumulate(&mut stats, backward.stats());

        let mut forward = Dopri5::new(Tolerances::uniform(tolerance));
        let mut y = self.pack();
        let mut t = 0.0;
        for idx in split..offsets_days.len() {
            let target = days_to_seconds(offsets_days[idx]);
            forward.integrate(&gravity, t, &mut y, target)?;
            t = target;
            states[idx] = Self::unpack(&y, count);
        }
        accumulate(&mut stats, forward.stats());

        debug!(
            "propagated {count} bodies to {} outputs: {} steps accepted, {} rejected, {} evaluations",
            offsets_days.len(),
            stats.accepted,
            stats.rejected,
            stats.evaluations
        );

        Ok(Trajectories {
            names: self.bodies.iter().map(|b| b.name.clone()).collect(),
            offsets_days: offsets_days.to_vec(),
            states,
            stats,
        })
    }
}

fn accumulate(total: &mut StepStats, part: StepStats) {
    total.accepted += part.accepted;
    total.rejected += part.rejected;
    total.evaluations += part.evaluations;
}

/// Sampled output of [`NBodySystem::propagate`].
#[derive(Debug, Clone)]
pub struct Trajectories {
    pub names: Vec<String>,
    pub offsets_days: Vec<f64>,
    /// `states[sample][body]`.
    pub states: Vec<Vec<StateVector>>,
    pub stats: StepStats,
}

/// Closest sampled approach between two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Encounter {
    pub offset_days: f64,
    pub distance_km: f64,
    pub relative_speed_km_s: f64,
}

impl Trajectories {
    pub fn positions(&self, body: usize) -> impl Iterator<Item = Vector3> + '_ {
        self.states.iter().map(move |s| s[body].position_km)
    }

    /// Sample with the smallest separation between bodies `a` and `b`.
    pub fn closest_approach(&self, a: usize, b: usize) -> Option<Encounter> {
        self.states
            .iter()
            .zip(&self.offsets_days)
            .map(|(s, &offset)| Encounter {
                offset_days: offset,
                distance_km: vector::distance(&s[a].position_km, &s[b].position_km),
                relative_speed_km_s: vector::distance(&s[a].velocity_km_s, &s[b].velocity_km_s),
            })
            .min_by(|x, y| x.distance_km.total_cmp(&y.distance_km))
    }

    /// Speed of `body` relative to `reference` at the last sample minus at the first.
    pub fn speed_change(&self, body: usize, reference: usize) -> Option<f64> {
        let speed = |s: &[StateVector]| vector::distance(&s[body].velocity_km_s, &s[reference].velocity_km_s);
        let first = self.states.first()?;
        let last = self.states.last()?;
        Some(speed(last) - speed(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use scout_core::constants::{AU_KM, MU_SUN_KM3_S2};

    fn sun_and_craft() -> NBodySystem {
        let v = (MU_SUN_KM3_S2 / AU_KM).sqrt();
        NBodySystem::new(vec![
            Body {
                name: "Sun".into(),
                gm_km3_s2: MU_SUN_KM3_S2,
                state: StateVector {
                    position_km: [0.0; 3],
                    velocity_km_s: [0.0; 3],
                },
            },
            Body {
                name: "Craft".into(),
                gm_km3_s2: 0.0,
                state: StateVector {
                    position_km: [AU_KM, 0.0, 0.0],
                    velocity_km_s: [0.0, v, 0.0],
                },
            },
        ])
        .expect("valid system")
    }

    #[test]
    fn circular_orbit_closes_after_one_period() {
        let system = sun_and_craft();
        let period_days =
            2.0 * std::f64::consts::PI * (AU_KM.powi(3) / MU_SUN_KM3_S2).sqrt() / 86_400.0;
        let out = system.propagate(&[-period_days, 0.0, period_days], 1e-12).expect("propagates");

        for sample in [0, 2] {
            let r = out.states[sample][1].position_km;
            assert_relative_eq!(r[0], AU_KM, max_relative = 1e-6);
            assert!(r[1].abs() < 1e-5 * AU_KM);
        }
        assert_eq!(out.states[1][1].position_km, [AU_KM, 0.0, 0.0]);
    }

    #[test]
    fn rejects_unordered_offsets_and_unknown_names() {
        let system = sun_and_craft();
        assert!(matches!(system.propagate(&[1.0, 0.0], 1e-9), Err(NBodyError::UnorderedOffsets)));
        assert!(matches!(system.index_of("Mars"), Err(NBodyError::UnknownBody(_))));
        assert_eq!(system.index_of("craft").expect("case-insensitive"), 1);
    }
}
