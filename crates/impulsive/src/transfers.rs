//! Closed-form references for impulsive transfers in the coplanar, circular limit.
//!
//! Grid searches report these next to their best Lambert arc: a heliocentric
//! porkchop minimum should sit close to the Hohmann estimate, and windows recur
//! roughly once per synodic period.

use std::f64::consts::PI;

use scout_core::time::seconds_to_days;

use crate::lambert::LambertSolverError;

/// Hohmann transfer between circular coplanar orbits of radii r1 and r2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HohmannEstimate {
    pub departure_dv_km_s: f64, // signed: negative for an inward (retro) burn
    pub arrival_dv_km_s: f64,
    pub total_dv_km_s: f64, // |departure| + |arrival|
    pub time_of_flight_days: f64,
}

/// Classical Hohmann transfer from a circular orbit of radius `r1_km` to one of
/// radius `r2_km` about a body with gravitational parameter `mu_km3_s2`.
pub fn hohmann(r1_km: f64, r2_km: f64, mu_km3_s2: f64) -> Result<HohmannEstimate, LambertSolverError> {
    if mu_km3_s2.is_nan() || mu_km3_s2 <= 0.0 {
        return Err(LambertSolverError::NonPositiveMu(mu_km3_s2));
    }
    if r1_km.is_nan() || r2_km.is_nan() || r1_km <= 0.0 || r2_km <= 0.0 {
        return Err(LambertSolverError::DegenerateGeometry("orbit radius must be positive"));
    }

    let v1 = (mu_km3_s2 / r1_km).sqrt();
    let v2 = (mu_km3_s2 / r2_km).sqrt();
    let a_t = 0.5 * (r1_km + r2_km);
    let tof_s = PI * (a_t.powi(3) / mu_km3_s2).sqrt();

    // Transfer-ellipse speeds at r1 and r2.
    let v_t1 = (mu_km3_s2 * (2.0 / r1_km - 1.0 / a_t)).sqrt();
    let v_t2 = (mu_km3_s2 * (2.0 / r2_km - 1.0 / a_t)).sqrt();

    let departure = v_t1 - v1;
    let arrival = v2 - v_t2;

    Ok(HohmannEstimate {
        departure_dv_km_s: departure,
        arrival_dv_km_s: arrival,
        total_dv_km_s: departure.abs() + arrival.abs(),
        time_of_flight_days: seconds_to_days(tof_s),
    })
}

/// Synodic period (days) of two circular orbits of radii r1 and r2.
///
/// Returns `None` for equal radii, where the bodies never realign.
pub fn synodic_period_days(r1_km: f64, r2_km: f64, mu_km3_s2: f64) -> Option<f64> {
    let period = |r: f64| 2.0 * PI * (r.powi(3) / mu_km3_s2).sqrt();
    let (p1, p2) = (period(r1_km), period(r2_km));
    let beat = (1.0 / p1 - 1.0 / p2).abs();
    if beat > 0.0 && beat.is_finite() {
        Some(seconds_to_days(1.0 / beat))
    } else {
        None
    }
}
