//! Two-body propagation: Kepler's equation for element sets and universal
//! variables for arbitrary (elliptic or hyperbolic) constructed bodies.

use scout_core::time::days_to_seconds;
use scout_core::vector::{self, Vector3};

use crate::{Ephemeris, EphemerisError, StateVector};

const KEPLER_MAX_ITERATIONS: usize = 50;
const UNIVERSAL_MAX_ITERATIONS: usize = 200;

/// Stumpff function C(z).
pub(crate) fn stumpff_c(z: f64) -> f64 {
    if z > 1e-4 {
        let sqrt_z = z.sqrt();
        (1.0 - sqrt_z.cos()) / z
    } else if z < -1e-4 {
        let sqrt_neg_z = (-z).sqrt();
        (sqrt_neg_z.cosh() - 1.0) / (-z)
    } else {
        1.0 / 2.0 - z / 24.0 + z * z / 720.0 - z * z * z / 40320.0
    }
}

/// Stumpff function S(z).
pub(crate) fn stumpff_s(z: f64) -> f64 {
    if z > 1e-4 {
        let sqrt_z = z.sqrt();
        (sqrt_z - sqrt_z.sin()) / sqrt_z.powi(3)
    } else if z < -1e-4 {
        let sqrt_neg_z = (-z).sqrt();
        (sqrt_neg_z.sinh() - sqrt_neg_z) / sqrt_neg_z.powi(3)
    } else {
        1.0 / 6.0 - z / 120.0 + z * z / 5040.0 - z * z * z / 362880.0
    }
}

/// Solve `M = E - e sin E` for the eccentric anomaly (elliptic orbits only).
pub fn solve_eccentric_anomaly(mean_anomaly: f64, eccentricity: f64) -> Result<f64, EphemerisError> {
    let mut e_anom = if eccentricity < 0.8 {
        mean_anomaly + eccentricity * mean_anomaly.sin()
    } else {
        std::f64::consts::PI.copysign(mean_anomaly)
    };

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
        let f_prime = 1.0 - eccentricity * e_anom.cos();
        let delta = f / f_prime;
        e_anom -= delta;
        if delta.abs() < 1e-13 {
            return Ok(e_anom);
        }
    }

    Err(EphemerisError::KeplerNonConvergence {
        iterations: KEPLER_MAX_ITERATIONS,
    })
}

/// Classical elements (angles in radians) to a Cartesian state.
pub fn elements_to_state(
    semi_major_axis_km: f64,
    eccentricity: f64,
    inclination: f64,
    raan: f64,
    argument_of_periapsis: f64,
    mean_anomaly: f64,
    mu_km3_s2: f64,
) -> Result<StateVector, EphemerisError> {
    if !(0.0..1.0).contains(&eccentricity) || semi_major_axis_km <= 0.0 {
        return Err(EphemerisError::InvalidState(format!(
            "elements require an ellipse (a = {semi_major_axis_km}, e = {eccentricity})"
        )));
    }

    let e_anom = solve_eccentric_anomaly(mean_anomaly, eccentricity)?;
    let (sin_e, cos_e) = e_anom.sin_cos();
    let root = (1.0 - eccentricity * eccentricity).sqrt();
    let mean_motion = (mu_km3_s2 / semi_major_axis_km.powi(3)).sqrt();
    let e_dot = mean_motion / (1.0 - eccentricity * cos_e);

    let x = semi_major_axis_km * (cos_e - eccentricity);
    let y = semi_major_axis_km * root * sin_e;
    let vx = -semi_major_axis_km * sin_e * e_dot;
    let vy = semi_major_axis_km * root * cos_e * e_dot;

    let (sin_w, cos_w) = argument_of_periapsis.sin_cos();
    let (sin_o, cos_o) = raan.sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();

    let p = [
        cos_w * cos_o - sin_w * sin_o * cos_i,
        cos_w * sin_o + sin_w * cos_o * cos_i,
        sin_w * sin_i,
    ];
    let q = [
        -sin_w * cos_o - cos_w * sin_o * cos_i,
        -sin_w * sin_o + cos_w * cos_o * cos_i,
        cos_w * sin_i,
    ];

    Ok(StateVector {
        position_km: vector::add(&vector::scale(&p, x), &vector::scale(&q, y)),
        velocity_km_s: vector::add(&vector::scale(&p, vx), &vector::scale(&q, vy)),
    })
}

/// Propagate a two-body state by `dt_s` seconds with universal variables.
///
/// Handles elliptic, parabolic and hyperbolic conics and negative `dt_s`.
pub fn propagate(state: &StateVector, dt_s: f64, mu_km3_s2: f64) -> Result<StateVector, EphemerisError> {
    let r0 = state.position_km;
    let v0 = state.velocity_km_s;
    let r0n = vector::norm(&r0);
    if r0n <= 0.0 || !vector::is_finite(&r0) || !vector::is_finite(&v0) {
        return Err(EphemerisError::InvalidState(format!("cannot propagate from {r0:?}")));
    }
    if dt_s == 0.0 {
        return Ok(*state);
    }

    let sqrt_mu = mu_km3_s2.sqrt();
    let vr0 = vector::dot(&r0, &v0) / r0n;
    let alpha = 2.0 / r0n - vector::dot(&v0, &v0) / mu_km3_s2;

    // Whole revolutions do not change the state of a bound orbit.
    let dt = if alpha * r0n > 1e-6 {
        let period = 2.0 * std::f64::consts::PI / (alpha.powi(3) * mu_km3_s2).sqrt();
        dt_s % period
    } else {
        dt_s
    };

    let residual = |chi: f64| -> (f64, f64) {
        let z = alpha * chi * chi;
        let c = stumpff_c(z);
        let s = stumpff_s(z);
        let f = r0n * vr0 / sqrt_mu * chi * chi * c
            + (1.0 - alpha * r0n) * chi.powi(3) * s
            + r0n * chi
            - sqrt_mu * dt;
        let f_prime = r0n * vr0 / sqrt_mu * chi * (1.0 - z * s)
            + (1.0 - alpha * r0n) * chi * chi * c
            + r0n;
        (f, f_prime)
    };

    // f(chi) is monotonic (f' = |r| > 0), so a bracket plus safeguarded Newton converges.
    let sign = dt.signum();
    let mut lo = 0.0_f64;
    let mut hi = sign * (sqrt_mu * dt.abs() / r0n).max(1e-3);
    let mut guard = 0;
    while residual(hi).0 * sign < 0.0 {
        lo = hi;
        hi *= 2.0;
        guard += 1;
        if guard > 200 || !hi.is_finite() {
            return Err(EphemerisError::KeplerNonConvergence { iterations: guard });
        }
    }

    let mut chi = if alpha * r0n > 1e-6 {
        (sqrt_mu * alpha * dt).clamp(lo.min(hi), lo.max(hi))
    } else {
        0.5 * (lo + hi)
    };

    let mut converged = false;
    for _ in 0..UNIVERSAL_MAX_ITERATIONS {
        let (f, f_prime) = residual(chi);
        if f * sign < 0.0 {
            lo = chi;
        } else {
            hi = chi;
        }
        let mut next = chi - f / f_prime;
        if !next.is_finite() || next < lo.min(hi) || next > lo.max(hi) {
            next = 0.5 * (lo + hi);
        }
        let step = (next - chi).abs();
        chi = next;
        if step <= 1e-12 * chi.abs().max(1.0) {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(EphemerisError::KeplerNonConvergence {
            iterations: UNIVERSAL_MAX_ITERATIONS,
        });
    }

    let z = alpha * chi * chi;
    let c = stumpff_c(z);
    let s = stumpff_s(z);

    let f = 1.0 - chi * chi / r0n * c;
    let g = dt - chi.powi(3) / sqrt_mu * s;
    let r = vector::add(&vector::scale(&r0, f), &vector::scale(&v0, g));
    let rn = vector::norm(&r);

    let f_dot = sqrt_mu / (rn * r0n) * (alpha * chi.powi(3) * s - chi);
    let g_dot = 1.0 - chi * chi / rn * c;
    let v = vector::add(&vector::scale(&r0, f_dot), &vector::scale(&v0, g_dot));

    Ok(StateVector {
        position_km: r,
        velocity_km_s: v,
    })
}

/// A body on a fixed two-body conic, defined by its state at a reference epoch.
///
/// Used for constructed targets (a hypothetical comet) and for sampling a
/// Lambert transfer arc from its departure state.
#[derive(Debug, Clone)]
pub struct KeplerianOrbit {
    name: String,
    epoch_mjd2000: f64,
    state: StateVector,
    mu_km3_s2: f64,
}

impl KeplerianOrbit {
    pub fn new(
        name: impl Into<String>,
        epoch_mjd2000: f64,
        position_km: Vector3,
        velocity_km_s: Vector3,
        mu_km3_s2: f64,
    ) -> Result<Self, EphemerisError> {
        let name = name.into();
        if mu_km3_s2.is_nan() || mu_km3_s2 <= 0.0 {
            return Err(EphemerisError::InvalidState(format!(
                "gravitational parameter must be positive for `{name}`"
            )));
        }
        if vector::norm(&position_km) <= 0.0
            || !vector::is_finite(&position_km)
            || !vector::is_finite(&velocity_km_s)
            || !epoch_mjd2000.is_finite()
        {
            return Err(EphemerisError::InvalidState(format!(
                "reference state of `{name}` must be finite and off-origin"
            )));
        }
        Ok(Self {
            name,
            epoch_mjd2000,
            state: StateVector {
                position_km,
                velocity_km_s,
            },
            mu_km3_s2,
        })
    }

    /// Reference epoch (MJD2000).
    pub fn epoch(&self) -> f64 {
        self.epoch_mjd2000
    }

    /// State at the reference epoch.
    pub fn reference_state(&self) -> &StateVector {
        &self.state
    }

    /// Orbital specific energy (km²/s²); positive for hyperbolic conics.
    pub fn specific_energy(&self) -> f64 {
        let v = vector::norm(&self.state.velocity_km_s);
        0.5 * v * v - self.mu_km3_s2 / vector::norm(&self.state.position_km)
    }

    /// Eccentricity of the conic.
    pub fn eccentricity(&self) -> f64 {
        let r = &self.state.position_km;
        let v = &self.state.velocity_km_s;
        let h = vector::cross(r, v);
        let e_vec = vector::sub(
            &vector::scale(&vector::cross(v, &h), 1.0 / self.mu_km3_s2),
            &vector::scale(r, 1.0 / vector::norm(r)),
        );
        vector::norm(&e_vec)
    }
}

impl Ephemeris for KeplerianOrbit {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_at(&self, epoch_mjd2000: f64) -> Result<StateVector, EphemerisError> {
        let dt = days_to_seconds(epoch_mjd2000 - self.epoch_mjd2000);
        propagate(&self.state, dt, self.mu_km3_s2)
    }
}
