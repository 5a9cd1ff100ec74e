//! Lambert boundary-value solvers.
//!
//! Given two position vectors, a time of flight and a central gravitational
//! parameter, a solver returns every conic arc it can find that connects the
//! two positions in that time. Multi-revolution problems have up to
//! `2 * N + 1` such arcs; each one is a [`LambertBranch`].
//!
//! Two implementations are provided:
//! - [`Izzo`]: Izzo's 2015 formulation with Householder iterations, handles
//!   multi-revolution branches. Branch order is direct first, then the left and
//!   right branch for each revolution count in increasing order.
//! - [`Bate`]: the universal-variable solver from the `lambert-bate` crate,
//!   zero revolutions only.

use std::f64::consts::PI;

use lambert_bate::get_velocities;
use scout_core::vector::{self, Vector3};
use thiserror::Error;

const BATTIN_THRESHOLD: f64 = 0.01;
const LAGRANGE_THRESHOLD: f64 = 0.2;

/// Sense of motion of the transfer about the +z axis of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Counter-clockwise seen from +z.
    #[default]
    Prograde,
    /// Clockwise seen from +z.
    Retrograde,
}

/// Which family a branch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Zero-revolution transfer.
    Direct,
    /// Multi-revolution solution on the left branch of the time-of-flight curve.
    Left,
    /// Multi-revolution solution on the right branch of the time-of-flight curve.
    Right,
}

/// Inputs of one boundary-value problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertProblem {
    pub r1_km: Vector3,
    pub r2_km: Vector3,
    pub time_of_flight_s: f64,
    pub mu_km3_s2: f64,
    /// Upper bound on complete revolutions; solvers may return fewer.
    pub max_revolutions: u32,
    pub direction: Direction,
}

/// One candidate arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertBranch {
    pub revolutions: u32,
    pub kind: BranchKind,
    /// Velocity on the arc at `r1`.
    pub v1_km_s: Vector3,
    /// Velocity on the arc at `r2`.
    pub v2_km_s: Vector3,
}

#[derive(Debug, Error)]
pub enum LambertSolverError {
    #[error("time of flight must be positive, got {0} s")]
    NonPositiveTimeOfFlight(f64),
    #[error("gravitational parameter must be positive, got {0}")]
    NonPositiveMu(f64),
    #[error("degenerate transfer geometry: {0}")]
    DegenerateGeometry(&'static str),
    #[error("lambert solver failed: {0}")]
    Failure(String),
}

/// Capability `solve(r1, r2, tof, mu, max_revs, direction) -> branches`.
pub trait LambertSolver {
    /// Every branch found for the problem. An empty vector means the geometry
    /// admits no converged solution; it is not an error.
    fn solve(&self, problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError>;
}

impl<T: LambertSolver + ?Sized> LambertSolver for &T {
    fn solve(&self, problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError> {
        (**self).solve(problem)
    }
}

impl<T: LambertSolver + ?Sized> LambertSolver for Box<T> {
    fn solve(&self, problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError> {
        (**self).solve(problem)
    }
}

impl LambertProblem {
    fn validate(&self) -> Result<(f64, f64), LambertSolverError> {
        if self.time_of_flight_s.is_nan() || self.time_of_flight_s <= 0.0 {
            return Err(LambertSolverError::NonPositiveTimeOfFlight(self.time_of_flight_s));
        }
        if self.mu_km3_s2.is_nan() || self.mu_km3_s2 <= 0.0 {
            return Err(LambertSolverError::NonPositiveMu(self.mu_km3_s2));
        }
        if !vector::is_finite(&self.r1_km) || !vector::is_finite(&self.r2_km) {
            return Err(LambertSolverError::DegenerateGeometry("non-finite position"));
        }
        let r1n = vector::norm(&self.r1_km);
        let r2n = vector::norm(&self.r2_km);
        if r1n <= 0.0 || r2n <= 0.0 {
            return Err(LambertSolverError::DegenerateGeometry("position at the central body"));
        }
        Ok((r1n, r2n))
    }
}

/// Izzo's multi-revolution Lambert solver.
#[derive(Debug, Clone, Copy)]
pub struct Izzo {
    /// Convergence tolerance on x for the direct branch.
    pub direct_tolerance: f64,
    /// Convergence tolerance on x for multi-revolution branches.
    pub multi_rev_tolerance: f64,
    pub max_iterations: usize,
}

impl Default for Izzo {
    fn default() -> Self {
        Self {
            direct_tolerance: 1e-5,
            multi_rev_tolerance: 1e-8,
            max_iterations: 15,
        }
    }
}

impl LambertSolver for Izzo {
    fn solve(&self, problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError> {
        let (r1n, r2n) = problem.validate()?;
        let r1 = &problem.r1_km;
        let r2 = &problem.r2_km;
        let mu = problem.mu_km3_s2;

        let c = vector::distance(r2, r1);
        let s = 0.5 * (c + r1n + r2n);
        let ir1 = vector::scale(r1, 1.0 / r1n);
        let ir2 = vector::scale(r2, 1.0 / r2n);
        let ih = vector::unit(&vector::cross(&ir1, &ir2))
            .ok_or(LambertSolverError::DegenerateGeometry("collinear position vectors"))?;

        let lambda2 = 1.0 - c / s;
        let mut lambda = lambda2.sqrt();
        let (mut it1, mut it2) = if ih[2] < 0.0 {
            lambda = -lambda;
            (vector::cross(&ir1, &ih), vector::cross(&ir2, &ih))
        } else {
            (vector::cross(&ih, &ir1), vector::cross(&ih, &ir2))
        };
        if problem.direction == Direction::Retrograde {
            lambda = -lambda;
            it1 = vector::scale(&it1, -1.0);
            it2 = vector::scale(&it2, -1.0);
        }
        let lambda3 = lambda * lambda2;

        let t = (2.0 * mu / s.powi(3)).sqrt() * problem.time_of_flight_s;

        let mut n_max = (t / PI).floor() as u32;
        let t00 = lambda.acos() + lambda * (1.0 - lambda2).sqrt();
        let t0 = t00 + f64::from(n_max) * PI;
        let t1 = 2.0 / 3.0 * (1.0 - lambda3);

        if n_max > 0 && t < t0 && minimum_time_of_flight(lambda, n_max) > t {
            n_max -= 1;
        }
        let n_max = n_max.min(problem.max_revolutions);

        let geometry = Geometry {
            lambda,
            r1n,
            r2n,
            gamma: (mu * s / 2.0).sqrt(),
            rho: (r1n - r2n) / c,
            ir1,
            ir2,
            it1,
            it2,
        };

        let mut branches = Vec::with_capacity(2 * n_max as usize + 1);

        let x0 = if t >= t00 {
            -(t - t00) / (t - t00 + 4.0)
        } else if t <= t1 {
            t1 * (t1 - t) / (0.4 * (1.0 - lambda2 * lambda3) * t) + 1.0
        } else {
            (t / t00).powf(std::f64::consts::LN_2 / (t1 / t00).ln()) - 1.0
        };
        if let Some(x) = self.householder(t, x0, lambda, 0, self.direct_tolerance) {
            branches.extend(geometry.branch(x, 0, BranchKind::Direct));
        }

        for n in 1..=n_max {
            let nf = f64::from(n);

            let tmp = ((nf * PI + PI) / (8.0 * t)).powf(2.0 / 3.0);
            let x_left = (tmp - 1.0) / (tmp + 1.0);
            if let Some(x) = self.householder(t, x_left, lambda, n, self.multi_rev_tolerance) {
                branches.extend(geometry.branch(x, n, BranchKind::Left));
            }

            let tmp = ((8.0 * t) / (nf * PI)).powf(2.0 / 3.0);
            let x_right = (tmp - 1.0) / (tmp + 1.0);
            if let Some(x) = self.householder(t, x_right, lambda, n, self.multi_rev_tolerance) {
                branches.extend(geometry.branch(x, n, BranchKind::Right));
            }
        }

        Ok(branches)
    }
}

impl Izzo {
    /// Third-order Householder iteration on x; `None` when it does not settle.
    fn householder(&self, t_target: f64, mut x: f64, lambda: f64, n: u32, tolerance: f64) -> Option<f64> {
        for _ in 0..self.max_iterations {
            let tof = x_to_time_of_flight(x, lambda, n);
            let (dt, ddt, dddt) = time_of_flight_derivatives(x, tof, lambda);
            let delta = tof - t_target;
            let dt2 = dt * dt;
            let x_new =
                x - delta * (dt2 - delta * ddt / 2.0) / (dt * (dt2 - delta * ddt) + dddt * delta * delta / 6.0);
            if !x_new.is_finite() {
                return None;
            }
            let err = (x - x_new).abs();
            x = x_new;
            if err <= tolerance {
                return Some(x);
            }
        }
        None
    }
}

struct Geometry {
    lambda: f64,
    r1n: f64,
    r2n: f64,
    gamma: f64,
    rho: f64,
    ir1: Vector3,
    ir2: Vector3,
    it1: Vector3,
    it2: Vector3,
}

impl Geometry {
    fn branch(&self, x: f64, revolutions: u32, kind: BranchKind) -> Option<LambertBranch> {
        let lambda = self.lambda;
        let sigma = (1.0 - self.rho * self.rho).sqrt();
        let y = (1.0 - lambda * lambda + lambda * lambda * x * x).sqrt();
        let vr1 = self.gamma * ((lambda * y - x) - self.rho * (lambda * y + x)) / self.r1n;
        let vr2 = -self.gamma * ((lambda * y - x) + self.rho * (lambda * y + x)) / self.r2n;
        let vt = self.gamma * sigma * (y + lambda * x);
        let vt1 = vt / self.r1n;
        let vt2 = vt / self.r2n;

        let v1 = vector::add(&vector::scale(&self.ir1, vr1), &vector::scale(&self.it1, vt1));
        let v2 = vector::add(&vector::scale(&self.ir2, vr2), &vector::scale(&self.it2, vt2));

        (vector::is_finite(&v1) && vector::is_finite(&v2)).then_some(LambertBranch {
            revolutions,
            kind,
            v1_km_s: v1,
            v2_km_s: v2,
        })
    }
}

/// Halley iterations for the minimum non-dimensional time of flight with `n` revolutions.
fn minimum_time_of_flight(lambda: f64, n: u32) -> f64 {
    let lambda2 = lambda * lambda;
    let mut t_min = lambda.acos() + lambda * (1.0 - lambda2).sqrt() + f64::from(n) * PI;
    let mut x_old = 0.0;
    let mut x_new = 0.0;
    for _ in 0..=12 {
        let (dt, ddt, dddt) = time_of_flight_derivatives(x_old, t_min, lambda);
        if dt != 0.0 {
            x_new = x_old - dt * ddt / (ddt * ddt - dt * dddt / 2.0);
        }
        if (x_old - x_new).abs() < 1e-13 {
            break;
        }
        t_min = x_to_time_of_flight(x_new, lambda, n);
        x_old = x_new;
    }
    t_min
}

/// Non-dimensional time of flight as a function of x, using Battin's series near
/// x = 1, Lagrange's expression close to it, and Lancaster's elsewhere.
fn x_to_time_of_flight(x: f64, lambda: f64, n: u32) -> f64 {
    let dist = (x - 1.0).abs();
    if dist < LAGRANGE_THRESHOLD && dist > BATTIN_THRESHOLD {
        return x_to_time_of_flight_lagrange(x, lambda, n);
    }

    let k = lambda * lambda;
    let e = x * x - 1.0;
    let rho = e.abs();
    let z = (1.0 + k * e).sqrt();

    if dist < BATTIN_THRESHOLD {
        let eta = z - lambda * x;
        let s1 = 0.5 * (1.0 - lambda - x * eta);
        let q = 4.0 / 3.0 * hypergeometric_f(s1, 1e-11);
        (eta.powi(3) * q + 4.0 * lambda * eta) / 2.0 + f64::from(n) * PI / rho.powf(1.5)
    } else {
        let y = rho.sqrt();
        let g = x * z - lambda * e;
        let d = if e < 0.0 {
            f64::from(n) * PI + g.acos()
        } else {
            let f = y * (z - lambda * x);
            (f + g).ln()
        };
        (x - lambda * z - d / y) / e
    }
}

fn x_to_time_of_flight_lagrange(x: f64, lambda: f64, n: u32) -> f64 {
    let a = 1.0 / (1.0 - x * x);
    if a > 0.0 {
        let alfa = 2.0 * x.acos();
        let mut beta = 2.0 * (lambda * lambda / a).sqrt().asin();
        if lambda < 0.0 {
            beta = -beta;
        }
        a * a.sqrt() * ((alfa - alfa.sin()) - (beta - beta.sin()) + 2.0 * PI * f64::from(n)) / 2.0
    } else {
        let alfa = 2.0 * x.acosh();
        let mut beta = 2.0 * (-lambda * lambda / a).sqrt().asinh();
        if lambda < 0.0 {
            beta = -beta;
        }
        -a * (-a).sqrt() * ((beta - beta.sinh()) - (alfa - alfa.sinh())) / 2.0
    }
}

/// First three derivatives of the non-dimensional time of flight with respect to x.
fn time_of_flight_derivatives(x: f64, t: f64, lambda: f64) -> (f64, f64, f64) {
    let l2 = lambda * lambda;
    let l3 = l2 * lambda;
    let umx2 = 1.0 - x * x;
    let y = (1.0 - l2 * umx2).sqrt();
    let y2 = y * y;
    let y3 = y2 * y;
    let dt = (3.0 * t * x - 2.0 + 2.0 * l3 * x / y) / umx2;
    let ddt = (3.0 * t + 5.0 * x * dt + 2.0 * (1.0 - l2) * l3 / y3) / umx2;
    let dddt = (7.0 * x * ddt + 8.0 * dt - 6.0 * (1.0 - l2) * l2 * l3 * x / y3 / y2) / umx2;
    (dt, ddt, dddt)
}

/// Gauss hypergeometric 2F1(3, 1; 5/2; z) for Battin's series.
fn hypergeometric_f(z: f64, tolerance: f64) -> f64 {
    let mut sj = 1.0;
    let mut cj = 1.0;
    for j in 0..1_000 {
        let jf = f64::from(j);
        let cj1 = cj * (3.0 + jf) * (1.0 + jf) / (2.5 + jf) * z / (jf + 1.0);
        sj += cj1;
        cj = cj1;
        if cj1.abs() <= tolerance {
            break;
        }
    }
    sj
}

/// Zero-revolution solver backed by `lambert-bate`.
#[derive(Debug, Clone, Copy)]
pub struct Bate {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for Bate {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 500,
        }
    }
}

impl LambertSolver for Bate {
    fn solve(&self, problem: &LambertProblem) -> Result<Vec<LambertBranch>, LambertSolverError> {
        problem.validate()?;
        let normal = vector::cross(&problem.r1_km, &problem.r2_km);
        if vector::unit(&normal).is_none() {
            return Err(LambertSolverError::DegenerateGeometry("collinear position vectors"));
        }

        // Short way is prograde when the orbit normal points to +z.
        let counter_clockwise_is_short = normal[2] >= 0.0;
        let short = match problem.direction {
            Direction::Prograde => counter_clockwise_is_short,
            Direction::Retrograde => !counter_clockwise_is_short,
        };

        let (v1, v2) = get_velocities(
            problem.r1_km,
            problem.r2_km,
            problem.time_of_flight_s,
            problem.mu_km3_s2,
            short,
            self.tolerance,
            self.max_iterations.try_into().unwrap_or(500),
        )
        .map_err(|e| LambertSolverError::Failure(format!("{e:?}")))?;

        Ok(vec![LambertBranch {
            revolutions: 0,
            kind: BranchKind::Direct,
            v1_km_s: v1,
            v2_km_s: v2,
        }])
    }
}
