//! Adaptive Dormand–Prince 5(4) integrator.
//!
//! Embedded Runge–Kutta pair with FSAL reuse and the usual mixed
//! absolute/relative error norm. Integrates forward or backward in time and
//! always lands exactly on the requested end time.

use crate::NBodyError;

/// Right-hand side of a first-order ODE system `dy/dt = f(t, y)`.
pub trait OdeSystem {
    fn dimension(&self) -> usize;
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// Error tolerances per state component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub relative: f64,
    pub absolute: f64,
}

impl Tolerances {
    pub fn uniform(tolerance: f64) -> Self {
        Self {
            relative: tolerance,
            absolute: tolerance,
        }
    }
}

/// Step statistics accumulated over the lifetime of an integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepStats {
    pub accepted: usize,
    pub rejected: usize,
    pub evaluations: usize,
}

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
// Fifth-order weights; also the last stage row (FSAL).
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;
// Difference between fifth- and fourth-order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct Dopri5 {
    tolerances: Tolerances,
    /// Smallest step magnitude (s) before giving up.
    pub min_step: f64,
    /// Largest step magnitude (s).
    pub max_step: f64,
    /// Accepted plus rejected steps allowed per `integrate` call.
    pub max_steps: usize,
    next_step: Option<f64>,
    stats: StepStats,
}

impl Dopri5 {
    pub fn new(tolerances: Tolerances) -> Self {
        Self {
            tolerances,
            min_step: 1e-6,
            max_step: f64::INFINITY,
            max_steps: 5_000_000,
            next_step: None,
            stats: StepStats::default(),
        }
    }

    pub fn stats(&self) -> StepStats {
        self.stats
    }

    /// Advance `y` from `t0` to `t1` in place.
    ///
    /// The step size that was last accepted carries over to the next call,
    /// so sampling a trajectory at many output times stays cheap.
    pub fn integrate<S: OdeSystem + ?Sized>(
        &mut self,
        system: &S,
        t0: f64,
        y: &mut [f64],
        t1: f64,
    ) -> Result<(), NBodyError> {
        let n = system.dimension();
        if y.len() != n {
            return Err(NBodyError::DimensionMismatch {
                expected: n,
                actual: y.len(),
            });
        }
        if t1 == t0 {
            return Ok(());
        }

        let direction = (t1 - t0).signum();
        let mut t = t0;
        let mut k = vec![vec![0.0; n]; 7];
        let mut stage = vec![0.0; n];
        let mut y_new = vec![0.0; n];

        system.rhs(t, y, &mut k[0]);
        self.stats.evaluations += 1;

        let mut h = match self.next_step {
            Some(h) => h.abs(),
            None => self.initial_step(system, t, y, &k[0], direction),
        }
        .min(self.max_step);

        let mut steps = 0usize;
        while (t1 - t) * direction > 0.0 {
            steps += 1;
            if steps > self.max_steps {
                return Err(NBodyError::StepLimit { steps: self.max_steps, t });
            }

            let remaining = (t1 - t).abs();
            let landing = h >= remaining;
            let h_step = if landing { remaining } else { h } * direction;

            for i in 0..n {
                stage[i] = y[i] + h_step * A21 * k[0][i];
            }
            system.rhs(t + C2 * h_step, &stage, &mut k[1]);
            for i in 0..n {
                stage[i] = y[i] + h_step * (A31 * k[0][i] + A32 * k[1][i]);
            }
            system.rhs(t + C3 * h_step, &stage, &mut k[2]);
            for i in 0..n {
                stage[i] = y[i] + h_step * (A41 * k[0][i] + A42 * k[1][i] + A43 * k[2][i]);
            }
            system.rhs(t + C4 * h_step, &stage, &mut k[3]);
            for i in 0..n {
                stage[i] = y[i]
                    + h_step * (A51 * k[0][i] + A52 * k[1][i] + A53 * k[2][i] + A54 * k[3][i]);
            }
            system.rhs(t + C5 * h_step, &stage, &mut k[4]);
            for i in 0..n {
                stage[i] = y[i]
                    + h_step
                        * (A61 * k[0][i] + A62 * k[1][i] + A63 * k[2][i] + A64 * k[3][i] + A65 * k[4][i]);
            }
            system.rhs(t + h_step, &stage, &mut k[5]);
            for i in 0..n {
                y_new[i] = y[i]
                    + h_step * (B1 * k[0][i] + B3 * k[2][i] + B4 * k[3][i] + B5 * k[4][i] + B6 * k[5][i]);
            }
            system.rhs(t + h_step, &y_new, &mut k[6]);
            self.stats.evaluations += 6;

            let mut sum = 0.0;
            for i in 0..n {
                let err = h_step
                    * (E1 * k[0][i] + E3 * k[2][i] + E4 * k[3][i] + E5 * k[4][i] + E6 * k[5][i] + E7 * k[6][i]);
                let scale = self.tolerances.absolute + self.tolerances.relative * y[i].abs().max(y_new[i].abs());
                sum += (err / scale).powi(2);
            }
            let err_norm = (sum / n as f64).sqrt();
            if !err_norm.is_finite() {
                return Err(NBodyError::NonFinite { t });
            }

            let factor = if err_norm == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err_norm.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };

            if err_norm <= 1.0 {
                t = if landing { t1 } else { t + h_step };
                y.copy_from_slice(&y_new);
                k.swap(0, 6);
                self.stats.accepted += 1;
                // A shortened landing step says nothing about the next step size.
                if !landing {
                    h = (h * factor).min(self.max_step);
                }
            } else {
                self.stats.rejected += 1;
                h = h_step.abs() * factor.min(1.0);
                if h < self.min_step {
                    return Err(NBodyError::StepSizeUnderflow { t, step: h });
                }
            }
        }

        self.next_step = Some(h);
        Ok(())
    }

    /// Hairer's starting-step heuristic for a fifth-order method.
    fn initial_step<S: OdeSystem + ?Sized>(&mut self, system: &S, t: f64, y: &[f64], f0: &[f64], direction: f64) -> f64 {
        let n = y.len();
        let scale = |i: usize| self.tolerances.absolute + self.tolerances.relative * y[i].abs();
        let rms = |v: &dyn Fn(usize) -> f64| ((0..n).map(|i| v(i).powi(2)).sum::<f64>() / n as f64).sqrt();

        let d0 = rms(&|i| y[i] / scale(i));
        let d1 = rms(&|i| f0[i] / scale(i));
        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };

        let y1: Vec<f64> = (0..n).map(|i| y[i] + direction * h0 * f0[i]).collect();
        let mut f1 = vec![0.0; n];
        system.rhs(t + direction * h0, &y1, &mut f1);
        self.stats.evaluations += 1;

        let d2 = rms(&|i| (f1[i] - f0[i]) / scale(i)) / h0;
        let h1 = if d1.max(d2) <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(0.2)
        };
        (100.0 * h0).min(h1).max(self.min_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Oscillator;

    impl OdeSystem for Oscillator {
        fn dimension(&self) -> usize {
            2
        }

        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = y[1];
            dydt[1] = -y[0];
        }
    }

    #[test]
    fn harmonic_oscillator_returns_after_one_period() {
        let mut solver = Dopri5::new(Tolerances::uniform(1e-11));
        let mut y = [1.0, 0.0];
        solver
            .integrate(&Oscillator, 0.0, &mut y, 2.0 * std::f64::consts::PI)
            .expect("integrates");
        assert_relative_eq!(y[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(y[1], 0.0, epsilon = 1e-8);
        assert!(solver.stats().accepted > 0);
    }

    #[test]
    fn backward_integration_matches_analytic_solution() {
        let mut solver = Dopri5::new(Tolerances::uniform(1e-11));
        let mut y = [1.0, 0.0];
        solver.integrate(&Oscillator, 0.0, &mut y, -1.0).expect("integrates");
        assert_relative_eq!(y[0], (-1.0f64).cos(), epsilon = 1e-8);
        assert_relative_eq!(y[1], -(-1.0f64).sin(), epsilon = 1e-8);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let mut solver = Dopri5::new(Tolerances::uniform(1e-9));
        let mut y = [1.0, 0.0, 0.0];
        assert!(matches!(
            solver.integrate(&Oscillator, 0.0, &mut y, 1.0),
            Err(NBodyError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }
}
