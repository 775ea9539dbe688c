//! Newton-Raphson iteration for the nonlinear root.
//!
//! Solves the implicit device equation of the K-method,
//!
//! ```text
//! x = E·a + F·i(x)
//! ```
//!
//! for the device port voltages `x`, given the waves `a` coming up from the
//! subtrees. All buffers are sized once at construction.

use tracing::{trace, warn};

use crate::error::{Result, WdfError};
use crate::models::NlModel;

use super::matrix::{norm, Lu, Mat};
use super::{SolverStats, DEFAULT_DAMPING, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};

/// Iteration controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonConfig {
    /// Convergence tolerance on the residual and step norms (volts).
    pub tolerance: f64,
    /// Iteration cap per sample.
    pub max_iterations: usize,
    /// Step scale in `(0, 1]`.
    pub damping: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            damping: DEFAULT_DAMPING,
        }
    }
}

impl NewtonConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence tolerance (in volts).
    ///
    /// Higher tolerance = faster convergence but less accuracy.
    /// - 1e-6 (default): Very precise, may need more iterations
    /// - 1e-4: Good balance for most audio applications
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum Newton-Raphson iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the step damping factor.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Reject unusable settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(WdfError::config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(WdfError::config("max_iterations must be at least 1"));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(WdfError::config(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Converged,
    MaxIterations,
    SingularJacobian,
    NonFinite,
}

/// Newton-Raphson solver over a set of device models.
#[derive(Debug)]
pub struct NewtonSolver {
    config: NewtonConfig,
    models: Vec<Box<dyn NlModel>>,
    /// First port of each model in the stacked port vector
    offsets: Vec<usize>,
    size: usize,
    /// Device port voltages
    x: Vec<f64>,
    x_prev: Vec<f64>,
    /// E·a
    ea: Vec<f64>,
    residual: Vec<f64>,
    step: Vec<f64>,
    /// Device currents at `x`
    f_nl: Vec<f64>,
    /// Block-diagonal device Jacobian
    j_nl: Mat,
    jacobian: Mat,
    lu: Lu,
    block: Vec<f64>,
    /// Currents of the last converged sample
    i_good: Vec<f64>,
    stats: SolverStats,
}

impl NewtonSolver {
    /// Create a solver for the given models, stacked in order.
    pub fn new(models: Vec<Box<dyn NlModel>>, config: NewtonConfig) -> Result<Self> {
        if models.is_empty() {
            return Err(WdfError::MissingNonlinearModel);
        }
        config.validate()?;

        let mut offsets = Vec::with_capacity(models.len());
        let mut size = 0;
        let mut widest = 0;
        for model in &models {
            offsets.push(size);
            size += model.num_ports();
            widest = widest.max(model.num_ports());
        }

        Ok(Self {
            config,
            models,
            offsets,
            size,
            x: vec![0.0; size],
            x_prev: vec![0.0; size],
            ea: vec![0.0; size],
            residual: vec![0.0; size],
            step: vec![0.0; size],
            f_nl: vec![0.0; size],
            j_nl: Mat::zeros(size, size),
            jacobian: Mat::zeros(size, size),
            lu: Lu::new(size),
            block: vec![0.0; widest * widest],
            i_good: vec![0.0; size],
            stats: SolverStats::default(),
        })
    }

    /// Total number of device ports.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Device models in stacking order.
    pub fn models(&self) -> &[Box<dyn NlModel>] {
        &self.models
    }

    /// Iteration controls.
    pub fn config(&self) -> &NewtonConfig {
        &self.config
    }

    /// Diagnostics since the last reset.
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Device port voltages of the last solve.
    pub fn voltages(&self) -> &[f64] {
        &self.x
    }

    /// Device currents of the last solve.
    pub fn currents(&self) -> &[f64] {
        &self.f_nl
    }

    /// Forget the warm start and clear the counters.
    pub fn reset(&mut self) {
        self.i_good.fill(0.0);
        self.x.fill(0.0);
        self.f_nl.fill(0.0);
        self.stats = SolverStats::default();
    }

    /// Solve for the device currents given the subtree waves `a`.
    ///
    /// Never fails. If the iteration does not converge the last finite
    /// iterate is used and the failure is recorded in [`SolverStats`].
    pub fn solve(&mut self, e: &Mat, f: &Mat, a: &[f64]) -> &[f64] {
        e.mul_vec(a, &mut self.ea);

        // Warm start from the last converged currents
        self.x.copy_from_slice(&self.ea);
        f.mul_vec_add(&self.i_good, &mut self.x);

        let tolerance = self.config.tolerance;
        let damping = self.config.damping;
        let mut outcome = Outcome::MaxIterations;
        let mut iterations = 0;
        // Whether f_nl and j_nl belong to the current x
        let mut evaluated = false;

        while iterations < self.config.max_iterations {
            iterations += 1;
            self.evaluate_models();
            evaluated = true;

            // F(x) = E·a + F·i(x) - x
            self.residual.copy_from_slice(&self.ea);
            f.mul_vec_add(&self.f_nl, &mut self.residual);
            for (r, x) in self.residual.iter_mut().zip(&self.x) {
                *r -= x;
            }
            if norm(&self.residual) < tolerance {
                outcome = Outcome::Converged;
                break;
            }

            // J = F·JNL - I
            f.mul_into(&self.j_nl, &mut self.jacobian);
            for k in 0..self.size {
                self.jacobian.add(k, k, -1.0);
            }
            if self.lu.factor(&self.jacobian).is_err() {
                outcome = Outcome::SingularJacobian;
                break;
            }

            for r in self.residual.iter_mut() {
                *r = -*r;
            }
            self.lu.solve(&self.residual, &mut self.step);

            self.x_prev.copy_from_slice(&self.x);
            let mut step_norm = 0.0;
            for (x, p) in self.x.iter_mut().zip(&self.step) {
                let dx = damping * p;
                *x += dx;
                step_norm += dx * dx;
            }
            evaluated = false;

            if !self.x.iter().all(|x| x.is_finite()) {
                self.x.copy_from_slice(&self.x_prev);
                evaluated = true;
                outcome = Outcome::NonFinite;
                break;
            }
            if step_norm.sqrt() < tolerance {
                outcome = Outcome::Converged;
                break;
            }
        }

        if !evaluated {
            self.evaluate_models();
        }

        self.stats.samples += 1;
        self.stats.last_iterations = iterations;
        self.stats.total_iterations += iterations as u64;
        self.stats.max_iterations_seen = self.stats.max_iterations_seen.max(iterations);

        if outcome == Outcome::Converged {
            self.stats.consecutive_failures = 0;
            self.i_good.copy_from_slice(&self.f_nl);
        } else {
            self.record_failure(outcome, iterations);
        }

        &self.f_nl
    }

    fn evaluate_models(&mut self) {
        for (model, &offset) in self.models.iter().zip(&self.offsets) {
            let n = model.num_ports();
            let block = &mut self.block[..n * n];
            model.evaluate(
                &self.x[offset..offset + n],
                &mut self.f_nl[offset..offset + n],
                block,
            );
            for r in 0..n {
                for c in 0..n {
                    self.j_nl.set(offset + r, offset + c, block[r * n + c]);
                }
            }
        }
    }

    fn record_failure(&mut self, outcome: Outcome, iterations: usize) {
        self.stats.failures += 1;
        self.stats.consecutive_failures += 1;

        if self.stats.consecutive_failures == 1 {
            warn!(
                sample = self.stats.samples,
                iterations,
                reason = ?outcome,
                "nonlinear root did not converge; using last finite iterate"
            );
        } else {
            trace!(
                sample = self.stats.samples,
                iterations,
                consecutive = self.stats.consecutive_failures,
                reason = ?outcome,
                "nonlinear root did not converge"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Diode;
    use approx::assert_abs_diff_eq;

    /// Diode across a Thevenin source `a` behind `r`: `x = a - r·i(x)`.
    fn diode_system(r: f64) -> (Mat, Mat) {
        (Mat::from_rows(&[&[1.0]]), Mat::from_rows(&[&[-r]]))
    }

    fn bisect_diode(d: &Diode, a: f64, r: f64) -> f64 {
        let (mut lo, mut hi) = (a.min(0.0) - 1.0, a.max(0.0) + 1.0);
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            let g = a - r * d.operating_point(mid).current - mid;
            if g > 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    #[test]
    fn test_matches_bisection() {
        let d = Diode::default();
        let (e, f) = diode_system(1000.0);
        let mut solver = NewtonSolver::new(vec![Box::new(d)], NewtonConfig::default()).unwrap();

        for k in 0..=20 {
            let a = -1.0 + 0.1 * k as f64;
            solver.solve(&e, &f, &[a]);
            let expected = bisect_diode(&d, a, 1000.0);
            assert_abs_diff_eq!(solver.voltages()[0], expected, epsilon = 1e-5);
        }
        assert_eq!(solver.stats().failures, 0);
        assert_eq!(solver.stats().samples, 21);
    }

    #[test]
    fn test_warm_start_saves_iterations() {
        let (e, f) = diode_system(1000.0);
        let mut solver =
            NewtonSolver::new(vec![Box::new(Diode::default())], NewtonConfig::default()).unwrap();

        solver.solve(&e, &f, &[1.0]);
        let cold = solver.stats().last_iterations;
        solver.solve(&e, &f, &[1.0 + 1e-3]);
        let nearby = solver.stats().last_iterations;
        solver.solve(&e, &f, &[1.0 + 1e-3]);
        let repeat = solver.stats().last_iterations;

        assert!(repeat <= nearby, "{repeat} > {nearby}");
        assert!(nearby <= cold, "{nearby} > {cold}");
        assert!(repeat <= 2);

        solver.solve(&e, &f, &[1.0 + 1e-3 + 1e-9]);
        let close = solver.stats().last_iterations;
        assert!(close <= repeat, "{close} > {repeat}");
    }

    #[test]
    fn test_failure_is_reported_and_recovers() {
        let steep = Diode::new(1e-3, 1e-5, 1.0).unwrap();
        let (e, f) = diode_system(1000.0);
        let mut solver =
            NewtonSolver::new(vec![Box::new(steep)], NewtonConfig::default()).unwrap();

        solver.solve(&e, &f, &[5.0]);
        assert_eq!(solver.stats().failures, 1);
        assert_eq!(solver.stats().last_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(solver.stats().consecutive_failures, 1);
        assert!(solver.voltages()[0].is_finite());
        assert!(solver.currents()[0].is_finite());

        solver.solve(&e, &f, &[0.0]);
        assert_eq!(solver.stats().failures, 1);
        assert_eq!(solver.stats().consecutive_failures, 0);
        assert_abs_diff_eq!(solver.voltages()[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_clears_counters() {
        let (e, f) = diode_system(100.0);
        let mut solver =
            NewtonSolver::new(vec![Box::new(Diode::default())], NewtonConfig::default()).unwrap();
        solver.solve(&e, &f, &[0.8]);
        solver.reset();
        assert_eq!(*solver.stats(), SolverStats::default());
    }

    #[test]
    fn test_config_validation() {
        assert!(NewtonConfig::default().validate().is_ok());
        assert!(NewtonConfig::default().with_tolerance(0.0).validate().is_err());
        assert!(NewtonConfig::default().with_max_iterations(0).validate().is_err());
        assert!(NewtonConfig::default().with_damping(1.5).validate().is_err());
        assert!(NewtonSolver::new(Vec::new(), NewtonConfig::default()).is_err());
    }
}
