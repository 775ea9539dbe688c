//! Root resolution: junction matrices and the nonlinear solver.
//!
//! ## K-method
//!
//! A nonlinear root joins the subtrees and the device ports through a
//! resistive junction. Nodal analysis of that junction gives four matrices
//! relating the waves `a` coming up from the subtrees, the device port
//! voltages `x` and the device currents `i`:
//!
//! ```text
//! x = E·a + F·i(x)
//! b = M·a + N·i(x)
//! ```
//!
//! The first equation is solved with Newton-Raphson every sample, the second
//! gives the waves `b` sent back down.

mod junction;
mod matrix;
mod newton;
mod root;

pub use junction::Junction;
pub use matrix::{Lu, Mat, MatData, SingularMatrix};
pub use newton::{NewtonConfig, NewtonSolver};
pub use root::{NonlinearRoot, Root, RootKind, RootSpec, RtypeRoot};

/// Default convergence tolerance for Newton-Raphson iteration (volts).
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default maximum Newton-Raphson iterations per sample.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default Newton step damping (undamped).
pub const DEFAULT_DAMPING: f64 = 1.0;

/// Convergence diagnostics of a nonlinear root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Samples solved
    pub samples: u64,
    /// Samples that did not converge
    pub failures: u64,
    /// Current run of non-converged samples
    pub consecutive_failures: u64,
    /// Iterations used by the last sample
    pub last_iterations: usize,
    /// Most iterations used by any sample
    pub max_iterations_seen: usize,
    /// Iterations summed over all samples
    pub total_iterations: u64,
}

impl SolverStats {
    /// Mean iterations per sample.
    pub fn mean_iterations(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_iterations as f64 / self.samples as f64
        }
    }
}
