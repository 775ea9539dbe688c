//! NPN transistor, Ebers-Moll transport model.
//!
//! The transistor occupies two ports, base-collector then base-emitter:
//!
//! ```text
//! i_bc = -Is (e^(vBE/Vt) - 1) + Is/αR (e^(vBC/Vt) - 1)
//! i_be =  Is/αF (e^(vBE/Vt) - 1) - Is (e^(vBC/Vt) - 1)
//! ```
//!
//! with `αF = βF / (1 + βF)` and `αR = βR / (1 + βR)`.

use crate::error::{check_positive, Result};
use super::{limited_exp, NlModel, THERMAL_VOLTAGE};

/// NPN bipolar transistor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NpnEbersMoll {
    /// Transport saturation current (A)
    pub is: f64,
    /// Thermal voltage (V)
    pub vt: f64,
    /// Forward current gain (β_F)
    pub beta_f: f64,
    /// Reverse current gain (β_R)
    pub beta_r: f64,
}

impl Default for NpnEbersMoll {
    fn default() -> Self {
        Self {
            is: 5.911e-15,
            vt: THERMAL_VOLTAGE,
            beta_f: 1434.0,
            beta_r: 1.262,
        }
    }
}

impl NpnEbersMoll {
    /// Create a transistor, rejecting non-positive parameters.
    pub fn new(is: f64, vt: f64, beta_f: f64, beta_r: f64) -> Result<Self> {
        Ok(Self {
            is: check_positive("npn", "saturation current", is)?,
            vt: check_positive("npn", "thermal voltage", vt)?,
            beta_f: check_positive("npn", "forward gain", beta_f)?,
            beta_r: check_positive("npn", "reverse gain", beta_r)?,
        })
    }

    /// Forward common-base current gain.
    pub fn alpha_f(&self) -> f64 {
        self.beta_f / (1.0 + self.beta_f)
    }

    /// Reverse common-base current gain.
    pub fn alpha_r(&self) -> f64 {
        self.beta_r / (1.0 + self.beta_r)
    }
}

impl NlModel for NpnEbersMoll {
    fn num_ports(&self) -> usize {
        2
    }

    fn name(&self) -> &'static str {
        "npn"
    }

    fn evaluate(&self, v: &[f64], i: &mut [f64], jacobian: &mut [f64]) {
        let (v_bc, v_be) = (v[0], v[1]);
        let (e_bc, de_bc) = limited_exp(v_bc / self.vt);
        let (e_be, de_be) = limited_exp(v_be / self.vt);

        let is_over_ar = self.is / self.alpha_r();
        let is_over_af = self.is / self.alpha_f();

        i[0] = -self.is * (e_be - 1.0) + is_over_ar * (e_bc - 1.0);
        i[1] = is_over_af * (e_be - 1.0) - self.is * (e_bc - 1.0);

        jacobian[0] = is_over_ar / self.vt * de_bc;
        jacobian[1] = -self.is / self.vt * de_be;
        jacobian[2] = -self.is / self.vt * de_bc;
        jacobian[3] = is_over_af / self.vt * de_be;
    }
}
