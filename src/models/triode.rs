//! Triode model after Dempwolf and Zölzer.
//!
//! Two ports, anode-cathode then grid-cathode:
//!
//! ```text
//! Ig = Gg · (ln(1 + e^(Cg·vGC)) / Cg)^ξ + Ig0
//! Ik = G · (ln(1 + e^(C·(vAC/μ + vGC))) / C)^γ
//! Ia = Ik - Ig
//! ```
//!
//! Port 0 carries `Ia`, port 1 carries `Ig`.

use super::{logistic, softplus, NlModel};

/// Triode valve (12AX7 fit by default).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triode {
    /// Cathode current scale (A)
    pub g: f64,
    /// Cathode current smoothing
    pub c: f64,
    /// Amplification factor
    pub mu: f64,
    /// Cathode current exponent
    pub gamma: f64,
    /// Grid current scale (A)
    pub g_g: f64,
    /// Grid current smoothing
    pub c_g: f64,
    /// Grid current exponent
    pub xi: f64,
    /// Grid current offset (A)
    pub i_g0: f64,
}

impl Default for Triode {
    fn default() -> Self {
        Self {
            g: 2.242e-3,
            c: 3.40,
            mu: 103.2,
            gamma: 1.26,
            g_g: 6.177e-4,
            c_g: 9.901,
            xi: 1.314,
            i_g0: 8.025e-8,
        }
    }
}

impl NlModel for Triode {
    fn num_ports(&self) -> usize {
        2
    }

    fn name(&self) -> &'static str {
        "triode"
    }

    fn evaluate(&self, v: &[f64], i: &mut [f64], jacobian: &mut [f64]) {
        let (v_ac, v_gc) = (v[0], v[1]);

        // Grid
        let arg_g = self.c_g * v_gc;
        let base_g = softplus(arg_g) / self.c_g;
        let i_g = self.g_g * base_g.powf(self.xi) + self.i_g0;
        let di_g = self.g_g * self.xi * base_g.powf(self.xi - 1.0) * logistic(arg_g);

        // Cathode
        let arg_k = self.c * (v_ac / self.mu + v_gc);
        let base_k = softplus(arg_k) / self.c;
        let i_k = self.g * base_k.powf(self.gamma);
        let di_k = self.g * self.gamma * base_k.powf(self.gamma - 1.0) * logistic(arg_k);

        i[0] = i_k - i_g;
        i[1] = i_g;

        jacobian[0] = di_k / self.mu;
        jacobian[1] = di_k - di_g;
        jacobian[2] = 0.0;
        jacobian[3] = di_g;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::check_jacobian;
    use approx::assert_relative_eq;

    fn eval(v_ac: f64, v_gc: f64) -> [f64; 2] {
        let mut i = [0.0; 2];
        let mut jac = [0.0; 4];
        Triode::default().evaluate(&[v_ac, v_gc], &mut i, &mut jac);
        i
    }

    #[test]
    fn test_anode_current_rises_with_plate_voltage() {
        let low = eval(100.0, -1.5)[0];
        let high = eval(250.0, -1.5)[0];
        assert!(high > low);
        assert!(low > 0.0);
    }

    #[test]
    fn test_grid_cutoff() {
        let [i_a, i_g] = eval(200.0, -40.0);
        // Ik vanishes, leaving only the grid offset
        assert_relative_eq!(i_g, Triode::default().i_g0, max_relative = 1e-6);
        assert!(i_a < 0.0);
    }

    #[test]
    fn test_jacobian() {
        check_jacobian(&Triode::default(), &[180.0, -1.2]);
        check_jacobian(&Triode::default(), &[50.0, 0.3]);
    }
}
