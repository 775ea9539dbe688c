//! Diode models.
//!
//! Uses the Shockley diode equation:
//!   I = Is * (exp(V / (n * Vt)) - 1)
//!
//! Default parameters follow Werner et al., "An Improved and Generalized
//! Diode Clipper Model for Wave Digital Filters".

use crate::error::{check_positive, Result, WdfError};
use super::{limited_exp, NlModel, OperatingPoint, THERMAL_VOLTAGE};

/// Single diode, anode on the positive port terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diode {
    /// Saturation current (A)
    pub is: f64,
    /// Thermal voltage (V)
    pub vt: f64,
    /// Ideality factor
    pub n: f64,
}

impl Default for Diode {
    fn default() -> Self {
        Self {
            is: 2.52e-9,
            vt: THERMAL_VOLTAGE,
            n: 1.0,
        }
    }
}

impl Diode {
    /// Create a diode, rejecting non-positive parameters.
    pub fn new(is: f64, vt: f64, n: f64) -> Result<Self> {
        Ok(Self {
            is: check_positive("diode", "saturation current", is)?,
            vt: check_positive("diode", "thermal voltage", vt)?,
            n: check_positive("diode", "ideality factor", n)?,
        })
    }

    /// Thermal voltage times ideality factor.
    pub fn n_vt(&self) -> f64 {
        self.n * self.vt
    }

    /// Current and conductance at voltage `v`.
    pub fn operating_point(&self, v: f64) -> OperatingPoint {
        let n_vt = self.n_vt();
        let (e, de) = limited_exp(v / n_vt);
        OperatingPoint {
            voltage: v,
            current: self.is * (e - 1.0),
            conductance: self.is / n_vt * de,
        }
    }
}

impl NlModel for Diode {
    fn num_ports(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "diode"
    }

    fn evaluate(&self, v: &[f64], i: &mut [f64], jacobian: &mut [f64]) {
        let op = self.operating_point(v[0]);
        i[0] = op.current;
        jacobian[0] = op.conductance;
    }
}

/// Two identical diodes in anti-parallel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiodePair {
    pub diode: Diode,
}

impl DiodePair {
    pub fn new(diode: Diode) -> Self {
        Self { diode }
    }

    /// Current and conductance at voltage `v`.
    pub fn operating_point(&self, v: f64) -> OperatingPoint {
        let forward = self.diode.operating_point(v);
        let reverse = self.diode.operating_point(-v);
        OperatingPoint {
            voltage: v,
            current: forward.current - reverse.current,
            conductance: forward.conductance + reverse.conductance,
        }
    }
}

impl NlModel for DiodePair {
    fn num_ports(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "diode_pair"
    }

    fn evaluate(&self, v: &[f64], i: &mut [f64], jacobian: &mut [f64]) {
        let op = self.operating_point(v[0]);
        i[0] = op.current;
        jacobian[0] = op.conductance;
    }
}

/// `count` identical diodes in series, sharing the port voltage equally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiodeString {
    pub diode: Diode,
    pub count: usize,
}

impl DiodeString {
    pub fn new(diode: Diode, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(WdfError::invalid_element(
                "diode_string",
                "needs at least one diode",
            ));
        }
        Ok(Self { diode, count })
    }

    /// Three diodes in series.
    pub fn triple(diode: Diode) -> Self {
        Self { diode, count: 3 }
    }

    /// Current and conductance at voltage `v`.
    pub fn operating_point(&self, v: f64) -> OperatingPoint {
        let per_diode = self.diode.operating_point(v / self.count as f64);
        OperatingPoint {
            voltage: v,
            current: per_diode.current,
            conductance: per_diode.conductance / self.count as f64,
        }
    }
}

impl NlModel for DiodeString {
    fn num_ports(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "diode_string"
    }

    fn evaluate(&self, v: &[f64], i: &mut [f64], jacobian: &mut [f64]) {
        let op = self.operating_point(v[0]);
        i[0] = op.current;
        jacobian[0] = op.conductance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::check_jacobian;
    use approx::assert_relative_eq;

    #[test]
    fn test_diode_forward_bias() {
        let d = Diode::default();

        // At 0V, current should be approximately 0
        assert!(d.operating_point(0.0).current.abs() < 1e-15);

        // At forward bias, current should increase exponentially
        let i_small = d.operating_point(0.3).current;
        let i_large = d.operating_point(0.6).current;
        assert!(i_large > i_small * 100.0);
    }

    #[test]
    fn test_diode_reverse_bias() {
        let d = Diode::default();

        // In reverse bias, current should approach -Is
        let i_rev = d.operating_point(-1.0).current;
        assert!(i_rev < 0.0);
        assert_relative_eq!(i_rev, -d.is, max_relative = 1e-9);
    }

    #[test]
    fn test_diode_huge_voltage_stays_finite() {
        let op = Diode::default().operating_point(100.0);
        assert!(op.current.is_finite());
        assert!(op.conductance.is_finite());
    }

    #[test]
    fn test_pair_is_odd() {
        let pair = DiodePair::default();
        let pos = pair.operating_point(0.4);
        let neg = pair.operating_point(-0.4);
        assert_relative_eq!(pos.current, -neg.current);
        assert_relative_eq!(pos.conductance, neg.conductance);
    }

    #[test]
    fn test_triple_needs_three_times_the_voltage() {
        let d = Diode::default();
        let triple = DiodeString::triple(d);
        assert_relative_eq!(
            triple.operating_point(1.5).current,
            d.operating_point(0.5).current
        );
    }

    #[test]
    fn test_jacobians() {
        check_jacobian(&Diode::default(), &[0.45]);
        check_jacobian(&DiodePair::default(), &[-0.3]);
        check_jacobian(&DiodeString::triple(Diode::default()), &[1.2]);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(Diode::new(0.0, 0.025, 1.0).is_err());
        assert!(Diode::new(1e-9, -0.025, 1.0).is_err());
        assert!(DiodeString::new(Diode::default(), 0).is_err());
    }
}
