//! Nonlinear device models resolved at the root of a tree.
//!
//! A model maps the voltages across its ports to the currents through them
//! and fills the matching Jacobian block. Models are stateless and their
//! parameters are fixed at construction.
//!
//! Port currents flow from the positive to the negative terminal through the
//! device.

mod bjt;
mod diode;
mod triode;

pub use bjt::NpnEbersMoll;
pub use diode::{Diode, DiodePair, DiodeString};
pub use triode::Triode;

use std::fmt;

use crate::error::{Result, WdfError};

/// Exponent above which exponentials continue linearly.
pub const EXP_LIMIT: f64 = 50.0;

/// Default thermal voltage (V) at roughly 27 °C.
pub const THERMAL_VOLTAGE: f64 = 0.02585;

/// A nonlinear multi-port device.
pub trait NlModel: fmt::Debug + Send {
    /// Number of ports the device occupies.
    fn num_ports(&self) -> usize;

    /// Short model name for diagnostics.
    fn name(&self) -> &'static str;

    /// Evaluate port currents and the Jacobian at port voltages `v`.
    ///
    /// `v` and `i` have `num_ports()` entries. `jacobian` is the row-major
    /// `num_ports() × num_ports()` block `∂i_r / ∂v_c`.
    fn evaluate(&self, v: &[f64], i: &mut [f64], jacobian: &mut [f64]);
}

/// Current, voltage and small-signal conductance of a one-port device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    /// Port voltage (V)
    pub voltage: f64,
    /// Device current (A)
    pub current: f64,
    /// dI/dV (S)
    pub conductance: f64,
}

/// `exp(x)` and its derivative, continued linearly above [`EXP_LIMIT`].
#[inline]
pub fn limited_exp(x: f64) -> (f64, f64) {
    if x > EXP_LIMIT {
        let e = EXP_LIMIT.exp();
        (e * (1.0 + x - EXP_LIMIT), e)
    } else {
        let e = x.exp();
        (e, e)
    }
}

/// `ln(1 + exp(x))` with asymptotic forms beyond ±[`EXP_LIMIT`].
#[inline]
pub fn softplus(x: f64) -> f64 {
    if x > EXP_LIMIT {
        x
    } else if x < -EXP_LIMIT {
        0.0
    } else {
        x.exp().ln_1p()
    }
}

/// Derivative of [`softplus`], the logistic function.
#[inline]
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Declarative model selection, used by tree descriptions.
#[derive(Debug, Clone, PartialEq)]
pub enum NlKind {
    /// Single diode
    Diode(Diode),
    /// Anti-parallel diode pair
    DiodePair(DiodePair),
    /// Diodes in series
    DiodeString(DiodeString),
    /// NPN transistor, Ebers-Moll
    Npn(NpnEbersMoll),
    /// Dempwolf triode
    Triode(Triode),
}

impl NlKind {
    /// Resolve a model name and its `key=value` overrides.
    ///
    /// Recognized names: `diode`, `diode_pair`, `diode_string` (`count=`),
    /// `diode_triple`, `npn`, `triode`. Diode-family keys are `is`, `vt` and
    /// `n`; `npn` takes `is`, `vt`, `bf` and `br`.
    pub fn from_params(name: &str, params: &[(String, f64)]) -> Result<Self> {
        let lookup = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| *v)
        };
        let allowed: &[&str] = match name.to_ascii_lowercase().as_str() {
            "diode" | "diode_pair" | "diode_triple" => &["is", "vt", "n"],
            "diode_string" => &["is", "vt", "n", "count"],
            "npn" => &["is", "vt", "bf", "br"],
            "triode" => &[],
            _ => {
                return Err(WdfError::UnknownModel {
                    model: name.to_string(),
                })
            }
        };
        if let Some((key, _)) = params
            .iter()
            .find(|(k, _)| !allowed.iter().any(|a| k.eq_ignore_ascii_case(a)))
        {
            return Err(WdfError::invalid_element(
                name,
                format!("unknown model parameter '{key}'"),
            ));
        }

        let diode = || {
            let d = Diode::default();
            Diode::new(
                lookup("is").unwrap_or(d.is),
                lookup("vt").unwrap_or(d.vt),
                lookup("n").unwrap_or(d.n),
            )
        };

        let kind = match name.to_ascii_lowercase().as_str() {
            "diode" => Self::Diode(diode()?),
            "diode_pair" => Self::DiodePair(DiodePair::new(diode()?)),
            "diode_triple" => Self::DiodeString(DiodeString::triple(diode()?)),
            "diode_string" => {
                let count = lookup("count").unwrap_or(1.0);
                if count < 1.0 || count.fract() != 0.0 {
                    return Err(WdfError::invalid_element(
                        name,
                        format!("count must be a positive integer, got {count}"),
                    ));
                }
                Self::DiodeString(DiodeString::new(diode()?, count as usize)?)
            }
            "npn" => {
                let d = NpnEbersMoll::default();
                Self::Npn(NpnEbersMoll::new(
                    lookup("is").unwrap_or(d.is),
                    lookup("vt").unwrap_or(d.vt),
                    lookup("bf").unwrap_or(d.beta_f),
                    lookup("br").unwrap_or(d.beta_r),
                )?)
            }
            _ => Self::Triode(Triode::default()),
        };
        Ok(kind)
    }

    /// Number of ports of the selected model.
    pub fn num_ports(&self) -> usize {
        match self {
            Self::Diode(_) | Self::DiodePair(_) | Self::DiodeString(_) => 1,
            Self::Npn(_) | Self::Triode(_) => 2,
        }
    }

    /// Box the selected model.
    pub fn into_model(self) -> Box<dyn NlModel> {
        match self {
            Self::Diode(m) => Box::new(m),
            Self::DiodePair(m) => Box::new(m),
            Self::DiodeString(m) => Box::new(m),
            Self::Npn(m) => Box::new(m),
            Self::Triode(m) => Box::new(m),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Compare a model's Jacobian to central differences.
    pub(crate) fn check_jacobian(model: &dyn NlModel, v: &[f64]) {
        let n = model.num_ports();
        let mut i = vec![0.0; n];
        let mut jac = vec![0.0; n * n];
        model.evaluate(v, &mut i, &mut jac);

        let h = 1e-7;
        let mut i_plus = vec![0.0; n];
        let mut i_minus = vec![0.0; n];
        let mut scratch = vec![0.0; n * n];
        for c in 0..n {
            let mut vp = v.to_vec();
            let mut vm = v.to_vec();
            vp[c] += h;
            vm[c] -= h;
            model.evaluate(&vp, &mut i_plus, &mut scratch);
            model.evaluate(&vm, &mut i_minus, &mut scratch);
            for r in 0..n {
                let numeric = (i_plus[r] - i_minus[r]) / (2.0 * h);
                assert_relative_eq!(jac[r * n + c], numeric, max_relative = 1e-4, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_limited_exp_is_continuous() {
        let (below, _) = limited_exp(EXP_LIMIT - 1e-9);
        let (above, slope) = limited_exp(EXP_LIMIT + 1e-9);
        assert_relative_eq!(below, above, max_relative = 1e-8);
        assert_relative_eq!(slope, EXP_LIMIT.exp());
        assert!(limited_exp(1e6).0.is_finite());
    }

    #[test]
    fn test_softplus_asymptotes() {
        assert_relative_eq!(softplus(100.0), 100.0);
        assert_eq!(softplus(-100.0), 0.0);
        assert_relative_eq!(softplus(0.0), 2f64.ln());
        assert_relative_eq!(logistic(0.0), 0.5);
        assert!(logistic(-800.0) >= 0.0);
    }

    #[test]
    fn test_kind_from_params() {
        let kind = NlKind::from_params("diode", &[("is".into(), 1e-12)]).unwrap();
        match kind {
            NlKind::Diode(d) => assert_relative_eq!(d.is, 1e-12),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(NlKind::from_params("npn", &[]).unwrap().num_ports(), 2);
        assert_eq!(NlKind::from_params("diode_triple", &[]).unwrap().num_ports(), 1);
        assert!(matches!(
            NlKind::from_params("pentode", &[]),
            Err(WdfError::UnknownModel { .. })
        ));
        assert!(NlKind::from_params("diode", &[("bf".into(), 1.0)]).is_err());
        assert!(NlKind::from_params("diode_string", &[("count".into(), 0.0)]).is_err());
    }
}
