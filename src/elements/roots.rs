//! Unadapted one-port elements that can terminate a tree at its root.
//!
//! A root element sees the port resistance of the subtree below it and maps
//! the wave coming up into the wave sent back down.

use crate::error::{check_positive, check_resistance, Result};

/// One-port root element.
#[derive(Debug, Clone, PartialEq)]
pub enum RootElement {
    /// Ideal voltage source.
    IdealVoltageSource { vs: f64 },
    /// Ideal current source.
    IdealCurrentSource { is: f64, rp: f64 },
    /// Resistor.
    Resistor { r: f64, rho: f64 },
    /// Capacitor, trapezoidal.
    Capacitor {
        c: f64,
        rho: f64,
        prev_in: f64,
        prev_out: f64,
    },
    /// Inductor, trapezoidal.
    Inductor {
        l: f64,
        rho: f64,
        prev_in: f64,
        prev_out: f64,
    },
    /// Ideal switch.
    Switch { closed: bool },
}

impl RootElement {
    pub fn voltage_source(vs: f64) -> Self {
        Self::IdealVoltageSource { vs }
    }

    pub fn current_source(is: f64) -> Self {
        Self::IdealCurrentSource { is, rp: 1.0 }
    }

    pub fn resistor(r: f64) -> Result<Self> {
        Ok(Self::Resistor {
            r: check_resistance("root resistor", r)?,
            rho: 0.0,
        })
    }

    pub fn capacitor(c: f64) -> Result<Self> {
        Ok(Self::Capacitor {
            c: check_positive("root capacitor", "capacitance", c)?,
            rho: 0.0,
            prev_in: 0.0,
            prev_out: 0.0,
        })
    }

    pub fn inductor(l: f64) -> Result<Self> {
        Ok(Self::Inductor {
            l: check_positive("root inductor", "inductance", l)?,
            rho: 0.0,
            prev_in: 0.0,
            prev_out: 0.0,
        })
    }

    pub fn switch(closed: bool) -> Self {
        Self::Switch { closed }
    }

    /// Short type name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IdealVoltageSource { .. } => "ideal voltage source",
            Self::IdealCurrentSource { .. } => "ideal current source",
            Self::Resistor { .. } => "resistor",
            Self::Capacitor { .. } => "capacitor",
            Self::Inductor { .. } => "inductor",
            Self::Switch { .. } => "switch",
        }
    }

    /// Update coefficients for the subtree port resistance `rp` and sample
    /// period `t`.
    pub fn set_port_resistance(&mut self, port_rp: f64, t: f64) {
        match self {
            Self::IdealCurrentSource { rp, .. } => *rp = port_rp,
            Self::Resistor { r, rho } => *rho = (*r - port_rp) / (*r + port_rp),
            Self::Capacitor { c, rho, .. } => {
                let rc = t / (2.0 * *c);
                *rho = (port_rp - rc) / (port_rp + rc);
            }
            Self::Inductor { l, rho, .. } => {
                let rl = 2.0 * *l / t;
                *rho = (port_rp - rl) / (port_rp + rl);
            }
            Self::IdealVoltageSource { .. } | Self::Switch { .. } => {}
        }
    }

    /// Map the wave coming up from the subtree to the wave sent back down.
    #[inline]
    pub fn reflect(&mut self, a: f64) -> f64 {
        match self {
            Self::IdealVoltageSource { vs } => 2.0 * *vs - a,
            Self::IdealCurrentSource { is, rp } => 2.0 * *rp * *is + a,
            Self::Resistor { rho, .. } => *rho * a,
            Self::Capacitor {
                rho,
                prev_in,
                prev_out,
                ..
            } => {
                let b = *rho * *prev_out - *rho * a + *prev_in;
                *prev_in = a;
                *prev_out = b;
                b
            }
            Self::Inductor {
                rho,
                prev_in,
                prev_out,
                ..
            } => {
                let b = -*rho * *prev_out - *rho * a - *prev_in;
                *prev_in = a;
                *prev_out = b;
                b
            }
            Self::Switch { closed } => {
                if *closed {
                    -a
                } else {
                    a
                }
            }
        }
    }

    /// Clear reactive memory.
    pub fn reset(&mut self) {
        if let Self::Capacitor {
            prev_in, prev_out, ..
        }
        | Self::Inductor {
            prev_in, prev_out, ..
        } = self
        {
            *prev_in = 0.0;
            *prev_out = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const T: f64 = 1.0 / 48000.0;

    #[test]
    fn test_matched_resistor_absorbs() {
        let mut r = RootElement::resistor(1000.0).unwrap();
        r.set_port_resistance(1000.0, T);
        assert_abs_diff_eq!(r.reflect(3.0), 0.0);
    }

    #[test]
    fn test_voltage_source_sets_port_voltage() {
        let mut v = RootElement::voltage_source(1.5);
        let a = 0.4;
        let b = v.reflect(a);
        assert_abs_diff_eq!((a + b) / 2.0, 1.5);
    }

    #[test]
    fn test_current_source_sets_port_current() {
        let rp = 220.0;
        let mut i = RootElement::current_source(0.01);
        i.set_port_resistance(rp, T);
        let a = 0.7;
        let b = i.reflect(a);
        // Current flowing out of the source into the subtree
        assert_abs_diff_eq!((b - a) / (2.0 * rp), 0.01, epsilon = 1e-15);
    }

    #[test]
    fn test_matched_capacitor_is_unit_delay() {
        let mut c = RootElement::capacitor(1e-6).unwrap();
        c.set_port_resistance(T / 2e-6, T);
        assert_abs_diff_eq!(c.reflect(0.5), 0.0);
        assert_abs_diff_eq!(c.reflect(0.0), 0.5);
    }

    #[test]
    fn test_capacitor_is_open_at_dc() {
        let mut c = RootElement::capacitor(1e-6).unwrap();
        c.set_port_resistance(1.0, T);
        let mut b = 0.0;
        for _ in 0..2000 {
            b = c.reflect(1.0);
        }
        assert_abs_diff_eq!(b, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inductor_is_short_at_dc() {
        let mut l = RootElement::inductor(1e-3).unwrap();
        l.set_port_resistance(1000.0, T);
        let mut b = 0.0;
        for _ in 0..20000 {
            b = l.reflect(1.0);
        }
        assert_abs_diff_eq!(b, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_switch() {
        assert_abs_diff_eq!(RootElement::switch(false).reflect(0.3), 0.3);
        assert_abs_diff_eq!(RootElement::switch(true).reflect(0.3), -0.3);
    }
}
