//! Terminated one-port leaves.
//!
//! Each leaf is adapted: its port resistance is chosen so that the reflected
//! wave does not depend on the incident wave of the same sample.

use crate::error::{check_positive, check_resistance, Result};

/// Adapted one-port element at the bottom of a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// Resistor, `Rp = R`, reflects nothing.
    Resistor { r: f64 },
    /// Capacitor, `Rp = T / 2C`, reflects its last incident wave.
    Capacitor { c: f64, state: f64 },
    /// Inductor, `Rp = 2L / T`, reflects its last incident wave negated.
    Inductor { l: f64, state: f64 },
    /// Voltage source behind a series resistance, `Rp = R`, reflects `Vs`.
    ResistiveVoltageSource { vs: f64, r: f64 },
}

impl Leaf {
    pub fn resistor(r: f64) -> Result<Self> {
        Ok(Self::Resistor {
            r: check_resistance("resistor", r)?,
        })
    }

    pub fn capacitor(c: f64) -> Result<Self> {
        Ok(Self::Capacitor {
            c: check_positive("capacitor", "capacitance", c)?,
            state: 0.0,
        })
    }

    pub fn inductor(l: f64) -> Result<Self> {
        Ok(Self::Inductor {
            l: check_positive("inductor", "inductance", l)?,
            state: 0.0,
        })
    }

    pub fn resistive_voltage_source(vs: f64, r: f64) -> Result<Self> {
        Ok(Self::ResistiveVoltageSource {
            vs,
            r: check_resistance("resistive voltage source", r)?,
        })
    }

    /// Short type name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resistor { .. } => "resistor",
            Self::Capacitor { .. } => "capacitor",
            Self::Inductor { .. } => "inductor",
            Self::ResistiveVoltageSource { .. } => "resistive voltage source",
        }
    }

    /// Adapted port resistance for sample period `t`.
    pub fn port_resistance(&self, t: f64) -> f64 {
        match *self {
            Self::Resistor { r } => r,
            Self::Capacitor { c, .. } => t / (2.0 * c),
            Self::Inductor { l, .. } => 2.0 * l / t,
            Self::ResistiveVoltageSource { r, .. } => r,
        }
    }

    /// Wave sent up to the parent.
    #[inline]
    pub fn reflect(&self) -> f64 {
        match *self {
            Self::Resistor { .. } => 0.0,
            Self::Capacitor { state, .. } | Self::Inductor { state, .. } => state,
            Self::ResistiveVoltageSource { vs, .. } => vs,
        }
    }

    /// Take the wave sent down by the parent.
    #[inline]
    pub fn accept_incident(&mut self, a: f64) {
        match self {
            Self::Capacitor { state, .. } => *state = a,
            Self::Inductor { state, .. } => *state = -a,
            Self::Resistor { .. } | Self::ResistiveVoltageSource { .. } => {}
        }
    }

    /// Clear reactive state.
    pub fn reset(&mut self) {
        if let Self::Capacitor { state, .. } | Self::Inductor { state, .. } = self {
            *state = 0.0;
        }
    }
}
