//! Runtime parameters bound to tree elements.
//!
//! A parameter carries its display metadata (name, units, limits) and the
//! element it drives. Changing a resistance re-adapts the whole tree; source
//! voltages and switch states only touch the element.

use tracing::debug;

use crate::elements::{Leaf, NodeKind, RootElement};
use crate::error::{Result, WdfError};

use super::types::NodeId;
use super::WdfTree;

/// Smallest resistance either half of a potentiometer can reach (ohms).
pub const MIN_POT_RESISTANCE: f64 = 1e-3;

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// On/off, stored as 0.0 or 1.0
    Bool,
    /// Continuous value
    Double,
}

/// Element a parameter drives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamTarget {
    /// Resistance of a resistor or resistive source leaf.
    Resistance(NodeId),
    /// Two resistor leaves sharing a track of `total` ohms. The value is the
    /// wiper position in `[0, 1]`; `lower` gets `total · position`.
    Potentiometer {
        upper: NodeId,
        lower: NodeId,
        total: f64,
    },
    /// State of the root switch.
    Switch,
    /// Voltage of a resistive source leaf.
    SourceVoltage(NodeId),
}

/// Parameter description and current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamData {
    pub name: String,
    pub id: usize,
    pub kind: ParamKind,
    pub value: f64,
    pub units: String,
    pub low: f64,
    pub high: f64,
    pub target: ParamTarget,
}

impl WdfTree {
    /// Register a parameter and apply its initial `value`.
    ///
    /// Returns the parameter ID. Switch parameters are boolean and ignore
    /// `low`/`high`.
    pub fn add_param(
        &mut self,
        name: impl Into<String>,
        target: ParamTarget,
        units: impl Into<String>,
        low: f64,
        high: f64,
        value: f64,
    ) -> Result<usize> {
        let name = name.into();
        self.check_param_target(&name, target)?;

        let (kind, low, high) = match target {
            ParamTarget::Switch => (ParamKind::Bool, 0.0, 1.0),
            ParamTarget::Potentiometer { .. } => (ParamKind::Double, low.max(0.0), high.min(1.0)),
            _ => (ParamKind::Double, low, high),
        };
        if !(low.is_finite() && high.is_finite() && low <= high) {
            return Err(WdfError::invalid_element(
                &name,
                format!("parameter limits [{low}, {high}] are not a valid range"),
            ));
        }

        let id = self.params.len();
        self.params.push(ParamData {
            name,
            id,
            kind,
            value: low,
            units: units.into(),
            low,
            high,
            target,
        });
        if let Err(e) = self.set_param(id, value) {
            self.params.pop();
            return Err(e);
        }
        Ok(id)
    }

    /// All registered parameters, indexed by ID.
    pub fn params(&self) -> &[ParamData] {
        &self.params
    }

    /// Set a parameter, clamped to its limits. Re-adapts the tree when a
    /// resistance changes.
    pub fn set_param(&mut self, id: usize, value: f64) -> Result<()> {
        let param = self.params.get(id).ok_or(WdfError::UnknownParam(id))?;
        if value.is_nan() {
            return Err(WdfError::invalid_element(&param.name, "value is NaN"));
        }
        let value = match param.kind {
            ParamKind::Bool => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamKind::Double => value.clamp(param.low, param.high),
        };
        let target = param.target;

        let readapt = match target {
            ParamTarget::Resistance(node) => {
                self.set_leaf_resistance(node, value)?;
                true
            }
            ParamTarget::Potentiometer {
                upper,
                lower,
                total,
            } => {
                self.set_leaf_resistance(upper, (total * (1.0 - value)).max(MIN_POT_RESISTANCE))?;
                self.set_leaf_resistance(lower, (total * value).max(MIN_POT_RESISTANCE))?;
                true
            }
            ParamTarget::Switch => {
                if let Some(RootElement::Switch { closed }) = self.root.element_mut() {
                    *closed = value != 0.0;
                }
                false
            }
            ParamTarget::SourceVoltage(node) => {
                self.set_source_voltage(node, value)?;
                false
            }
        };

        self.params[id].value = value;
        debug!(id, name = %self.params[id].name, value, readapt, "parameter changed");
        if readapt {
            self.adapt()?;
        }
        Ok(())
    }

    fn check_param_target(&self, name: &str, target: ParamTarget) -> Result<()> {
        let is_resistive = |node: NodeId| {
            matches!(
                self.nodes.get(node.0).map(|n| &n.kind),
                Some(NodeKind::Leaf(Leaf::Resistor { .. }))
                    | Some(NodeKind::Leaf(Leaf::ResistiveVoltageSource { .. }))
            )
        };
        let ok = match target {
            ParamTarget::Resistance(node) => is_resistive(node),
            ParamTarget::Potentiometer {
                upper,
                lower,
                total,
            } => {
                upper != lower
                    && total.is_finite()
                    && total > 0.0
                    && matches!(
                        self.nodes.get(upper.0).map(|n| &n.kind),
                        Some(NodeKind::Leaf(Leaf::Resistor { .. }))
                    )
                    && matches!(
                        self.nodes.get(lower.0).map(|n| &n.kind),
                        Some(NodeKind::Leaf(Leaf::Resistor { .. }))
                    )
            }
            ParamTarget::Switch => matches!(self.root.element(), Some(RootElement::Switch { .. })),
            ParamTarget::SourceVoltage(node) => matches!(
                self.nodes.get(node.0).map(|n| &n.kind),
                Some(NodeKind::Leaf(Leaf::ResistiveVoltageSource { .. }))
            ),
        };
        if ok {
            Ok(())
        } else {
            Err(WdfError::invalid_element(
                name,
                format!("parameter target {target:?} does not match the tree"),
            ))
        }
    }
}
