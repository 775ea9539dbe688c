//! Where samples enter and leave a tree.

use super::types::{NodeId, Port};

/// Where the input sample is written each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputBinding {
    /// Voltage of a resistive voltage source leaf.
    SourceVoltage(NodeId),
    /// Voltage of the root ideal voltage source.
    RootVoltage,
    /// Current of the root ideal current source.
    RootCurrent,
}

/// Port quantity read by an output probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Voltage,
    Current,
}

/// Reads one port after every sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputProbe {
    pub node: NodeId,
    pub quantity: Quantity,
    pub scale: f64,
}

impl OutputProbe {
    /// Probe the voltage of `node`'s port.
    pub fn voltage(node: NodeId) -> Self {
        Self {
            node,
            quantity: Quantity::Voltage,
            scale: 1.0,
        }
    }

    /// Probe the current into `node`'s port.
    pub fn current(node: NodeId) -> Self {
        Self {
            node,
            quantity: Quantity::Current,
            scale: 1.0,
        }
    }

    /// Multiply the reading by `scale`.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    #[inline]
    pub(crate) fn read(&self, ports: &[Port]) -> f64 {
        let port = &ports[self.node.0];
        let value = match self.quantity {
            Quantity::Voltage => port.voltage(),
            Quantity::Current => port.current(),
        };
        value * self.scale
    }
}
