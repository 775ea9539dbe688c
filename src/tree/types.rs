//! Core handle and port types for the scattering tree.

use std::fmt;

/// Handle to a node of a tree.
///
/// Handles are indices into the tree arena. A node is always created after
/// all of its children, so ascending handle order is a valid bottom-up
/// traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Wave port connecting a node to its parent.
///
/// `a` is the incident wave (parent to node), `b` the reflected wave (node to
/// parent) and `rp` the port resistance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Port {
    /// Incident wave
    pub a: f64,
    /// Reflected wave
    pub b: f64,
    /// Port resistance in ohms
    pub rp: f64,
}

impl Port {
    /// Create a port with zero waves.
    pub fn new(rp: f64) -> Self {
        Self { a: 0.0, b: 0.0, rp }
    }

    /// Port conductance.
    #[inline]
    pub fn gp(&self) -> f64 {
        1.0 / self.rp
    }

    /// Port voltage, `(a + b) / 2`.
    #[inline]
    pub fn voltage(&self) -> f64 {
        (self.a + self.b) * 0.5
    }

    /// Port current flowing into the node, `(a - b) / (2 Rp)`.
    #[inline]
    pub fn current(&self) -> f64 {
        (self.a - self.b) / (2.0 * self.rp)
    }

    /// Power absorbed by the node.
    #[inline]
    pub fn power(&self) -> f64 {
        self.voltage() * self.current()
    }
}

impl Default for Port {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_port_kirchhoff_values() {
        let port = Port {
            a: 3.0,
            b: 1.0,
            rp: 2.0,
        };
        assert_relative_eq!(port.voltage(), 2.0);
        assert_relative_eq!(port.current(), 0.5);
        assert_relative_eq!(port.power(), 1.0);
        // (a² - b²) / 4Rp
        assert_relative_eq!(port.power(), (9.0 - 1.0) / 8.0);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "#7");
    }
}
