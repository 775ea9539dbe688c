//! Tree elements: terminated leaves, adaptors and root one-ports.
//!
//! Nodes are a closed set, so dispatch is a `match` over [`NodeKind`]. Each
//! node owns the behavior of one port in the tree's port array; adaptors
//! additionally read and write their children's ports.

mod adaptors;
mod leaves;
mod roots;

pub use adaptors::{Adaptor, RtypeAdaptor};
pub use leaves::Leaf;
pub use roots::RootElement;

use crate::error::Result;
use crate::tree::Port;

/// What a node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf(Leaf),
    Adaptor(Adaptor),
}

/// One entry of the tree arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub label: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, label: None }
    }

    /// Short type name.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Leaf(l) => l.name(),
            NodeKind::Adaptor(a) => a.name(),
        }
    }

    /// Child handles, empty for leaves.
    pub fn children(&self) -> &[crate::tree::NodeId] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Adaptor(a) => a.children(),
        }
    }

    /// Recompute this node's port resistance. Children must already be adapted.
    pub(crate) fn adapt(&mut self, index: usize, ports: &mut [Port], t: f64) -> Result<()> {
        let rp = match &mut self.kind {
            NodeKind::Leaf(l) => l.port_resistance(t),
            NodeKind::Adaptor(a) => a.adapt(ports)?,
        };
        ports[index].rp = rp;
        Ok(())
    }

    /// Fill this node's reflected wave `b`.
    #[inline]
    pub(crate) fn reflect(&self, index: usize, ports: &mut [Port]) {
        let b = match &self.kind {
            NodeKind::Leaf(l) => l.reflect(),
            NodeKind::Adaptor(a) => a.reflect(&ports[index], ports),
        };
        ports[index].b = b;
    }

    /// Consume this node's incident wave `a`.
    #[inline]
    pub(crate) fn accept_incident(&mut self, index: usize, ports: &mut [Port]) {
        let own = ports[index];
        match &mut self.kind {
            NodeKind::Leaf(l) => l.accept_incident(own.a),
            NodeKind::Adaptor(a) => a.scatter(&own, ports),
        }
    }

    /// Clear reactive state.
    pub(crate) fn reset(&mut self) {
        if let NodeKind::Leaf(l) = &mut self.kind {
            l.reset();
        }
    }
}
