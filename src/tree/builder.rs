//! Bottom-up tree construction.
//!
//! Nodes are created children-first; every constructor returns a handle that
//! can be passed to exactly one adaptor or to the root. [`TreeBuilder::build`]
//! checks that nothing is left dangling and adapts the finished tree.

use crate::elements::{Adaptor, Leaf, Node, NodeKind, RtypeAdaptor};
use crate::error::{Result, WdfError};
use crate::solver::{Junction, Root, RootSpec};

use super::types::NodeId;
use super::{TreeConfig, WdfTree};

/// Builder for a [`WdfTree`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    /// Whether each node already has a parent
    claimed: Vec<bool>,
}

impl TreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes created so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been created yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a resistor leaf.
    pub fn resistor(&mut self, r: f64) -> Result<NodeId> {
        Ok(self.push_leaf(Leaf::resistor(r)?))
    }

    /// Add a capacitor leaf.
    pub fn capacitor(&mut self, c: f64) -> Result<NodeId> {
        Ok(self.push_leaf(Leaf::capacitor(c)?))
    }

    /// Add an inductor leaf.
    pub fn inductor(&mut self, l: f64) -> Result<NodeId> {
        Ok(self.push_leaf(Leaf::inductor(l)?))
    }

    /// Add a voltage source leaf with series resistance `r`.
    pub fn resistive_voltage_source(&mut self, vs: f64, r: f64) -> Result<NodeId> {
        Ok(self.push_leaf(Leaf::resistive_voltage_source(vs, r)?))
    }

    /// Join children in series.
    pub fn series(&mut self, children: &[NodeId]) -> Result<NodeId> {
        let adaptor = Adaptor::series(children.to_vec())?;
        self.push_adaptor(adaptor)
    }

    /// Join children in parallel.
    pub fn parallel(&mut self, children: &[NodeId]) -> Result<NodeId> {
        let adaptor = Adaptor::parallel(children.to_vec())?;
        self.push_adaptor(adaptor)
    }

    /// Invert the polarity of a child.
    pub fn inverter(&mut self, child: NodeId) -> Result<NodeId> {
        self.push_adaptor(Adaptor::inverter(child))
    }

    /// Join children through a junction. Junction port 0 is the parent port,
    /// port `k` is `children[k - 1]`.
    pub fn rtype(&mut self, junction: Junction, children: &[NodeId]) -> Result<NodeId> {
        let adaptor = RtypeAdaptor::new(junction, children.to_vec())?;
        self.push_adaptor(Adaptor::Rtype(adaptor))
    }

    /// Attach a label to a node. Labels are unique within a tree.
    pub fn label(&mut self, node: NodeId, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        if node.0 >= self.nodes.len() {
            return Err(WdfError::UnknownNode(node));
        }
        let taken = self
            .nodes
            .iter()
            .enumerate()
            .any(|(i, n)| i != node.0 && n.label.as_deref() == Some(label.as_str()));
        if taken {
            return Err(WdfError::DuplicateName { name: label });
        }
        self.nodes[node.0].label = Some(label);
        Ok(())
    }

    /// Finish the tree with the default configuration.
    pub fn build(self, root: RootSpec, subtrees: &[NodeId]) -> Result<WdfTree> {
        self.build_with_config(root, subtrees, TreeConfig::default())
    }

    /// Finish the tree. `subtrees` are the nodes attached to the root, in
    /// junction order.
    pub fn build_with_config(
        mut self,
        root: RootSpec,
        subtrees: &[NodeId],
        config: TreeConfig,
    ) -> Result<WdfTree> {
        config.validate()?;
        self.claim(subtrees)?;

        if let Some(orphan) = self.claimed.iter().position(|c| !c) {
            return Err(WdfError::DetachedNode(NodeId(orphan)));
        }

        let root = Root::new(root, subtrees.to_vec(), config.newton)?;
        WdfTree::assemble(self.nodes, root, config)
    }

    fn push_leaf(&mut self, leaf: Leaf) -> NodeId {
        self.push(Node::new(NodeKind::Leaf(leaf)))
    }

    fn push_adaptor(&mut self, adaptor: Adaptor) -> Result<NodeId> {
        self.claim(adaptor.children())?;
        Ok(self.push(Node::new(NodeKind::Adaptor(adaptor))))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.claimed.push(false);
        id
    }

    /// Give `children` a parent, all or nothing.
    fn claim(&mut self, children: &[NodeId]) -> Result<()> {
        for (k, child) in children.iter().enumerate() {
            match self.claimed.get(child.0) {
                None => return Err(WdfError::UnknownNode(*child)),
                Some(true) => return Err(WdfError::NodeReused(*child)),
                Some(false) if children[..k].contains(child) => {
                    return Err(WdfError::NodeReused(*child))
                }
                Some(false) => {}
            }
        }
        for child in children {
            self.claimed[child.0] = true;
        }
        Ok(())
    }
}
