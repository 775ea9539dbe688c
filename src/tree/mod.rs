//! The scattering tree and its per-sample loop.
//!
//! A [`WdfTree`] is built once with a [`TreeBuilder`] and then driven one
//! sample at a time:
//!
//! 1. the input sample is written to the bound source,
//! 2. every node computes its reflected wave, children before parents,
//! 3. the root turns the ascending waves into descending ones,
//! 4. every node accepts its incident wave, parents before children,
//! 5. the output probe reads its port.
//!
//! Nodes live in a flat arena and their ports in a parallel array, so both
//! passes are plain index loops.

mod builder;
mod loader;
mod params;
mod probe;
mod types;

pub use builder::TreeBuilder;
pub use params::{ParamData, ParamKind, ParamTarget, MIN_POT_RESISTANCE};
pub use probe::{InputBinding, OutputProbe, Quantity};
pub use types::{NodeId, Port};

use tracing::debug;

use crate::elements::{Leaf, Node, NodeKind, RootElement};
use crate::error::{check_resistance, Result, WdfError};
use crate::solver::{NewtonConfig, Root, RootKind, SolverStats};
use crate::DEFAULT_SAMPLE_RATE;

/// Configuration for a tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Newton-Raphson controls for nonlinear roots.
    pub newton: NewtonConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            newton: NewtonConfig::default(),
        }
    }
}

impl TreeConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sample rate (Hz).
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the Newton-Raphson controls.
    pub fn with_newton(mut self, newton: NewtonConfig) -> Self {
        self.newton = newton;
        self
    }

    /// Set the convergence tolerance (in volts).
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.newton.tolerance = tolerance;
        self
    }

    /// Set the maximum Newton-Raphson iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.newton.max_iterations = max_iterations;
        self
    }

    /// Set the Newton step damping.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.newton.damping = damping;
        self
    }

    /// Reject unusable settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(WdfError::config(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        self.newton.validate()
    }
}

/// A built Wave Digital Filter tree.
#[derive(Debug)]
pub struct WdfTree {
    config: TreeConfig,
    sample_period: f64,
    nodes: Vec<Node>,
    ports: Vec<Port>,
    root: Root,
    input: Option<InputBinding>,
    output: Option<OutputProbe>,
    params: Vec<ParamData>,
}

impl WdfTree {
    /// Assemble and adapt a tree. Called by [`TreeBuilder::build`].
    fn assemble(nodes: Vec<Node>, root: Root, config: TreeConfig) -> Result<Self> {
        let ports = vec![Port::default(); nodes.len()];
        let mut tree = Self {
            sample_period: 1.0 / config.sample_rate,
            config,
            nodes,
            ports,
            root,
            input: None,
            output: None,
            params: Vec::new(),
        };
        tree.adapt()?;
        debug!(
            nodes = tree.nodes.len(),
            root = ?tree.root.kind(),
            subtrees = tree.root.subtrees().len(),
            sample_rate = tree.config.sample_rate,
            "built tree"
        );
        Ok(tree)
    }

    /// Recompute every port resistance and every root coefficient.
    pub fn adapt(&mut self) -> Result<()> {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.adapt(index, &mut self.ports, self.sample_period)?;
        }
        self.root.adapt(&self.ports, self.sample_period)?;
        debug!(
            root_ports = ?self
                .root
                .subtrees()
                .iter()
                .map(|s| self.ports[s.0].rp)
                .collect::<Vec<_>>(),
            "adapted tree"
        );
        Ok(())
    }

    /// Run one full scattering cycle with the current source values.
    #[inline]
    pub fn cycle_wave(&mut self) {
        for (index, node) in self.nodes.iter().enumerate() {
            node.reflect(index, &mut self.ports);
        }
        self.root.process(&mut self.ports);
        for (index, node) in self.nodes.iter_mut().enumerate().rev() {
            node.accept_incident(index, &mut self.ports);
        }
    }

    /// Process one sample: write the input, cycle, read the output.
    ///
    /// Returns 0.0 when no output probe is set.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.apply_input(input);
        self.cycle_wave();
        self.output.map_or(0.0, |probe| probe.read(&self.ports))
    }

    /// Process a buffer of samples.
    ///
    /// Processes `min(input.len(), output.len())` samples.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        for (inp, out) in input.iter().zip(output.iter_mut()) {
            *out = self.process(*inp as f64) as f32;
        }
    }

    /// Clear reactive state, root memory, warm start and solver counters.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
        for port in &mut self.ports {
            port.a = 0.0;
            port.b = 0.0;
        }
        self.root.reset();
    }

    /// Bind the input sample to a source.
    pub fn set_input(&mut self, binding: InputBinding) -> Result<()> {
        let ok = match binding {
            InputBinding::SourceVoltage(node) => matches!(
                self.node(node).map(|n| &n.kind),
                Some(NodeKind::Leaf(Leaf::ResistiveVoltageSource { .. }))
            ),
            InputBinding::RootVoltage => matches!(
                self.root.element(),
                Some(RootElement::IdealVoltageSource { .. })
            ),
            InputBinding::RootCurrent => matches!(
                self.root.element(),
                Some(RootElement::IdealCurrentSource { .. })
            ),
        };
        if !ok {
            return Err(WdfError::InvalidInput {
                message: format!("{binding:?} does not name a source of this tree"),
            });
        }
        self.input = Some(binding);
        Ok(())
    }

    /// Current input binding.
    pub fn input(&self) -> Option<InputBinding> {
        self.input
    }

    /// Set the port read after every sample.
    pub fn set_output(&mut self, probe: OutputProbe) -> Result<()> {
        self.check_node(probe.node)?;
        self.output = Some(probe);
        Ok(())
    }

    /// Current output probe.
    pub fn output(&self) -> Option<OutputProbe> {
        self.output
    }

    /// Set the voltage of a resistive source leaf.
    pub fn set_source_voltage(&mut self, node: NodeId, voltage: f64) -> Result<()> {
        self.check_node(node)?;
        match &mut self.nodes[node.0].kind {
            NodeKind::Leaf(Leaf::ResistiveVoltageSource { vs, .. }) => {
                *vs = voltage;
                Ok(())
            }
            _ => Err(WdfError::invalid_element(
                node.to_string(),
                "not a resistive voltage source",
            )),
        }
    }

    /// Change the resistance of a resistor or resistive source leaf.
    ///
    /// The tree is not re-adapted; call [`adapt`](Self::adapt) afterwards.
    pub fn set_leaf_resistance(&mut self, node: NodeId, resistance: f64) -> Result<()> {
        self.check_node(node)?;
        let label = self.node_name(node);
        let value = check_resistance(&label, resistance)?;
        match &mut self.nodes[node.0].kind {
            NodeKind::Leaf(Leaf::Resistor { r }) | NodeKind::Leaf(Leaf::ResistiveVoltageSource { r, .. }) => {
                *r = value;
                Ok(())
            }
            _ => Err(WdfError::invalid_element(label, "not a resistive leaf")),
        }
    }

    /// Configuration the tree was built with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    /// Number of nodes in the arena.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// A node by handle.
    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.0)
    }

    /// Port of a node.
    pub fn port(&self, node: NodeId) -> Option<&Port> {
        self.ports.get(node.0)
    }

    /// Label given to a node at build time.
    pub fn node_label(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).and_then(|n| n.label.as_deref())
    }

    /// Find a node by label.
    pub fn find_node(&self, label: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.label.as_deref() == Some(label))
            .map(NodeId)
    }

    /// Handles of all nodes, bottom-up.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// The root.
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Root variant.
    pub fn root_kind(&self) -> RootKind {
        self.root.kind()
    }

    /// Newton diagnostics. `None` unless the root is nonlinear.
    pub fn stats(&self) -> Option<SolverStats> {
        self.root.stats().copied()
    }

    fn apply_input(&mut self, input: f64) {
        match self.input {
            Some(InputBinding::SourceVoltage(node)) => {
                if let NodeKind::Leaf(Leaf::ResistiveVoltageSource { vs, .. }) =
                    &mut self.nodes[node.0].kind
                {
                    *vs = input;
                }
            }
            Some(InputBinding::RootVoltage) => {
                if let Some(RootElement::IdealVoltageSource { vs }) = self.root.element_mut() {
                    *vs = input;
                }
            }
            Some(InputBinding::RootCurrent) => {
                if let Some(RootElement::IdealCurrentSource { is, .. }) = self.root.element_mut() {
                    *is = input;
                }
            }
            None => {}
        }
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(WdfError::UnknownNode(node))
        }
    }

    fn node_name(&self, node: NodeId) -> String {
        self.node_label(node)
            .map_or_else(|| node.to_string(), str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Diode, NlModel, NpnEbersMoll};
    use crate::solver::{Junction, RootSpec};
    use approx::assert_abs_diff_eq;

    const FS: f64 = 48000.0;

    /// Ideal voltage source driving R1 in series with C1, output on C1.
    fn rc_tree(r: f64, c: f64) -> (WdfTree, NodeId, NodeId) {
        let mut b = TreeBuilder::new();
        let r1 = b.resistor(r).unwrap();
        let c1 = b.capacitor(c).unwrap();
        let s = b.series(&[r1, c1]).unwrap();
        let inv = b.inverter(s).unwrap();
        let mut tree = b
            .build(RootSpec::Simple(RootElement::voltage_source(0.0)), &[inv])
            .unwrap();
        tree.set_input(InputBinding::RootVoltage).unwrap();
        tree.set_output(OutputProbe::voltage(c1)).unwrap();
        (tree, r1, c1)
    }

    /// Resistive source into a single-diode root, output across the diode.
    fn clipper(model: Box<dyn NlModel>, config: TreeConfig) -> (WdfTree, NodeId) {
        let mut b = TreeBuilder::new();
        let vin = b.resistive_voltage_source(0.0, 1e3).unwrap();
        let mut tree = b
            .build_with_config(
                RootSpec::nonlinear(Junction::parallel(2).unwrap(), vec![model]),
                &[vin],
                config,
            )
            .unwrap();
        tree.set_input(InputBinding::SourceVoltage(vin)).unwrap();
        tree.set_output(OutputProbe::voltage(vin)).unwrap();
        (tree, vin)
    }

    fn bisect_diode(d: &Diode, vs: f64, r: f64) -> f64 {
        let (mut lo, mut hi) = (vs.min(0.0) - 1.0, vs.max(0.0) + 1.0);
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if vs - r * d.operating_point(mid).current - mid > 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    #[test]
    fn test_rc_step_response() {
        let (mut tree, _, _) = rc_tree(1e3, 1e-6);
        let rc = 1e-3;
        for n in 0..480 {
            let v = tree.process(1.0);
            // Trapezoidal samples sit half a period late
            let t = (n as f64 + 0.5) / FS;
            assert_abs_diff_eq!(v, 1.0 - (-t / rc).exp(), epsilon = 1e-3);
        }
    }

    #[test]
    fn test_energy_balance() {
        let mut b = TreeBuilder::new();
        let r1 = b.resistor(470.0).unwrap();
        let c1 = b.capacitor(100e-9).unwrap();
        let r2 = b.resistor(1e3).unwrap();
        let l1 = b.inductor(50e-3).unwrap();
        let r3 = b.resistor(2.2e3).unwrap();
        let s1 = b.series(&[r1, c1]).unwrap();
        let s2 = b.series(&[r2, l1]).unwrap();
        let p = b.parallel(&[s1, s2, r3]).unwrap();
        let inv = b.inverter(p).unwrap();
        let mut tree = b
            .build(RootSpec::Simple(RootElement::voltage_source(0.0)), &[inv])
            .unwrap();
        tree.set_input(InputBinding::RootVoltage).unwrap();

        let leaves = [r1, c1, r2, l1, r3];
        for n in 0..500 {
            let input = (2.0 * std::f64::consts::PI * 440.0 * n as f64 / FS).sin();
            tree.process(input);
            let delivered = tree.port(inv).unwrap().power();
            let absorbed: f64 = leaves.iter().map(|l| tree.port(*l).unwrap().power()).sum();
            assert_abs_diff_eq!(delivered, absorbed, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_series_parallel_port_resistance() {
        let mut b = TreeBuilder::new();
        let r1 = b.resistor(100.0).unwrap();
        let r2 = b.resistor(300.0).unwrap();
        let r3 = b.resistor(100.0).unwrap();
        let r4 = b.resistor(300.0).unwrap();
        let s = b.series(&[r1, r2]).unwrap();
        let p = b.parallel(&[r3, r4]).unwrap();
        let top = b.series(&[s, p]).unwrap();
        let tree = b
            .build(RootSpec::Simple(RootElement::resistor(1e3).unwrap()), &[top])
            .unwrap();

        assert_abs_diff_eq!(tree.port(s).unwrap().rp, 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tree.port(p).unwrap().rp, 75.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tree.port(top).unwrap().rp, 475.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quiescent_tree_stays_silent() {
        let mut b = TreeBuilder::new();
        let vin = b.resistive_voltage_source(0.0, 1e3).unwrap();
        let c1 = b.capacitor(10e-9).unwrap();
        let p = b.parallel(&[vin, c1]).unwrap();
        let mut tree = b
            .build(
                RootSpec::nonlinear(Junction::parallel(2).unwrap(), vec![Box::new(Diode::default())]),
                &[p],
            )
            .unwrap();
        tree.set_input(InputBinding::SourceVoltage(vin)).unwrap();
        tree.set_output(OutputProbe::voltage(c1)).unwrap();

        for _ in 0..100 {
            assert_eq!(tree.process(0.0), 0.0);
        }
        assert_eq!(tree.stats().unwrap().failures, 0);
    }

    #[test]
    fn test_diode_clipper_matches_shockley() {
        let d = Diode::default();
        let (mut tree, _) = clipper(Box::new(d), TreeConfig::default());
        for k in 0..=20 {
            let vs = -1.0 + 0.1 * k as f64;
            let v = tree.process(vs);
            assert_abs_diff_eq!(v, bisect_diode(&d, vs, 1e3), epsilon = 1e-5);
        }
        assert_eq!(tree.stats().unwrap().failures, 0);
    }

    #[test]
    fn test_diode_current_follows_shockley_on_slow_sweep() {
        let d = Diode::default();
        let (mut tree, vin) = clipper(Box::new(d), TreeConfig::default());
        let steps = 4800;
        for k in 0..=steps {
            tree.process(-1.0 + 2.0 * k as f64 / steps as f64);
            let port = tree.port(vin).unwrap();
            let shockley = d.is * ((port.voltage() / d.vt).exp() - 1.0);
            assert_abs_diff_eq!(-port.current(), shockley, epsilon = 5e-8);
        }
        let stats = tree.stats().unwrap();
        assert_eq!(stats.failures, 0);
        assert!(stats.max_iterations_seen <= 10, "{}", stats.max_iterations_seen);
    }

    #[test]
    fn test_warm_start_never_costs_iterations() {
        let (mut tree, _) = clipper(Box::new(Diode::default()), TreeConfig::default());
        tree.process(1.0);
        let cold = tree.stats().unwrap().last_iterations;
        tree.process(1.0 + 1e-4);
        let nearby = tree.stats().unwrap().last_iterations;
        tree.process(1.0 + 1e-4);
        let repeat = tree.stats().unwrap().last_iterations;
        assert!(repeat <= nearby && nearby <= cold, "{repeat} {nearby} {cold}");

        // A barely different sample costs no more than the repeated one
        tree.process(1.0 + 1e-4 + 1e-9);
        let close = tree.stats().unwrap().last_iterations;
        assert!(close <= repeat, "{close} > {repeat}");
    }

    #[test]
    fn test_non_convergence_is_reported_and_recovers() {
        // Tiny thermal voltage with a huge saturation current diverges
        // within the default iteration budget
        let steep = Diode::new(1e-3, 1e-5, 1.0).unwrap();
        let (mut tree, _) = clipper(Box::new(steep), TreeConfig::default());

        let out = tree.process(5.0);
        assert!(out.is_finite());
        let stats = tree.stats().unwrap();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.consecutive_failures, 1);
        assert_eq!(stats.last_iterations, tree.config().newton.max_iterations);

        assert_abs_diff_eq!(tree.process(0.0), 0.0, epsilon = 1e-9);
        let stats = tree.stats().unwrap();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.consecutive_failures, 0);
    }

    #[test]
    fn test_rtype_series_matches_series_adaptor() {
        let build = |use_rtype: bool| {
            let mut b = TreeBuilder::new();
            let r1 = b.resistor(100.0).unwrap();
            let c1 = b.capacitor(1e-6).unwrap();
            let r2 = b.resistor(220.0).unwrap();
            let s = if use_rtype {
                b.rtype(Junction::series(4).unwrap(), &[r1, c1, r2]).unwrap()
            } else {
                b.series(&[r1, c1, r2]).unwrap()
            };
            let inv = b.inverter(s).unwrap();
            let mut tree = b
                .build(RootSpec::Simple(RootElement::voltage_source(0.0)), &[inv])
                .unwrap();
            tree.set_input(InputBinding::RootVoltage).unwrap();
            tree.set_output(OutputProbe::voltage(c1)).unwrap();
            (tree, s)
        };
        let (mut plain, s_plain) = build(false);
        let (mut rtype, s_rtype) = build(true);
        assert_abs_diff_eq!(
            plain.port(s_plain).unwrap().rp,
            rtype.port(s_rtype).unwrap().rp,
            epsilon = 1e-9
        );

        for n in 0..300 {
            let input = (2.0 * std::f64::consts::PI * 1000.0 * n as f64 / FS).sin();
            assert_abs_diff_eq!(plain.process(input), rtype.process(input), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rtype_parallel_matches_parallel_adaptor() {
        let build = |use_rtype: bool| {
            let mut b = TreeBuilder::new();
            let vin = b.resistive_voltage_source(0.0, 1e3).unwrap();
            let c1 = b.capacitor(47e-9).unwrap();
            let p = if use_rtype {
                b.rtype(Junction::parallel(3).unwrap(), &[vin, c1]).unwrap()
            } else {
                b.parallel(&[vin, c1]).unwrap()
            };
            let mut tree = b
                .build(RootSpec::Simple(RootElement::resistor(10e3).unwrap()), &[p])
                .unwrap();
            tree.set_input(InputBinding::SourceVoltage(vin)).unwrap();
            tree.set_output(OutputProbe::voltage(c1)).unwrap();
            tree
        };
        let mut plain = build(false);
        let mut rtype = build(true);
        for n in 0..300 {
            let input = if n < 150 { 1.0 } else { -0.5 };
            assert_abs_diff_eq!(plain.process(input), rtype.process(input), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rtype_root_matches_open_root() {
        // Source and capacitor in parallel, once through an R-type root and
        // once through a parallel adaptor under an open switch
        let mut b = TreeBuilder::new();
        let vin = b.resistive_voltage_source(0.0, 1e3).unwrap();
        let c1 = b.capacitor(1e-6).unwrap();
        let mut joined = b.build(RootSpec::Rtype(Junction::parallel(2).unwrap()), &[vin, c1]).unwrap();
        joined.set_input(InputBinding::SourceVoltage(vin)).unwrap();
        joined.set_output(OutputProbe::voltage(c1)).unwrap();

        let mut b = TreeBuilder::new();
        let vin2 = b.resistive_voltage_source(0.0, 1e3).unwrap();
        let c2 = b.capacitor(1e-6).unwrap();
        let p = b.parallel(&[vin2, c2]).unwrap();
        let mut open = b
            .build(RootSpec::Simple(RootElement::switch(false)), &[p])
            .unwrap();
        open.set_input(InputBinding::SourceVoltage(vin2)).unwrap();
        open.set_output(OutputProbe::voltage(c2)).unwrap();

        assert_eq!(joined.root_kind(), RootKind::Rtype);
        for _ in 0..200 {
            assert_abs_diff_eq!(joined.process(1.0), open.process(1.0), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_current_source_root() {
        let mut b = TreeBuilder::new();
        let r1 = b.resistor(1e3).unwrap();
        let mut tree = b
            .build(RootSpec::Simple(RootElement::current_source(0.0)), &[r1])
            .unwrap();
        tree.set_input(InputBinding::RootCurrent).unwrap();
        tree.set_output(OutputProbe::voltage(r1)).unwrap();
        assert_abs_diff_eq!(tree.process(1e-3), 1.0, epsilon = 1e-12);

        tree.set_output(OutputProbe::current(r1).with_scale(1e3)).unwrap();
        assert_abs_diff_eq!(tree.process(2e-3), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_npn_stage() {
        // Base driven through 100k, collector through 1k from 9V, emitter grounded
        let mut b = TreeBuilder::new();
        let base = b.resistive_voltage_source(0.0, 100e3).unwrap();
        let collector = b.resistive_voltage_source(9.0, 1e3).unwrap();
        let junction = Junction::new(vec![(1, 0), (2, 0), (1, 2), (1, 0)]).unwrap();
        let mut tree = b
            .build(
                RootSpec::nonlinear(junction, vec![Box::new(NpnEbersMoll::default())]),
                &[base, collector],
            )
            .unwrap();
        tree.set_input(InputBinding::SourceVoltage(base)).unwrap();
        tree.set_output(OutputProbe::voltage(collector)).unwrap();

        let off = tree.process(0.0);
        assert!(off > 8.99, "collector at {off}");

        let mut on = 0.0;
        for _ in 0..5 {
            on = tree.process(0.8);
        }
        assert!(on > 1.0 && on < 8.5, "collector at {on}");
        assert_eq!(tree.stats().unwrap().samples, 6);
    }

    #[test]
    fn test_resistance_param_readapts() {
        let (mut tree, r1, c1) = rc_tree(1e3, 1e-6);
        let id = tree
            .add_param("R1", ParamTarget::Resistance(r1), "ohm", 10.0, 100e3, 1e3)
            .unwrap();
        let series = NodeId(2);
        let rc = 1.0 / FS / 2e-6;

        tree.set_param(id, 2e3).unwrap();
        assert_abs_diff_eq!(tree.port(r1).unwrap().rp, 2e3);
        assert_abs_diff_eq!(tree.port(series).unwrap().rp, 2e3 + rc, epsilon = 1e-9);
        assert_abs_diff_eq!(tree.port(c1).unwrap().rp, rc, epsilon = 1e-12);

        tree.set_param(id, 1e9).unwrap();
        assert_eq!(tree.params()[id].value, 100e3);
        assert_abs_diff_eq!(tree.port(r1).unwrap().rp, 100e3);

        assert!(matches!(tree.set_param(7, 1.0), Err(WdfError::UnknownParam(7))));
        assert!(tree
            .add_param("C1", ParamTarget::Resistance(c1), "ohm", 1.0, 2.0, 1.0)
            .is_err());
        assert_eq!(tree.params().len(), 1);
    }

    #[test]
    fn test_potentiometer_and_switch_params() {
        let mut b = TreeBuilder::new();
        let upper = b.resistor(5e3).unwrap();
        let lower = b.resistor(5e3).unwrap();
        let s = b.series(&[upper, lower]).unwrap();
        let mut tree = b
            .build(RootSpec::Simple(RootElement::switch(false)), &[s])
            .unwrap();

        let pot = tree
            .add_param(
                "gain",
                ParamTarget::Potentiometer {
                    upper,
                    lower,
                    total: 10e3,
                },
                "",
                0.0,
                1.0,
                0.25,
            )
            .unwrap();
        assert_abs_diff_eq!(tree.port(upper).unwrap().rp, 7.5e3, epsilon = 1e-9);
        assert_abs_diff_eq!(tree.port(lower).unwrap().rp, 2.5e3, epsilon = 1e-9);

        tree.set_param(pot, 0.0).unwrap();
        assert_abs_diff_eq!(tree.port(lower).unwrap().rp, MIN_POT_RESISTANCE);

        let sw = tree.add_param("bypass", ParamTarget::Switch, "", 0.0, 1.0, 0.0).unwrap();
        assert_eq!(tree.params()[sw].kind, ParamKind::Bool);
        tree.set_param(sw, 0.9).unwrap();
        assert_eq!(tree.root().element(), Some(&RootElement::switch(true)));
    }

    #[test]
    fn test_reset_clears_state() {
        let (mut tree, _, _) = rc_tree(1e3, 1e-6);
        for _ in 0..100 {
            tree.process(1.0);
        }
        tree.reset();
        assert_eq!(tree.process(0.0), 0.0);
    }

    #[test]
    fn test_input_binding_checked() {
        let (mut tree, r1, _) = rc_tree(1e3, 1e-6);
        assert!(matches!(
            tree.set_input(InputBinding::RootCurrent),
            Err(WdfError::InvalidInput { .. })
        ));
        assert!(tree.set_input(InputBinding::SourceVoltage(r1)).is_err());
        assert!(tree.set_output(OutputProbe::voltage(NodeId(99))).is_err());
    }

    #[test]
    fn test_process_block() {
        let (mut tree, _, _) = rc_tree(1e3, 1e-6);
        let input = [1.0f32; 64];
        let mut output = [0.0f32; 64];
        tree.process_block(&input, &mut output);
        assert!(output.windows(2).all(|w| w[1] > w[0]));
    }
}
