//! Junction topologies and the matrices derived from them.
//!
//! A junction is a small resistive network with numbered nodes (node 0 is the
//! datum) and an ordered list of ports, each a `(positive, negative)` terminal
//! pair. Optional internal resistors may connect any two nodes.
//!
//! Every derivation is a nodal analysis of the junction with its ports
//! terminated:
//!
//! - a wave port seen from the junction is a Thevenin source (the wave `w`
//!   the subtree sends up behind its port resistance `Rj`), stamped as a
//!   conductance `Gj` plus a current source `Gj·w` into the positive terminal;
//! - a device port is a current source `i` flowing from the positive to the
//!   negative terminal through the device.
//!
//! The junction sends back `2v − w` on every wave port, where `v` is the port
//! voltage.

use crate::error::{check_resistance, Result, WdfError};
use super::matrix::{Lu, Mat, MatData};

/// Resistive junction description.
#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    nodes: usize,
    ports: Vec<(usize, usize)>,
    resistors: Vec<(usize, usize, f64)>,
}

impl Junction {
    /// Create a junction from its ordered port terminal pairs.
    ///
    /// The node count is the highest referenced node plus one.
    pub fn new(ports: Vec<(usize, usize)>) -> Result<Self> {
        if ports.is_empty() {
            return Err(WdfError::junction("a junction needs at least one port"));
        }
        for (k, &(p, n)) in ports.iter().enumerate() {
            if p == n {
                return Err(WdfError::junction(format!(
                    "port {k} has both terminals on node {p}"
                )));
            }
        }
        let nodes = ports.iter().map(|&(p, n)| p.max(n)).max().unwrap_or(0) + 1;
        Ok(Self {
            nodes,
            ports,
            resistors: Vec::new(),
        })
    }

    /// Add an internal resistor between two nodes.
    pub fn with_resistor(mut self, p: usize, n: usize, r: f64) -> Result<Self> {
        if p == n {
            return Err(WdfError::junction(format!(
                "internal resistor has both terminals on node {p}"
            )));
        }
        check_resistance("junction resistor", r)?;
        self.nodes = self.nodes.max(p + 1).max(n + 1);
        self.resistors.push((p, n, r));
        Ok(self)
    }

    /// Loop of `ports` ports in series: `(0 1) (1 2) … (N-1 0)`.
    pub fn series(ports: usize) -> Result<Self> {
        check_preset_arity("series", ports)?;
        Self::new((0..ports).map(|k| (k, (k + 1) % ports)).collect())
    }

    /// `ports` ports sharing one node pair.
    pub fn parallel(ports: usize) -> Result<Self> {
        check_preset_arity("parallel", ports)?;
        Self::new(vec![(1, 0); ports])
    }

    /// Number of ports.
    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    /// Number of nodes including the datum.
    pub fn num_nodes(&self) -> usize {
        self.nodes
    }

    /// Port terminal pairs in declared order.
    pub fn ports(&self) -> &[(usize, usize)] {
        &self.ports
    }

    /// Internal resistors.
    pub fn resistors(&self) -> &[(usize, usize, f64)] {
        &self.resistors
    }

    /// Resistance seen into `port` when every other port is terminated by
    /// its entry in `rp`. The entry for `port` itself is ignored.
    pub fn thevenin_resistance(&self, port: usize, rp: &[f64]) -> Result<f64> {
        self.check_wave_ports(rp.len())?;
        let mut conductances: Vec<Option<f64>> = rp.iter().map(|r| Some(1.0 / r)).collect();
        conductances[port] = None;
        let system = NodalSystem::new(self, &conductances)?;

        let (p, n) = self.ports[port];
        let mut rhs = vec![0.0; system.size];
        stamp_current_source(&mut rhs, n, p, 1.0);
        let v = system.solve(&rhs);
        let r = port_voltage(&v, p, n);
        check_resistance("junction port", r)
    }

    /// Scattering matrix with every port terminated by its `rp`.
    ///
    /// Column `k` holds the waves sent back on every port when port `k`
    /// carries a unit incoming wave and all others carry zero.
    pub fn scattering(&self, rp: &[f64]) -> Result<Mat> {
        self.check_wave_ports(rp.len())?;
        if rp.len() != self.ports.len() {
            return Err(WdfError::junction(format!(
                "scattering needs {} port resistances, got {}",
                self.ports.len(),
                rp.len()
            )));
        }
        let conductances: Vec<Option<f64>> = rp.iter().map(|r| Some(1.0 / r)).collect();
        let system = NodalSystem::new(self, &conductances)?;

        let count = self.ports.len();
        let mut s = Mat::zeros(count, count);
        let mut rhs = vec![0.0; system.size];
        for k in 0..count {
            rhs.fill(0.0);
            let (p, n) = self.ports[k];
            stamp_current_source(&mut rhs, n, p, 1.0 / rp[k]);
            let v = system.solve(&rhs);
            for (j, &(pj, nj)) in self.ports.iter().enumerate() {
                let incoming = if j == k { 1.0 } else { 0.0 };
                s.set(j, k, 2.0 * port_voltage(&v, pj, nj) - incoming);
            }
        }
        Ok(s)
    }

    /// K-method matrices for a junction whose first `rp.len()` ports are wave
    /// ports and whose remaining ports are device ports.
    pub fn kmethod(&self, rp: &[f64]) -> Result<MatData> {
        self.check_wave_ports(rp.len())?;
        let waves = rp.len();
        let devices = self.ports.len() - waves;
        if devices == 0 {
            return Err(WdfError::junction("junction has no device ports"));
        }

        let mut conductances: Vec<Option<f64>> = rp.iter().map(|r| Some(1.0 / r)).collect();
        conductances.resize(self.ports.len(), None);
        let system = NodalSystem::new(self, &conductances)?;

        let mut data = MatData::new(waves, devices);
        let mut rhs = vec![0.0; system.size];

        // Unit incoming wave on a subtree port, devices carrying no current
        for k in 0..waves {
            rhs.fill(0.0);
            let (p, n) = self.ports[k];
            stamp_current_source(&mut rhs, n, p, 1.0 / rp[k]);
            let v = system.solve(&rhs);
            for j in 0..devices {
                let (pj, nj) = self.ports[waves + j];
                data.e.set(j, k, port_voltage(&v, pj, nj));
            }
            for j in 0..waves {
                let (pj, nj) = self.ports[j];
                let incoming = if j == k { 1.0 } else { 0.0 };
                data.m.set(j, k, 2.0 * port_voltage(&v, pj, nj) - incoming);
            }
        }

        // Unit device current, subtrees silent
        for k in 0..devices {
            rhs.fill(0.0);
            let (p, n) = self.ports[waves + k];
            stamp_current_source(&mut rhs, p, n, 1.0);
            let v = system.solve(&rhs);
            for j in 0..devices {
                let (pj, nj) = self.ports[waves + j];
                data.f.set(j, k, port_voltage(&v, pj, nj));
            }
            for j in 0..waves {
                let (pj, nj) = self.ports[j];
                data.n.set(j, k, 2.0 * port_voltage(&v, pj, nj));
            }
        }

        Ok(data)
    }

    fn check_wave_ports(&self, count: usize) -> Result<()> {
        if count == 0 || count > self.ports.len() {
            return Err(WdfError::junction(format!(
                "junction has {} ports, {count} port resistances given",
                self.ports.len()
            )));
        }
        Ok(())
    }
}

/// Factored nodal conductance matrix of a terminated junction.
struct NodalSystem {
    size: usize,
    lu: Lu,
}

impl NodalSystem {
    /// `conductances[k]` terminates port `k`; `None` leaves it open.
    fn new(junction: &Junction, conductances: &[Option<f64>]) -> Result<Self> {
        let size = junction.nodes - 1;
        let mut g = Mat::zeros(size, size);
        for &(p, n, r) in &junction.resistors {
            stamp_conductance(&mut g, p, n, 1.0 / r);
        }
        for (&(p, n), gk) in junction.ports.iter().zip(conductances) {
            if let Some(gk) = gk {
                stamp_conductance(&mut g, p, n, *gk);
            }
        }

        let mut lu = Lu::new(size);
        lu.factor(&g).map_err(|e| WdfError::SingularJunction {
            message: format!(
                "nodal matrix of {} nodes and {} ports has {e}",
                junction.nodes,
                junction.ports.len()
            ),
        })?;
        Ok(Self { size, lu })
    }

    /// Node voltages (datum excluded) for the given current injections.
    fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let mut v = vec![0.0; self.size];
        self.lu.solve(rhs, &mut v);
        v
    }
}

#[inline]
fn unknown(node: usize) -> Option<usize> {
    node.checked_sub(1)
}

#[inline]
fn node_voltage(v: &[f64], node: usize) -> f64 {
    unknown(node).map_or(0.0, |i| v[i])
}

#[inline]
fn port_voltage(v: &[f64], p: usize, n: usize) -> f64 {
    node_voltage(v, p) - node_voltage(v, n)
}

/// Stamp a conductance between two nodes.
fn stamp_conductance(g: &mut Mat, n1: usize, n2: usize, value: f64) {
    let (i, j) = (unknown(n1), unknown(n2));
    if let Some(i) = i {
        g.add(i, i, value);
    }
    if let Some(j) = j {
        g.add(j, j, value);
    }
    if let (Some(i), Some(j)) = (i, j) {
        g.add(i, j, -value);
        g.add(j, i, -value);
    }
}

/// Stamp a current source. Current flows from `n_pos` to `n_neg` through the
/// source branch, leaving `n_pos` and entering `n_neg`.
fn stamp_current_source(rhs: &mut [f64], n_pos: usize, n_neg: usize, current: f64) {
    if let Some(i) = unknown(n_pos) {
        rhs[i] -= current;
    }
    if let Some(j) = unknown(n_neg) {
        rhs[j] += current;
    }
}

fn check_preset_arity(kind: &str, ports: usize) -> Result<()> {
    if ports < 2 {
        return Err(WdfError::junction(format!(
            "{kind} junction needs at least 2 ports, got {ports}"
        )));
    }
    Ok(())
}
