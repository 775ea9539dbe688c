//! Adaptors joining child ports into one adapted parent port.
//!
//! Children are referenced by handle and their waves live in the tree's port
//! array. The parent port is the adaptor's own entry in that array.

use crate::error::{check_resistance, Result, WdfError};
use crate::solver::{Junction, Mat};
use crate::tree::{NodeId, Port};

/// Adaptor variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Adaptor {
    /// Children in series.
    Series { children: Vec<NodeId> },
    /// Children in parallel.
    Parallel { children: Vec<NodeId> },
    /// Polarity inverter around a single child.
    Inverter { child: NodeId },
    /// Arbitrary topology described by a junction.
    Rtype(RtypeAdaptor),
}

impl Adaptor {
    pub fn series(children: Vec<NodeId>) -> Result<Self> {
        check_arity("series", "at least 2", children.len(), 2)?;
        Ok(Self::Series { children })
    }

    pub fn parallel(children: Vec<NodeId>) -> Result<Self> {
        check_arity("parallel", "at least 2", children.len(), 2)?;
        Ok(Self::Parallel { children })
    }

    pub fn inverter(child: NodeId) -> Self {
        Self::Inverter { child }
    }

    /// Short type name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Series { .. } => "series",
            Self::Parallel { .. } => "parallel",
            Self::Inverter { .. } => "inverter",
            Self::Rtype(_) => "rtype",
        }
    }

    /// Child handles in declared order.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Series { children } | Self::Parallel { children } => children,
            Self::Inverter { child } => std::slice::from_ref(child),
            Self::Rtype(r) => &r.children,
        }
    }

    /// Compute the parent port resistance from the children's.
    pub fn adapt(&mut self, ports: &[Port]) -> Result<f64> {
        let rp = match self {
            Self::Series { children } => children.iter().map(|c| ports[c.0].rp).sum(),
            Self::Parallel { children } => {
                1.0 / children.iter().map(|c| ports[c.0].gp()).sum::<f64>()
            }
            Self::Inverter { child } => ports[child.0].rp,
            Self::Rtype(r) => r.adapt(ports)?,
        };
        check_resistance(self.name(), rp)
    }

    /// Wave sent up to the parent.
    #[inline]
    pub fn reflect(&self, own: &Port, ports: &[Port]) -> f64 {
        match self {
            Self::Series { children } => -children.iter().map(|c| ports[c.0].b).sum::<f64>(),
            Self::Parallel { children } => {
                let gp = own.gp();
                children
                    .iter()
                    .map(|c| {
                        let port = &ports[c.0];
                        port.gp() / gp * port.b
                    })
                    .sum()
            }
            Self::Inverter { child } => -ports[child.0].b,
            Self::Rtype(r) => r.reflect(ports),
        }
    }

    /// Distribute the parent's incident wave to the children.
    #[inline]
    pub fn scatter(&self, own: &Port, ports: &mut [Port]) {
        match self {
            Self::Series { children } => {
                let sum = children.iter().map(|c| ports[c.0].b).sum::<f64>() + own.a;
                for c in children {
                    let port = &mut ports[c.0];
                    port.a = port.b - port.rp / own.rp * sum;
                }
            }
            Self::Parallel { children } => {
                for c in children {
                    let port = &mut ports[c.0];
                    port.a = own.b + own.a - port.b;
                }
            }
            Self::Inverter { child } => ports[child.0].a = -own.a,
            Self::Rtype(r) => r.scatter(own.a, ports),
        }
    }
}

/// Adaptor whose scattering matrix is derived from a junction.
///
/// Junction port 0 is the adapted parent port; port `k` is child `k - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RtypeAdaptor {
    junction: Junction,
    children: Vec<NodeId>,
    s: Mat,
}

impl RtypeAdaptor {
    pub fn new(junction: Junction, children: Vec<NodeId>) -> Result<Self> {
        check_arity("rtype", "at least 1", children.len(), 1)?;
        if junction.num_ports() != children.len() + 1 {
            return Err(WdfError::junction(format!(
                "rtype adaptor with {} children needs a {}-port junction, got {} ports",
                children.len(),
                children.len() + 1,
                junction.num_ports()
            )));
        }
        let size = junction.num_ports();
        Ok(Self {
            junction,
            children,
            s: Mat::zeros(size, size),
        })
    }

    /// Junction this adaptor was built from.
    pub fn junction(&self) -> &Junction {
        &self.junction
    }

    /// Current scattering matrix, parent port first.
    pub fn scattering(&self) -> &Mat {
        &self.s
    }

    fn adapt(&mut self, ports: &[Port]) -> Result<f64> {
        let mut rp = Vec::with_capacity(self.children.len() + 1);
        rp.push(0.0);
        rp.extend(self.children.iter().map(|c| ports[c.0].rp));
        rp[0] = self.junction.thevenin_resistance(0, &rp)?;
        self.s = self.junction.scattering(&rp)?;
        // Adapted port
        self.s.set(0, 0, 0.0);
        Ok(rp[0])
    }

    #[inline]
    fn reflect(&self, ports: &[Port]) -> f64 {
        let row = self.s.row(0);
        self.children
            .iter()
            .zip(&row[1..])
            .map(|(c, s)| s * ports[c.0].b)
            .sum()
    }

    #[inline]
    fn scatter(&self, a: f64, ports: &mut [Port]) {
        for (k, child) in self.children.iter().enumerate() {
            let row = self.s.row(k + 1);
            let mut wave = row[0] * a;
            for (c, s) in self.children.iter().zip(&row[1..]) {
                wave += s * ports[c.0].b;
            }
            ports[child.0].a = wave;
        }
    }
}

fn check_arity(adaptor: &'static str, expected: &'static str, got: usize, min: usize) -> Result<()> {
    if got < min {
        return Err(WdfError::ArityMismatch {
            adaptor,
            expected,
            got,
        });
    }
    Ok(())
}
