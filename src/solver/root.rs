//! Tree roots: the one place where waves turn around.

use crate::elements::RootElement;
use crate::error::{Result, WdfError};
use crate::models::NlModel;
use crate::tree::{NodeId, Port};

use super::junction::Junction;
use super::matrix::{Mat, MatData};
use super::newton::{NewtonConfig, NewtonSolver};
use super::SolverStats;

/// How the root of a tree is built.
#[derive(Debug)]
pub enum RootSpec {
    /// One subtree terminated by an unadapted one-port.
    Simple(RootElement),
    /// Subtrees joined by a junction with no adapted port.
    Rtype(Junction),
    /// Subtrees and device ports joined by a junction.
    ///
    /// Junction ports are the subtrees in order, then each model's ports in
    /// order.
    Nonlinear {
        junction: Junction,
        models: Vec<Box<dyn NlModel>>,
    },
}

impl RootSpec {
    pub fn nonlinear(junction: Junction, models: Vec<Box<dyn NlModel>>) -> Self {
        Self::Nonlinear { junction, models }
    }
}

/// Root variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Simple,
    Rtype,
    Nonlinear,
}

/// Root of a built tree.
#[derive(Debug)]
pub enum Root {
    Simple {
        element: RootElement,
        subtree: NodeId,
    },
    Rtype(RtypeRoot),
    Nonlinear(NonlinearRoot),
}

impl Root {
    pub(crate) fn new(spec: RootSpec, subtrees: Vec<NodeId>, newton: NewtonConfig) -> Result<Self> {
        match spec {
            RootSpec::Simple(element) => {
                if subtrees.len() != 1 {
                    return Err(WdfError::ArityMismatch {
                        adaptor: "simple root",
                        expected: "exactly 1",
                        got: subtrees.len(),
                    });
                }
                Ok(Self::Simple {
                    element,
                    subtree: subtrees[0],
                })
            }
            RootSpec::Rtype(junction) => Ok(Self::Rtype(RtypeRoot::new(junction, subtrees)?)),
            RootSpec::Nonlinear { junction, models } => Ok(Self::Nonlinear(NonlinearRoot::new(
                junction, subtrees, models, newton,
            )?)),
        }
    }

    pub fn kind(&self) -> RootKind {
        match self {
            Self::Simple { .. } => RootKind::Simple,
            Self::Rtype(_) => RootKind::Rtype,
            Self::Nonlinear(_) => RootKind::Nonlinear,
        }
    }

    /// Subtree entry nodes in junction order.
    pub fn subtrees(&self) -> &[NodeId] {
        match self {
            Self::Simple { subtree, .. } => std::slice::from_ref(subtree),
            Self::Rtype(r) => &r.subtrees,
            Self::Nonlinear(r) => &r.subtrees,
        }
    }

    /// The root one-port, for simple roots.
    pub fn element(&self) -> Option<&RootElement> {
        match self {
            Self::Simple { element, .. } => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut RootElement> {
        match self {
            Self::Simple { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Newton diagnostics, for nonlinear roots.
    pub fn stats(&self) -> Option<&SolverStats> {
        match self {
            Self::Nonlinear(r) => Some(r.solver.stats()),
            _ => None,
        }
    }

    /// Recompute coefficients from the subtree port resistances.
    pub(crate) fn adapt(&mut self, ports: &[Port], t: f64) -> Result<()> {
        match self {
            Self::Simple { element, subtree } => {
                element.set_port_resistance(ports[subtree.0].rp, t);
                Ok(())
            }
            Self::Rtype(r) => r.adapt(ports),
            Self::Nonlinear(r) => r.adapt(ports),
        }
    }

    /// Turn the ascending waves into descending ones.
    #[inline]
    pub(crate) fn process(&mut self, ports: &mut [Port]) {
        match self {
            Self::Simple { element, subtree } => {
                let port = &mut ports[subtree.0];
                port.a = element.reflect(port.b);
            }
            Self::Rtype(r) => r.process(ports),
            Self::Nonlinear(r) => r.process(ports),
        }
    }

    pub(crate) fn reset(&mut self) {
        match self {
            Self::Simple { element, .. } => element.reset(),
            Self::Rtype(_) => {}
            Self::Nonlinear(r) => r.solver.reset(),
        }
    }
}

/// Linear multi-subtree root, `descending = S · ascending`.
#[derive(Debug)]
pub struct RtypeRoot {
    junction: Junction,
    subtrees: Vec<NodeId>,
    s: Mat,
    ascending: Vec<f64>,
    descending: Vec<f64>,
}

impl RtypeRoot {
    fn new(junction: Junction, subtrees: Vec<NodeId>) -> Result<Self> {
        if subtrees.is_empty() {
            return Err(WdfError::ArityMismatch {
                adaptor: "rtype root",
                expected: "at least 1",
                got: 0,
            });
        }
        if junction.num_ports() != subtrees.len() {
            return Err(WdfError::junction(format!(
                "rtype root with {} subtrees has a {}-port junction",
                subtrees.len(),
                junction.num_ports()
            )));
        }
        let n = subtrees.len();
        Ok(Self {
            junction,
            subtrees,
            s: Mat::zeros(n, n),
            ascending: vec![0.0; n],
            descending: vec![0.0; n],
        })
    }

    /// Current scattering matrix.
    pub fn scattering(&self) -> &Mat {
        &self.s
    }

    fn adapt(&mut self, ports: &[Port]) -> Result<()> {
        let rp: Vec<f64> = self.subtrees.iter().map(|s| ports[s.0].rp).collect();
        self.s = self.junction.scattering(&rp)?;
        Ok(())
    }

    #[inline]
    fn process(&mut self, ports: &mut [Port]) {
        for (w, s) in self.ascending.iter_mut().zip(&self.subtrees) {
            *w = ports[s.0].b;
        }
        self.s.mul_vec(&self.ascending, &mut self.descending);
        for (w, s) in self.descending.iter().zip(&self.subtrees) {
            ports[s.0].a = *w;
        }
    }
}

/// Root holding nonlinear devices, resolved by Newton iteration.
#[derive(Debug)]
pub struct NonlinearRoot {
    junction: Junction,
    subtrees: Vec<NodeId>,
    data: MatData,
    solver: NewtonSolver,
    ascending: Vec<f64>,
    descending: Vec<f64>,
}

impl NonlinearRoot {
    fn new(
        junction: Junction,
        subtrees: Vec<NodeId>,
        models: Vec<Box<dyn NlModel>>,
        config: NewtonConfig,
    ) -> Result<Self> {
        if subtrees.is_empty() {
            return Err(WdfError::ArityMismatch {
                adaptor: "nonlinear root",
                expected: "at least 1",
                got: 0,
            });
        }
        let solver = NewtonSolver::new(models, config)?;
        let expected = subtrees.len() + solver.size();
        if junction.num_ports() != expected {
            return Err(WdfError::junction(format!(
                "nonlinear root with {} subtrees and {} device ports needs {expected} junction ports, got {}",
                subtrees.len(),
                solver.size(),
                junction.num_ports()
            )));
        }
        let n = subtrees.len();
        Ok(Self {
            data: MatData::new(n, solver.size()),
            junction,
            subtrees,
            solver,
            ascending: vec![0.0; n],
            descending: vec![0.0; n],
        })
    }

    /// Current K-method matrices.
    pub fn matrices(&self) -> &MatData {
        &self.data
    }

    /// The Newton solver.
    pub fn solver(&self) -> &NewtonSolver {
        &self.solver
    }

    fn adapt(&mut self, ports: &[Port]) -> Result<()> {
        let rp: Vec<f64> = self.subtrees.iter().map(|s| ports[s.0].rp).collect();
        self.data = self.junction.kmethod(&rp)?;
        Ok(())
    }

    #[inline]
    fn process(&mut self, ports: &mut [Port]) {
        for (w, s) in self.ascending.iter_mut().zip(&self.subtrees) {
            *w = ports[s.0].b;
        }
        let currents = self.solver.solve(&self.data.e, &self.data.f, &self.ascending);

        // b = M·a + N·i
        self.data.m.mul_vec(&self.ascending, &mut self.descending);
        self.data.n.mul_vec_add(currents, &mut self.descending);
        for (w, s) in self.descending.iter().zip(&self.subtrees) {
            ports[s.0].a = *w;
        }
    }
}
