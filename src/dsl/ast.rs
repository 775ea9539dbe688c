//! Syntax tree for parsed tree descriptions.

use crate::tree::Quantity;

/// Complete parsed description, names still unresolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeAst {
    /// Leaves and adaptors in declaration order
    pub elements: Vec<ElementDef>,
    pub junctions: Vec<JunctionDef>,
    pub root: Option<RootDef>,
    pub input: Option<InputDef>,
    pub output: Option<OutputDef>,
    /// `.samplerate`
    pub sample_rate: Option<f64>,
    /// `.newton`
    pub newton: NewtonDef,
}

impl TreeAst {
    /// Create a new empty description.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, name: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn junction(&self, name: &str) -> Option<&JunctionDef> {
        self.junctions.iter().find(|j| j.name == name)
    }
}

/// A leaf or adaptor line.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDef {
    pub name: String,
    pub kind: ElementKind,
    /// Source line number for error reporting
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Resistor { r: f64 },
    Capacitor { c: f64 },
    Inductor { l: f64 },
    ResistiveSource { r: f64, vs: f64 },
    Series(Vec<String>),
    Parallel(Vec<String>),
    Inverter(String),
    Rtype { junction: String, children: Vec<String> },
}

impl ElementKind {
    /// Element names this element takes as children.
    pub fn children(&self) -> Vec<&str> {
        match self {
            Self::Series(c) | Self::Parallel(c) | Self::Rtype { children: c, .. } => {
                c.iter().map(String::as_str).collect()
            }
            Self::Inverter(c) => vec![c.as_str()],
            _ => Vec::new(),
        }
    }
}

/// A `.junction` line.
#[derive(Debug, Clone, PartialEq)]
pub struct JunctionDef {
    pub name: String,
    /// Port node pairs `(positive, negative)`
    pub ports: Vec<(usize, usize)>,
    /// Internal resistors `(positive, negative, ohms)`
    pub resistors: Vec<(usize, usize, f64)>,
    pub line: usize,
}

/// A `.root` line.
#[derive(Debug, Clone, PartialEq)]
pub struct RootDef {
    pub kind: RootDefKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RootDefKind {
    Simple {
        subtree: String,
        element: RootElementDef,
    },
    Rtype {
        junction: String,
        subtrees: Vec<String>,
    },
    Nonlinear {
        junction: String,
        subtrees: Vec<String>,
        models: Vec<ModelDef>,
    },
}

/// Unadapted one-port closing a simple root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootElementDef {
    VoltageSource(f64),
    CurrentSource(f64),
    Resistor(f64),
    Capacitor(f64),
    Inductor(f64),
    Switch(bool),
}

/// Nonlinear model reference with parameter overrides, e.g.
/// `diode(is=2.52n vt=25.85m)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    pub name: String,
    pub params: Vec<(String, f64)>,
    pub line: usize,
}

/// A `.input` line.
#[derive(Debug, Clone, PartialEq)]
pub enum InputDef {
    /// Resistive source leaf by name
    Source { name: String, line: usize },
    /// The root source
    Root { line: usize },
}

/// A `.output` line.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDef {
    pub quantity: Quantity,
    pub node: String,
    pub scale: f64,
    pub line: usize,
}

/// `.newton` settings; unset fields keep their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NewtonDef {
    pub tolerance: Option<f64>,
    pub max_iterations: Option<usize>,
    pub damping: Option<f64>,
}
