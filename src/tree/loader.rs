//! Building trees from parsed descriptions.

use std::collections::HashMap;

use tracing::debug;

use crate::dsl::{self, ElementKind, InputDef, JunctionDef, RootDefKind, RootElementDef, TreeAst};
use crate::elements::RootElement;
use crate::error::{Result, WdfError};
use crate::models::NlKind;
use crate::solver::{Junction, RootSpec};

use super::builder::TreeBuilder;
use super::probe::{InputBinding, OutputProbe};
use super::types::NodeId;
use super::{TreeConfig, WdfTree};

impl TreeAst {
    /// `base` with the description's `.samplerate` and `.newton` applied.
    pub fn config(&self, base: TreeConfig) -> TreeConfig {
        let mut config = base;
        if let Some(sample_rate) = self.sample_rate {
            config.sample_rate = sample_rate;
        }
        if let Some(tolerance) = self.newton.tolerance {
            config.newton.tolerance = tolerance;
        }
        if let Some(max_iterations) = self.newton.max_iterations {
            config.newton.max_iterations = max_iterations;
        }
        if let Some(damping) = self.newton.damping {
            config.newton.damping = damping;
        }
        config
    }
}

impl WdfTree {
    /// Parse and build a tree using the settings in the description.
    pub fn from_description(text: &str) -> Result<Self> {
        let ast = dsl::parse(text)?;
        let config = ast.config(TreeConfig::default());
        Self::from_ast(&ast, config)
    }

    /// Build a tree from a parsed description.
    ///
    /// `config` is used as is; combine with [`TreeAst::config`] to honour the
    /// description's own settings.
    pub fn from_ast(ast: &TreeAst, config: TreeConfig) -> Result<Self> {
        let root_def = ast.root.as_ref().ok_or_else(|| {
            WdfError::invalid_element("root", "description has no .root line")
        })?;

        let mut builder = TreeBuilder::new();
        let mut names: HashMap<&str, NodeId> = HashMap::new();

        let lookup = |names: &HashMap<&str, NodeId>, name: &str, line: usize| {
            names.get(name).copied().ok_or_else(|| WdfError::UndefinedName {
                name: name.to_string(),
                line,
            })
        };
        let lookup_all = |names: &HashMap<&str, NodeId>, list: &[String], line: usize| {
            list.iter()
                .map(|name| lookup(names, name, line))
                .collect::<Result<Vec<_>>>()
        };
        let junction = |name: &str, line: usize| {
            ast.junction(name)
                .ok_or_else(|| WdfError::UndefinedName {
                    name: name.to_string(),
                    line,
                })
                .and_then(build_junction)
        };

        for def in &ast.elements {
            let line = def.line;
            let id = match &def.kind {
                ElementKind::Resistor { r } => builder.resistor(*r),
                ElementKind::Capacitor { c } => builder.capacitor(*c),
                ElementKind::Inductor { l } => builder.inductor(*l),
                ElementKind::ResistiveSource { r, vs } => builder.resistive_voltage_source(*vs, *r),
                ElementKind::Series(children) => builder.series(&lookup_all(&names, children, line)?),
                ElementKind::Parallel(children) => {
                    builder.parallel(&lookup_all(&names, children, line)?)
                }
                ElementKind::Inverter(child) => builder.inverter(lookup(&names, child, line)?),
                ElementKind::Rtype {
                    junction: j,
                    children,
                } => builder.rtype(junction(j, line)?, &lookup_all(&names, children, line)?),
            }
            .map_err(|e| in_element(e, &def.name))?;
            builder.label(id, def.name.clone())?;
            names.insert(def.name.as_str(), id);
        }

        let line = root_def.line;
        let (spec, subtrees) = match &root_def.kind {
            RootDefKind::Simple { subtree, element } => (
                RootSpec::Simple(root_element(*element)?),
                vec![lookup(&names, subtree, line)?],
            ),
            RootDefKind::Rtype {
                junction: j,
                subtrees,
            } => (
                RootSpec::Rtype(junction(j, line)?),
                lookup_all(&names, subtrees, line)?,
            ),
            RootDefKind::Nonlinear {
                junction: j,
                subtrees,
                models,
            } => {
                let models = models
                    .iter()
                    .map(|m| NlKind::from_params(&m.name, &m.params).map(NlKind::into_model))
                    .collect::<Result<Vec<_>>>()?;
                (
                    RootSpec::nonlinear(junction(j, line)?, models),
                    lookup_all(&names, subtrees, line)?,
                )
            }
        };

        let mut tree = builder.build_with_config(spec, &subtrees, config)?;

        if let Some(input) = &ast.input {
            let binding = match input {
                InputDef::Source { name, line } => {
                    InputBinding::SourceVoltage(lookup(&names, name, *line)?)
                }
                InputDef::Root { .. } => match tree.root().element() {
                    Some(RootElement::IdealCurrentSource { .. }) => InputBinding::RootCurrent,
                    _ => InputBinding::RootVoltage,
                },
            };
            tree.set_input(binding)?;
        }

        if let Some(output) = &ast.output {
            let node = lookup(&names, &output.node, output.line)?;
            tree.set_output(OutputProbe {
                node,
                quantity: output.quantity,
                scale: output.scale,
            })?;
        }

        debug!(
            elements = ast.elements.len(),
            junctions = ast.junctions.len(),
            input = ?tree.input(),
            output = ?tree.output().map(|p| p.node),
            "loaded tree description"
        );
        Ok(tree)
    }
}

fn build_junction(def: &JunctionDef) -> Result<Junction> {
    let mut junction = Junction::new(def.ports.clone())?;
    for &(p, n, r) in &def.resistors {
        junction = junction.with_resistor(p, n, r)?;
    }
    Ok(junction)
}

fn root_element(def: RootElementDef) -> Result<RootElement> {
    Ok(match def {
        RootElementDef::VoltageSource(v) => RootElement::voltage_source(v),
        RootElementDef::CurrentSource(i) => RootElement::current_source(i),
        RootElementDef::Resistor(r) => RootElement::resistor(r)?,
        RootElementDef::Capacitor(c) => RootElement::capacitor(c)?,
        RootElementDef::Inductor(l) => RootElement::inductor(l)?,
        RootElementDef::Switch(closed) => RootElement::switch(closed),
    })
}

/// Name the offending element in value errors raised by the builder.
fn in_element(err: WdfError, name: &str) -> WdfError {
    match err {
        WdfError::NonPositiveResistance { value, .. } => WdfError::NonPositiveResistance {
            element: name.to_string(),
            value,
        },
        WdfError::InvalidElement { message, .. } => WdfError::InvalidElement {
            element: name.to_string(),
            message,
        },
        other => other,
    }
}
