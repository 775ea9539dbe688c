//! Error types for the WDF core.
//!
//! This module provides a unified error type [`WdfError`] that covers
//! tree construction, junction derivation, tree description parsing and
//! host I/O. Nonlinear convergence failures are not errors; the per-sample
//! loop reports them through [`SolverStats`](crate::solver::SolverStats).

use thiserror::Error;

use crate::tree::NodeId;

/// Result type alias using [`WdfError`].
pub type Result<T> = std::result::Result<T, WdfError>;

/// Unified error type for all WDF operations.
#[derive(Error, Debug)]
pub enum WdfError {
    // ============ Description Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Reference to an element or junction that was never declared
    #[error("Undefined name '{name}' at line {line}")]
    UndefinedName { name: String, line: usize },

    /// Element or junction declared twice
    #[error("Duplicate name '{name}'")]
    DuplicateName { name: String },

    /// Unknown nonlinear model name
    #[error("Unknown nonlinear model '{model}'")]
    UnknownModel { model: String },

    // ============ Tree Construction Errors ============
    /// Port resistance (or the value it is derived from) is not strictly positive
    #[error("Non-positive port resistance for '{element}' ({value:.3e} ohm)")]
    NonPositiveResistance { element: String, value: f64 },

    /// Invalid element value
    #[error("Invalid value for '{element}': {message}")]
    InvalidElement { element: String, message: String },

    /// Adaptor has the wrong number of children
    #[error("{adaptor} adaptor expects {expected} children, got {got}")]
    ArityMismatch {
        adaptor: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// Handle does not refer to a node of this builder
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    /// Node is already owned by another adaptor or root
    #[error("Node {0} already has a parent")]
    NodeReused(NodeId),

    /// Node was built but is not connected to the root
    #[error("Node {0} is not connected to the root")]
    DetachedNode(NodeId),

    /// Junction description does not match the ports attached to it
    #[error("Junction port mismatch: {message}")]
    JunctionMismatch { message: String },

    /// Junction nodal matrix cannot be solved
    #[error("Singular junction - {message}")]
    SingularJunction { message: String },

    /// Nonlinear root declared without any device model
    #[error("Nonlinear root requires at least one device model")]
    MissingNonlinearModel,

    /// Input binding does not match the tree
    #[error("Invalid input binding: {message}")]
    InvalidInput { message: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown parameter ID
    #[error("Unknown parameter ID {0}")]
    UnknownParam(usize),

    // ============ I/O Errors ============
    /// Error reading a tree description file
    #[error("Failed to read tree description '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error reading audio input
    #[error("Audio input error: {message}")]
    AudioInputError { message: String },

    /// Error writing audio output
    #[error("Audio output error: {message}")]
    AudioOutputError { message: String },
}

impl WdfError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid element error
    pub fn invalid_element(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidElement {
            element: element.into(),
            message: message.into(),
        }
    }

    /// Create a junction mismatch error
    pub fn junction(message: impl Into<String>) -> Self {
        Self::JunctionMismatch {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Check that a resistance is strictly positive and finite.
pub(crate) fn check_resistance(element: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(WdfError::NonPositiveResistance {
            element: element.to_string(),
            value,
        })
    }
}

/// Check that a component value (capacitance, inductance) is strictly positive and finite.
pub(crate) fn check_positive(element: &str, what: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(WdfError::invalid_element(
            element,
            format!("{what} must be positive and finite, got {value:e}"),
        ))
    }
}
