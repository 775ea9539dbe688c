//! # WDF Core
//!
//! Real-time Wave Digital Filter simulation of audio circuits.
//!
//! This library provides:
//! - A tree of one-port leaves (R, C, L, resistive sources) joined by series,
//!   parallel, inverter and R-type adaptors
//! - Roots that close the tree with an unadapted element, a multi-port
//!   junction, or a set of nonlinear devices solved by Newton-Raphson
//! - Device models for diodes, an Ebers-Moll NPN and a Dempwolf triode
//! - A line-oriented description language and an audio pipeline (CLI only)
//!
//! ## Architecture
//!
//! - [`elements`] - Leaves, adaptors and root one-ports
//! - [`models`] - Nonlinear device models
//! - [`solver`] - Junction analysis, K-method matrices and Newton-Raphson
//! - [`tree`] - Tree construction, parameters and the per-sample loop
//! - [`dsl`] - Parser for the tree description language
//! - [`audio`] - Audio I/O (CLI only)
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! ffmpeg -i input.wav -f f32le -ac 1 -ar 48000 - | wdf clipper.wdf | ffmpeg -f f32le -ac 1 -ar 48000 -i - output.wav
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use wdf_core::WdfTree;
//!
//! let mut tree = WdfTree::from_description(
//!     "RV VIN 1k\nC C1 10n\nPAR P1 VIN C1\n\
//!      .junction J1 (1 0) (1 0)\n.root nl J1 P1 with diode_pair\n\
//!      .input VIN\n.output voltage C1\n",
//! )?;
//! let y = tree.process(0.5);
//! # Ok::<(), wdf_core::WdfError>(())
//! ```
//!
//! ## Wave convention
//!
//! Every port carries an incident wave `a` (parent to child), a reflected
//! wave `b` (child to parent) and a port resistance `Rp`, with
//! `v = (a + b) / 2` and `i = (a - b) / (2 Rp)`. Reactive leaves use the
//! bilinear transform at the configured sample rate.

pub mod dsl;
pub mod elements;
pub mod error;
pub mod models;
pub mod solver;
pub mod tree;

#[cfg(feature = "cli")]
pub mod audio;

pub use error::{Result, WdfError};
pub use solver::{Junction, NewtonConfig, RootKind, RootSpec, SolverStats};
pub use tree::{InputBinding, NodeId, OutputProbe, TreeBuilder, TreeConfig, WdfTree};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmWdfTree;

/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;
