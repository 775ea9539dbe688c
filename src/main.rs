//! wdf - Wave Digital Filter tree simulator
//!
//! Streams raw mono f32 audio through a tree description.
//!
//! # Usage
//!
//! ```bash
//! ffmpeg -i input.wav -f f32le -ac 1 -ar 48000 - | wdf clipper.wdf | ffmpeg -f f32le -ac 1 -ar 48000 -i - output.wav
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wdf_core::{audio::process_audio, dsl, error::Result, TreeConfig, WdfTree};

/// Wave Digital Filter tree simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the tree description file
    #[arg(value_name = "TREE_FILE")]
    tree_file: PathBuf,

    /// Sample rate in Hz (overrides .samplerate)
    #[arg(short, long)]
    sample_rate: Option<f64>,

    /// Newton-Raphson tolerance in volts (overrides .newton tol)
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Newton-Raphson iteration limit (overrides .newton maxiter)
    #[arg(short, long)]
    max_iterations: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let ast = dsl::parse_file(&args.tree_file)?;
    let mut config = ast.config(TreeConfig::default());
    if let Some(sample_rate) = args.sample_rate {
        config.sample_rate = sample_rate;
    }
    if let Some(tolerance) = args.tolerance {
        config.newton.tolerance = tolerance;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.newton.max_iterations = max_iterations;
    }

    let mut tree = WdfTree::from_ast(&ast, config)?;
    if tree.output().is_none() {
        warn!("tree has no .output line, writing silence");
    }

    let samples = process_audio(&mut tree)?;

    match tree.stats() {
        Some(stats) => info!(
            samples,
            failures = stats.failures,
            mean_iterations = stats.mean_iterations(),
            max_iterations = stats.max_iterations_seen,
            "done"
        ),
        None => info!(samples, "done"),
    }
    if let Some(stats) = tree.stats().filter(|s| s.failures > 0) {
        warn!(
            failures = stats.failures,
            samples,
            "Newton-Raphson did not converge on every sample"
        );
    }

    Ok(())
}
