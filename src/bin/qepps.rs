//! Command-line runner for a parameter sweep.
//!
//! Reads a Lua configuration script declaring the parameter sequence, the matrix
//! families and the sweep options, then solves the polynomial eigenproblem at every
//! parameter value. Converged eigenvalues are logged and, with `--results`, written to a
//! CSV table. An aborted sweep (no eigenpair converged at some step) is reported but is
//! not an error.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use qepps::{
    SweepConfig, SweepOrchestrator, SweepStatus, algorithms::LinearizationSolver,
    script::ScriptContext, utils::data_loader::MatrixMarketStore, utils::results::ResultsWriter,
};
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[clap(
    name = "qepps",
    about = "Sweeps a sparse matrix-polynomial eigenproblem over a parameter sequence."
)]
struct Args {
    /// Lua configuration script.
    #[clap(long, value_name = "PATH")]
    lua: PathBuf,
    /// Optional CSV file receiving every converged eigenvalue.
    #[clap(long, value_name = "PATH")]
    results: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    let args = Args::parse();

    let script = ScriptContext::from_file(&args.lua)
        .with_context(|| format!("Failed to run configuration script {:?}", args.lua))?;
    let config = SweepConfig::from_script(&script)?;
    let solver = LinearizationSolver::new(config.options.nev, config.options.tol);

    let mut sweep = SweepOrchestrator::new(&script, config, MatrixMarketStore, solver)?;
    if let Some(path) = &args.results {
        log::info!("Writing eigenvalues to {path:?}.");
        sweep = sweep.with_results(ResultsWriter::from_path(path)?);
    }

    let report = sweep.run()?;
    match report.status {
        SweepStatus::Done => log::info!(
            "Sweep complete: {} parameter values processed.",
            report.steps.len()
        ),
        SweepStatus::Aborted { step, parameter } => log::warn!(
            "Sweep aborted at step {} (parameter {parameter}) after {} completed steps.",
            step + 1,
            report.steps.len()
        ),
    }
    Ok(())
}
