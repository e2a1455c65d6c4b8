//! chronoq CLI
//!
//! Runs one of the reference models for a batch of trials and prints one
//! JSON line of stats per trial on stdout. Logs go to stderr.

use std::io::Write;
use std::path::PathBuf;

use chronoq::models::{self, ModelKind, ModelStats};
use chronoq::{run_trials, HeapBackend, SimConfig};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chronoq")]
#[command(about = "Run discrete-event queueing models over independent trials")]
#[command(version)]
struct Cli {
    /// TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to run (grocery, airport, dump_truck)
    #[arg(short, long)]
    model: Option<ModelKind>,

    /// Number of trials
    #[arg(short, long)]
    trials: Option<u64>,

    /// Base seed; trial i draws from stream i under it
    #[arg(short, long)]
    seed: Option<u64>,

    /// Heap backend (array, binary)
    #[arg(short, long)]
    backend: Option<HeapBackend>,

    /// Run trials one after another instead of on the thread pool
    #[arg(long)]
    sequential: bool,
}

#[derive(Serialize)]
struct TrialLine<'a> {
    trial: u64,
    #[serde(flatten)]
    stats: &'a ModelStats,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            SimConfig::load(path)?
        }
        None => SimConfig::default(),
    };
    if let Some(model) = cli.model {
        config.run.model = model;
    }
    if let Some(trials) = cli.trials {
        config.run.trials = trials;
    }
    if let Some(seed) = cli.seed {
        config.run.base_seed = seed;
    }
    if let Some(backend) = cli.backend {
        config.run.backend = backend;
    }
    if cli.sequential {
        config.run.parallel = false;
    }
    config.validate()?;

    tracing::info!(
        model = %config.run.model,
        backend = %config.run.backend,
        "Starting chronoq"
    );

    let results = run_trials(&config.trial_plan(), |_trial, stream| {
        models::run_trial(&config, stream)
    })?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (trial, stats) in results.iter().enumerate() {
        let line = TrialLine {
            trial: trial as u64,
            stats,
        };
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
    }

    tracing::info!(trials = results.len(), "Done");
    Ok(())
}
