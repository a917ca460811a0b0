//! Run an example script inside the analysis engine.
//!
//! The example is looked up by name below `--dir`, its output lands in a
//! `simulation` directory of the current working directory, and every
//! temporary file is removed again once the engine exits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use supercompressible::config::{DEFAULT_ENGINE, ENGINE_ENV};
use supercompressible::{
    EngineConfig, Orchestrator, OrchestratorConfig, RunContext, SupportLibrary,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run an example script in the analysis engine
#[derive(Parser)]
#[command(name = "run_example")]
#[command(about = "Locate an example script and run it in the analysis engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Name of the example script, with or without the .py extension
    example_name: String,

    /// Directory searched for the example
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Open the engine's graphical interface
    #[arg(long)]
    gui: bool,

    /// Reuse the most recent simulation directory instead of creating a new one
    #[arg(long = "same_dir")]
    same_dir: bool,

    /// Engine executable
    #[arg(long, env = ENGINE_ENV, default_value = DEFAULT_ENGINE)]
    engine: String,

    /// Support library copied next to the example when absent from the working directory
    #[arg(long)]
    support: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let support_library = match &cli.support {
        Some(source) => {
            let name = source
                .file_name()
                .with_context(|| format!("{} does not name a directory", source.display()))?
                .to_string_lossy()
                .into_owned();
            Some(SupportLibrary {
                name,
                source: source.clone(),
            })
        }
        None => None,
    };
    let config = OrchestratorConfig {
        support_library,
        engine: EngineConfig {
            command: cli.engine,
            extra_args: Vec::new(),
        },
        ..OrchestratorConfig::default()
    };
    let context = RunContext::current().context("failed to read the working directory")?;

    let orchestrator = Orchestrator::from_config(config, context);
    let summary = orchestrator
        .run(&cli.dir, &cli.example_name, cli.same_dir, cli.gui)
        .with_context(|| format!("failed to run {}", cli.example_name))?;
    info!(output = %summary.staging_dir.display(), "simulation output");

    Ok(())
}
