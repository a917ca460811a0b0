//! Command-line driver for the supercompressible lattice pipeline.
//!
//! - `supercompressible lattice` prints the generated geometry
//! - `supercompressible buckle` writes (and optionally runs) the linear buckle deck
//! - `supercompressible riks` seeds and writes (and optionally runs) the Riks deck

mod report;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use supercompressible::config::ENGINE_ENV;
use supercompressible::results::read;
use supercompressible::{
    generate, prepare_linear_buckle, prepare_riks, submit, CommandEngine, EngineConfig,
    Feasibility, JobArtifact, PreparedJob, StepKind, StructuralParameters,
};
use tracing_subscriber::EnvFilter;

use report::{render_job, render_lattice, render_record};

/// Parametric supercompressible lattice models
#[derive(Parser)]
#[command(name = "supercompressible")]
#[command(about = "Generate and run two-stage stability analyses of supercompressible lattices", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args)]
struct Design {
    /// JSON file with structural parameters; missing fields use the reference design
    #[arg(long)]
    params: Option<PathBuf>,
}

/// Options of the stages that write decks.
#[derive(Args)]
struct Stage {
    #[command(flatten)]
    design: Design,

    /// Directory the input deck is written to
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Run the job after writing its deck
    #[arg(long)]
    submit: bool,

    /// Engine executable
    #[arg(long, env = ENGINE_ENV, default_value = supercompressible::config::DEFAULT_ENGINE)]
    engine: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the joint lattice of a design
    Lattice {
        #[command(flatten)]
        design: Design,
    },

    /// Write the linear buckling deck
    Buckle {
        #[command(flatten)]
        stage: Stage,
    },

    /// Write the Riks deck seeded from the linear buckling results
    Riks {
        #[command(flatten)]
        stage: Stage,

        /// Directory holding the linear buckling results (defaults to --out)
        #[arg(long)]
        results: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Lattice { design } => {
            let params = load_params(&design)?;
            let lattice = generate(&params, &Feasibility::Unchecked)
                .context("failed to generate the lattice")?;
            print!("{}", render_lattice(&params, &lattice));
        }
        Commands::Buckle { stage } => {
            let params = load_params(&stage.design)?;
            let out = output_dir(&stage.out)?;
            let job = prepare_linear_buckle(&params, &out)
                .context("failed to prepare the linear buckle stage")?;
            finish(&stage, &job, &out)?;
        }
        Commands::Riks { stage, results } => {
            let params = load_params(&stage.design)?;
            let out = output_dir(&stage.out)?;
            let results_dir = results.unwrap_or_else(|| out.clone());
            let artifact = JobArtifact::new(StepKind::LinearBuckle.job_name(), results_dir);
            let record = read(&artifact).context("failed to read the linear buckle results")?;
            print!("{}", render_record(&record));
            let job = prepare_riks(&params, &record, &out)
                .context("failed to prepare the Riks stage")?;
            finish(&stage, &job, &out)?;
        }
    }

    Ok(())
}

/// Load the structural parameters, falling back to the reference design.
fn load_params(design: &Design) -> Result<StructuralParameters> {
    let Some(path) = &design.params else {
        return Ok(StructuralParameters::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read parameters from {}", path.display()))?;
    StructuralParameters::from_json_str(&text)
        .with_context(|| format!("failed to parse parameters in {}", path.display()))
}

/// Create the output directory and resolve it to an absolute path.
fn output_dir(out: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out)
        .with_context(|| format!("failed to create output directory {}", out.display()))?;
    fs::canonicalize(out).with_context(|| format!("failed to resolve {}", out.display()))
}

/// Report the written deck and run it from `out` when requested.
fn finish(stage: &Stage, job: &PreparedJob, out: &Path) -> Result<()> {
    print!("{}", render_job(job));
    if stage.submit {
        let engine = CommandEngine::new(EngineConfig {
            command: stage.engine.clone(),
            extra_args: Vec::new(),
        });
        submit(&engine, job, out)
            .with_context(|| format!("job {} failed", job.job_name))?;
    }
    Ok(())
}
