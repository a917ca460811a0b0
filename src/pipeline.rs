//! Two-stage stability analysis: a linear buckle followed by a Riks continuation.
//!
//! Both stages regenerate the lattice from the same parameters, so the mode
//! shape written by the first stage lines up node for node with the model of
//! the second one.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::deck::InputDeck;
use crate::engine::{Engine, EngineInvocation};
use crate::errors::{OrchestratorError, PipelineError};
use crate::geometry::{generate, Feasibility};
use crate::imperfection::{splice, ImperfectionDirective};
use crate::model::{assemble, StepKind};
use crate::params::StructuralParameters;
use crate::results::ResultRecord;

/// Input deck written for one analysis stage.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedJob {
    /// Job name the engine runs the deck under.
    pub job_name: String,
    /// Location of the written deck.
    pub input_path: PathBuf,
    /// Imperfection seeded into the deck, if any.
    pub imperfection: Option<ImperfectionDirective>,
}

/// Path of the input deck of `job_name` in `out_dir`.
fn deck_path(out_dir: &Path, job_name: &str) -> PathBuf {
    out_dir.join(format!("{job_name}.inp"))
}

/// Generate and assemble one stage, returning its job name and deck.
fn render_stage(
    params: &StructuralParameters,
    feasibility: &Feasibility,
    step_kind: StepKind,
) -> Result<(&'static str, InputDeck), PipelineError> {
    let lattice = generate(params, feasibility)?;
    let artifact = assemble(&lattice, params, step_kind)?;
    let deck = artifact
        .input_deck
        .unwrap_or_else(|| artifact.model.to_input_deck());
    Ok((artifact.model.job_name(), deck))
}

/// Write the finished deck of `job_name` into `out_dir`.
fn write_deck(
    job_name: &str,
    deck: &InputDeck,
    out_dir: &Path,
    imperfection: Option<ImperfectionDirective>,
) -> Result<PreparedJob, PipelineError> {
    let input_path = deck_path(out_dir, job_name);
    let io_error = |source| PipelineError::Io {
        path: input_path.clone(),
        source,
    };
    fs::create_dir_all(out_dir).map_err(io_error)?;
    deck.write(&input_path).map_err(io_error)?;
    info!(
        job = job_name,
        path = %input_path.display(),
        lines = deck.lines().len(),
        "wrote input deck"
    );

    Ok(PreparedJob {
        job_name: job_name.to_string(),
        input_path,
        imperfection,
    })
}

/// Write the linear buckling deck for `params` into `out_dir`.
///
/// # Errors
///
/// Returns [`PipelineError::Lattice`] for invalid parameters,
/// [`PipelineError::Assembly`] for degenerate geometry and
/// [`PipelineError::Io`] when the deck cannot be written.
pub fn prepare_linear_buckle(
    params: &StructuralParameters,
    out_dir: &Path,
) -> Result<PreparedJob, PipelineError> {
    let (job_name, deck) =
        render_stage(params, &Feasibility::Unchecked, StepKind::LinearBuckle)?;
    write_deck(job_name, &deck, out_dir, None)
}

/// Write the Riks deck for `params` into `out_dir`, seeded from `record`.
///
/// The record must come from the linear buckling stage. The deck is seeded in
/// memory and written once, so a geometry the record marks as not coilable or
/// an imperfection that cannot be derived leaves `out_dir` untouched.
///
/// # Errors
///
/// Returns [`PipelineError::Lattice`] when the record rejects the geometry,
/// [`PipelineError::Injection`] when the imperfection cannot be seeded and the
/// errors of [`prepare_linear_buckle`].
pub fn prepare_riks(
    params: &StructuralParameters,
    record: &ResultRecord,
    out_dir: &Path,
) -> Result<PreparedJob, PipelineError> {
    let (job_name, deck) = render_stage(
        params,
        &record.feasibility(),
        StepKind::RiksContinuation,
    )?;
    let directive = ImperfectionDirective::from_record(
        record,
        StepKind::LinearBuckle.job_name(),
        record.eigen_mode_id,
        params.imperfection_fraction,
    )?;
    let seeded = InputDeck::from_lines(splice(deck.into_lines(), &directive)?);
    info!(
        source = %directive.source_job_id,
        amplitude = directive.amplitude_factor,
        "seeded imperfection"
    );
    write_deck(job_name, &seeded, out_dir, Some(directive))
}

/// Run `job` through `engine` from `working_dir` and wait for it.
///
/// # Errors
///
/// Returns [`PipelineError::Orchestrator`] when the engine cannot be started
/// or exits unsuccessfully.
pub fn submit<E: Engine>(
    engine: &E,
    job: &PreparedJob,
    working_dir: &Path,
) -> Result<(), PipelineError> {
    let invocation = EngineInvocation::Job {
        name: job.job_name.clone(),
        input: job.input_path.clone(),
    };
    info!(job = %job.job_name, "submitting job");
    let exit = engine.run(&invocation, working_dir)?;
    if !exit.success() {
        return Err(OrchestratorError::EngineFailure {
            example: job.job_name.clone(),
            code: exit.code,
        }
        .into());
    }
    info!(job = %job.job_name, "job completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::INTERACTIONS_ANCHOR;
    use crate::errors::{InjectionError, LatticeError};
    use tempfile::tempdir;

    fn buckle_record(coilable: bool) -> ResultRecord {
        ResultRecord {
            job_id: StepKind::LinearBuckle.job_name().to_string(),
            feasible: coilable,
            displacement_history: vec![0.0, 2.0],
            loads: Vec::new(),
            eigen_mode_id: 1,
        }
    }

    #[test]
    fn buckle_deck_is_written_unseeded() {
        let dir = tempdir().expect("temporary directory");
        let job = prepare_linear_buckle(&StructuralParameters::default(), dir.path())
            .expect("deck written");

        assert_eq!(job.job_name, "Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE");
        assert!(job.imperfection.is_none());
        let deck = InputDeck::read(&job.input_path).expect("deck readable");
        assert!(!deck.lines().iter().any(|line| line.starts_with("*IMPERFECTION")));
    }

    #[test]
    fn riks_deck_is_seeded_after_anchor() {
        let dir = tempdir().expect("temporary directory");
        let params = StructuralParameters::default();
        let job = prepare_riks(&params, &buckle_record(true), dir.path()).expect("deck written");

        let directive = job.imperfection.expect("imperfection seeded");
        assert_eq!(directive.amplitude_factor, params.imperfection_fraction / 2.0);
        let lines = InputDeck::read(&job.input_path).expect("deck readable").into_lines();
        let anchor = lines
            .iter()
            .rposition(|line| line == INTERACTIONS_ANCHOR)
            .expect("anchor present");
        assert_eq!(
            lines[anchor + 2],
            "*IMPERFECTION, FILE=Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE, STEP=1"
        );
    }

    #[test]
    fn infeasible_buckle_blocks_riks() {
        let dir = tempdir().expect("temporary directory");
        let error = prepare_riks(
            &StructuralParameters::default(),
            &buckle_record(false),
            dir.path(),
        )
        .expect_err("geometry rejected");
        assert!(matches!(
            error,
            PipelineError::Lattice(LatticeError::PreconditionFailure { .. })
        ));
        assert!(!deck_path(dir.path(), StepKind::RiksContinuation.job_name()).exists());
    }

    #[test]
    fn underivable_imperfection_writes_no_deck() {
        let dir = tempdir().expect("temporary directory");
        let record = ResultRecord {
            displacement_history: vec![0.5],
            ..buckle_record(true)
        };
        let error = prepare_riks(&StructuralParameters::default(), &record, dir.path())
            .expect_err("mode 1 has no displacement");
        assert!(matches!(
            error,
            PipelineError::Injection(InjectionError::MissingReference { mode_id: 1 })
        ));
        assert!(!deck_path(dir.path(), StepKind::RiksContinuation.job_name()).exists());
    }

    #[test]
    fn failed_seeding_keeps_previous_deck() {
        let dir = tempdir().expect("temporary directory");
        let params = StructuralParameters::default();
        let seeded = prepare_riks(&params, &buckle_record(true), dir.path()).expect("deck written");
        let before = fs::read_to_string(&seeded.input_path).expect("deck readable");

        let zero = ResultRecord {
            displacement_history: vec![0.0, 0.0],
            ..buckle_record(true)
        };
        let error = prepare_riks(&params, &zero, dir.path()).expect_err("zero reference");
        assert!(matches!(
            error,
            PipelineError::Injection(InjectionError::ZeroReference { .. })
        ));
        assert_eq!(
            fs::read_to_string(&seeded.input_path).expect("deck readable"),
            before
        );
    }
}
