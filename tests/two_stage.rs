#![warn(clippy::pedantic)]

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use supercompressible::results::read;
use supercompressible::{
    assemble, generate, prepare_linear_buckle, prepare_riks, submit, Engine, EngineExit,
    EngineInvocation, InputDeck, JobArtifact, OrchestratorError, PipelineError, StepKind,
    StructuralParameters, INTERACTIONS_ANCHOR,
};
use tempfile::tempdir;

/// Engine that answers every job with a canned results file.
struct ScriptedSolver {
    results: &'static str,
    code: i32,
    jobs: RefCell<Vec<String>>,
}

impl ScriptedSolver {
    fn new(results: &'static str) -> Self {
        Self {
            results,
            code: 0,
            jobs: RefCell::new(Vec::new()),
        }
    }
}

impl Engine for ScriptedSolver {
    fn run(
        &self,
        invocation: &EngineInvocation,
        working_dir: &Path,
    ) -> Result<EngineExit, OrchestratorError> {
        let EngineInvocation::Job { name, input } = invocation else {
            panic!("pipeline only submits jobs");
        };
        assert!(input.exists(), "input deck written before submission");
        let artifact = JobArtifact::new(name.clone(), working_dir);
        fs::write(artifact.results_path(), self.results).expect("results written");
        self.jobs.borrow_mut().push(name.clone());
        Ok(EngineExit {
            code: Some(self.code),
        })
    }
}

#[test]
fn buckle_results_seed_the_riks_deck() {
    let dir = tempdir().expect("temporary directory");
    let params = StructuralParameters::default();
    let solver = ScriptedSolver::new(r#"{ "coilable": 1, "max_disps": [0.0, 0.5], "mode": 1 }"#);

    let buckle = prepare_linear_buckle(&params, dir.path()).expect("buckle deck written");
    submit(&solver, &buckle, dir.path()).expect("buckle job succeeds");

    let record = read(&JobArtifact::new(&buckle.job_name, dir.path())).expect("buckle results");
    let riks = prepare_riks(&params, &record, dir.path()).expect("riks deck written");
    submit(&solver, &riks, dir.path()).expect("riks job succeeds");

    assert_eq!(
        *solver.jobs.borrow(),
        vec![
            StepKind::LinearBuckle.job_name().to_string(),
            StepKind::RiksContinuation.job_name().to_string(),
        ]
    );

    let directive = riks.imperfection.expect("imperfection seeded");
    assert_eq!(directive.source_job_id, "Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE");
    assert_relative_eq!(directive.amplitude_factor, params.imperfection_fraction / 0.5);

    let lines = InputDeck::read(&riks.input_path).expect("deck readable").into_lines();
    let anchor = lines
        .iter()
        .rposition(|line| line == INTERACTIONS_ANCHOR)
        .expect("anchor present");
    assert_eq!(lines[anchor + 2], "*IMPERFECTION, FILE=Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE, STEP=1");
    assert_eq!(lines[anchor + 3], format!("1, {}", directive.amplitude_factor));
    assert_eq!(
        lines.iter().filter(|line| line.starts_with("*IMPERFECTION")).count(),
        1
    );
}

#[test]
fn seeding_changes_only_two_lines() {
    let dir = tempdir().expect("temporary directory");
    let params = StructuralParameters::default();
    let solver = ScriptedSolver::new(r#"{ "coilable": true, "max_disps": [0.0, 2.0] }"#);

    let buckle = prepare_linear_buckle(&params, dir.path()).expect("buckle deck written");
    submit(&solver, &buckle, dir.path()).expect("buckle job succeeds");
    let record = read(&JobArtifact::new(&buckle.job_name, dir.path())).expect("buckle results");

    let seeded = prepare_riks(&params, &record, dir.path()).expect("riks deck written");
    let lattice = generate(&params, &record.feasibility()).expect("coilable lattice");
    let plain = assemble(&lattice, &params, StepKind::RiksContinuation)
        .expect("assembled")
        .input_deck
        .expect("riks deck rendered");

    let mut seeded_lines = InputDeck::read(&seeded.input_path)
        .expect("deck readable")
        .into_lines();
    let anchor = seeded_lines
        .iter()
        .rposition(|line| line == INTERACTIONS_ANCHOR)
        .expect("anchor present");
    seeded_lines.drain(anchor + 2..anchor + 4);
    assert_eq!(seeded_lines, plain.into_lines());
}

#[test]
fn non_coilable_buckle_stops_the_pipeline() {
    let dir = tempdir().expect("temporary directory");
    let params = StructuralParameters::default();
    let solver = ScriptedSolver::new(r#"{ "coilable": 0 }"#);

    let buckle = prepare_linear_buckle(&params, dir.path()).expect("buckle deck written");
    submit(&solver, &buckle, dir.path()).expect("buckle job succeeds");
    let record = read(&JobArtifact::new(&buckle.job_name, dir.path())).expect("buckle results");

    let error = prepare_riks(&params, &record, dir.path()).expect_err("geometry rejected");
    assert!(matches!(error, PipelineError::Lattice(_)));
}

#[test]
fn failing_job_is_reported() {
    let dir = tempdir().expect("temporary directory");
    let solver = ScriptedSolver {
        code: 1,
        ..ScriptedSolver::new(r#"{ "coilable": 1, "max_disps": [1.0] }"#)
    };
    let buckle = prepare_linear_buckle(&StructuralParameters::default(), dir.path())
        .expect("buckle deck written");

    let error = submit(&solver, &buckle, dir.path()).expect_err("job fails");
    assert!(matches!(
        error,
        PipelineError::Orchestrator(OrchestratorError::EngineFailure { code: Some(1), .. })
    ));
}
