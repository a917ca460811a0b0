//! Error types produced while generating, assembling and running lattice models.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error returned when a set of [`StructuralParameters`](crate::StructuralParameters)
/// does not describe a buildable lattice.
///
/// # Examples
///
/// ```
/// use supercompressible::{ParameterError, StructuralParameters};
///
/// let params = StructuralParameters {
///     n_longerons: 2,
///     ..StructuralParameters::default()
/// };
/// assert_eq!(
///     params.validate(),
///     Err(ParameterError::TooFewLongerons(2))
/// );
/// ```
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParameterError {
    /// Returned when fewer than three longerons are requested.
    #[error("at least 3 longerons are required (received {0})")]
    TooFewLongerons(usize),
    /// Returned when the lattice has no storeys.
    #[error("at least 1 storey is required")]
    NoStoreys,
    /// Returned when a length or modulus is zero, negative or not finite.
    #[error("{name} must be positive (received {value})")]
    NonPositive {
        /// Name of the rejected parameter.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// Returned when the transition length ratio falls outside `(0, 1]`.
    #[error("transition length ratio must lie in (0, 1] (received {0})")]
    TransitionRatioOutOfRange(f64),
    /// Returned when the imperfection fraction is negative or not finite.
    #[error("imperfection fraction must be non-negative (received {0})")]
    NegativeImperfection(f64),
    /// Returned when the twist angle is not finite.
    #[error("twist angle must be finite (received {0})")]
    NonFiniteTwist(f64),
}

/// Error returned by the lattice generator.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LatticeError {
    /// The preceding analysis stage flagged the geometry as infeasible.
    #[error("geometry from job '{job}' is not coilable; refusing to generate the lattice")]
    PreconditionFailure {
        /// Job whose results rejected the geometry.
        job: String,
    },
    /// The structural parameters are invalid.
    #[error(transparent)]
    InvalidParameters(#[from] ParameterError),
}

/// Error returned while building a [`ModelAssembly`](crate::ModelAssembly).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AssemblyError {
    /// A direction used to orient beam sections or local frames has no length.
    #[error("longeron {longeron} has a degenerate orientation: {reason}")]
    GeometryInconsistency {
        /// Index of the offending longeron.
        longeron: usize,
        /// Which direction collapsed.
        reason: &'static str,
    },
}

/// Error returned when reading the results of a previous analysis stage.
#[derive(Debug, Error)]
pub enum ResultError {
    /// The job did not complete or left no usable data behind.
    #[error("results of job '{job}' are unavailable: {reason}")]
    MissingResult {
        /// Identifier of the job that was queried.
        job: String,
        /// Why the results were rejected.
        reason: String,
    },
    /// The results file exists but cannot be decoded.
    #[error("results file {path:?} is malformed: {source}")]
    Malformed {
        /// Location of the results file.
        path: PathBuf,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// The results file could not be read.
    #[error("failed to read results file {path:?}: {source}")]
    Io {
        /// Location of the results file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Error returned by the perturbation injector.
///
/// No variant is ever produced after the artifact has been modified, so a
/// failed injection leaves the input untouched.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The anchor line is absent from the artifact.
    #[error("anchor line '{anchor}' not found in the analysis input")]
    AnchorNotFound {
        /// Literal anchor that was searched for.
        anchor: &'static str,
    },
    /// The result record holds no displacement for the requested mode.
    #[error("result record has no displacement for mode {mode_id}")]
    MissingReference {
        /// Mode or increment that was requested.
        mode_id: usize,
    },
    /// The reference displacement is zero, so no amplitude can be derived.
    #[error("reference displacement for mode {mode_id} is zero")]
    ZeroReference {
        /// Mode or increment that was requested.
        mode_id: usize,
    },
    /// The artifact could not be read or written.
    #[error("failed to access analysis input {path:?}: {source}")]
    Io {
        /// Location of the artifact.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Error returned by the job orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No file below the search root carries the example name.
    #[error("{name} was not found under {root:?}")]
    ExampleNotFound {
        /// Normalised example file name.
        name: String,
        /// Directory that was searched.
        root: PathBuf,
    },
    /// A staged path could not be created or populated.
    #[error("failed to stage {path:?}: {source}")]
    Staging {
        /// Path being created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The engine executable could not be started at all.
    #[error("failed to launch engine '{command}': {source}")]
    EngineLaunch {
        /// Executable that was invoked.
        command: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The engine ran but reported failure.
    #[error("'{example}' has a bug! (engine exit code {code:?})")]
    EngineFailure {
        /// Example or job that failed.
        example: String,
        /// Exit code, absent when the process was killed by a signal.
        code: Option<i32>,
    },
}

/// Error returned by the two-stage pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Lattice generation failed.
    #[error(transparent)]
    Lattice(#[from] LatticeError),
    /// Model assembly failed.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    /// The previous stage's results are unusable.
    #[error(transparent)]
    Result(#[from] ResultError),
    /// The imperfection could not be seeded.
    #[error(transparent)]
    Injection(#[from] InjectionError),
    /// Running the engine failed.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    /// Writing the analysis input failed.
    #[error("failed to write analysis input {path:?}: {source}")]
    Io {
        /// Destination of the analysis input.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}
