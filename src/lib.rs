#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod deck;
pub mod engine;
pub mod errors;
pub mod geometry;
pub mod imperfection;
pub mod model;
pub mod orchestrator;
pub mod params;
pub mod pipeline;
pub mod results;

pub use config::{EngineConfig, OrchestratorConfig, SupportLibrary};
pub use deck::{InputDeck, INTERACTIONS_ANCHOR};
pub use engine::{CommandEngine, Engine, EngineExit, EngineInvocation};
pub use errors::{
    AssemblyError, InjectionError, LatticeError, OrchestratorError, ParameterError,
    PipelineError, ResultError,
};
pub use geometry::{generate, point, Feasibility, JointLattice, Point, Ring};
pub use imperfection::{inject, inject_file, ImperfectionDirective};
pub use model::{assemble, ModelArtifact, ModelAssembly, StepKind};
pub use orchestrator::{normalize_example_name, Orchestrator, RunContext, RunSummary};
pub use params::StructuralParameters;
pub use pipeline::{prepare_linear_buckle, prepare_riks, submit, PreparedJob};
pub use results::{JobArtifact, ResultRecord};
