//! Seam between the crate and the external finite-element engine.
//!
//! The engine is a black box launched as a subprocess: it either runs a
//! generated entry script or submits a job from an input deck, and reports
//! success through its exit status.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::EngineConfig;
use crate::errors::OrchestratorError;

/// One request to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineInvocation {
    /// Run a script inside the engine's scripting host.
    Script {
        /// Script to execute.
        path: PathBuf,
        /// Open the graphical interface instead of running headless.
        interactive: bool,
    },
    /// Run an analysis job from an input deck and wait for it.
    Job {
        /// Job name, which names every file the job writes.
        name: String,
        /// Input deck of the job.
        input: PathBuf,
    },
}

impl EngineInvocation {
    /// Command-line arguments passed after the executable.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        match self {
            EngineInvocation::Script { path, interactive } => {
                let mut script = OsString::from(if *interactive { "SCRIPT=" } else { "noGUI=" });
                script.push(path);
                vec![OsString::from("cae"), script]
            }
            EngineInvocation::Job { name, input } => {
                let mut input_arg = OsString::from("input=");
                input_arg.push(input);
                vec![
                    OsString::from(format!("job={name}")),
                    input_arg,
                    OsString::from("interactive"),
                ]
            }
        }
    }
}

/// Exit status reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineExit {
    /// Exit code, absent when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl EngineExit {
    /// Whether the engine reported success.
    #[must_use]
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

/// Something that can execute engine invocations.
///
/// Calls block until the engine exits; there is no timeout.
pub trait Engine {
    /// Execute `invocation` with `working_dir` as the process working directory.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::EngineLaunch`] when the engine cannot be started.
    fn run(
        &self,
        invocation: &EngineInvocation,
        working_dir: &Path,
    ) -> Result<EngineExit, OrchestratorError>;
}

/// Engine launched as a subprocess of the configured executable.
#[derive(Clone, Debug, Default)]
pub struct CommandEngine {
    /// Executable and leading arguments.
    config: EngineConfig,
}

impl CommandEngine {
    /// Engine launched according to `config`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl Engine for CommandEngine {
    fn run(
        &self,
        invocation: &EngineInvocation,
        working_dir: &Path,
    ) -> Result<EngineExit, OrchestratorError> {
        let args = invocation.args();
        debug!(command = %self.config.command, ?args, "launching engine");
        let status = Command::new(&self.config.command)
            .args(&self.config.extra_args)
            .args(&args)
            .current_dir(working_dir)
            .status()
            .map_err(|source| OrchestratorError::EngineLaunch {
                command: self.config.command.clone(),
                source,
            })?;
        Ok(EngineExit {
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_mode_selects_interface() {
        let headless = EngineInvocation::Script {
            path: PathBuf::from("_temp.py"),
            interactive: false,
        };
        let gui = EngineInvocation::Script {
            path: PathBuf::from("_temp.py"),
            interactive: true,
        };
        assert_eq!(headless.args(), vec![OsString::from("cae"), OsString::from("noGUI=_temp.py")]);
        assert_eq!(gui.args(), vec![OsString::from("cae"), OsString::from("SCRIPT=_temp.py")]);
    }

    #[test]
    fn job_invocation_waits_for_completion() {
        let job = EngineInvocation::Job {
            name: "Simul_SUPERCOMPRESSIBLE_RIKS".to_string(),
            input: PathBuf::from("Simul_SUPERCOMPRESSIBLE_RIKS.inp"),
        };
        assert_eq!(
            job.args(),
            vec![
                OsString::from("job=Simul_SUPERCOMPRESSIBLE_RIKS"),
                OsString::from("input=Simul_SUPERCOMPRESSIBLE_RIKS.inp"),
                OsString::from("interactive"),
            ]
        );
    }

    #[test]
    fn missing_executable_is_launch_error() {
        let engine = CommandEngine::new(EngineConfig {
            command: "definitely-not-an-installed-engine".to_string(),
            extra_args: Vec::new(),
        });
        let invocation = EngineInvocation::Script {
            path: PathBuf::from("_temp.py"),
            interactive: false,
        };
        let error = engine
            .run(&invocation, Path::new("."))
            .expect_err("engine cannot start");
        assert!(matches!(error, OrchestratorError::EngineLaunch { .. }));
    }

    #[test]
    fn only_zero_is_success() {
        assert!(EngineExit { code: Some(0) }.success());
        assert!(!EngineExit { code: Some(1) }.success());
        assert!(!EngineExit { code: None }.success());
    }
}
