//! Runtime configuration for the engine and the example orchestrator.

use std::path::PathBuf;

/// Environment variable the binaries read the engine executable from.
pub const ENGINE_ENV: &str = "SUPERCOMPRESSIBLE_ENGINE";

/// Default engine executable.
pub const DEFAULT_ENGINE: &str = "abaqus";

/// How the external engine is launched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Executable of the engine.
    pub command: String,
    /// Arguments placed before the invocation-specific ones.
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_ENGINE.to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// Library the example scripts import, copied next to them when absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupportLibrary {
    /// Directory name the scripts import.
    pub name: String,
    /// Directory holding the library sources.
    pub source: PathBuf,
}

/// Naming and cleanup policy of the example orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Base name of staging directories.
    pub staging_base: String,
    /// Base name of the disposable entry script.
    pub entry_script: String,
    /// Base name of the temporary support directory.
    pub support_dir_base: String,
    /// Library to stage when the working directory lacks it.
    pub support_library: Option<SupportLibrary>,
    /// Prefixes of engine scratch files removed after a run.
    pub scratch_prefixes: Vec<String>,
    /// Extensions of engine scratch files removed after a run.
    pub scratch_extensions: Vec<String>,
    /// Engine launch settings.
    pub engine: EngineConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            staging_base: "simulation".to_string(),
            entry_script: "_temp.py".to_string(),
            support_dir_base: "_temp".to_string(),
            support_library: None,
            scratch_prefixes: vec!["abaqus.rpy".to_string(), "abaqus_acis".to_string()],
            scratch_extensions: ["rec", "dmp", "exception", "SMABulk"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            engine: EngineConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Whether a file name matches one of the scratch patterns.
    #[must_use]
    pub fn is_scratch(&self, file_name: &str) -> bool {
        self.scratch_prefixes
            .iter()
            .any(|prefix| file_name.starts_with(prefix.as_str()))
            || file_name.rsplit_once('.').map_or(false, |(_, extension)| {
                self.scratch_extensions
                    .iter()
                    .any(|candidate| candidate == extension)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_scratch_files() {
        let config = OrchestratorConfig::default();
        assert!(config.is_scratch("abaqus.rpy"));
        assert!(config.is_scratch("abaqus.rpy.12"));
        assert!(config.is_scratch("abaqus_acis.log"));
        assert!(config.is_scratch("Simul.rec"));
        assert!(config.is_scratch("core.dmp"));
        assert!(!config.is_scratch("Simul.inp"));
        assert!(!config.is_scratch("recipe"));
    }

    #[test]
    fn engine_defaults_to_abaqus() {
        assert_eq!(EngineConfig::default().command, "abaqus");
    }
}
