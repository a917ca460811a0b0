//! Running example scripts inside the external engine.
//!
//! A run locates the example below a search root, stages a durable
//! `simulation` directory for its output, optionally stages a temporary copy
//! of the support library, writes a disposable entry script and hands that
//! script to the engine. Everything except the staging directory is removed
//! again however the run ends.
//!
//! Runs are not meant to overlap on the same working directory: allocation of
//! staging names and reuse of the most recent directory take no locks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{OrchestratorConfig, SupportLibrary};
use crate::engine::{CommandEngine, Engine, EngineInvocation};
use crate::errors::OrchestratorError;

/// Explicit replacement for the process working directory.
///
/// The orchestrator never changes the process' own working directory; every
/// path it stages is resolved against this context instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunContext {
    /// Directory the run starts from and returns to.
    pub working_dir: PathBuf,
}

impl RunContext {
    /// Context rooted at `working_dir`.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Context rooted at the process' current directory.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the current directory is unavailable.
    pub fn current() -> io::Result<Self> {
        std::env::current_dir().map(Self::new)
    }
}

/// Located example script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExampleLocation {
    /// Directory holding the script.
    pub directory: PathBuf,
    /// Module name of the script (its file stem).
    pub module: String,
}

/// Paths staged for a single run.
///
/// Dropping the value removes the entry script and the temporary support
/// directory; the staging directory is kept as the run's output.
#[derive(Debug)]
pub struct StagedRun<'a> {
    /// Root the example was searched under.
    pub search_root: PathBuf,
    /// Durable output directory of the run.
    pub staging_dir: PathBuf,
    /// Disposable entry script.
    pub entry_script: PathBuf,
    /// Temporary copy of the support library, if one was needed.
    pub temp_support_dir: Option<PathBuf>,
    /// Working directory the engine runs in.
    working_dir: PathBuf,
    /// Scratch-file policy.
    config: &'a OrchestratorConfig,
}

impl Drop for StagedRun<'_> {
    fn drop(&mut self) {
        clean_scratch_files(&self.working_dir, self.config);
        match fs::remove_file(&self.entry_script) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(path = %self.entry_script.display(), %error, "failed to remove entry script"),
        }
        if let Some(dir) = &self.temp_support_dir {
            if let Err(error) = fs::remove_dir_all(dir) {
                warn!(path = %dir.display(), %error, "failed to remove support directory");
            }
        }
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Example file name that was run.
    pub example: String,
    /// Directory holding the run's output.
    pub staging_dir: PathBuf,
}

/// Normalise an example name to a script file name with the `.py` extension.
///
/// # Examples
/// ```
/// use supercompressible::normalize_example_name;
///
/// assert_eq!(normalize_example_name("supercompressible_riks"), "supercompressible_riks.py");
/// assert_eq!(normalize_example_name("Lin_Buckle.py"), "Lin_Buckle.py");
/// ```
#[must_use]
pub fn normalize_example_name(example_name: &str) -> String {
    let stem = match example_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => example_name,
    };
    format!("{stem}.py")
}

/// Find the first file below `search_root` named `file_name`, ignoring case.
///
/// Directories are traversed depth first with entries sorted by name, so the
/// result does not depend on the file system's listing order.
///
/// # Errors
///
/// Returns [`OrchestratorError::ExampleNotFound`] when nothing matches.
pub fn find_example(
    search_root: &Path,
    file_name: &str,
) -> Result<ExampleLocation, OrchestratorError> {
    let wanted = file_name.to_lowercase();
    let found = WalkDir::new(search_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                debug!(%error, "skipping unreadable entry");
                None
            }
        })
        .find(|entry| {
            entry.file_type().is_file()
                && entry.file_name().to_string_lossy().to_lowercase() == wanted
        });

    let Some(entry) = found else {
        return Err(OrchestratorError::ExampleNotFound {
            name: file_name.to_string(),
            root: search_root.to_path_buf(),
        });
    };
    let path = entry.path();
    Ok(ExampleLocation {
        directory: path.parent().map_or_else(PathBuf::new, Path::to_path_buf),
        module: path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })
}

/// First name derived from `name` that does not exist in `dir`.
///
/// Suffixes `_1`, `_2`, ... are inserted before the extension.
#[must_use]
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, format!(".{extension}")),
        _ => (name, String::new()),
    };
    (1..)
        .map(|index| dir.join(format!("{stem}_{index}{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(candidate)
}

/// Whether `name` is `base` or `base_<number>`.
fn is_staging_name(name: &str, base: &str) -> bool {
    match name.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('_')
            .map_or(false, |digits| {
                !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
            }),
        None => false,
    }
}

/// Most recently modified staging directory in `working_dir`.
fn most_recent_staging_dir(working_dir: &Path, base: &str) -> io::Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(working_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !entry.file_type()?.is_dir() || !is_staging_name(&name.to_string_lossy(), base) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(time, _)| modified >= *time) {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Choose and, when needed, create the staging directory.
///
/// With `reuse_same_dir` the most recently modified directory named `base` or
/// `base_<n>` is returned as is. Otherwise, or when none exists, a fresh
/// directory with the first free name is created.
///
/// # Errors
///
/// Returns [`OrchestratorError::Staging`] when the directory cannot be listed
/// or created.
pub fn allocate_staging_dir(
    working_dir: &Path,
    base: &str,
    reuse_same_dir: bool,
) -> Result<PathBuf, OrchestratorError> {
    if reuse_same_dir {
        let recent = most_recent_staging_dir(working_dir, base).map_err(|source| {
            OrchestratorError::Staging {
                path: working_dir.to_path_buf(),
                source,
            }
        })?;
        if let Some(dir) = recent {
            debug!(path = %dir.display(), "reusing staging directory");
            return Ok(dir);
        }
    }
    let dir = unique_path(working_dir, base);
    fs::create_dir(&dir).map_err(|source| OrchestratorError::Staging {
        path: dir.clone(),
        source,
    })?;
    debug!(path = %dir.display(), "created staging directory");
    Ok(dir)
}

/// Recursively copy `source` into `target`.
fn copy_dir(source: &Path, target: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}

/// Quote `value` as a single-quoted script string literal.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Inputs of the disposable entry script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryScript<'a> {
    /// Located example.
    pub example: &'a ExampleLocation,
    /// Directory the example runs in.
    pub staging_dir: &'a Path,
    /// Temporary support directory added to the import path.
    pub temp_support_dir: Option<&'a Path>,
}

impl EntryScript<'_> {
    /// Script text.
    ///
    /// The script extends the import path with the initial directory, the
    /// example's directory and the support directory, runs the example as
    /// `__main__` from the staging directory and always returns to the
    /// initial directory.
    #[must_use]
    pub fn render(&self) -> String {
        let temp_dir = self
            .temp_support_dir
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lines = [
            "import os".to_string(),
            "import runpy".to_string(),
            "import sys".to_string(),
            "initial_wd = os.getcwd()".to_string(),
            format!("temp_dir_name = {}", quoted(&temp_dir)),
            "sys.path.append(initial_wd)".to_string(),
            format!(
                "sys.path.append(os.path.join(initial_wd, {}))",
                quoted(&self.example.directory.to_string_lossy())
            ),
            "if temp_dir_name:".to_string(),
            "    sys.path.append(os.path.join(initial_wd, temp_dir_name))".to_string(),
            format!("os.chdir({})", quoted(&self.staging_dir.to_string_lossy())),
            "try:".to_string(),
            format!(
                "    runpy.run_module({}, run_name='__main__')",
                quoted(&self.example.module)
            ),
            "finally:".to_string(),
            "    os.chdir(initial_wd)".to_string(),
        ];
        let mut script = lines.join("\n");
        script.push('\n');
        script
    }
}

/// Remove engine scratch files left in `dir`; failures are only logged.
fn clean_scratch_files(dir: &Path, config: &OrchestratorConfig) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(path = %dir.display(), %error, "failed to list scratch files");
            return;
        }
    };
    for entry in entries.flatten() {
        let is_file = entry.file_type().map_or(false, |kind| kind.is_file());
        if is_file && config.is_scratch(&entry.file_name().to_string_lossy()) {
            if let Err(error) = fs::remove_file(entry.path()) {
                warn!(path = %entry.path().display(), %error, "failed to remove scratch file");
            }
        }
    }
}

/// Runs example scripts through an [`Engine`].
#[derive(Debug)]
pub struct Orchestrator<E> {
    /// Naming and cleanup policy.
    config: OrchestratorConfig,
    /// Engine the entry script is handed to.
    engine: E,
    /// Working directory of the run.
    context: RunContext,
}

impl Orchestrator<CommandEngine> {
    /// Orchestrator launching the engine configured in `config`.
    #[must_use]
    pub fn from_config(config: OrchestratorConfig, context: RunContext) -> Self {
        let engine = CommandEngine::new(config.engine.clone());
        Self::new(config, engine, context)
    }
}

impl<E: Engine> Orchestrator<E> {
    /// Orchestrator using `engine` from `context`.
    #[must_use]
    pub fn new(config: OrchestratorConfig, engine: E, context: RunContext) -> Self {
        Self {
            config,
            engine,
            context,
        }
    }

    /// Engine the orchestrator launches.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Stage the support library when the working directory lacks a copy.
    fn stage_support(
        &self,
        staged: &mut StagedRun<'_>,
        library: &SupportLibrary,
    ) -> Result<(), OrchestratorError> {
        let working_dir = &self.context.working_dir;
        if working_dir.join(&library.name).exists() {
            return Ok(());
        }
        let dir = unique_path(working_dir, &self.config.support_dir_base);
        fs::create_dir(&dir).map_err(|source| OrchestratorError::Staging {
            path: dir.clone(),
            source,
        })?;
        staged.temp_support_dir = Some(dir.clone());
        let target = dir.join(&library.name);
        copy_dir(&library.source, &target)
            .map_err(|source| OrchestratorError::Staging { path: target, source })?;
        debug!(path = %dir.display(), "staged support library");
        Ok(())
    }

    /// Run `example_name` found below `search_root` through the engine.
    ///
    /// The entry script, the temporary support directory and engine scratch
    /// files are removed on every exit path once staging has begun.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::ExampleNotFound`] when no script matches,
    /// [`OrchestratorError::Staging`] when paths cannot be prepared,
    /// [`OrchestratorError::EngineLaunch`] when the engine does not start and
    /// [`OrchestratorError::EngineFailure`] when it exits unsuccessfully.
    pub fn run(
        &self,
        search_root: &Path,
        example_name: &str,
        reuse_same_dir: bool,
        interactive: bool,
    ) -> Result<RunSummary, OrchestratorError> {
        let example = normalize_example_name(example_name);
        let location = find_example(search_root, &example)?;
        info!(example = %example, directory = %location.directory.display(), "located example");

        let working_dir = &self.context.working_dir;
        let staging_dir =
            allocate_staging_dir(working_dir, &self.config.staging_base, reuse_same_dir)?;
        let mut staged = StagedRun {
            search_root: search_root.to_path_buf(),
            staging_dir,
            entry_script: unique_path(working_dir, &self.config.entry_script),
            temp_support_dir: None,
            working_dir: working_dir.clone(),
            config: &self.config,
        };
        if let Some(library) = &self.config.support_library {
            self.stage_support(&mut staged, library)?;
        }

        let script = EntryScript {
            example: &location,
            staging_dir: &staged.staging_dir,
            temp_support_dir: staged.temp_support_dir.as_deref(),
        }
        .render();
        fs::write(&staged.entry_script, script).map_err(|source| OrchestratorError::Staging {
            path: staged.entry_script.clone(),
            source,
        })?;

        let invocation = EngineInvocation::Script {
            path: staged.entry_script.clone(),
            interactive,
        };
        let exit = self.engine.run(&invocation, working_dir)?;
        let module = location.module;
        if !exit.success() {
            return Err(OrchestratorError::EngineFailure {
                example: module,
                code: exit.code,
            });
        }

        info!("'{module}' successfully run");
        Ok(RunSummary {
            example,
            staging_dir: staged.staging_dir.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn staging_names_follow_suffix_pattern() {
        assert!(is_staging_name("simulation", "simulation"));
        assert!(is_staging_name("simulation_12", "simulation"));
        assert!(!is_staging_name("simulation_", "simulation"));
        assert!(!is_staging_name("simulation_x", "simulation"));
        assert!(!is_staging_name("simulations", "simulation"));
    }

    #[test]
    fn unique_path_inserts_suffix_before_extension() {
        let dir = tempdir().expect("temporary directory");
        assert_eq!(unique_path(dir.path(), "_temp.py"), dir.path().join("_temp.py"));
        fs::write(dir.path().join("_temp.py"), "").expect("file written");
        fs::write(dir.path().join("_temp_1.py"), "").expect("file written");
        assert_eq!(unique_path(dir.path(), "_temp.py"), dir.path().join("_temp_2.py"));
    }

    #[test]
    fn fresh_staging_never_overwrites() {
        let dir = tempdir().expect("temporary directory");
        fs::create_dir(dir.path().join("simulation")).expect("directory created");
        fs::write(dir.path().join("simulation").join("keep.txt"), "data").expect("file written");

        let staged = allocate_staging_dir(dir.path(), "simulation", false).expect("staged");
        assert_eq!(staged, dir.path().join("simulation_1"));
        assert!(staged.is_dir());
        assert!(dir.path().join("simulation").join("keep.txt").exists());
    }

    #[test]
    fn reuse_without_candidates_creates_directory() {
        let dir = tempdir().expect("temporary directory");
        let staged = allocate_staging_dir(dir.path(), "simulation", true).expect("staged");
        assert_eq!(staged, dir.path().join("simulation"));
        assert!(staged.is_dir());
    }

    #[test]
    fn entry_script_quotes_paths() {
        let location = ExampleLocation {
            directory: PathBuf::from(r"C:\examples\it's"),
            module: "supercompressible_riks".to_string(),
        };
        let script = EntryScript {
            example: &location,
            staging_dir: Path::new("simulation_1"),
            temp_support_dir: None,
        }
        .render();
        assert!(script.contains(r"sys.path.append(os.path.join(initial_wd, 'C:\\examples\\it\'s'))"));
        assert!(script.contains("temp_dir_name = ''"));
        assert!(script.contains("os.chdir('simulation_1')"));
        assert!(script.contains("runpy.run_module('supercompressible_riks', run_name='__main__')"));
        assert!(script.ends_with("    os.chdir(initial_wd)\n"));
    }
}
