//! Typed access to the results a finished analysis stage leaves behind.
//!
//! The engine-side post-processing writes `<job>_results.json` next to the
//! job's own files. While the engine is still running it holds a
//! `<job>.lck` lock file, which marks the results as incomplete.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::errors::ResultError;
use crate::geometry::Feasibility;

/// Location of a job's artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobArtifact {
    /// Job identifier, also the stem of its files.
    pub job_id: String,
    /// Directory the job ran in.
    pub directory: PathBuf,
}

impl JobArtifact {
    /// Refer to job `job_id` run in `directory`.
    #[must_use]
    pub fn new(job_id: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            job_id: job_id.into(),
            directory: directory.into(),
        }
    }

    /// Path of the post-processed results file.
    #[must_use]
    pub fn results_path(&self) -> PathBuf {
        self.directory.join(format!("{}_results.json", self.job_id))
    }

    /// Path of the engine's lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.directory.join(format!("{}.lck", self.job_id))
    }
}

/// Results of a completed analysis stage.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord {
    /// Job the record was read from.
    pub job_id: String,
    /// Whether the geometry may proceed to the next stage.
    pub feasible: bool,
    /// Maximum displacement magnitude, indexed by mode or increment.
    pub displacement_history: Vec<f64>,
    /// Reaction loads, indexed like the displacements.
    pub loads: Vec<f64>,
    /// Eigenmode the record refers to.
    pub eigen_mode_id: usize,
}

impl ResultRecord {
    /// Displacement magnitude recorded at `index`.
    #[must_use]
    pub fn displacement(&self, index: usize) -> Option<f64> {
        self.displacement_history.get(index).copied()
    }

    /// Largest reaction load magnitude, if any loads were recorded.
    #[must_use]
    pub fn peak_load(&self) -> Option<f64> {
        self.loads.iter().map(|load| load.abs()).reduce(f64::max)
    }

    /// Verdict to hand to the lattice generator of the next stage.
    #[must_use]
    pub fn feasibility(&self) -> Feasibility {
        Feasibility::Checked {
            job: self.job_id.clone(),
            coilable: self.feasible,
        }
    }
}

/// On-disk layout of the results file.
#[derive(Debug, Deserialize)]
struct RawResults {
    /// Coilability flag, written as a boolean or as `0`/`1`.
    #[serde(deserialize_with = "flag")]
    coilable: bool,
    #[serde(default)]
    max_disps: Vec<f64>,
    #[serde(default)]
    loads: Vec<f64>,
    mode: Option<usize>,
}

/// Accept `true`/`false` as well as numeric flags.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Number(value) => value != 0.0,
    })
}

/// Default eigenmode used when the results do not name one.
const DEFAULT_MODE: usize = 1;

/// Read the results of a finished job.
///
/// # Errors
///
/// Returns [`ResultError::MissingResult`] when the job is still locked, left no
/// results file, or recorded no displacements; [`ResultError::Malformed`] when
/// the file cannot be decoded; [`ResultError::Io`] for other read failures.
pub fn read(artifact: &JobArtifact) -> Result<ResultRecord, ResultError> {
    let missing = |reason: &str| ResultError::MissingResult {
        job: artifact.job_id.clone(),
        reason: reason.to_string(),
    };

    if artifact.lock_path().exists() {
        return Err(missing("the job has not completed"));
    }
    let path = artifact.results_path();
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Err(missing("no results file was written"));
        }
        Err(source) => return Err(ResultError::Io { path, source }),
    };
    let record = parse(&artifact.job_id, &text, &path)?;
    debug!(job = %artifact.job_id, feasible = record.feasible, "read result record");
    Ok(record)
}

/// Decode results text belonging to `job_id`.
fn parse(job_id: &str, text: &str, path: &Path) -> Result<ResultRecord, ResultError> {
    let raw: RawResults = serde_json::from_str(text).map_err(|source| ResultError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    // an infeasible geometry legitimately stops before producing displacements
    if raw.coilable && raw.max_disps.is_empty() {
        return Err(ResultError::MissingResult {
            job: job_id.to_string(),
            reason: "no displacement data was recorded".to_string(),
        });
    }
    Ok(ResultRecord {
        job_id: job_id.to_string(),
        feasible: raw.coilable,
        displacement_history: raw.max_disps,
        loads: raw.loads,
        eigen_mode_id: raw.mode.unwrap_or(DEFAULT_MODE),
    })
}
