//! Seeding the continuation deck with a scaled buckling-mode imperfection.

use std::path::Path;

use tracing::info;

use crate::deck::{InputDeck, INTERACTIONS_ANCHOR};
use crate::errors::InjectionError;
use crate::results::ResultRecord;

/// Imperfection to splice into an input deck.
#[derive(Clone, Debug, PartialEq)]
pub struct ImperfectionDirective {
    /// Job whose results file holds the mode shape.
    pub source_job_id: String,
    /// Eigenmode used as the imperfection shape.
    pub mode_id: usize,
    /// Scale applied to the normalised mode shape.
    pub amplitude_factor: f64,
}

impl ImperfectionDirective {
    /// Derive the directive from a previous stage's results.
    ///
    /// The amplitude factor is `imperfection_fraction` divided by the magnitude
    /// of the displacement recorded for `mode_id`.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::MissingReference`] when the record holds no
    /// displacement at `mode_id` and [`InjectionError::ZeroReference`] when that
    /// displacement is zero.
    ///
    /// # Examples
    /// ```
    /// use supercompressible::{ImperfectionDirective, ResultRecord};
    ///
    /// let record = ResultRecord {
    ///     job_id: "Simul_SUPERCOMPRESSIBLE_LIN_BUCKLE".to_string(),
    ///     feasible: true,
    ///     displacement_history: vec![0.0, -4.0],
    ///     loads: Vec::new(),
    ///     eigen_mode_id: 1,
    /// };
    /// let directive = ImperfectionDirective::from_record(&record, "buckle", 1, 0.5)
    ///     .expect("reference displacement available");
    /// assert_eq!(directive.amplitude_factor, 0.125);
    /// ```
    pub fn from_record(
        record: &ResultRecord,
        source_job_id: &str,
        mode_id: usize,
        imperfection_fraction: f64,
    ) -> Result<Self, InjectionError> {
        let reference = record
            .displacement(mode_id)
            .ok_or(InjectionError::MissingReference { mode_id })?
            .abs();
        if reference == 0.0 {
            return Err(InjectionError::ZeroReference { mode_id });
        }
        Ok(Self {
            source_job_id: source_job_id.to_string(),
            mode_id,
            amplitude_factor: imperfection_fraction / reference,
        })
    }

    /// Header and data line, in deck order.
    #[must_use]
    pub fn to_lines(&self) -> [String; 2] {
        [
            format!("*IMPERFECTION, FILE={}, STEP=1", self.source_job_id),
            format!("{}, {}", self.mode_id, self.amplitude_factor),
        ]
    }
}

/// Index of the last line exactly equal to the interactions anchor.
fn find_anchor(lines: &[String]) -> Option<usize> {
    lines.iter().rposition(|line| line == INTERACTIONS_ANCHOR)
}

/// Splice `directive` into `lines` two lines after the last anchor.
///
/// # Errors
///
/// Returns [`InjectionError::AnchorNotFound`] when no line equals the anchor;
/// `lines` is left untouched in that case.
pub fn splice(
    mut lines: Vec<String>,
    directive: &ImperfectionDirective,
) -> Result<Vec<String>, InjectionError> {
    let anchor = find_anchor(&lines).ok_or(InjectionError::AnchorNotFound {
        anchor: INTERACTIONS_ANCHOR,
    })?;
    // an anchor on the last line appends instead of overrunning the deck
    let position = (anchor + 2).min(lines.len());
    for line in directive.to_lines().into_iter().rev() {
        lines.insert(position, line);
    }
    Ok(lines)
}

/// Compute the imperfection from `record` and splice it into `artifact_text`.
///
/// Exactly two lines are added; every other line keeps its content and order.
///
/// # Errors
///
/// Returns the first [`InjectionError`] raised while deriving the directive or
/// locating the anchor. The input is never partially modified.
///
/// # Examples
/// ```
/// use supercompressible::{inject, ResultRecord};
///
/// let record = ResultRecord {
///     job_id: "buckle".to_string(),
///     feasible: true,
///     displacement_history: vec![0.0, 2.0],
///     loads: Vec::new(),
///     eigen_mode_id: 1,
/// };
/// let lines: Vec<String> = ["*Heading", "** INTERACTIONS", "**", "*Contact Pair"]
///     .iter()
///     .map(|line| line.to_string())
///     .collect();
/// let seeded = inject(lines, &record, "buckle", 1, 0.1).expect("anchor present");
/// assert_eq!(seeded[3], "*IMPERFECTION, FILE=buckle, STEP=1");
/// assert_eq!(seeded[4], "1, 0.05");
/// assert_eq!(seeded[5], "*Contact Pair");
/// ```
pub fn inject(
    artifact_text: Vec<String>,
    record: &ResultRecord,
    source_job_id: &str,
    mode_id: usize,
    imperfection_fraction: f64,
) -> Result<Vec<String>, InjectionError> {
    let directive =
        ImperfectionDirective::from_record(record, source_job_id, mode_id, imperfection_fraction)?;
    splice(artifact_text, &directive)
}

/// Read the deck at `path`, seed it and write it back in place.
///
/// Nothing is written unless the injection succeeds.
///
/// # Errors
///
/// Returns [`InjectionError::Io`] when the deck cannot be read or written, and
/// any error raised by [`inject`].
pub fn inject_file(
    path: &Path,
    record: &ResultRecord,
    source_job_id: &str,
    mode_id: usize,
    imperfection_fraction: f64,
) -> Result<ImperfectionDirective, InjectionError> {
    let io_error = |source| InjectionError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut deck = InputDeck::read(path).map_err(io_error)?;
    let directive =
        ImperfectionDirective::from_record(record, source_job_id, mode_id, imperfection_fraction)?;
    let seeded = splice(std::mem::take(deck.lines_mut()), &directive)?;
    *deck.lines_mut() = seeded;
    deck.write(path).map_err(io_error)?;

    info!(
        path = %path.display(),
        source = source_job_id,
        amplitude = directive.amplitude_factor,
        "seeded imperfection"
    );
    Ok(directive)
}
