//! Error types for toolrep
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Run-level errors (`Validation`, `DataIntegrity`) and contrast-level errors
//! (`InsufficientData`, `Computation`) are isolated by the pipeline and
//! recorded in the report. Only `NoValidTrials` and `NoComputableContrasts`
//! stop a pipeline.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// toolrep error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing required field in a raw source
    #[error("Validation error in run {run_number}: {message}")]
    Validation {
        /// Run the malformed record belongs to
        run_number: u32,
        /// What was wrong
        message: String,
    },

    /// Duplicate key, non-monotonic onsets or source mismatch
    #[error("Data integrity error in run {run_number}: {message}\nRun excluded from the trial table")]
    DataIntegrity {
        /// Run that was excluded
        run_number: u32,
        /// What was inconsistent
        message: String,
    },

    /// A contrast group is below the minimum sample size
    #[error("Insufficient data for contrast '{contrast}': n_a={n_a}, n_b={n_b}, minimum={minimum}")]
    InsufficientData {
        /// Contrast name
        contrast: String,
        /// Observations in group A
        n_a: usize,
        /// Observations in group B
        n_b: usize,
        /// Configured minimum per group
        minimum: usize,
    },

    /// Degenerate statistics (e.g. zero variance in both groups)
    #[error("Computation error for contrast '{contrast}': {message}")]
    Computation {
        /// Contrast name
        contrast: String,
        /// Why the statistic is undefined
        message: String,
    },

    /// Ingestion produced an empty trial table
    #[error("No valid trials for participant '{participant_id}' ({failed_runs} run(s) failed)\nCheck the quality report run failures")]
    NoValidTrials {
        /// Participant being processed
        participant_id: String,
        /// Number of runs rejected during ingestion
        failed_runs: usize,
    },

    /// Every contrast was skipped
    #[error("No computable contrasts for participant '{participant_id}' ({skipped} skipped)")]
    NoComputableContrasts {
        /// Participant being processed
        participant_id: String,
        /// Number of skipped contrasts
        skipped: usize,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Arrow conversion error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True for errors that exclude a single run but leave the rest of the
    /// ingestion intact.
    #[must_use]
    pub const fn is_run_scoped(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::DataIntegrity { .. })
    }

    /// True for errors that skip a single contrast.
    #[must_use]
    pub const fn is_contrast_scoped(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::Computation { .. })
    }
}
