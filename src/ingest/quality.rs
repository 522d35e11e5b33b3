//! Quality Report - diagnostic summary of one ingestion pass

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::QualityWeights;
use crate::trial::{Condition, TrialTable};
use crate::Error;

/// A merged trial whose two onsets disagree by more than the tolerance.
///
/// Non-fatal: the trial stays in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncFlag {
    /// Participant the trial belongs to
    pub participant_id: String,
    /// Run number
    pub run_number: u32,
    /// Trial number
    pub trial_number: u32,
    /// Behavioral onset (s)
    pub behavioral_onset: f64,
    /// Timing-stream onset (s)
    pub timing_onset: f64,
    /// Absolute difference (ms)
    pub delta_ms: f64,
}

/// What is wrong with a stimulus duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationIssue {
    /// Duration below zero
    Negative,
    /// More than three standard deviations from the participant mean
    Outlier,
}

/// An accepted trial with a suspicious timing-stream duration.
///
/// Non-fatal and not part of the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationFlag {
    /// Run number
    pub run_number: u32,
    /// Trial number
    pub trial_number: u32,
    /// Recorded duration (s)
    pub duration: f64,
    /// Flag category
    pub issue: DurationIssue,
}

/// Flag negative durations and durations beyond three sample standard
/// deviations of the mean.
///
/// `durations` holds `(run_number, trial_number, duration)`. A negative
/// duration is reported as [`DurationIssue::Negative`] even when it is also
/// an outlier. Flags are ordered by run, then trial.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn duration_flags(durations: &[(u32, u32, f64)]) -> Vec<DurationFlag> {
    let n = durations.len();
    let spread = (n > 1).then(|| {
        let mean = durations.iter().map(|d| d.2).sum::<f64>() / n as f64;
        let variance =
            durations.iter().map(|d| (d.2 - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        (mean, variance.sqrt())
    });

    let mut flags: Vec<DurationFlag> = durations
        .iter()
        .filter_map(|&(run_number, trial_number, duration)| {
            let issue = if duration < 0.0 {
                DurationIssue::Negative
            } else if spread.is_some_and(|(mean, sd)| (duration - mean).abs() > 3.0 * sd) {
                DurationIssue::Outlier
            } else {
                return None;
            };
            Some(DurationFlag {
                run_number,
                trial_number,
                duration,
                issue,
            })
        })
        .collect();
    flags.sort_by_key(|f| (f.run_number, f.trial_number));
    flags
}

/// Category of a run-level ingestion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunFailureKind {
    /// Malformed or missing fields
    Validation,
    /// Duplicate key, ordering or cardinality violation
    DataIntegrity,
}

/// A run excluded from the trial table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Excluded run
    pub run_number: u32,
    /// Failure category
    pub kind: RunFailureKind,
    /// Human-readable reason
    pub message: String,
}

impl RunFailure {
    /// Record a run-scoped error. Returns `None` for errors that are not
    /// run-scoped.
    #[must_use]
    pub fn from_error(error: &Error) -> Option<Self> {
        match error {
            Error::Validation {
                run_number,
                message,
            } => Some(Self {
                run_number: *run_number,
                kind: RunFailureKind::Validation,
                message: message.clone(),
            }),
            Error::DataIntegrity {
                run_number,
                message,
            } => Some(Self {
                run_number: *run_number,
                kind: RunFailureKind::DataIntegrity,
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

/// Missing optional values among accepted trials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingValueCounts {
    /// Trials without a response time
    pub response_time: usize,
    /// Trials without an accuracy score
    pub accuracy: usize,
    /// Trials without an activation-proxy value
    pub activation: usize,
}

/// Quality Report for one ingestion call.
///
/// ## Composite score
///
/// ```text
/// score = (w_c * completeness_ratio + w_s * (1 - sync_flag_ratio)) / (w_c + w_s)
/// ```
///
/// `completeness_ratio` is accepted trials over attempted trials, and
/// `sync_flag_ratio` is flags over accepted trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    total_trials: usize,
    attempted_trials: usize,
    condition_counts: BTreeMap<Condition, usize>,
    missing_values: MissingValueCounts,
    sync_flags: Vec<SyncFlag>,
    #[serde(default)]
    duration_flags: Vec<DurationFlag>,
    run_failures: Vec<RunFailure>,
    completeness_ratio: f64,
    sync_flag_ratio: f64,
    quality_score: f64,
}

impl QualityReport {
    /// Assess a freshly ingested table.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn assess(
        table: &TrialTable,
        attempted_trials: usize,
        sync_flags: Vec<SyncFlag>,
        run_failures: Vec<RunFailure>,
        weights: QualityWeights,
    ) -> Self {
        let total_trials = table.len();
        let mut missing_values = MissingValueCounts::default();
        for trial in table {
            missing_values.response_time += usize::from(trial.response_time().is_none());
            missing_values.accuracy += usize::from(trial.accuracy().is_none());
            missing_values.activation += usize::from(trial.activation().is_none());
        }

        let (completeness_ratio, sync_flag_ratio, quality_score) = if total_trials == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let completeness = total_trials as f64 / attempted_trials.max(total_trials) as f64;
            let sync_ratio = sync_flags.len() as f64 / total_trials as f64;
            let weight_sum = weights.completeness + weights.synchronization;
            let score = weights
                .synchronization
                .mul_add(1.0 - sync_ratio, weights.completeness * completeness)
                / weight_sum;
            (completeness, sync_ratio, score)
        };

        Self {
            total_trials,
            attempted_trials,
            condition_counts: table.condition_counts(),
            missing_values,
            sync_flags,
            duration_flags: Vec::new(),
            run_failures,
            completeness_ratio,
            sync_flag_ratio,
            quality_score,
        }
    }

    /// Attach stimulus-duration diagnostics
    #[must_use]
    pub fn with_duration_flags(mut self, duration_flags: Vec<DurationFlag>) -> Self {
        self.duration_flags = duration_flags;
        self
    }

    /// Trials accepted into the table.
    #[must_use]
    pub const fn total_trials(&self) -> usize {
        self.total_trials
    }

    /// Trials the raw sources could have contributed.
    #[must_use]
    pub const fn attempted_trials(&self) -> usize {
        self.attempted_trials
    }

    /// Accepted trials per condition.
    #[must_use]
    pub const fn condition_counts(&self) -> &BTreeMap<Condition, usize> {
        &self.condition_counts
    }

    /// Missing optional values among accepted trials.
    #[must_use]
    pub const fn missing_values(&self) -> MissingValueCounts {
        self.missing_values
    }

    /// Timing-synchronization flags.
    #[must_use]
    pub fn sync_flags(&self) -> &[SyncFlag] {
        &self.sync_flags
    }

    /// Negative or outlying stimulus durations.
    #[must_use]
    pub fn duration_flags(&self) -> &[DurationFlag] {
        &self.duration_flags
    }

    /// Runs excluded during ingestion.
    #[must_use]
    pub fn run_failures(&self) -> &[RunFailure] {
        &self.run_failures
    }

    /// Accepted over attempted trials.
    #[must_use]
    pub const fn completeness_ratio(&self) -> f64 {
        self.completeness_ratio
    }

    /// Flags over accepted trials.
    #[must_use]
    pub const fn sync_flag_ratio(&self) -> f64 {
        self.sync_flag_ratio
    }

    /// Composite score in `[0, 1]`.
    #[must_use]
    pub const fn quality_score(&self) -> f64 {
        self.quality_score
    }
}
