//! Ingestion & validation
//!
//! Turns the raw per-run sources of one participant into the canonical
//! [`TrialTable`] plus a [`QualityReport`].
//!
//! ## Partial failure
//!
//! Each run is validated on its own. A `Validation` or `DataIntegrity` error
//! excludes that run only and is recorded as a [`RunFailure`]. Onset
//! disagreements above the tolerance become [`SyncFlag`]s and never drop a
//! trial. Negative or outlying stimulus durations become [`DurationFlag`]s.
//!
//! ## Usage
//!
//! ```rust
//! use toolrep::config::PipelineConfig;
//! use toolrep::ingest::{ingest, BehavioralEvent, RawRun, TimingEvent};
//! use toolrep::trial::RunKind;
//!
//! let run = RawRun::new(1, RunKind::PassiveViewing)
//!     .with_behavioral(vec![
//!         BehavioralEvent::new("tool", 2.0).with_response(540.0, true),
//!         BehavioralEvent::new("shape", 6.0).with_response(505.0, true),
//!     ])
//!     .with_timing(vec![TimingEvent::new("tool", 2.0), TimingEvent::new("shape", 6.2)]);
//!
//! let (table, quality) = ingest("S01", &[run], &PipelineConfig::default());
//! assert_eq!(table.len(), 2);
//! assert_eq!(quality.sync_flags().len(), 1); // 200 ms > 50 ms tolerance
//! ```

pub mod afni;
mod quality;
mod source;
mod validate;

pub use quality::{
    duration_flags, DurationFlag, DurationIssue, MissingValueCounts, QualityReport, RunFailure,
    RunFailureKind, SyncFlag,
};
pub use source::{BehavioralEvent, RawRun, TimingEvent};
pub use validate::validate_run;

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::trial::TrialTable;
use crate::Error;

/// Ingest all runs of one participant.
///
/// Never fails as a whole: run-level errors are recorded in the returned
/// quality report. Whether an empty table is fatal is decided by the caller
/// (see [`Pipeline`](crate::pipeline::Pipeline)).
#[must_use]
#[tracing::instrument(skip(runs, config), fields(runs = runs.len()))]
pub fn ingest(
    participant_id: &str,
    runs: &[RawRun],
    config: &PipelineConfig,
) -> (TrialTable, QualityReport) {
    let mut trials = Vec::new();
    let mut failures = Vec::new();
    let mut seen_runs = BTreeSet::new();
    let mut durations = Vec::new();
    let attempted: usize = runs.iter().map(RawRun::attempted_trials).sum();

    for run in runs {
        let result = if seen_runs.insert(run.run_number) {
            validate_run(participant_id, run)
        } else {
            Err(Error::DataIntegrity {
                run_number: run.run_number,
                message: "duplicate run number for participant".to_string(),
            })
        };

        match result {
            Ok(run_trials) => {
                debug!(
                    run_number = run.run_number,
                    run_kind = %run.run_kind,
                    trials = run_trials.len(),
                    "run validated"
                );
                // Validated trials are in logged order, one per timing event
                durations.extend(run_trials.iter().zip(&run.timing).filter_map(|(trial, timing)| {
                    timing
                        .duration
                        .map(|d| (run.run_number, trial.trial_number(), d))
                }));
                trials.extend(run_trials);
            }
            Err(error) => {
                warn!(run_number = run.run_number, %error, "run excluded");
                if let Some(failure) = RunFailure::from_error(&error) {
                    failures.push(failure);
                }
            }
        }
    }

    let table = TrialTable::new(trials);
    let sync_flags = synchronization_flags(&table, config.timing_tolerance_ms());
    if !sync_flags.is_empty() {
        warn!(
            flags = sync_flags.len(),
            tolerance_ms = config.timing_tolerance_ms(),
            "timing synchronization flags raised"
        );
    }

    let quality = QualityReport::assess(
        &table,
        attempted,
        sync_flags,
        failures,
        config.quality_weights(),
    )
    .with_duration_flags(duration_flags(&durations));
    if !quality.duration_flags().is_empty() {
        warn!(
            flags = quality.duration_flags().len(),
            "stimulus duration flags raised"
        );
    }
    info!(
        trials = quality.total_trials(),
        failed_runs = quality.run_failures().len(),
        score = quality.quality_score(),
        "ingestion complete"
    );
    (table, quality)
}

/// Flag every trial whose source onsets differ by more than `tolerance_ms`.
#[must_use]
pub fn synchronization_flags(table: &TrialTable, tolerance_ms: f64) -> Vec<SyncFlag> {
    table
        .iter()
        .filter(|t| t.onset_delta_ms() > tolerance_ms)
        .map(|t| SyncFlag {
            participant_id: t.participant_id().to_string(),
            run_number: t.run_number(),
            trial_number: t.trial_number(),
            behavioral_onset: t.onset_time(),
            timing_onset: t.timing_onset(),
            delta_ms: t.onset_delta_ms(),
        })
        .collect()
}
