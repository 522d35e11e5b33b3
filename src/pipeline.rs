//! Pipeline - one participant from raw sources to report
//!
//! ## Stages
//!
//! ```text
//! RAW ──ingest──▶ VALIDATED ──analyze──▶ ANALYZED ──correct──▶ CORRECTED
//!                                                                  │
//!                      REPORTED ◀──aggregate── INTEGRATED ◀──integrate
//! ```
//!
//! The analysis stage also compares response times across run kinds; the
//! report omits that comparison when fewer than two run kinds have enough
//! trials.
//!
//! Run and contrast failures are recorded in the report. Two conditions stop
//! the pipeline without a report: no valid trial after ingestion
//! (`Error::NoValidTrials`) and no computable contrast
//! (`Error::NoComputableContrasts`).

use std::fmt;

use chrono::{DateTime, Utc};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::correction::correct;
use crate::ingest::{ingest, RawRun};
use crate::report::{aggregate, Provenance, Report};
use crate::spatial::{integrate, SpatialMetadata};
use crate::stats::{analyze, compare_run_kinds, ContrastOutcome, ContrastSpec, Measure};
use crate::{Error, Result};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Raw sources received
    Raw,
    /// Trial table and quality report built
    Validated,
    /// Contrasts computed or skipped
    Analyzed,
    /// q-values assigned
    Corrected,
    /// Spatial annotations attached
    Integrated,
    /// Report assembled
    Reported,
}

impl PipelineStage {
    /// Stage that follows this one; `None` after `Reported`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Raw => Some(Self::Validated),
            Self::Validated => Some(Self::Analyzed),
            Self::Analyzed => Some(Self::Corrected),
            Self::Corrected => Some(Self::Integrated),
            Self::Integrated => Some(Self::Reported),
            Self::Reported => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Raw => "RAW",
            Self::Validated => "VALIDATED",
            Self::Analyzed => "ANALYZED",
            Self::Corrected => "CORRECTED",
            Self::Integrated => "INTEGRATED",
            Self::Reported => "REPORTED",
        };
        f.write_str(name)
    }
}

/// Raw inputs of one participant for [`Pipeline::run_many`].
#[derive(Debug, Clone)]
pub struct ParticipantRuns {
    /// Participant identifier
    pub participant_id: String,
    /// Raw runs
    pub runs: Vec<RawRun>,
}

impl ParticipantRuns {
    /// Bundle a participant's runs
    pub fn new(participant_id: impl Into<String>, runs: Vec<RawRun>) -> Self {
        Self {
            participant_id: participant_id.into(),
            runs,
        }
    }
}

/// Single-participant pipeline.
///
/// # Example
///
/// ```rust
/// use toolrep::config::PipelineConfig;
/// use toolrep::pipeline::Pipeline;
/// use toolrep::spatial::SpatialMetadata;
/// use toolrep::stats::ContrastSpec;
/// use toolrep::Error;
///
/// let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
/// let result = pipeline.run(
///     "S01",
///     &[],
///     &ContrastSpec::research_questions(),
///     &SpatialMetadata::study_defaults(),
/// );
/// assert!(matches!(result, Err(Error::NoValidTrials { .. })));
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    generated_at: Option<DateTime<Utc>>,
}

impl Pipeline {
    /// Create a pipeline.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration is out of range.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            generated_at: None,
        })
    }

    /// Stamp every report with a generation time
    #[must_use]
    pub const fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    /// Configuration
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all stages for one participant.
    ///
    /// # Errors
    ///
    /// - `Error::NoValidTrials` if every run was rejected
    /// - `Error::NoComputableContrasts` if every contrast was skipped, or
    ///   `specs` is empty
    #[tracing::instrument(skip(self, runs, specs, spatial), fields(runs = runs.len()))]
    pub fn run(
        &self,
        participant_id: &str,
        runs: &[RawRun],
        specs: &[ContrastSpec],
        spatial: &SpatialMetadata,
    ) -> Result<Report> {
        let (table, quality) = ingest(participant_id, runs, &self.config);
        if table.is_empty() {
            return Err(halt(
                PipelineStage::Raw,
                Error::NoValidTrials {
                    participant_id: participant_id.to_string(),
                    failed_runs: quality.run_failures().len(),
                },
            ));
        }
        enter(PipelineStage::Validated);

        let (computed, skipped) = ContrastOutcome::partition(analyze(&table, specs, &self.config));
        if computed.is_empty() {
            return Err(halt(
                PipelineStage::Validated,
                Error::NoComputableContrasts {
                    participant_id: participant_id.to_string(),
                    skipped: skipped.len(),
                },
            ));
        }
        let run_kind_comparison =
            match compare_run_kinds(&table, Measure::ResponseTime, &self.config) {
                Ok(comparison) => Some(comparison),
                Err(error) => {
                    debug!(%error, "run-kind comparison left out");
                    None
                }
            };
        enter(PipelineStage::Analyzed);

        let corrected = correct(&computed, self.config.alpha())?;
        enter(PipelineStage::Corrected);

        let activations = integrate(&corrected, spatial);
        enter(PipelineStage::Integrated);

        let mut provenance = Provenance::new(
            participant_id,
            self.config.clone(),
            specs.iter().map(|s| s.name().to_string()).collect(),
        );
        if let Some(generated_at) = self.generated_at {
            provenance = provenance.with_timestamp(generated_at);
        }
        let mut report = aggregate(quality, activations, skipped, provenance);
        if let Some(comparison) = run_kind_comparison {
            report = report.with_run_kind_comparison(comparison);
        }
        enter(PipelineStage::Reported);

        info!(
            significant = report.significant_activations().count(),
            skipped = report.skipped().len(),
            "pipeline complete"
        );
        Ok(report)
    }

    /// Run independent pipelines for several participants.
    ///
    /// Returns one result per participant in input order. With the `rayon`
    /// feature participants are processed in parallel.
    #[must_use]
    pub fn run_many(
        &self,
        participants: &[ParticipantRuns],
        specs: &[ContrastSpec],
        spatial: &SpatialMetadata,
    ) -> Vec<Result<Report>> {
        let run_one =
            |p: &ParticipantRuns| self.run(&p.participant_id, &p.runs, specs, spatial);

        #[cfg(feature = "rayon")]
        let reports: Vec<Result<Report>> = participants.par_iter().map(run_one).collect();
        #[cfg(not(feature = "rayon"))]
        let reports: Vec<Result<Report>> = participants.iter().map(run_one).collect();

        reports
    }
}

fn enter(stage: PipelineStage) {
    debug!(%stage, "stage entered");
}

fn halt(stage: PipelineStage, error: Error) -> Error {
    warn!(%stage, %error, "pipeline halted");
    error
}
