//! Report Aggregator
//!
//! Assembles the quality report, annotated results and skipped contrasts of
//! one pipeline run into an immutable [`Report`].
//!
//! ## Schema Overview
//!
//! ```text
//! Report
//! ├── provenance        participant, config snapshot, contrast order, version
//! ├── quality           QualityReport (ingestion diagnostics)
//! ├── activations[]     ActivationRecord, in contrast order
//! ├── skipped[]         SkippedContrast, in contrast order
//! └── run_kind_comparison  RunKindComparison (absent when undefined)
//! ```
//!
//! The JSON form is lossless: `Report::from_json(&report.to_json()?)?`
//! equals the original report.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::ingest::QualityReport;
use crate::spatial::ActivationRecord;
use crate::stats::{RunKindComparison, SkippedContrast};
use crate::Result;

/// Where a report came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Participant the report describes
    pub participant_id: String,
    /// Configuration snapshot
    pub config: PipelineConfig,
    /// Contrast names in requested order
    pub contrast_order: Vec<String>,
    /// Version of this crate
    pub crate_version: String,
    /// Caller-supplied generation time; absent keeps output reproducible
    pub generated_at: Option<DateTime<Utc>>,
}

impl Provenance {
    /// Provenance without a timestamp
    pub fn new(
        participant_id: impl Into<String>,
        config: PipelineConfig,
        contrast_order: Vec<String>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            config,
            contrast_order,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: None,
        }
    }

    /// Attach a generation time
    #[must_use]
    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }
}

/// Final immutable output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    provenance: Provenance,
    quality: QualityReport,
    activations: Vec<ActivationRecord>,
    skipped: Vec<SkippedContrast>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_kind_comparison: Option<RunKindComparison>,
}

impl Report {
    /// Attach a run-kind comparison
    #[must_use]
    pub fn with_run_kind_comparison(mut self, comparison: RunKindComparison) -> Self {
        self.run_kind_comparison = Some(comparison);
        self
    }

    /// Provenance
    #[must_use]
    pub const fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Ingestion quality report
    #[must_use]
    pub const fn quality(&self) -> &QualityReport {
        &self.quality
    }

    /// Annotated results in contrast order
    #[must_use]
    pub fn activations(&self) -> &[ActivationRecord] {
        &self.activations
    }

    /// Skipped contrasts in contrast order
    #[must_use]
    pub fn skipped(&self) -> &[SkippedContrast] {
        &self.skipped
    }

    /// Analysis of variance across run kinds, when it was defined
    #[must_use]
    pub const fn run_kind_comparison(&self) -> Option<&RunKindComparison> {
        self.run_kind_comparison.as_ref()
    }

    /// Activation of a contrast by name
    #[must_use]
    pub fn activation(&self, contrast_name: &str) -> Option<&ActivationRecord> {
        self.activations
            .iter()
            .find(|a| a.contrast_name() == contrast_name)
    }

    /// Activations whose corrected result is significant
    pub fn significant_activations(&self) -> impl Iterator<Item = &ActivationRecord> {
        self.activations.iter().filter(|a| a.is_significant())
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a report produced by [`Report::to_json`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the text is not a report.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Assemble a report.
///
/// Activations and skipped contrasts are ordered by
/// `provenance.contrast_order`; names not listed there follow in their input
/// order.
#[must_use]
#[tracing::instrument(skip_all, fields(participant = %provenance.participant_id))]
pub fn aggregate(
    quality: QualityReport,
    mut activations: Vec<ActivationRecord>,
    mut skipped: Vec<SkippedContrast>,
    provenance: Provenance,
) -> Report {
    let rank: HashMap<&str, usize> = provenance
        .contrast_order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let position = |name: &str| rank.get(name).copied().unwrap_or(usize::MAX);

    // sort_by_key is stable
    activations.sort_by_key(|a| position(a.contrast_name()));
    skipped.sort_by_key(|s| position(&s.contrast_name));

    info!(
        activations = activations.len(),
        skipped = skipped.len(),
        "report assembled"
    );
    Report {
        provenance,
        quality,
        activations,
        skipped,
        run_kind_comparison: None,
    }
}
