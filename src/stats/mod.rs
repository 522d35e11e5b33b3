//! Statistical Analyzer
//!
//! Runs each [`ContrastSpec`] over the canonical trial table and returns one
//! [`ContrastOutcome`] per contrast, in input order.
//!
//! ## Skips
//!
//! A contrast whose group has fewer than `min_sample_size` observations, or
//! whose statistics are undefined, becomes [`ContrastOutcome::Skipped`]. The
//! remaining contrasts are unaffected.
//!
//! ## Run-kind comparison
//!
//! [`compare_run_kinds`] runs a one-way analysis of variance of one measure
//! across run kinds with pairwise post-hoc t-tests.
//!
//! ## Parallelism
//!
//! With the `rayon` feature contrasts are computed on the rayon pool. Output
//! order and values do not depend on scheduling.

mod anova;
mod contrast;
mod result;
pub mod ttest;

pub use anova::{
    compare_run_kinds, one_way, OneWayAnova, PairwiseComparison, RunKindComparison, RunKindGroup,
    RUN_KIND_COMPARISON,
};
pub use contrast::{ContrastSpec, Measure, TestFamily, TrialSelector};
pub use result::{ContrastOutcome, ContrastResult, EffectMagnitude, SkipReason, SkippedContrast};

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::trial::TrialTable;
use crate::{Error, Result};
use ttest::GroupSummary;

/// Analyze every contrast.
#[must_use]
#[tracing::instrument(skip_all, fields(trials = table.len(), contrasts = specs.len()))]
pub fn analyze(
    table: &TrialTable,
    specs: &[ContrastSpec],
    config: &PipelineConfig,
) -> Vec<ContrastOutcome> {
    #[cfg(feature = "rayon")]
    let outcomes: Vec<ContrastOutcome> = specs
        .par_iter()
        .map(|spec| outcome(table, spec, config))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let outcomes: Vec<ContrastOutcome> = specs
        .iter()
        .map(|spec| outcome(table, spec, config))
        .collect();

    let computed = outcomes
        .iter()
        .filter(|o| matches!(o, ContrastOutcome::Computed(_)))
        .count();
    info!(
        computed,
        skipped = outcomes.len() - computed,
        "analysis complete"
    );
    outcomes
}

fn outcome(table: &TrialTable, spec: &ContrastSpec, config: &PipelineConfig) -> ContrastOutcome {
    match compute_contrast(table, spec, config) {
        Ok(result) => {
            debug!(
                contrast = spec.name(),
                t = result.t_statistic,
                p = result.p_value,
                d = result.cohens_d,
                "contrast computed"
            );
            ContrastOutcome::Computed(result)
        }
        Err(error) => {
            warn!(contrast = spec.name(), %error, "contrast skipped");
            // Only contrast-scoped errors come out of compute_contrast
            let skip = SkippedContrast::from_error(&error).unwrap_or_else(|| SkippedContrast {
                contrast_name: spec.name().to_string(),
                reason: SkipReason::Computation {
                    message: error.to_string(),
                },
            });
            ContrastOutcome::Skipped(skip)
        }
    }
}

/// Group values of a contrast: its measure over each selected group,
/// missing values dropped, in table order.
#[must_use]
pub fn group_values(table: &TrialTable, spec: &ContrastSpec) -> (Vec<f64>, Vec<f64>) {
    let select = |selector: &TrialSelector| -> Vec<f64> {
        table
            .iter()
            .filter(|t| selector.matches(t))
            .filter_map(|t| spec.measure().extract(t))
            .collect()
    };
    (select(spec.group_a()), select(spec.group_b()))
}

/// Compute one contrast.
///
/// # Errors
///
/// - `Error::InsufficientData` if either group has fewer than
///   `config.min_sample_size()` observations
/// - `Error::Computation` if the t statistic or an effect size is undefined
pub fn compute_contrast(
    table: &TrialTable,
    spec: &ContrastSpec,
    config: &PipelineConfig,
) -> Result<ContrastResult> {
    let (values_a, values_b) = group_values(table, spec);
    let minimum = config.min_sample_size();
    let (a, b) = match (
        GroupSummary::from_values(&values_a),
        GroupSummary::from_values(&values_b),
    ) {
        (Some(a), Some(b)) if a.n >= minimum && b.n >= minimum => (a, b),
        _ => {
            return Err(Error::InsufficientData {
                contrast: spec.name().to_string(),
                n_a: values_a.len(),
                n_b: values_b.len(),
                minimum,
            })
        }
    };

    let variant = config.test_variant();
    let test = match spec.family() {
        TestFamily::IndependentTwoSample => ttest::two_sample(&a, &b, variant),
    }
    .map_err(|e| Error::Computation {
        contrast: spec.name().to_string(),
        message: e.to_string(),
    })?;

    Ok(ContrastResult {
        contrast_name: spec.name().to_string(),
        measure: spec.measure(),
        test_variant: variant,
        t_statistic: test.t_statistic,
        degrees_of_freedom: test.degrees_of_freedom,
        p_value: test.p_value,
        q_value: None,
        significant: None,
        cohens_d: test.cohens_d,
        effect_magnitude: EffectMagnitude::from_cohens_d(test.cohens_d),
        eta_squared: test.eta_squared,
        mean_a: a.mean,
        mean_b: b.mean,
        std_a: a.std_dev(),
        std_b: b.std_dev(),
        median_a: a.median,
        median_b: b.median,
        n_a: a.n,
        n_b: b.n,
        confidence_interval_95: test.confidence_interval,
    })
}
