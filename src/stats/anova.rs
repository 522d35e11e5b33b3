//! Run-kind comparison
//!
//! One-way analysis of variance of a measure across run kinds, followed by
//! pairwise post-hoc t-tests.
//!
//! ## Formulas
//!
//! ```text
//! SS_between = Σ n_i (mean_i - grand_mean)²      df_b = k - 1
//! SS_within  = Σ (n_i - 1) v_i                    df_w = N - k
//! F          = (SS_between / df_b) / (SS_within / df_w)
//! p          = P(F_{df_b, df_w} > F)
//! ```
//!
//! Every run kind with at least `min_sample_size` observations forms a group.
//! Post-hoc comparisons use Student's t-test and are not corrected for
//! multiple comparisons.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use tracing::{debug, info};

use super::ttest::{self, finite, Degenerate, GroupSummary};
use super::Measure;
use crate::config::{PipelineConfig, TestVariant};
use crate::trial::{RunKind, TrialTable};
use crate::{Error, Result};

/// Name used for run-kind comparison errors.
pub const RUN_KIND_COMPARISON: &str = "run_kind_comparison";

/// Outcome of a one-way analysis of variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OneWayAnova {
    /// F statistic
    pub f_statistic: f64,
    /// Between-group degrees of freedom (k - 1)
    pub df_between: f64,
    /// Within-group degrees of freedom (N - k)
    pub df_within: f64,
    /// Upper-tail p-value
    pub p_value: f64,
}

/// One-way analysis of variance over group summaries.
///
/// # Errors
///
/// Returns [`Degenerate`] with fewer than two groups, zero within-group
/// variance, or a non-finite statistic.
#[allow(clippy::cast_precision_loss)]
pub fn one_way(groups: &[GroupSummary]) -> std::result::Result<OneWayAnova, Degenerate> {
    let k = groups.len();
    if k < 2 {
        return Err(Degenerate::TooFewGroups(k));
    }
    let total: usize = groups.iter().map(|g| g.n).sum();
    let n = total as f64;
    let grand_mean = groups.iter().map(|g| g.n as f64 * g.mean).sum::<f64>() / n;
    let ss_between: f64 = groups
        .iter()
        .map(|g| g.n as f64 * (g.mean - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .map(|g| (g.n as f64 - 1.0) * g.variance)
        .sum();
    if total <= k || ss_within <= 0.0 {
        return Err(Degenerate::ZeroWithinVariance);
    }

    let df_between = (k - 1) as f64;
    let df_within = (total - k) as f64;
    let f_statistic = finite(
        "F statistic",
        (ss_between / df_between) / (ss_within / df_within),
    )?;
    let dist = FisherSnedecor::new(df_between, df_within)
        .map_err(|e| Degenerate::Distribution(e.to_string()))?;
    let p_value = finite("p-value", dist.sf(f_statistic).clamp(0.0, 1.0))?;

    Ok(OneWayAnova {
        f_statistic,
        df_between,
        df_within,
        p_value,
    })
}

/// Descriptive summary of one run kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunKindGroup {
    /// Run kind
    pub run_kind: RunKind,
    /// Observations
    pub n: usize,
    /// Mean
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
}

/// Post-hoc comparison of two run kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    /// First run kind (mean_a)
    pub run_kind_a: RunKind,
    /// Second run kind (mean_b)
    pub run_kind_b: RunKind,
    /// Student t statistic
    pub t_statistic: f64,
    /// Degrees of freedom
    pub degrees_of_freedom: f64,
    /// Two-tailed, uncorrected p-value
    pub p_value: f64,
    /// `p_value < alpha`
    pub significant: bool,
}

/// Comparison of one measure across run kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunKindComparison {
    /// Compared measure
    pub measure: Measure,
    /// Groups in canonical run-kind order
    pub groups: Vec<RunKindGroup>,
    /// Omnibus test
    pub anova: OneWayAnova,
    /// `anova.p_value < alpha`
    pub significant: bool,
    /// Post-hoc pairs in group order; undefined pairs are left out
    pub pairwise: Vec<PairwiseComparison>,
}

/// Compare `measure` across the run kinds present in `table`.
///
/// # Errors
///
/// Returns `Error::Computation` (named [`RUN_KIND_COMPARISON`]) when fewer
/// than two run kinds reach `min_sample_size` or the F statistic is
/// undefined.
#[tracing::instrument(skip(table, config), fields(trials = table.len()))]
pub fn compare_run_kinds(
    table: &TrialTable,
    measure: Measure,
    config: &PipelineConfig,
) -> Result<RunKindComparison> {
    let summaries: Vec<(RunKind, GroupSummary)> = RunKind::ALL
        .iter()
        .filter_map(|&kind| {
            let values: Vec<f64> = table
                .iter()
                .filter(|t| t.run_kind() == kind)
                .filter_map(|t| measure.extract(t))
                .collect();
            GroupSummary::from_values(&values)
                .filter(|s| s.n >= config.min_sample_size())
                .map(|s| (kind, s))
        })
        .collect();

    let groups: Vec<GroupSummary> = summaries.iter().map(|(_, s)| *s).collect();
    let anova = one_way(&groups).map_err(|e| Error::Computation {
        contrast: RUN_KIND_COMPARISON.to_string(),
        message: e.to_string(),
    })?;

    let alpha = config.alpha();
    let mut pairwise = Vec::new();
    for (i, (kind_a, a)) in summaries.iter().enumerate() {
        for (kind_b, b) in &summaries[i + 1..] {
            match ttest::two_sample(a, b, TestVariant::Student) {
                Ok(test) => pairwise.push(PairwiseComparison {
                    run_kind_a: *kind_a,
                    run_kind_b: *kind_b,
                    t_statistic: test.t_statistic,
                    degrees_of_freedom: test.degrees_of_freedom,
                    p_value: test.p_value,
                    significant: test.p_value < alpha,
                }),
                Err(reason) => debug!(%kind_a, %kind_b, %reason, "pairwise comparison undefined"),
            }
        }
    }

    info!(
        groups = summaries.len(),
        f = anova.f_statistic,
        p = anova.p_value,
        "run-kind comparison complete"
    );
    Ok(RunKindComparison {
        measure,
        groups: summaries
            .iter()
            .map(|(run_kind, s)| RunKindGroup {
                run_kind: *run_kind,
                n: s.n,
                mean: s.mean,
                std_dev: s.std_dev(),
            })
            .collect(),
        anova,
        significant: anova.p_value < alpha,
        pairwise,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::TrialRecord;

    fn summary(values: &[f64]) -> GroupSummary {
        GroupSummary::from_values(values).unwrap()
    }

    fn table(groups: &[(RunKind, &[f64])]) -> TrialTable {
        let mut trials = Vec::new();
        for (run_number, (kind, values)) in (1..).zip(groups) {
            let condition = kind.allowed_conditions()[0];
            for (trial_number, &rt) in (1..).zip(values.iter()) {
                trials.push(
                    TrialRecord::builder("S01", *kind, condition, run_number, trial_number, f64::from(trial_number) * 2.0)
                        .response_time(Some(rt))
                        .build(),
                );
            }
        }
        TrialTable::new(trials)
    }

    fn config(k: usize) -> PipelineConfig {
        PipelineConfig::builder().min_sample_size(k).build().unwrap()
    }

    #[test]
    fn test_one_way_reference() {
        // Means 2, 5, 8; SS_between 54, SS_within 6; F(2, 6) = 27
        let anova = one_way(&[
            summary(&[1.0, 2.0, 3.0]),
            summary(&[4.0, 5.0, 6.0]),
            summary(&[7.0, 8.0, 9.0]),
        ])
        .unwrap();
        assert!((anova.f_statistic - 27.0).abs() < 1e-9);
        assert!((anova.df_between - 2.0).abs() < f64::EPSILON);
        assert!((anova.df_within - 6.0).abs() < f64::EPSILON);
        // F(2, d) upper tail is (1 + 2F/d)^(-d/2) = 10^-3
        assert!((anova.p_value - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_one_way_degenerate() {
        assert_eq!(
            one_way(&[summary(&[1.0, 2.0])]),
            Err(Degenerate::TooFewGroups(1))
        );
        assert_eq!(
            one_way(&[summary(&[0.1; 4]), summary(&[0.2; 4])]),
            Err(Degenerate::ZeroWithinVariance)
        );
        assert_eq!(
            one_way(&[summary(&[1.0]), summary(&[2.0])]),
            Err(Degenerate::ZeroWithinVariance)
        );
    }

    #[test]
    fn test_compare_run_kinds() {
        let table = table(&[
            (RunKind::PassiveViewing, &[500.0, 510.0, 505.0, 495.0]),
            (RunKind::ImaginedGrasp, &[560.0, 570.0, 555.0, 565.0]),
            (RunKind::MotorLocalizer, &[620.0, 610.0, 615.0, 625.0]),
        ]);
        let comparison = compare_run_kinds(&table, Measure::ResponseTime, &config(4)).unwrap();

        let kinds: Vec<RunKind> = comparison.groups.iter().map(|g| g.run_kind).collect();
        assert_eq!(kinds, RunKind::ALL.to_vec());
        assert!(comparison.significant);
        assert!(comparison.anova.p_value < 1e-6);
        assert_eq!(comparison.pairwise.len(), 3);
        let first = comparison.pairwise[0];
        assert_eq!(
            (first.run_kind_a, first.run_kind_b),
            (RunKind::PassiveViewing, RunKind::ImaginedGrasp)
        );
        assert!(first.t_statistic < 0.0);
        assert!((first.degrees_of_freedom - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_small_run_kinds_are_left_out() {
        let table = table(&[
            (RunKind::PassiveViewing, &[500.0, 510.0, 505.0]),
            (RunKind::ImaginedGrasp, &[560.0, 570.0, 555.0]),
            (RunKind::MotorLocalizer, &[620.0]),
        ]);
        let comparison = compare_run_kinds(&table, Measure::ResponseTime, &config(3)).unwrap();
        assert_eq!(comparison.groups.len(), 2);
        assert_eq!(comparison.pairwise.len(), 1);

        let err = compare_run_kinds(&table, Measure::ResponseTime, &config(4)).unwrap_err();
        assert!(matches!(
            err,
            Error::Computation { ref contrast, .. } if contrast == RUN_KIND_COMPARISON
        ));
    }
}
