//! Two-sample t-tests
//!
//! ## Formulas
//!
//! ```text
//! Welch:    se² = v_a/n_a + v_b/n_b
//!           df  = se⁴ / ((v_a/n_a)²/(n_a-1) + (v_b/n_b)²/(n_b-1))
//! Student:  s_p² = ((n_a-1)v_a + (n_b-1)v_b) / (n_a+n_b-2)
//!           se² = s_p² (1/n_a + 1/n_b),  df = n_a+n_b-2
//!
//! t  = (mean_a - mean_b) / se
//! p  = 2 · P(T_df > |t|)
//! d  = (mean_a - mean_b) / s_p          (pooled SD for both variants)
//! η² = t² / (t² + df)
//! CI = (mean_a - mean_b) ± t*_{df} · se
//! ```

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

use crate::config::{TestVariant, CONFIDENCE_LEVEL};

/// Why a t-test has no defined result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Degenerate {
    /// Fewer than two observations in a group
    #[error("group {group} has {n} observation(s); variance needs at least 2")]
    TooFewObservations {
        /// `'A'` or `'B'`
        group: char,
        /// Observations present
        n: usize,
    },
    /// Both groups have zero variance
    #[error("zero variance in both groups; t statistic undefined")]
    ZeroVariance,
    /// An analysis of variance needs at least two non-empty groups
    #[error("{0} group(s) with observations; analysis of variance needs at least 2")]
    TooFewGroups(usize),
    /// Every group is constant, so the within-group variance is zero
    #[error("zero within-group variance; F statistic undefined")]
    ZeroWithinVariance,
    /// An intermediate value was NaN or infinite
    #[error("non-finite {0}")]
    NonFinite(&'static str),
    /// A t or F distribution rejected its parameters
    #[error("distribution parameters rejected: {0}")]
    Distribution(String),
}

/// Descriptive statistics of one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Observations
    pub n: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample variance (n - 1 denominator)
    pub variance: f64,
    /// Median
    pub median: f64,
}

impl GroupSummary {
    /// Summarize `values`; `None` for an empty slice.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        // Constant groups get exactly zero so rounding in the mean cannot
        // leave a tiny spurious variance
        let constant = values.iter().all(|v| v.total_cmp(&values[0]).is_eq());
        let variance = if n > 1 && !constant {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = n / 2;
        let median = if n % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            n,
            mean,
            variance,
            median,
        })
    }

    /// Sample standard deviation
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Outcome of one two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    /// t statistic
    pub t_statistic: f64,
    /// Degrees of freedom
    pub degrees_of_freedom: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    /// Cohen's d with pooled SD
    pub cohens_d: f64,
    /// t² / (t² + df)
    pub eta_squared: f64,
    /// Interval for `mean_a - mean_b` at [`CONFIDENCE_LEVEL`]
    pub confidence_interval: (f64, f64),
}

/// Run a two-sample t-test between two group summaries.
///
/// # Errors
///
/// Returns [`Degenerate`] when a group has fewer than two observations,
/// both variances are zero, or any intermediate value is not finite.
#[allow(clippy::cast_precision_loss)]
pub fn two_sample(
    a: &GroupSummary,
    b: &GroupSummary,
    variant: TestVariant,
) -> Result<TTest, Degenerate> {
    for (group, summary) in [('A', a), ('B', b)] {
        if summary.n < 2 {
            return Err(Degenerate::TooFewObservations {
                group,
                n: summary.n,
            });
        }
    }
    if a.variance == 0.0 && b.variance == 0.0 {
        return Err(Degenerate::ZeroVariance);
    }

    let (na, nb) = (a.n as f64, b.n as f64);
    let pooled_variance =
        (na - 1.0).mul_add(a.variance, (nb - 1.0) * b.variance) / (na + nb - 2.0);

    let (se_squared, df) = match variant {
        TestVariant::Welch => {
            let (qa, qb) = (a.variance / na, b.variance / nb);
            let se_squared = qa + qb;
            let df = se_squared.powi(2) / (qa.powi(2) / (na - 1.0) + qb.powi(2) / (nb - 1.0));
            (se_squared, df)
        }
        TestVariant::Student => (pooled_variance * (1.0 / na + 1.0 / nb), na + nb - 2.0),
    };
    finite("degrees of freedom", df)?;
    let se = finite("standard error", se_squared.sqrt())?;

    let diff = a.mean - b.mean;
    let t_statistic = finite("t statistic", diff / se)?;
    let cohens_d = finite("Cohen's d", diff / pooled_variance.sqrt())?;
    let t_squared = t_statistic.powi(2);
    let eta_squared = t_squared / (t_squared + df);

    let dist =
        StudentsT::new(0.0, 1.0, df).map_err(|e| Degenerate::Distribution(e.to_string()))?;
    let p_value = finite("p-value", (2.0 * dist.sf(t_statistic.abs())).min(1.0))?;
    let critical = finite(
        "critical value",
        dist.inverse_cdf(1.0 - (1.0 - CONFIDENCE_LEVEL) / 2.0),
    )?;
    let margin = critical * se;

    Ok(TTest {
        t_statistic,
        degrees_of_freedom: df,
        p_value,
        cohens_d,
        eta_squared,
        confidence_interval: (diff - margin, diff + margin),
    })
}

pub(crate) fn finite(what: &'static str, value: f64) -> Result<f64, Degenerate> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Degenerate::NonFinite(what))
    }
}
