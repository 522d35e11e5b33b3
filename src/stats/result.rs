//! Contrast results and skip records

use serde::{Deserialize, Serialize};

use super::Measure;
use crate::config::TestVariant;
use crate::Error;

/// Conventional magnitude band of |Cohen's d|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectMagnitude {
    /// |d| < 0.2
    Negligible,
    /// 0.2 ≤ |d| < 0.5
    Small,
    /// 0.5 ≤ |d| < 0.8
    Medium,
    /// |d| ≥ 0.8
    Large,
}

impl EffectMagnitude {
    /// Classify an effect size
    #[must_use]
    pub fn from_cohens_d(d: f64) -> Self {
        let d = d.abs();
        if d < 0.2 {
            Self::Negligible
        } else if d < 0.5 {
            Self::Small
        } else if d < 0.8 {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

/// Statistics of one computed contrast.
///
/// `q_value` and `significant` stay `None` until
/// [`correct`](crate::correction::correct) produces a corrected copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastResult {
    /// Contrast name
    pub contrast_name: String,
    /// Compared measure
    pub measure: Measure,
    /// Test variant used
    pub test_variant: TestVariant,
    /// t statistic
    pub t_statistic: f64,
    /// Degrees of freedom
    pub degrees_of_freedom: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    /// BH-adjusted p-value
    pub q_value: Option<f64>,
    /// `q_value < alpha`
    pub significant: Option<bool>,
    /// Cohen's d with pooled SD
    pub cohens_d: f64,
    /// Magnitude band of `cohens_d`
    pub effect_magnitude: EffectMagnitude,
    /// t² / (t² + df)
    pub eta_squared: f64,
    /// Group A mean
    pub mean_a: f64,
    /// Group B mean
    pub mean_b: f64,
    /// Group A sample SD
    pub std_a: f64,
    /// Group B sample SD
    pub std_b: f64,
    /// Group A median
    pub median_a: f64,
    /// Group B median
    pub median_b: f64,
    /// Group A observations
    pub n_a: usize,
    /// Group B observations
    pub n_b: usize,
    /// 95% interval for `mean_a - mean_b`
    pub confidence_interval_95: (f64, f64),
}

impl ContrastResult {
    /// Difference of group means
    #[must_use]
    pub fn mean_difference(&self) -> f64 {
        self.mean_a - self.mean_b
    }

    /// Whether correction has been applied
    #[must_use]
    pub const fn is_corrected(&self) -> bool {
        self.q_value.is_some()
    }
}

/// Why a contrast produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// A group fell below the minimum sample size
    InsufficientData {
        /// Group A observations
        n_a: usize,
        /// Group B observations
        n_b: usize,
        /// Configured minimum
        minimum: usize,
    },
    /// Degenerate statistics
    Computation {
        /// What was undefined
        message: String,
    },
}

/// A contrast recorded in the report without statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedContrast {
    /// Contrast name
    pub contrast_name: String,
    /// Skip reason
    pub reason: SkipReason,
}

impl SkippedContrast {
    /// Record a contrast-scoped error. Returns `None` for other errors.
    #[must_use]
    pub fn from_error(error: &Error) -> Option<Self> {
        match error {
            Error::InsufficientData {
                contrast,
                n_a,
                n_b,
                minimum,
            } => Some(Self {
                contrast_name: contrast.clone(),
                reason: SkipReason::InsufficientData {
                    n_a: *n_a,
                    n_b: *n_b,
                    minimum: *minimum,
                },
            }),
            Error::Computation { contrast, message } => Some(Self {
                contrast_name: contrast.clone(),
                reason: SkipReason::Computation {
                    message: message.clone(),
                },
            }),
            _ => None,
        }
    }
}

/// Result of analyzing one contrast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContrastOutcome {
    /// Statistics were computed
    Computed(ContrastResult),
    /// The contrast was skipped
    Skipped(SkippedContrast),
}

impl ContrastOutcome {
    /// Name of the contrast this outcome belongs to
    #[must_use]
    pub fn contrast_name(&self) -> &str {
        match self {
            Self::Computed(result) => &result.contrast_name,
            Self::Skipped(skipped) => &skipped.contrast_name,
        }
    }

    /// Split outcomes into computed results and skips, keeping order.
    #[must_use]
    pub fn partition(outcomes: Vec<Self>) -> (Vec<ContrastResult>, Vec<SkippedContrast>) {
        let mut computed = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Self::Computed(result) => computed.push(result),
                Self::Skipped(skip) => skipped.push(skip),
            }
        }
        (computed, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_magnitude_bands() {
        assert_eq!(EffectMagnitude::from_cohens_d(0.1), EffectMagnitude::Negligible);
        assert_eq!(EffectMagnitude::from_cohens_d(-0.2), EffectMagnitude::Small);
        assert_eq!(EffectMagnitude::from_cohens_d(0.5), EffectMagnitude::Medium);
        assert_eq!(EffectMagnitude::from_cohens_d(-0.79), EffectMagnitude::Medium);
        assert_eq!(EffectMagnitude::from_cohens_d(4.6), EffectMagnitude::Large);
    }

    #[test]
    fn test_skip_from_error() {
        let err = Error::InsufficientData {
            contrast: "pv_tool_vs_shape".to_string(),
            n_a: 9,
            n_b: 12,
            minimum: 10,
        };
        let skip = SkippedContrast::from_error(&err).unwrap();
        assert_eq!(skip.contrast_name, "pv_tool_vs_shape");
        assert_eq!(
            skip.reason,
            SkipReason::InsufficientData {
                n_a: 9,
                n_b: 12,
                minimum: 10
            }
        );
        assert!(SkippedContrast::from_error(&Error::InvalidConfig("x".into())).is_none());
    }
}
