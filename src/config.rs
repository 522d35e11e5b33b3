//! Pipeline configuration
//!
//! One immutable [`PipelineConfig`] is threaded through every stage call.
//! Nothing is read from process-wide state, so pipelines for different
//! participants never interfere.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default onset tolerance between behavioral and timing streams (ms)
pub const DEFAULT_TIMING_TOLERANCE_MS: f64 = 50.0;

/// Default minimum observations per contrast group
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 10;

/// Default FDR level
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Confidence level of the reported mean-difference interval
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Two-sample t-test variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestVariant {
    /// Unequal variances, Welch–Satterthwaite degrees of freedom
    Welch,
    /// Pooled variance, `n_a + n_b - 2` degrees of freedom
    Student,
}

/// Weights of the composite ingestion quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Weight of the completeness ratio
    pub completeness: f64,
    /// Weight of `1 - sync_flag_ratio`
    pub synchronization: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            completeness: 0.5,
            synchronization: 0.5,
        }
    }
}

/// Configuration for one pipeline run.
///
/// ## Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `timing_tolerance_ms` | 50 ms |
/// | `min_sample_size` | 10 |
/// | `test_variant` | Welch |
/// | `alpha` | 0.05 |
/// | `quality_weights` | 0.5 / 0.5 |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    timing_tolerance_ms: f64,
    min_sample_size: usize,
    test_variant: TestVariant,
    alpha: f64,
    quality_weights: QualityWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timing_tolerance_ms: DEFAULT_TIMING_TOLERANCE_MS,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            test_variant: TestVariant::Welch,
            alpha: DEFAULT_ALPHA,
            quality_weights: QualityWeights::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration builder starting from the defaults
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Maximum tolerated |onset difference| between sources, in milliseconds
    #[must_use]
    pub const fn timing_tolerance_ms(&self) -> f64 {
        self.timing_tolerance_ms
    }

    /// Minimum observations required in each contrast group
    #[must_use]
    pub const fn min_sample_size(&self) -> usize {
        self.min_sample_size
    }

    /// t-test variant used by the analyzer
    #[must_use]
    pub const fn test_variant(&self) -> TestVariant {
        self.test_variant
    }

    /// FDR level for the significance flag
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Composite quality score weights
    #[must_use]
    pub const fn quality_weights(&self) -> QualityWeights {
        self.quality_weights
    }

    /// Check every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if !self.timing_tolerance_ms.is_finite() || self.timing_tolerance_ms < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "timing_tolerance_ms must be finite and >= 0, got {}",
                self.timing_tolerance_ms
            )));
        }
        // Sample variance needs at least two observations
        if self.min_sample_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "min_sample_size must be >= 2, got {}",
                self.min_sample_size
            )));
        }
        validate_alpha(self.alpha)?;
        let w = self.quality_weights;
        if !(w.completeness >= 0.0 && w.synchronization >= 0.0)
            || !(w.completeness + w.synchronization).is_normal()
        {
            return Err(Error::InvalidConfig(format!(
                "quality weights must be non-negative with a positive sum, got {w:?}"
            )));
        }
        Ok(())
    }
}

/// Reject an FDR level outside `(0, 1)`.
pub(crate) fn validate_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "alpha must lie in (0, 1), got {alpha}"
        )))
    }
}

/// Builder for `PipelineConfig`.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the onset tolerance in milliseconds
    #[must_use]
    pub const fn timing_tolerance_ms(mut self, tolerance_ms: f64) -> Self {
        self.config.timing_tolerance_ms = tolerance_ms;
        self
    }

    /// Set the minimum per-group sample size `k`
    #[must_use]
    pub const fn min_sample_size(mut self, k: usize) -> Self {
        self.config.min_sample_size = k;
        self
    }

    /// Set the t-test variant
    #[must_use]
    pub const fn test_variant(mut self, variant: TestVariant) -> Self {
        self.config.test_variant = variant;
        self
    }

    /// Set the FDR level
    #[must_use]
    pub const fn alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    /// Set the quality score weights
    #[must_use]
    pub const fn quality_weights(mut self, completeness: f64, synchronization: f64) -> Self {
        self.config.quality_weights = QualityWeights {
            completeness,
            synchronization,
        };
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if any parameter is out of range.
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
