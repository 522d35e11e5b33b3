//! Spatial Integrator
//!
//! Joins corrected contrast results with externally supplied coordinate and
//! anatomical-label metadata.
//!
//! ## Metadata format
//!
//! ```json
//! {
//!   "pv_tool_vs_shape": {
//!     "mni_coordinate": { "x": 22.0, "y": 100.0, "z": -2.0 },
//!     "anatomical_label": "LOC; V1; V2; BA 18/17",
//!     "secondary_regions": []
//!   }
//! }
//! ```
//!
//! A contrast without an entry keeps null coordinate and label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats::ContrastResult;
use crate::Result;

/// A point in MNI space (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MniCoordinate {
    /// Left (-) / right (+)
    pub x: f64,
    /// Posterior (-) / anterior (+)
    pub y: f64,
    /// Inferior (-) / superior (+)
    pub z: f64,
}

impl MniCoordinate {
    /// Create a coordinate
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A further peak reported for the same contrast map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Anatomical label
    pub label: String,
    /// Peak coordinate, when reported
    pub mni_coordinate: Option<MniCoordinate>,
}

impl Region {
    /// Region with a known peak
    pub fn at(label: impl Into<String>, coordinate: MniCoordinate) -> Self {
        Self {
            label: label.into(),
            mni_coordinate: Some(coordinate),
        }
    }

    /// Region reported without a coordinate
    pub fn unlocated(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            mni_coordinate: None,
        }
    }
}

/// Spatial annotation of one contrast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialAnnotation {
    /// Primary peak
    pub mni_coordinate: Option<MniCoordinate>,
    /// Label of the primary peak
    pub anatomical_label: Option<String>,
    /// Further peaks
    #[serde(default)]
    pub secondary_regions: Vec<Region>,
}

impl SpatialAnnotation {
    /// Annotation with a primary peak and no secondary regions
    pub fn new(label: impl Into<String>, coordinate: MniCoordinate) -> Self {
        Self {
            mni_coordinate: Some(coordinate),
            anatomical_label: Some(label.into()),
            secondary_regions: Vec::new(),
        }
    }

    /// Add a secondary region
    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.secondary_regions.push(region);
        self
    }
}

/// Static mapping from contrast name to annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpatialMetadata {
    annotations: BTreeMap<String, SpatialAnnotation>,
}

impl SpatialMetadata {
    /// Empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object keyed by contrast name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the text is not a valid mapping.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add or replace the annotation of a contrast
    #[must_use]
    pub fn with(mut self, contrast: impl Into<String>, annotation: SpatialAnnotation) -> Self {
        self.annotations.insert(contrast.into(), annotation);
        self
    }

    /// Annotation of a contrast, if any
    #[must_use]
    pub fn get(&self, contrast: &str) -> Option<&SpatialAnnotation> {
        self.annotations.get(contrast)
    }

    /// Number of annotated contrasts
    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// True when no contrast is annotated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Peaks reported by the tool-representation study for its four
    /// research questions.
    #[must_use]
    pub fn study_defaults() -> Self {
        Self::new()
            .with(
                "pv_tool_vs_shape",
                SpatialAnnotation::new("LOC; V1; V2; BA 18/17", MniCoordinate::new(22.0, 100.0, -2.0))
                    .with_region(Region::at(
                        "Left Pre/Postcentral Gyrus; BA 3-5",
                        MniCoordinate::new(10.0, 44.0, 70.0),
                    )),
            )
            .with(
                "ig_vs_pv",
                SpatialAnnotation::new(
                    "Left superior frontal gyrus",
                    MniCoordinate::new(22.0, -54.0, 18.0),
                )
                .with_region(Region::at("Brodmann Area 6", MniCoordinate::new(22.0, 10.0, 68.0)))
                .with_region(Region::at(
                    "Left superior parietal lobe",
                    MniCoordinate::new(22.0, 48.0, 68.0),
                )),
            )
            .with(
                "functional_vs_structural",
                SpatialAnnotation::new(
                    "Left superior frontal gyrus",
                    MniCoordinate::new(24.0, -58.0, 22.0),
                )
                .with_region(Region::at("Parietal lobe", MniCoordinate::new(24.0, 50.0, 54.0)))
                .with_region(Region::at(
                    "LOC (Lateral Occipital Complex)",
                    MniCoordinate::new(24.0, 90.0, 24.0),
                )),
            )
            .with(
                "motor_vs_non_motor",
                SpatialAnnotation::new(
                    "Primary Motor Cortex (M1)",
                    MniCoordinate::new(-40.0, 22.0, 62.0),
                )
                .with_region(Region::unlocated("Brodmann Area 4"))
                .with_region(Region::unlocated("Brodmann Area 6")),
            )
    }
}

/// A corrected contrast result with its spatial annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationRecord {
    /// Statistics
    pub result: ContrastResult,
    /// Primary peak, if annotated
    pub mni_coordinate: Option<MniCoordinate>,
    /// Label of the primary peak, if annotated
    pub anatomical_label: Option<String>,
    /// Further peaks
    pub secondary_regions: Vec<Region>,
}

impl ActivationRecord {
    /// Contrast name
    #[must_use]
    pub fn contrast_name(&self) -> &str {
        &self.result.contrast_name
    }

    /// True when the corrected result is significant
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.result.significant == Some(true)
    }
}

/// Attach annotations to results, keeping result order.
#[must_use]
#[tracing::instrument(skip_all, fields(results = results.len(), annotated = metadata.len()))]
pub fn integrate(results: &[ContrastResult], metadata: &SpatialMetadata) -> Vec<ActivationRecord> {
    results
        .iter()
        .map(|result| {
            let annotation = metadata.get(&result.contrast_name).cloned().unwrap_or_else(|| {
                debug!(contrast = %result.contrast_name, "no spatial annotation");
                SpatialAnnotation::default()
            });
            ActivationRecord {
                result: result.clone(),
                mni_coordinate: annotation.mni_coordinate,
                anatomical_label: annotation.anatomical_label,
                secondary_regions: annotation.secondary_regions,
            }
        })
        .collect()
}
