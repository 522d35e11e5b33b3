//! # toolrep: Tool-Representation Study Pipeline
//!
//! **Version**: 0.1.0
//!
//! toolrep turns the per-trial behavioral logs and timing files of a
//! visual / motor-imagery fMRI experiment into a reproducible report:
//! validated trials, two-sample contrasts with effect sizes,
//! Benjamini–Hochberg FDR correction and MNI-space annotations.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: malformed runs are stopped at ingestion and recorded, never
//!   silently merged
//! - **Poka-Yoke**: typed run kinds, conditions and selectors; no stringly
//!   keyed groups
//! - **Genchi Genbutsu**: every report carries its quality diagnostics and a
//!   configuration snapshot
//! - **Heijunka**: contrasts and participants fan out on rayon with
//!   deterministic output order
//!
//! ## Example Usage
//!
//! ```rust
//! use toolrep::config::PipelineConfig;
//! use toolrep::ingest::{BehavioralEvent, RawRun, TimingEvent};
//! use toolrep::pipeline::Pipeline;
//! use toolrep::spatial::SpatialMetadata;
//! use toolrep::stats::ContrastSpec;
//! use toolrep::trial::RunKind;
//!
//! # fn main() -> toolrep::Result<()> {
//! let mut behavioral = Vec::new();
//! let mut timing = Vec::new();
//! for i in 0..6 {
//!     let onset = f64::from(i) * 4.0;
//!     let (label, rt) = if i % 2 == 0 { ("tool", 560.0) } else { ("shape", 510.0) };
//!     let rt = rt + f64::from(i) * 3.0;
//!     behavioral.push(BehavioralEvent::new(label, onset).with_response(rt, true));
//!     timing.push(TimingEvent::new(label, onset));
//! }
//! let run = RawRun::new(1, RunKind::PassiveViewing)
//!     .with_behavioral(behavioral)
//!     .with_timing(timing);
//!
//! let config = PipelineConfig::builder().min_sample_size(3).build()?;
//! let report = Pipeline::new(config)?.run(
//!     "S01",
//!     &[run],
//!     &ContrastSpec::research_questions(),
//!     &SpatialMetadata::study_defaults(),
//! )?;
//!
//! let pv = report.activation("pv_tool_vs_shape").expect("computed");
//! assert!(pv.result.mean_a > pv.result.mean_b);
//! assert_eq!(pv.anatomical_label.as_deref(), Some("LOC; V1; V2; BA 18/17"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod correction;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod spatial;
pub mod stats;
pub mod trial;

pub use error::{Error, Result};
