//! Trial data model
//!
//! ## Schema Overview
//!
//! ```text
//! TrialTable (1 participant) ──< TrialRecord (N)
//!                                   │
//!                                   ├── RunKind   (PassiveViewing | ImaginedGrasp | MotorLocalizer)
//!                                   └── Condition (Tool | Shape | ScrambledTool | ScrambledShape | Localizer)
//! ```
//!
//! Run kinds and conditions are closed enums. Unknown labels are rejected
//! when parsed, never carried into the analysis.

mod record;
mod table;

pub use record::{Condition, RunKind, TrialRecord, TrialRecordBuilder, UnknownLabel};
pub use table::TrialTable;
