//! Trial Record - one observed experimental event

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of experimental run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RunKind {
    /// Passive viewing of tool and shape images
    PassiveViewing,
    /// Imagined grasping of the viewed object
    ImaginedGrasp,
    /// Hand-clench motor localizer
    MotorLocalizer,
}

impl RunKind {
    /// All run kinds in canonical order.
    pub const ALL: [Self; 3] = [Self::PassiveViewing, Self::ImaginedGrasp, Self::MotorLocalizer];

    /// Conditions that may appear in a run of this kind.
    #[must_use]
    pub const fn allowed_conditions(self) -> &'static [Condition] {
        match self {
            Self::PassiveViewing | Self::ImaginedGrasp => &Condition::STIMULI,
            Self::MotorLocalizer => &[Condition::Localizer],
        }
    }

    /// Check whether `condition` is permitted in this run kind.
    #[must_use]
    pub fn permits(self, condition: Condition) -> bool {
        self.allowed_conditions().contains(&condition)
    }

    /// Canonical snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PassiveViewing => "passive_viewing",
            Self::ImaginedGrasp => "imagined_grasp",
            Self::MotorLocalizer => "motor_localizer",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passive_viewing" | "pv" => Ok(Self::PassiveViewing),
            "imagined_grasp" | "ig" => Ok(Self::ImaginedGrasp),
            "motor_localizer" | "clench" => Ok(Self::MotorLocalizer),
            _ => Err(UnknownLabel::new("run kind", s)),
        }
    }
}

/// Stimulus condition of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Graspable tool image
    Tool,
    /// Neutral shape image
    Shape,
    /// Phase-scrambled tool image
    ScrambledTool,
    /// Phase-scrambled shape image
    ScrambledShape,
    /// Motor localizer block
    Localizer,
}

impl Condition {
    /// Visual stimulus conditions (everything except the localizer).
    pub const STIMULI: [Self; 4] = [
        Self::Tool,
        Self::Shape,
        Self::ScrambledTool,
        Self::ScrambledShape,
    ];

    /// All conditions in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Tool,
        Self::Shape,
        Self::ScrambledTool,
        Self::ScrambledShape,
        Self::Localizer,
    ];

    /// Label as written by the acquisition software.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Shape => "shape",
            Self::ScrambledTool => "SCRtool",
            Self::ScrambledShape => "SCRshape",
            Self::Localizer => "localizer",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tool" => Ok(Self::Tool),
            "shape" => Ok(Self::Shape),
            "scrtool" | "scrambled_tool" => Ok(Self::ScrambledTool),
            "scrshape" | "scrambled_shape" => Ok(Self::ScrambledShape),
            "localizer" | "clench" => Ok(Self::Localizer),
            _ => Err(UnknownLabel::new("condition", s)),
        }
    }
}

/// A label that does not name any known run kind or condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} label '{label}'")]
pub struct UnknownLabel {
    kind: &'static str,
    label: String,
}

impl UnknownLabel {
    fn new(kind: &'static str, label: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
        }
    }
}

/// Trial Record represents one validated, merged trial.
///
/// Created once during ingestion and never mutated. The
/// `(participant_id, run_number, trial_number)` triple is unique within a
/// [`TrialTable`](super::TrialTable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    participant_id: String,
    run_kind: RunKind,
    condition: Condition,
    run_number: u32,
    trial_number: u32,
    onset_time: f64,
    timing_onset: f64,
    response_time: Option<f64>,
    accuracy: Option<bool>,
    activation: Option<f64>,
}

impl TrialRecord {
    /// Create a builder with the required fields.
    ///
    /// `onset_time` is in seconds from scan start. The timing-stream onset
    /// defaults to the same value.
    #[must_use]
    pub fn builder(
        participant_id: impl Into<String>,
        run_kind: RunKind,
        condition: Condition,
        run_number: u32,
        trial_number: u32,
        onset_time: f64,
    ) -> TrialRecordBuilder {
        TrialRecordBuilder {
            record: Self {
                participant_id: participant_id.into(),
                run_kind,
                condition,
                run_number,
                trial_number,
                onset_time,
                timing_onset: onset_time,
                response_time: None,
                accuracy: None,
                activation: None,
            },
        }
    }

    /// Get the participant ID.
    #[must_use]
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Get the run kind.
    #[must_use]
    pub const fn run_kind(&self) -> RunKind {
        self.run_kind
    }

    /// Get the stimulus condition.
    #[must_use]
    pub const fn condition(&self) -> Condition {
        self.condition
    }

    /// Get the 1-based run number.
    #[must_use]
    pub const fn run_number(&self) -> u32 {
        self.run_number
    }

    /// Get the 1-based trial number within the run.
    #[must_use]
    pub const fn trial_number(&self) -> u32 {
        self.trial_number
    }

    /// Behavioral onset in seconds.
    #[must_use]
    pub const fn onset_time(&self) -> f64 {
        self.onset_time
    }

    /// Onset reported by the independent timing stream, in seconds.
    #[must_use]
    pub const fn timing_onset(&self) -> f64 {
        self.timing_onset
    }

    /// Response time in milliseconds, if a response was recorded.
    #[must_use]
    pub const fn response_time(&self) -> Option<f64> {
        self.response_time
    }

    /// Response accuracy, if scored.
    #[must_use]
    pub const fn accuracy(&self) -> Option<bool> {
        self.accuracy
    }

    /// Activation-proxy value, if supplied.
    #[must_use]
    pub const fn activation(&self) -> Option<f64> {
        self.activation
    }

    /// Absolute onset difference between the two sources, in milliseconds.
    #[must_use]
    pub fn onset_delta_ms(&self) -> f64 {
        (self.onset_time - self.timing_onset).abs() * 1000.0
    }
}

/// Builder for `TrialRecord`.
#[derive(Debug)]
pub struct TrialRecordBuilder {
    record: TrialRecord,
}

impl TrialRecordBuilder {
    /// Set the timing-stream onset (seconds).
    #[must_use]
    pub const fn timing_onset(mut self, onset: f64) -> Self {
        self.record.timing_onset = onset;
        self
    }

    /// Set the response time (milliseconds).
    #[must_use]
    pub const fn response_time(mut self, response_time: Option<f64>) -> Self {
        self.record.response_time = response_time;
        self
    }

    /// Set the response accuracy.
    #[must_use]
    pub const fn accuracy(mut self, accuracy: Option<bool>) -> Self {
        self.record.accuracy = accuracy;
        self
    }

    /// Set the activation-proxy value.
    #[must_use]
    pub const fn activation(mut self, activation: Option<f64>) -> Self {
        self.record.activation = activation;
        self
    }

    /// Build the `TrialRecord`.
    #[must_use]
    pub fn build(self) -> TrialRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_labels_parse() {
        assert_eq!("Shape".parse::<Condition>().unwrap(), Condition::Shape);
        assert_eq!("SCRtool".parse::<Condition>().unwrap(), Condition::ScrambledTool);
        assert_eq!("scrshape".parse::<Condition>().unwrap(), Condition::ScrambledShape);
        assert_eq!("clench".parse::<Condition>().unwrap(), Condition::Localizer);
        assert!("hammer".parse::<Condition>().is_err());
    }

    #[test]
    fn test_run_kind_labels_parse() {
        assert_eq!("PV".parse::<RunKind>().unwrap(), RunKind::PassiveViewing);
        assert_eq!("IG".parse::<RunKind>().unwrap(), RunKind::ImaginedGrasp);
        assert_eq!("clench".parse::<RunKind>().unwrap(), RunKind::MotorLocalizer);
        let err = "active".parse::<RunKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown run kind label 'active'");
    }

    #[test]
    fn test_allowed_conditions() {
        assert!(RunKind::PassiveViewing.permits(Condition::ScrambledTool));
        assert!(!RunKind::PassiveViewing.permits(Condition::Localizer));
        assert!(RunKind::MotorLocalizer.permits(Condition::Localizer));
        assert!(!RunKind::MotorLocalizer.permits(Condition::Tool));
    }

    #[test]
    fn test_onset_delta_ms() {
        let trial = TrialRecord::builder("S01", RunKind::PassiveViewing, Condition::Tool, 1, 1, 10.0)
            .timing_onset(10.075)
            .build();
        assert!((trial.onset_delta_ms() - 75.0).abs() < 1e-6);
    }
}
