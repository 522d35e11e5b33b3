//! Raw per-run sources as delivered by the acquisition collaborators
//!
//! Every field that a log parser can fail to recover is optional here, so
//! missing data reaches the validator instead of being papered over.

use serde::{Deserialize, Serialize};

use crate::trial::RunKind;

/// One event from the behavioral log (stimulus-presentation software).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralEvent {
    /// Condition label as logged (e.g. `"tool"`, `"SCRshape"`)
    pub condition: Option<String>,
    /// Stimulus onset, seconds from scan start
    pub onset_time: Option<f64>,
    /// Response time in milliseconds
    pub response_time: Option<f64>,
    /// Response accuracy
    pub accuracy: Option<bool>,
    /// Activation-proxy value supplied alongside the log
    pub activation: Option<f64>,
    /// Trial number declared by the log; ordinal position when absent
    pub trial_number: Option<u32>,
}

impl BehavioralEvent {
    /// Event with a condition label and onset, no response.
    #[must_use]
    pub fn new(condition: impl Into<String>, onset_time: f64) -> Self {
        Self {
            condition: Some(condition.into()),
            onset_time: Some(onset_time),
            ..Self::default()
        }
    }

    /// Attach a response time (ms) and accuracy.
    #[must_use]
    pub const fn with_response(mut self, response_time: f64, accuracy: bool) -> Self {
        self.response_time = Some(response_time);
        self.accuracy = Some(accuracy);
        self
    }

    /// Attach an activation-proxy value.
    #[must_use]
    pub const fn with_activation(mut self, activation: f64) -> Self {
        self.activation = Some(activation);
        self
    }

    /// Declare an explicit trial number.
    #[must_use]
    pub const fn with_trial_number(mut self, trial_number: u32) -> Self {
        self.trial_number = Some(trial_number);
        self
    }
}

/// One event from the independent timing stream (imaging condition files).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingEvent {
    /// Condition label of the timing file the onset came from
    pub condition: Option<String>,
    /// Onset, seconds from scan start
    pub onset_time: Option<f64>,
    /// Stimulus duration in seconds, when the timing file records one
    #[serde(default)]
    pub duration: Option<f64>,
}

impl TimingEvent {
    /// Timing event with a condition label and onset.
    #[must_use]
    pub fn new(condition: impl Into<String>, onset_time: f64) -> Self {
        Self {
            condition: Some(condition.into()),
            onset_time: Some(onset_time),
            duration: None,
        }
    }

    /// Attach a stimulus duration (s).
    #[must_use]
    pub const fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Both sources for one run of one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRun {
    /// 1-based run number
    pub run_number: u32,
    /// Task performed during the run
    pub run_kind: RunKind,
    /// Behavioral log events, in logged order
    pub behavioral: Vec<BehavioralEvent>,
    /// Timing-stream events, in onset order
    pub timing: Vec<TimingEvent>,
}

impl RawRun {
    /// Create an empty run.
    #[must_use]
    pub const fn new(run_number: u32, run_kind: RunKind) -> Self {
        Self {
            run_number,
            run_kind,
            behavioral: Vec::new(),
            timing: Vec::new(),
        }
    }

    /// Set the behavioral stream.
    #[must_use]
    pub fn with_behavioral(mut self, events: Vec<BehavioralEvent>) -> Self {
        self.behavioral = events;
        self
    }

    /// Set the timing stream.
    #[must_use]
    pub fn with_timing(mut self, events: Vec<TimingEvent>) -> Self {
        self.timing = events;
        self
    }

    /// Trials this run could contribute: the longer of the two streams.
    #[must_use]
    pub fn attempted_trials(&self) -> usize {
        self.behavioral.len().max(self.timing.len())
    }
}
