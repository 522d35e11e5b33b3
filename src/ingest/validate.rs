//! Per-run structural validation and source merge
//!
//! A run either validates completely or is rejected with a run-scoped
//! error. Trials are never dropped individually and streams are never
//! truncated to a common length.

use std::collections::BTreeSet;

use super::{BehavioralEvent, RawRun, TimingEvent};
use crate::trial::{Condition, RunKind, TrialRecord};
use crate::{Error, Result};

/// Merge and validate one run into trial records.
///
/// # Errors
///
/// - `Error::Validation` for missing labels/onsets, unknown labels,
///   conditions not permitted for the run kind, or non-finite values
/// - `Error::DataIntegrity` for stream length mismatch, disagreeing condition
///   labels, duplicate or out-of-order trial numbers, or non-increasing
///   onsets
pub fn validate_run(participant_id: &str, run: &RawRun) -> Result<Vec<TrialRecord>> {
    let run_number = run.run_number;
    if run_number == 0 {
        return Err(validation(run_number, "run number must be positive"));
    }

    if run.behavioral.len() != run.timing.len() {
        return Err(integrity(
            run_number,
            format!(
                "source cardinality mismatch: {} behavioral events vs {} timing events",
                run.behavioral.len(),
                run.timing.len()
            ),
        ));
    }

    let mut trials = Vec::with_capacity(run.behavioral.len());
    let mut seen = BTreeSet::new();
    let mut previous_trial: Option<u32> = None;

    for (index, (event, timing)) in run.behavioral.iter().zip(&run.timing).enumerate() {
        let position = index + 1;
        let condition = behavioral_condition(run_number, run.run_kind, position, event)?;
        let timing_condition = timing_condition(run_number, position, timing)?;
        if condition != timing_condition {
            return Err(integrity(
                run_number,
                format!(
                    "trial {position}: behavioral condition '{condition}' disagrees with timing condition '{timing_condition}'"
                ),
            ));
        }

        let onset = required_onset(run_number, position, "behavioral", event.onset_time)?;
        let timing_onset = required_onset(run_number, position, "timing", timing.onset_time)?;
        let response_time = optional_value(run_number, position, "response time", event.response_time)?;
        let activation = optional_finite(run_number, position, "activation", event.activation)?;
        optional_finite(run_number, position, "duration", timing.duration)?;

        let trial_number = match event.trial_number {
            Some(0) => {
                return Err(validation(
                    run_number,
                    format!("trial {position}: declared trial number must be positive"),
                ))
            }
            Some(n) => n,
            None => u32::try_from(position).map_err(|_| {
                validation(run_number, format!("trial {position}: too many trials in run"))
            })?,
        };
        if !seen.insert(trial_number) {
            return Err(integrity(
                run_number,
                format!("duplicate trial number {trial_number}"),
            ));
        }
        // Onsets are checked in logged order, so trial order must agree with it
        if let Some(prev) = previous_trial.filter(|&prev| trial_number < prev) {
            return Err(integrity(
                run_number,
                format!("trial {position}: trial number {trial_number} logged after trial {prev}"),
            ));
        }
        previous_trial = Some(trial_number);

        trials.push(
            TrialRecord::builder(
                participant_id,
                run.run_kind,
                condition,
                run_number,
                trial_number,
                onset,
            )
            .timing_onset(timing_onset)
            .response_time(response_time)
            .accuracy(event.accuracy)
            .activation(activation)
            .build(),
        );
    }

    check_strictly_increasing(run_number, "behavioral", trials.iter().map(TrialRecord::onset_time))?;
    check_strictly_increasing(run_number, "timing", trials.iter().map(TrialRecord::timing_onset))?;

    Ok(trials)
}

fn behavioral_condition(
    run_number: u32,
    run_kind: RunKind,
    position: usize,
    event: &BehavioralEvent,
) -> Result<Condition> {
    let label = event.condition.as_deref().ok_or_else(|| {
        validation(run_number, format!("trial {position}: missing behavioral condition"))
    })?;
    let condition: Condition = label
        .parse()
        .map_err(|e| validation(run_number, format!("trial {position}: {e}")))?;
    if !run_kind.permits(condition) {
        return Err(validation(
            run_number,
            format!("trial {position}: condition '{condition}' not allowed in a {run_kind} run"),
        ));
    }
    Ok(condition)
}

fn timing_condition(run_number: u32, position: usize, event: &TimingEvent) -> Result<Condition> {
    let label = event.condition.as_deref().ok_or_else(|| {
        validation(run_number, format!("trial {position}: missing timing condition"))
    })?;
    label
        .parse()
        .map_err(|e| validation(run_number, format!("trial {position}: {e}")))
}

fn required_onset(run_number: u32, position: usize, source: &str, onset: Option<f64>) -> Result<f64> {
    match onset {
        None => Err(validation(
            run_number,
            format!("trial {position}: missing {source} onset"),
        )),
        Some(t) if !t.is_finite() || t < 0.0 => Err(validation(
            run_number,
            format!("trial {position}: {source} onset must be finite and >= 0, got {t}"),
        )),
        Some(t) => Ok(t),
    }
}

/// Optional non-negative measurement.
fn optional_value(
    run_number: u32,
    position: usize,
    name: &str,
    value: Option<f64>,
) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(validation(
            run_number,
            format!("trial {position}: {name} must be finite and >= 0, got {v}"),
        )),
        other => Ok(other),
    }
}

fn optional_finite(
    run_number: u32,
    position: usize,
    name: &str,
    value: Option<f64>,
) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() => Err(validation(
            run_number,
            format!("trial {position}: {name} must be finite, got {v}"),
        )),
        other => Ok(other),
    }
}

fn check_strictly_increasing(
    run_number: u32,
    source: &str,
    onsets: impl Iterator<Item = f64>,
) -> Result<()> {
    let mut previous: Option<f64> = None;
    for (index, onset) in onsets.enumerate() {
        if let Some(prev) = previous {
            if onset <= prev {
                return Err(integrity(
                    run_number,
                    format!(
                        "{source} onsets not strictly increasing at trial {}: {onset} after {prev}",
                        index + 1
                    ),
                ));
            }
        }
        previous = Some(onset);
    }
    Ok(())
}

fn validation(run_number: u32, message: impl Into<String>) -> Error {
    Error::Validation {
        run_number,
        message: message.into(),
    }
}

fn integrity(run_number: u32, message: impl Into<String>) -> Error {
    Error::DataIntegrity {
        run_number,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(behavioral: Vec<BehavioralEvent>, timing: Vec<TimingEvent>) -> RawRun {
        RawRun::new(1, RunKind::PassiveViewing)
            .with_behavioral(behavioral)
            .with_timing(timing)
    }

    #[test]
    fn test_merge_keeps_both_onsets() {
        let trials = validate_run(
            "S01",
            &run(
                vec![
                    BehavioralEvent::new("tool", 1.0).with_response(520.0, true),
                    BehavioralEvent::new("Shape", 5.0),
                ],
                vec![TimingEvent::new("tool", 1.01), TimingEvent::new("shape", 5.0)],
            ),
        )
        .unwrap();

        assert_eq!(trials.len(), 2);
        assert_eq!(trials[0].trial_number(), 1);
        assert_eq!(trials[1].trial_number(), 2);
        assert_eq!(trials[1].condition(), Condition::Shape);
        assert!((trials[0].timing_onset() - 1.01).abs() < f64::EPSILON);
        assert_eq!(trials[0].response_time(), Some(520.0));
    }

    #[test]
    fn test_cardinality_mismatch_is_integrity_error() {
        let err = validate_run(
            "S01",
            &run(
                vec![BehavioralEvent::new("tool", 1.0), BehavioralEvent::new("tool", 2.0)],
                vec![TimingEvent::new("tool", 1.0)],
            ),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { run_number: 1, .. }));
        assert!(err.to_string().contains("cardinality mismatch"));
    }

    #[test]
    fn test_unknown_condition_is_validation_error() {
        let err = validate_run(
            "S01",
            &run(
                vec![BehavioralEvent::new("hammer", 1.0)],
                vec![TimingEvent::new("tool", 1.0)],
            ),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_localizer_not_allowed_in_viewing_run() {
        let err = validate_run(
            "S01",
            &run(
                vec![BehavioralEvent::new("clench", 1.0)],
                vec![TimingEvent::new("clench", 1.0)],
            ),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[test]
    fn test_missing_onset_is_validation_error() {
        let missing = BehavioralEvent {
            condition: Some("tool".to_string()),
            ..BehavioralEvent::default()
        };
        let err = validate_run("S01", &run(vec![missing], vec![TimingEvent::new("tool", 1.0)]))
            .unwrap_err();
        assert!(err.to_string().contains("missing behavioral onset"));
    }

    #[test]
    fn test_condition_disagreement_is_integrity_error() {
        let err = validate_run(
            "S01",
            &run(
                vec![BehavioralEvent::new("tool", 1.0)],
                vec![TimingEvent::new("shape", 1.0)],
            ),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { .. }));
    }

    #[test]
    fn test_non_monotonic_onsets() {
        let err = validate_run(
            "S01",
            &run(
                vec![BehavioralEvent::new("tool", 4.0), BehavioralEvent::new("tool", 4.0)],
                vec![TimingEvent::new("tool", 4.0), TimingEvent::new("tool", 6.0)],
            ),
        )
        .unwrap_err();
        assert!(err.to_string().contains("behavioral onsets not strictly increasing"));

        let err = validate_run(
            "S01",
            &run(
                vec![BehavioralEvent::new("tool", 4.0), BehavioralEvent::new("tool", 6.0)],
                vec![TimingEvent::new("tool", 6.0), TimingEvent::new("tool", 4.0)],
            ),
        )
        .unwrap_err();
        assert!(err.to_string().contains("timing onsets"));
    }

    #[test]
    fn test_declared_duplicate_trial_number() {
        let err = validate_run(
            "S01",
            &run(
                vec![
                    BehavioralEvent::new("tool", 1.0).with_trial_number(3),
                    BehavioralEvent::new("tool", 2.0).with_trial_number(3),
                ],
                vec![TimingEvent::new("tool", 1.0), TimingEvent::new("tool", 2.0)],
            ),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate trial number 3"));
    }

    #[test]
    fn test_declared_trial_numbers_must_follow_log_order() {
        let err = validate_run(
            "S01",
            &run(
                vec![
                    BehavioralEvent::new("tool", 1.0).with_trial_number(2),
                    BehavioralEvent::new("tool", 2.0).with_trial_number(1),
                ],
                vec![TimingEvent::new("tool", 1.0), TimingEvent::new("tool", 2.0)],
            ),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { run_number: 1, .. }));
        assert!(err.to_string().contains("trial number 1 logged after trial 2"));

        // Gaps are fine as long as the order holds
        let trials = validate_run(
            "S01",
            &run(
                vec![
                    BehavioralEvent::new("tool", 1.0).with_trial_number(3),
                    BehavioralEvent::new("tool", 2.0).with_trial_number(7),
                ],
                vec![TimingEvent::new("tool", 1.0), TimingEvent::new("tool", 2.0)],
            ),
        )
        .unwrap();
        assert_eq!(trials[1].trial_number(), 7);
    }

    #[test]
    fn test_non_finite_duration_rejected() {
        let err = validate_run(
            "S01",
            &run(
                vec![BehavioralEvent::new("tool", 1.0)],
                vec![TimingEvent::new("tool", 1.0).with_duration(f64::NAN)],
            ),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duration must be finite"));
    }

    #[test]
    fn test_negative_response_time_rejected() {
        let err = validate_run(
            "S01",
            &run(
                vec![BehavioralEvent::new("tool", 1.0).with_response(-3.0, true)],
                vec![TimingEvent::new("tool", 1.0)],
            ),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
