//! AFNI stimulus-timing files
//!
//! Per-condition timing files list onsets (seconds) for each run on its own
//! line:
//!
//! ```text
//! 12.0 36.5:16 60.0
//! *
//! 8.0 32.0
//! ```
//!
//! An optional `:duration` suffix (seconds) is kept as the event duration,
//! and a line starting with `*` means the condition has no events in that
//! run.

use super::TimingEvent;
use crate::trial::Condition;
use crate::{Error, Result};

/// One entry of a timing file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimTime {
    /// Onset, seconds from scan start
    pub onset: f64,
    /// Duration from a `:duration` suffix
    pub duration: Option<f64>,
}

impl From<f64> for StimTime {
    fn from(onset: f64) -> Self {
        Self {
            onset,
            duration: None,
        }
    }
}

/// Parse a timing file into one entry list per run (data line).
///
/// # Errors
///
/// Returns `Error::Validation` for an onset that is not a finite,
/// non-negative number or a duration that is not finite. The run number is
/// the 1-based index of the data line, blank lines not counted.
pub fn parse_stim_events(text: &str) -> Result<Vec<Vec<StimTime>>> {
    let mut runs = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let run_number = u32::try_from(runs.len() + 1).unwrap_or(u32::MAX);
        if line.starts_with('*') {
            runs.push(Vec::new());
            continue;
        }
        let mut events = Vec::new();
        for token in line.split_whitespace() {
            let invalid = || Error::Validation {
                run_number,
                message: format!("invalid timing token '{token}' in timing file"),
            };
            let (onset, duration) = match token.split_once(':') {
                Some((onset, duration)) => (onset, Some(duration)),
                None => (token, None),
            };
            let onset: f64 = onset.parse().map_err(|_| invalid())?;
            if !onset.is_finite() || onset < 0.0 {
                return Err(Error::Validation {
                    run_number,
                    message: format!("onset must be finite and >= 0, got {onset}"),
                });
            }
            let duration = match duration {
                Some(d) => {
                    let d: f64 = d.parse().map_err(|_| invalid())?;
                    if !d.is_finite() {
                        return Err(invalid());
                    }
                    Some(d)
                }
                None => None,
            };
            events.push(StimTime { onset, duration });
        }
        runs.push(events);
    }
    Ok(runs)
}

/// Parse a timing file into one onset list per run, dropping durations.
///
/// # Errors
///
/// Same as [`parse_stim_events`].
///
/// # Example
///
/// ```rust
/// use toolrep::ingest::afni::parse_stim_times;
///
/// # fn main() -> toolrep::Result<()> {
/// let runs = parse_stim_times("10.0 30.5:16\n*\n")?;
/// assert_eq!(runs, vec![vec![10.0, 30.5], vec![]]);
/// # Ok(())
/// # }
/// ```
pub fn parse_stim_times(text: &str) -> Result<Vec<Vec<f64>>> {
    Ok(parse_stim_events(text)?
        .into_iter()
        .map(|run| run.into_iter().map(|e| e.onset).collect())
        .collect())
}

/// Merge per-condition onset lists of one run into a single timing stream
/// ordered by onset.
///
/// Accepts plain onsets or [`StimTime`] entries. Equal onsets keep the order
/// in which their conditions were given, which the validator then reports
/// as a non-increasing stream.
#[must_use]
pub fn timing_stream<T>(per_condition: &[(Condition, Vec<T>)]) -> Vec<TimingEvent>
where
    T: Copy + Into<StimTime>,
{
    let mut events: Vec<(StimTime, Condition)> = per_condition
        .iter()
        .flat_map(|(condition, entries)| entries.iter().map(move |&e| (e.into(), *condition)))
        .collect();
    events.sort_by(|a, b| a.0.onset.total_cmp(&b.0.onset));
    events
        .into_iter()
        .map(|(entry, condition)| {
            let event = TimingEvent::new(condition.as_str(), entry.onset);
            match entry.duration {
                Some(duration) => event.with_duration(duration),
                None => event,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_duration_suffix() {
        let runs = parse_stim_times("12 36.5:16 60:16\n").unwrap();
        assert_eq!(runs, vec![vec![12.0, 36.5, 60.0]]);
    }

    #[test]
    fn test_parse_keeps_durations() {
        let runs = parse_stim_events("12 36.5:16\n").unwrap();
        assert_eq!(
            runs[0],
            vec![
                StimTime { onset: 12.0, duration: None },
                StimTime { onset: 36.5, duration: Some(16.0) },
            ]
        );
        assert!(parse_stim_events("4.0:inf\n").is_err());
        assert!(parse_stim_events("4.0:x\n").is_err());

        let stream = timing_stream(&[(Condition::Tool, runs[0].clone())]);
        assert_eq!(stream[0].duration, None);
        assert_eq!(stream[1].duration, Some(16.0));
    }

    #[test]
    fn test_error_names_data_line_not_file_line() {
        let err = parse_stim_times("1.0 2.0\n\n\n3.0 abc\n").unwrap_err();
        assert!(matches!(err, Error::Validation { run_number: 2, .. }));
    }

    #[test]
    fn test_parse_star_line_is_empty_run() {
        let runs = parse_stim_times("*\n4.0 8.0\n\n* *\n").unwrap();
        assert_eq!(runs.len(), 3);
        assert!(runs[0].is_empty());
        assert_eq!(runs[1], vec![4.0, 8.0]);
        assert!(runs[2].is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_stim_times("1.0 2.0\n3.0 abc\n").unwrap_err();
        assert!(matches!(err, Error::Validation { run_number: 2, .. }));
        assert!(parse_stim_times("-4.0\n").is_err());
    }

    #[test]
    fn test_timing_stream_interleaves_conditions() {
        let stream = timing_stream(&[
            (Condition::Tool, vec![2.0, 10.0]),
            (Condition::Shape, vec![6.0]),
        ]);
        let labels: Vec<&str> = stream
            .iter()
            .map(|e| e.condition.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(labels, vec!["tool", "shape", "tool"]);
        assert_eq!(stream[1].onset_time, Some(6.0));
    }
}
