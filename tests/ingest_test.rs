//! Integration tests for ingestion & validation
//!
//! Toyota Way: Jidoka (stop the bad run, keep the line moving)

use arrow::array::{Array, Float64Array, StringArray, UInt32Array};
use toolrep::config::PipelineConfig;
use toolrep::ingest::afni::{parse_stim_events, parse_stim_times, timing_stream};
use toolrep::ingest::{ingest, BehavioralEvent, DurationIssue, RawRun, RunFailureKind, TimingEvent};
use toolrep::trial::{Condition, RunKind};

/// Alternating tool/shape run with `n` trials, 4 s apart, matching timing.
fn pv_run(run_number: u32, n: u32) -> RawRun {
    let labels = ["tool", "shape"];
    let behavioral = (0..n)
        .map(|i| {
            BehavioralEvent::new(labels[i as usize % 2], f64::from(i) * 4.0 + 2.0)
                .with_response(500.0 + f64::from(i), true)
        })
        .collect();
    let timing = (0..n)
        .map(|i| TimingEvent::new(labels[i as usize % 2], f64::from(i) * 4.0 + 2.0))
        .collect();
    RawRun::new(run_number, RunKind::PassiveViewing)
        .with_behavioral(behavioral)
        .with_timing(timing)
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merged_count_equals_source_count() {
    let runs = [pv_run(1, 8), pv_run(2, 6)];
    let (table, quality) = ingest("S01", &runs, &PipelineConfig::default());

    assert_eq!(table.len(), 14);
    assert_eq!(table.run(1).count(), 8);
    assert_eq!(table.run(2).count(), 6);
    assert_eq!(table.run_numbers(), vec![1, 2]);
    assert!(quality.run_failures().is_empty());
    assert!((quality.completeness_ratio() - 1.0).abs() < 1e-12);
    assert!((quality.quality_score() - 1.0).abs() < 1e-12);
}

#[test]
fn test_cardinality_mismatch_excludes_run() {
    let mut short = pv_run(2, 6);
    short.timing.pop();
    let (table, quality) = ingest("S01", &[pv_run(1, 8), short], &PipelineConfig::default());

    assert_eq!(table.len(), 8);
    assert_eq!(quality.attempted_trials(), 14);
    let failure = &quality.run_failures()[0];
    assert_eq!(failure.run_number, 2);
    assert_eq!(failure.kind, RunFailureKind::DataIntegrity);
    assert!(failure.message.contains("cardinality"));
    assert!((quality.completeness_ratio() - 8.0 / 14.0).abs() < 1e-12);
}

#[test]
fn test_duplicate_trial_number_fails_only_that_run() {
    let mut run = pv_run(2, 4);
    run.behavioral[1].trial_number = Some(1);
    let (table, quality) = ingest("S01", &[pv_run(1, 4), run, pv_run(3, 4)], &PipelineConfig::default());

    assert_eq!(table.run_numbers(), vec![1, 3]);
    assert_eq!(quality.run_failures().len(), 1);
    assert_eq!(quality.run_failures()[0].run_number, 2);
    assert!(quality.run_failures()[0].message.contains("duplicate trial number 1"));
}

#[test]
fn test_duplicate_run_number_rejects_later_run() {
    let (table, quality) = ingest("S01", &[pv_run(1, 4), pv_run(1, 6)], &PipelineConfig::default());
    assert_eq!(table.len(), 4);
    assert_eq!(quality.run_failures()[0].kind, RunFailureKind::DataIntegrity);
}

// ============================================================================
// Structural validation
// ============================================================================

#[test]
fn test_condition_not_allowed_for_run_kind() {
    let run = RawRun::new(1, RunKind::MotorLocalizer)
        .with_behavioral(vec![BehavioralEvent::new("tool", 1.0)])
        .with_timing(vec![TimingEvent::new("tool", 1.0)]);
    let (table, quality) = ingest("S01", &[run], &PipelineConfig::default());
    assert!(table.is_empty());
    assert_eq!(quality.run_failures()[0].kind, RunFailureKind::Validation);
    assert!(quality.quality_score().abs() < f64::EPSILON);
}

#[test]
fn test_unknown_label_is_validation_error() {
    let mut run = pv_run(1, 4);
    run.behavioral[2].condition = Some("hammer".to_string());
    let (_, quality) = ingest("S01", &[run], &PipelineConfig::default());
    let failure = &quality.run_failures()[0];
    assert_eq!(failure.kind, RunFailureKind::Validation);
    assert!(failure.message.contains("hammer"));
}

#[test]
fn test_missing_onset_is_validation_error() {
    let mut run = pv_run(1, 4);
    run.behavioral[0].onset_time = None;
    let (_, quality) = ingest("S01", &[run], &PipelineConfig::default());
    assert_eq!(quality.run_failures()[0].kind, RunFailureKind::Validation);
}

#[test]
fn test_non_increasing_onsets_is_integrity_error() {
    let mut run = pv_run(1, 4);
    run.behavioral[2].onset_time = Some(1.0);
    let (_, quality) = ingest("S01", &[run], &PipelineConfig::default());
    let failure = &quality.run_failures()[0];
    assert_eq!(failure.kind, RunFailureKind::DataIntegrity);
    assert!(failure.message.contains("not strictly increasing"));
}

#[test]
fn test_trial_numbers_against_log_order_exclude_run() {
    let run = RawRun::new(1, RunKind::PassiveViewing)
        .with_behavioral(vec![
            BehavioralEvent::new("tool", 1.0).with_trial_number(2),
            BehavioralEvent::new("tool", 2.0).with_trial_number(1),
        ])
        .with_timing(vec![TimingEvent::new("tool", 1.0), TimingEvent::new("tool", 2.0)]);
    let (table, quality) = ingest("S01", &[run, pv_run(2, 4)], &PipelineConfig::default());

    assert_eq!(table.run_numbers(), vec![2]);
    let failure = &quality.run_failures()[0];
    assert_eq!(failure.run_number, 1);
    assert_eq!(failure.kind, RunFailureKind::DataIntegrity);

    // Every accepted run has onsets increasing in trial order
    let onsets: Vec<f64> = table.run(2).map(|t| t.onset_time()).collect();
    assert!(onsets.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_label_disagreement_is_integrity_error() {
    let mut run = pv_run(1, 4);
    run.timing[0].condition = Some("shape".to_string());
    let (_, quality) = ingest("S01", &[run], &PipelineConfig::default());
    assert_eq!(quality.run_failures()[0].kind, RunFailureKind::DataIntegrity);
}

// ============================================================================
// Timing synchronization
// ============================================================================

#[test]
fn test_sync_flag_keeps_trial() {
    let mut run = pv_run(1, 4);
    run.timing[3].onset_time = Some(14.08); // behavioral 14.0 -> 80 ms
    let (table, quality) = ingest("S01", &[run], &PipelineConfig::default());

    assert_eq!(table.len(), 4);
    let flags = quality.sync_flags();
    assert_eq!(flags.len(), 1);
    assert_eq!(flags[0].trial_number, 4);
    assert!((flags[0].delta_ms - 80.0).abs() < 1e-6);
    assert!((quality.sync_flag_ratio() - 0.25).abs() < 1e-12);
    assert!((quality.quality_score() - 0.875).abs() < 1e-12);
}

#[test]
fn test_tolerance_is_configurable() {
    let mut run = pv_run(1, 4);
    run.timing[3].onset_time = Some(14.08);
    let config = PipelineConfig::builder().timing_tolerance_ms(100.0).build().unwrap();
    let (_, quality) = ingest("S01", &[run], &config);
    assert!(quality.sync_flags().is_empty());
}

// ============================================================================
// Quality report and columnar view
// ============================================================================

#[test]
fn test_missing_value_counts() {
    let mut run = pv_run(1, 4);
    run.behavioral[1].response_time = None;
    run.behavioral[1].accuracy = None;
    run.behavioral[0].activation = Some(0.4);
    let (_, quality) = ingest("S01", &[run], &PipelineConfig::default());

    let missing = quality.missing_values();
    assert_eq!(missing.response_time, 1);
    assert_eq!(missing.accuracy, 1);
    assert_eq!(missing.activation, 3);
    assert_eq!(quality.condition_counts().get(&Condition::Tool), Some(&2));
    assert_eq!(quality.condition_counts().get(&Condition::Shape), Some(&2));
}

#[test]
fn test_record_batch_view() {
    let mut run = pv_run(1, 4);
    run.behavioral[1].response_time = None;
    let (table, _) = ingest("S01", &[run], &PipelineConfig::default());
    let batch = table.to_record_batch().unwrap();

    assert_eq!(batch.num_rows(), 4);
    assert_eq!(batch.schema(), toolrep::trial::TrialTable::arrow_schema());

    let conditions = batch
        .column_by_name("condition")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(conditions.value(0), "tool");
    assert_eq!(conditions.value(1), "shape");

    let trial_numbers = batch
        .column_by_name("trial_number")
        .unwrap()
        .as_any()
        .downcast_ref::<UInt32Array>()
        .unwrap();
    assert_eq!(trial_numbers.value(3), 4);

    let rts = batch
        .column_by_name("response_time")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert!(rts.is_null(1));
    assert!((rts.value(0) - 500.0).abs() < f64::EPSILON);
}

// ============================================================================
// AFNI timing files
// ============================================================================

#[test]
fn test_duration_flags_reach_quality_report() {
    let mut run = pv_run(1, 20);
    for event in &mut run.timing {
        event.duration = Some(16.0);
    }
    run.timing[7].duration = Some(90.0);
    run.timing[12].duration = Some(-1.0);
    let (table, quality) = ingest("S01", &[run], &PipelineConfig::default());

    assert_eq!(table.len(), 20);
    let flags: Vec<(u32, DurationIssue)> = quality
        .duration_flags()
        .iter()
        .map(|f| (f.trial_number, f.issue))
        .collect();
    assert_eq!(
        flags,
        vec![(8, DurationIssue::Outlier), (13, DurationIssue::Negative)]
    );
    // Diagnostics only: the score is unaffected
    assert!((quality.quality_score() - 1.0).abs() < 1e-12);
}

#[test]
fn test_afni_durations_feed_quality_report() {
    let tool = parse_stim_events("2.0:16 10.0:16\n").unwrap();
    let shape = parse_stim_events("6.0:16 14.0:-2\n").unwrap();
    let timing = timing_stream(&[
        (Condition::Tool, tool[0].clone()),
        (Condition::Shape, shape[0].clone()),
    ]);
    let (_, quality) = ingest(
        "S01",
        &[pv_run(1, 4).with_timing(timing)],
        &PipelineConfig::default(),
    );
    let flags = quality.duration_flags();
    assert_eq!(flags.len(), 1);
    assert_eq!((flags[0].trial_number, flags[0].issue), (4, DurationIssue::Negative));
}

#[test]
fn test_afni_timing_feeds_ingestion() {
    let tool = parse_stim_times("2.0 10.0\n").unwrap();
    let shape = parse_stim_times("6.0:16 14.0:16\n").unwrap();
    let timing = timing_stream(&[
        (Condition::Tool, tool[0].clone()),
        (Condition::Shape, shape[0].clone()),
    ]);
    assert_eq!(timing.len(), 4);

    let (table, quality) = ingest(
        "S01",
        &[pv_run(1, 4).with_timing(timing)],
        &PipelineConfig::default(),
    );
    assert_eq!(table.len(), 4);
    assert!(quality.sync_flags().is_empty());
}
