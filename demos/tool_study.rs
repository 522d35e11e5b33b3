//! Tool Study: one participant from raw logs to an FDR-corrected report
//!
//! Builds a synthetic participant (two passive-viewing runs, two
//! imagined-grasp runs, one clench localizer), reads the timing stream of each
//! stimulus run from AFNI-style condition files, and runs the full pipeline
//! over the four research questions.
//!
//! Run with: RUST_LOG=toolrep=debug cargo run --example tool_study

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use toolrep::config::PipelineConfig;
use toolrep::ingest::afni::{parse_stim_events, timing_stream};
use toolrep::ingest::{BehavioralEvent, RawRun, TimingEvent};
use toolrep::pipeline::Pipeline;
use toolrep::spatial::SpatialMetadata;
use toolrep::stats::ContrastSpec;
use toolrep::trial::{Condition, RunKind};

const TRIAL_SPACING_S: f64 = 12.0;
const TRIALS_PER_CONDITION: u32 = 6;

/// Behavioral log plus the AFNI condition files of one stimulus run.
fn stimulus_run(run_number: u32, run_kind: RunKind, rt_offset_ms: f64) -> Result<RawRun> {
    let mut behavioral = Vec::new();
    let mut afni_lines: Vec<(Condition, String)> = Condition::STIMULI
        .iter()
        .map(|&c| (c, String::new()))
        .collect();

    for i in 0..TRIALS_PER_CONDITION * 4 {
        let slot = (i % 4) as usize;
        let condition = Condition::STIMULI[slot];
        let onset = f64::from(i).mul_add(TRIAL_SPACING_S, 6.0);
        let base_rt = [565.0, 522.0, 548.0, 517.0][slot];
        let rt = f64::from((i * 13) % 17).mul_add(4.0, base_rt + rt_offset_ms);

        behavioral.push(
            BehavioralEvent::new(condition.as_str(), onset)
                .with_response(rt, i % 7 != 0)
                .with_activation(rt / 1000.0),
        );
        // Scanner log rounds to 10 ms and reports a 16 s block duration
        afni_lines[slot].1.push_str(&format!("{:.2}:16 ", onset + 0.004));
    }

    let mut per_condition = Vec::new();
    for (condition, line) in afni_lines {
        let runs = parse_stim_events(&line)
            .with_context(|| format!("parsing {condition} timing file"))?;
        per_condition.push((condition, runs.into_iter().next().unwrap_or_default()));
    }

    Ok(RawRun::new(run_number, run_kind)
        .with_behavioral(behavioral)
        .with_timing(timing_stream(&per_condition)))
}

fn clench_run(run_number: u32) -> RawRun {
    let onsets: Vec<f64> = (0..12).map(|i| f64::from(i).mul_add(20.0, 10.0)).collect();
    RawRun::new(run_number, RunKind::MotorLocalizer)
        .with_behavioral(
            onsets
                .iter()
                .zip(0_u32..)
                .map(|(&t, i)| {
                    BehavioralEvent::new("clench", t).with_response(f64::from(i % 5).mul_add(6.0, 602.0), true)
                })
                .collect(),
        )
        .with_timing(onsets.iter().map(|&t| TimingEvent::new("clench", t)).collect())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Tool Study Pipeline ===\n");

    let runs = vec![
        stimulus_run(1, RunKind::PassiveViewing, 0.0)?,
        stimulus_run(2, RunKind::PassiveViewing, 6.0)?,
        stimulus_run(3, RunKind::ImaginedGrasp, 38.0)?,
        stimulus_run(4, RunKind::ImaginedGrasp, 44.0)?,
        clench_run(5),
    ];

    let config = PipelineConfig::builder()
        .timing_tolerance_ms(50.0)
        .min_sample_size(10)
        .alpha(0.05)
        .build()?;
    let specs: Vec<ContrastSpec> = ContrastSpec::research_questions()
        .into_iter()
        .chain(ContrastSpec::supplementary_contrasts())
        .collect();
    let report = Pipeline::new(config)?.run(
        "S01",
        &runs,
        &specs,
        &SpatialMetadata::study_defaults(),
    )?;

    let quality = report.quality();
    println!("Ingestion:");
    println!("  Trials accepted: {}/{}", quality.total_trials(), quality.attempted_trials());
    println!("  Sync flags: {}", quality.sync_flags().len());
    println!("  Duration flags: {}", quality.duration_flags().len());
    println!("  Failed runs: {}", quality.run_failures().len());
    println!("  Quality score: {:.3}\n", quality.quality_score());

    println!("Contrasts:");
    for activation in report.activations() {
        let r = &activation.result;
        println!(
            "  {:<26} t({:.1}) = {:>6.2}  p = {:.2e}  q = {:.2e}  d = {:>5.2} ({:?}){}",
            r.contrast_name,
            r.degrees_of_freedom,
            r.t_statistic,
            r.p_value,
            r.q_value.unwrap_or(f64::NAN),
            r.cohens_d,
            r.effect_magnitude,
            if activation.is_significant() { "  *" } else { "" },
        );
        if let (Some(label), Some(c)) = (&activation.anatomical_label, activation.mni_coordinate) {
            println!("  {:<26} {label} at ({}, {}, {})", "", c.x, c.y, c.z);
        }
    }
    for skipped in report.skipped() {
        println!("  {:<26} skipped: {:?}", skipped.contrast_name, skipped.reason);
    }

    if let Some(comparison) = report.run_kind_comparison() {
        let anova = comparison.anova;
        println!(
            "\nRun kinds: F({}, {}) = {:.2}  p = {:.2e}",
            anova.df_between, anova.df_within, anova.f_statistic, anova.p_value
        );
        for pair in &comparison.pairwise {
            println!(
                "  {} vs {}: t = {:>6.2}  p = {:.2e}",
                pair.run_kind_a, pair.run_kind_b, pair.t_statistic, pair.p_value
            );
        }
    }

    println!(
        "\n{} of {} contrasts significant at FDR 0.05",
        report.significant_activations().count(),
        report.activations().len()
    );

    let json = report.to_json()?;
    println!("Report JSON: {} bytes", json.len());
    Ok(())
}
