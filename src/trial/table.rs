//! Canonical trial table
//!
//! The validated, merged trial list for one participant. Every statistical
//! computation reads from here.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{BooleanArray, Float64Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use super::{Condition, TrialRecord};
use crate::Result;

/// Ordered, immutable collection of [`TrialRecord`]s.
///
/// Trials are kept sorted by `(run_number, trial_number)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialTable {
    trials: Vec<TrialRecord>,
}

impl TrialTable {
    /// Build a table, sorting trials by run then trial number.
    #[must_use]
    pub fn new(mut trials: Vec<TrialRecord>) -> Self {
        trials.sort_by_key(|t| (t.run_number(), t.trial_number()));
        Self { trials }
    }

    /// All trials in canonical order.
    #[must_use]
    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// Number of trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// True if no trial survived ingestion.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Iterate over trials in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &TrialRecord> {
        self.trials.iter()
    }

    /// Trials belonging to one run.
    pub fn run(&self, run_number: u32) -> impl Iterator<Item = &TrialRecord> {
        self.trials
            .iter()
            .filter(move |t| t.run_number() == run_number)
    }

    /// Distinct run numbers present, ascending.
    #[must_use]
    pub fn run_numbers(&self) -> Vec<u32> {
        let mut runs: Vec<u32> = self.trials.iter().map(TrialRecord::run_number).collect();
        runs.dedup();
        runs
    }

    /// Trial count per condition. Conditions with no trials are omitted.
    #[must_use]
    pub fn condition_counts(&self) -> BTreeMap<Condition, usize> {
        let mut counts = BTreeMap::new();
        for trial in &self.trials {
            *counts.entry(trial.condition()).or_insert(0) += 1;
        }
        counts
    }

    /// Arrow schema of [`to_record_batch`](Self::to_record_batch).
    #[must_use]
    pub fn arrow_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("participant_id", DataType::Utf8, false),
            Field::new("run_kind", DataType::Utf8, false),
            Field::new("condition", DataType::Utf8, false),
            Field::new("run_number", DataType::UInt32, false),
            Field::new("trial_number", DataType::UInt32, false),
            Field::new("onset_time", DataType::Float64, false),
            Field::new("timing_onset", DataType::Float64, false),
            Field::new("response_time", DataType::Float64, true),
            Field::new("accuracy", DataType::Boolean, true),
            Field::new("activation", DataType::Float64, true),
        ]))
    }

    /// Columnar view of the table for exporters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use toolrep::trial::{Condition, RunKind, TrialRecord, TrialTable};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let table = TrialTable::new(vec![
    ///     TrialRecord::builder("S01", RunKind::PassiveViewing, Condition::Tool, 1, 1, 12.0)
    ///         .response_time(Some(540.0))
    ///         .build(),
    /// ]);
    /// let batch = table.to_record_batch()?;
    /// assert_eq!(batch.num_rows(), 1);
    /// assert_eq!(batch.num_columns(), 10);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `Error::Arrow` if the batch cannot be assembled.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let t = &self.trials;
        let batch = RecordBatch::try_new(
            Self::arrow_schema(),
            vec![
                Arc::new(StringArray::from_iter_values(
                    t.iter().map(TrialRecord::participant_id),
                )),
                Arc::new(StringArray::from_iter_values(
                    t.iter().map(|r| r.run_kind().as_str()),
                )),
                Arc::new(StringArray::from_iter_values(
                    t.iter().map(|r| r.condition().as_str()),
                )),
                Arc::new(UInt32Array::from_iter_values(
                    t.iter().map(TrialRecord::run_number),
                )),
                Arc::new(UInt32Array::from_iter_values(
                    t.iter().map(TrialRecord::trial_number),
                )),
                Arc::new(Float64Array::from_iter_values(
                    t.iter().map(TrialRecord::onset_time),
                )),
                Arc::new(Float64Array::from_iter_values(
                    t.iter().map(TrialRecord::timing_onset),
                )),
                Arc::new(t.iter().map(TrialRecord::response_time).collect::<Float64Array>()),
                Arc::new(t.iter().map(TrialRecord::accuracy).collect::<BooleanArray>()),
                Arc::new(t.iter().map(TrialRecord::activation).collect::<Float64Array>()),
            ],
        )?;
        Ok(batch)
    }
}

impl<'a> IntoIterator for &'a TrialTable {
    type Item = &'a TrialRecord;
    type IntoIter = std::slice::Iter<'a, TrialRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.trials.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::RunKind;
    use arrow::array::Array;

    fn trial(run: u32, n: u32, condition: Condition, rt: Option<f64>) -> TrialRecord {
        TrialRecord::builder("S01", RunKind::PassiveViewing, condition, run, n, f64::from(n))
            .response_time(rt)
            .build()
    }

    #[test]
    fn test_table_sorted_by_run_then_trial() {
        let table = TrialTable::new(vec![
            trial(2, 1, Condition::Tool, None),
            trial(1, 2, Condition::Shape, None),
            trial(1, 1, Condition::Tool, None),
        ]);
        let keys: Vec<(u32, u32)> = table
            .iter()
            .map(|t| (t.run_number(), t.trial_number()))
            .collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);
        assert_eq!(table.run_numbers(), vec![1, 2]);
        assert_eq!(table.run(1).count(), 2);
    }

    #[test]
    fn test_condition_counts() {
        let table = TrialTable::new(vec![
            trial(1, 1, Condition::Tool, None),
            trial(1, 2, Condition::Tool, None),
            trial(1, 3, Condition::Shape, None),
        ]);
        let counts = table.condition_counts();
        assert_eq!(counts.get(&Condition::Tool), Some(&2));
        assert_eq!(counts.get(&Condition::Shape), Some(&1));
        assert_eq!(counts.get(&Condition::Localizer), None);
    }

    #[test]
    fn test_record_batch_nullability() {
        let table = TrialTable::new(vec![
            trial(1, 1, Condition::Tool, Some(512.0)),
            trial(1, 2, Condition::Shape, None),
        ]);
        let batch = table.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        let rt = batch
            .column(7)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(rt.is_valid(0));
        assert!(rt.is_null(1));
        assert!((rt.value(0) - 512.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_table_batch() {
        let batch = TrialTable::default().to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
