//! Contrast specifications
//!
//! A contrast compares one measure between two trial groups. Each group is a
//! typed selector: the set of run kinds and the set of conditions a trial
//! must belong to.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trial::{Condition, RunKind, TrialRecord};

/// Per-trial quantity a contrast compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measure {
    /// Response time (ms)
    ResponseTime,
    /// Behavioral onset (s)
    OnsetTime,
    /// Externally supplied activation proxy (e.g. a per-trial beta)
    ActivationProxy,
}

impl Measure {
    /// Extract this measure from a trial; `None` when the value is missing.
    #[must_use]
    pub const fn extract(self, trial: &TrialRecord) -> Option<f64> {
        match self {
            Self::ResponseTime => trial.response_time(),
            Self::OnsetTime => Some(trial.onset_time()),
            Self::ActivationProxy => trial.activation(),
        }
    }

    /// Snake-case label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResponseTime => "response_time",
            Self::OnsetTime => "onset_time",
            Self::ActivationProxy => "activation_proxy",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hypothesis test family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestFamily {
    /// Two independent groups, compared with a two-sample t-test
    #[default]
    IndependentTwoSample,
}

/// Typed predicate selecting the trials of one contrast group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSelector {
    run_kinds: BTreeSet<RunKind>,
    conditions: BTreeSet<Condition>,
}

impl TrialSelector {
    /// Select trials whose run kind and condition are both in the given sets.
    pub fn new(
        run_kinds: impl IntoIterator<Item = RunKind>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        Self {
            run_kinds: run_kinds.into_iter().collect(),
            conditions: conditions.into_iter().collect(),
        }
    }

    /// Select every trial of the given run kinds, whatever the condition.
    pub fn runs(run_kinds: impl IntoIterator<Item = RunKind>) -> Self {
        Self::new(run_kinds, Condition::ALL)
    }

    /// Permitted run kinds
    #[must_use]
    pub const fn run_kinds(&self) -> &BTreeSet<RunKind> {
        &self.run_kinds
    }

    /// Permitted conditions
    #[must_use]
    pub const fn conditions(&self) -> &BTreeSet<Condition> {
        &self.conditions
    }

    /// Check whether `trial` belongs to this group
    #[must_use]
    pub fn matches(&self, trial: &TrialRecord) -> bool {
        self.run_kinds.contains(&trial.run_kind()) && self.conditions.contains(&trial.condition())
    }

    /// Check whether some trial could belong to both selectors.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.run_kinds.iter().any(|kind| other.run_kinds.contains(kind))
            && self.conditions.iter().any(|c| other.conditions.contains(c))
    }
}

/// One hypothesis test over the canonical trial table.
///
/// # Example
///
/// ```rust
/// use toolrep::stats::{ContrastSpec, Measure, TrialSelector};
/// use toolrep::trial::{Condition, RunKind};
///
/// let spec = ContrastSpec::new(
///     "ig_tool_vs_pv_tool",
///     TrialSelector::new([RunKind::ImaginedGrasp], [Condition::Tool]),
///     TrialSelector::new([RunKind::PassiveViewing], [Condition::Tool]),
/// )
/// .with_measure(Measure::ActivationProxy);
/// assert_eq!(spec.measure(), Measure::ActivationProxy);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContrastSpec {
    name: String,
    description: String,
    group_a: TrialSelector,
    group_b: TrialSelector,
    measure: Measure,
    family: TestFamily,
}

impl ContrastSpec {
    /// Contrast of response times between two groups.
    pub fn new(name: impl Into<String>, group_a: TrialSelector, group_b: TrialSelector) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            group_a,
            group_b,
            measure: Measure::ResponseTime,
            family: TestFamily::IndependentTwoSample,
        }
    }

    /// Set the compared measure
    #[must_use]
    pub const fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    /// Set the human-readable research question
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The four research questions of the tool-representation study.
    ///
    /// | Name | Group A | Group B |
    /// |------|---------|---------|
    /// | `pv_tool_vs_shape` | PV tool | PV shape |
    /// | `ig_vs_pv` | IG stimuli | PV stimuli |
    /// | `functional_vs_structural` | tool + SCRtool | shape + SCRshape |
    /// | `motor_vs_non_motor` | IG + motor localizer | PV |
    #[must_use]
    pub fn research_questions() -> Vec<Self> {
        let viewing = [RunKind::PassiveViewing, RunKind::ImaginedGrasp];
        vec![
            Self::new(
                "pv_tool_vs_shape",
                TrialSelector::new([RunKind::PassiveViewing], [Condition::Tool]),
                TrialSelector::new([RunKind::PassiveViewing], [Condition::Shape]),
            )
            .with_description("RQ1: are tools special? Passive viewing of tools vs shapes"),
            Self::new(
                "ig_vs_pv",
                TrialSelector::new([RunKind::ImaginedGrasp], Condition::STIMULI),
                TrialSelector::new([RunKind::PassiveViewing], Condition::STIMULI),
            )
            .with_description("RQ2: action potentiation. Imagined grasping vs passive viewing"),
            Self::new(
                "functional_vs_structural",
                TrialSelector::new(viewing, [Condition::Tool, Condition::ScrambledTool]),
                TrialSelector::new(viewing, [Condition::Shape, Condition::ScrambledShape]),
            )
            .with_description("RQ3: functional vs structural object properties"),
            Self::new(
                "motor_vs_non_motor",
                TrialSelector::runs([RunKind::ImaginedGrasp, RunKind::MotorLocalizer]),
                TrialSelector::runs([RunKind::PassiveViewing]),
            )
            .with_description("RQ4: motor network engagement vs passive viewing"),
        ]
    }

    /// Finer contrasts behind the research questions.
    ///
    /// | Name | Group A | Group B |
    /// |------|---------|---------|
    /// | `standard_tool_vs_shape` | PV + IG tool | PV + IG shape |
    /// | `scr_tool_vs_scr_shape` | PV + IG SCRtool | PV + IG SCRshape |
    /// | `ig_tool_vs_shape` | IG tool | IG shape |
    /// | `tools_ig_vs_pv` | IG tool + SCRtool | PV tool + SCRtool |
    /// | `shapes_ig_vs_pv` | IG shape + SCRshape | PV shape + SCRshape |
    /// | `pv_functional_vs_structural` | PV tool + SCRtool | PV shape + SCRshape |
    /// | `ig_functional_vs_structural` | IG tool + SCRtool | IG shape + SCRshape |
    ///
    /// Running them in the same call as [`ContrastSpec::research_questions`]
    /// puts all of them in one FDR family.
    #[must_use]
    pub fn supplementary_contrasts() -> Vec<Self> {
        let viewing = [RunKind::PassiveViewing, RunKind::ImaginedGrasp];
        let pv = [RunKind::PassiveViewing];
        let ig = [RunKind::ImaginedGrasp];
        let tools = [Condition::Tool, Condition::ScrambledTool];
        let shapes = [Condition::Shape, Condition::ScrambledShape];
        vec![
            Self::new(
                "standard_tool_vs_shape",
                TrialSelector::new(viewing, [Condition::Tool]),
                TrialSelector::new(viewing, [Condition::Shape]),
            )
            .with_description("RQ1: standard tools vs standard shapes"),
            Self::new(
                "scr_tool_vs_scr_shape",
                TrialSelector::new(viewing, [Condition::ScrambledTool]),
                TrialSelector::new(viewing, [Condition::ScrambledShape]),
            )
            .with_description("RQ1: screen-optimized tools vs screen-optimized shapes"),
            Self::new(
                "ig_tool_vs_shape",
                TrialSelector::new(ig, [Condition::Tool]),
                TrialSelector::new(ig, [Condition::Shape]),
            )
            .with_description("RQ1: tools vs shapes during imagined grasping"),
            Self::new(
                "tools_ig_vs_pv",
                TrialSelector::new(ig, tools),
                TrialSelector::new(pv, tools),
            )
            .with_description("RQ2: tools, imagined grasping vs passive viewing"),
            Self::new(
                "shapes_ig_vs_pv",
                TrialSelector::new(ig, shapes),
                TrialSelector::new(pv, shapes),
            )
            .with_description("RQ2: shapes, imagined grasping vs passive viewing"),
            Self::new(
                "pv_functional_vs_structural",
                TrialSelector::new(pv, tools),
                TrialSelector::new(pv, shapes),
            )
            .with_description("RQ3: functional vs structural during passive viewing"),
            Self::new(
                "ig_functional_vs_structural",
                TrialSelector::new(ig, tools),
                TrialSelector::new(ig, shapes),
            )
            .with_description("RQ3: functional vs structural during imagined grasping"),
        ]
    }

    /// Contrast name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Research question, possibly empty
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Group A selector
    #[must_use]
    pub const fn group_a(&self) -> &TrialSelector {
        &self.group_a
    }

    /// Group B selector
    #[must_use]
    pub const fn group_b(&self) -> &TrialSelector {
        &self.group_b
    }

    /// Compared measure
    #[must_use]
    pub const fn measure(&self) -> Measure {
        self.measure
    }

    /// Test family
    #[must_use]
    pub const fn family(&self) -> TestFamily {
        self.family
    }
}
