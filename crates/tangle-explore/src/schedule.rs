//! Recorded scheduling and nondeterministic choices.
//!
//! The controlled runtime appends one [`ScheduleStep`] to the iteration's
//! [`ScheduleTrace`] every time its strategy makes a decision. The trace is the
//! raw material for the reproducible `.schedule` artifact.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a controlled operation (task, actor, thread).
pub type OperationId = u64;

/// A single recorded choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStep {
    /// The runtime scheduled the operation with this id.
    SchedulingChoice(OperationId),
    /// A nondeterministic boolean was chosen.
    BooleanChoice(bool),
    /// A nondeterministic integer was chosen.
    IntegerChoice(i64),
}

impl fmt::Display for ScheduleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchedulingChoice(id) => write!(f, "({id})"),
            Self::BooleanChoice(true) => f.write_str("True"),
            Self::BooleanChoice(false) => f.write_str("False"),
            Self::IntegerChoice(value) => write!(f, "{value}"),
        }
    }
}

/// The ordered choices of one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTrace {
    steps: Vec<ScheduleStep>,
}

impl ScheduleTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `operation` was scheduled.
    pub fn add_scheduling_choice(&mut self, operation: OperationId) {
        self.steps.push(ScheduleStep::SchedulingChoice(operation));
    }

    /// Records a nondeterministic boolean choice.
    pub fn add_boolean_choice(&mut self, value: bool) {
        self.steps.push(ScheduleStep::BooleanChoice(value));
    }

    /// Records a nondeterministic integer choice.
    pub fn add_integer_choice(&mut self, value: i64) {
        self.steps.push(ScheduleStep::IntegerChoice(value));
    }

    pub fn push(&mut self, step: ScheduleStep) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleStep> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[ScheduleStep] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduleStep> {
        self.steps.iter()
    }

    /// Number of scheduling choices, ignoring nondeterministic values.
    pub fn scheduling_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, ScheduleStep::SchedulingChoice(_)))
            .count()
    }
}

impl From<Vec<ScheduleStep>> for ScheduleTrace {
    fn from(steps: Vec<ScheduleStep>) -> Self {
        Self { steps }
    }
}

impl FromIterator<ScheduleStep> for ScheduleTrace {
    fn from_iter<I: IntoIterator<Item = ScheduleStep>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ScheduleTrace {
    type Item = &'a ScheduleStep;
    type IntoIter = std::slice::Iter<'a, ScheduleStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
