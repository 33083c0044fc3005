//! Scheduling strategies.
//!
//! A [`Strategy`] decides every scheduling and nondeterministic choice the
//! controlled runtime has to make. Exploring strategies (random, priority
//! based, fairness aware) are supplied by the caller; this crate provides the
//! [`ReplayStrategy`], which answers from a recorded `.schedule` trace.

use std::fmt;

use crate::repro::ReproducibleTrace;
use crate::schedule::{OperationId, ScheduleStep};

/// Policy deciding the choices of an iteration.
///
/// The engine owns the strategy across iterations and lends it to one
/// controlled runtime at a time.
pub trait Strategy: Send {
    /// Prepares for the next iteration.
    ///
    /// # Returns
    ///
    /// `false` if the strategy has nothing left to explore.
    fn prepare_for_next_iteration(&mut self) -> bool;

    /// Returns true if the strategy schedules fairly.
    fn is_fair(&self) -> bool;

    /// Current random seed, for seeded strategies.
    fn seed(&self) -> Option<u64> {
        None
    }

    /// Replaces the random seed. Strategies without a seed ignore this.
    fn set_seed(&mut self, _seed: u64) {}

    /// Human-readable description, reported when an exploration starts.
    fn description(&self) -> String;

    /// Picks the next operation to run among `ready`.
    ///
    /// # Arguments
    ///
    /// * `ready` - Operations that are enabled, in a stable order
    /// * `current` - The operation that reached the scheduling point
    ///
    /// # Returns
    ///
    /// `None` if the strategy cannot (or will not) make a choice; the runtime
    /// ends the iteration.
    fn next_operation(&mut self, ready: &[OperationId], current: OperationId)
    -> Option<OperationId>;

    /// Picks a nondeterministic boolean. `max` is the number of outcomes the
    /// program asked for (2 for a fair coin).
    fn next_boolean(&mut self, max: u64) -> Option<bool>;

    /// Picks a nondeterministic integer in `0..max`. A `max` of zero or less
    /// leaves 0 as the only valid answer.
    fn next_integer(&mut self, max: i64) -> Option<i64>;
}

// ============================================================================
// Replay
// ============================================================================

/// Replays a recorded trace, one choice at a time.
///
/// The first choice that does not match the recorded step ends the replay:
/// the strategy records why and answers `None` from then on.
#[derive(Debug, Clone)]
pub struct ReplayStrategy {
    steps: Vec<ScheduleStep>,
    position: usize,
    fair: bool,
    divergence: Option<String>,
}

impl ReplayStrategy {
    pub fn new(trace: &ReproducibleTrace) -> Self {
        Self {
            steps: trace.steps.steps().to_vec(),
            position: 0,
            fair: trace.fair_scheduling,
            divergence: None,
        }
    }

    /// Why the replay stopped matching the recorded trace, if it did.
    pub fn divergence(&self) -> Option<&str> {
        self.divergence.as_deref()
    }

    /// Number of recorded steps consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns true once every recorded step has been replayed.
    pub fn is_complete(&self) -> bool {
        self.position == self.steps.len()
    }

    fn diverge<T>(&mut self, reason: fmt::Arguments<'_>) -> Option<T> {
        let message = format!("step {}: {reason}", self.position + 1);
        tracing::warn!(%message, "replay diverged from the recorded trace");
        self.divergence = Some(message);
        None
    }

    /// Consumes the next recorded step, unless the replay already diverged.
    fn next_step(&mut self, requested: &str) -> Option<ScheduleStep> {
        if self.divergence.is_some() {
            return None;
        }
        match self.steps.get(self.position).copied() {
            Some(step) => {
                self.position += 1;
                Some(step)
            }
            None => self.diverge(format_args!(
                "trace is exhausted, but the program requested a {requested}"
            )),
        }
    }

    fn mismatch<T>(&mut self, requested: &str, recorded: ScheduleStep) -> Option<T> {
        // Undo the consumption so `position` points at the offending step.
        self.position -= 1;
        self.diverge(format_args!(
            "the program requested a {requested}, but the trace recorded '{recorded}'"
        ))
    }
}

impl Strategy for ReplayStrategy {
    fn prepare_for_next_iteration(&mut self) -> bool {
        false
    }

    fn is_fair(&self) -> bool {
        self.fair
    }

    fn description(&self) -> String {
        "replay".to_string()
    }

    fn next_operation(
        &mut self,
        ready: &[OperationId],
        _current: OperationId,
    ) -> Option<OperationId> {
        match self.next_step("scheduling choice")? {
            ScheduleStep::SchedulingChoice(id) if ready.contains(&id) => Some(id),
            ScheduleStep::SchedulingChoice(id) => {
                self.position -= 1;
                self.diverge(format_args!(
                    "operation {id} is not enabled (ready: {ready:?})"
                ))
            }
            other => self.mismatch("scheduling choice", other),
        }
    }

    fn next_boolean(&mut self, _max: u64) -> Option<bool> {
        match self.next_step("boolean choice")? {
            ScheduleStep::BooleanChoice(value) => Some(value),
            other => self.mismatch("boolean choice", other),
        }
    }

    fn next_integer(&mut self, max: i64) -> Option<i64> {
        match self.next_step("integer choice")? {
            ScheduleStep::IntegerChoice(value) if integer_in_range(value, max) => Some(value),
            ScheduleStep::IntegerChoice(value) => {
                self.position -= 1;
                self.diverge(format_args!("integer {value} is outside 0..{}", max.max(1)))
            }
            other => self.mismatch("integer choice", other),
        }
    }
}

/// An empty range still admits 0, the only value a runtime can fall back to.
fn integer_in_range(value: i64, max: i64) -> bool {
    if max > 0 {
        (0..max).contains(&value)
    } else {
        value == 0
    }
}
