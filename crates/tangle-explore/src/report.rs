//! Per-iteration and cumulative testing statistics.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::ExploreConfig;
use crate::coverage::CoverageInfo;

/// Outcome of one iteration, or the merge of many.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub num_of_found_bugs: u64,
    /// Distinct bug reports.
    pub bug_reports: BTreeSet<String>,
    pub coverage: CoverageInfo,

    pub num_of_explored_fair_schedules: u64,
    pub num_of_explored_unfair_schedules: u64,

    pub total_explored_fair_steps: u64,
    pub min_explored_fair_steps: Option<u64>,
    pub max_explored_fair_steps: u64,
    pub total_explored_unfair_steps: u64,
    pub min_explored_unfair_steps: Option<u64>,
    pub max_explored_unfair_steps: u64,

    /// Fair schedules that ran into `max_fair_steps`.
    pub max_fair_steps_hit_in_fair_tests: u64,
    /// Unfair schedules that ran into `max_unfair_steps`.
    pub max_unfair_steps_hit_in_unfair_tests: u64,

    pub internal_errors: BTreeSet<String>,
}

impl TestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a found bug.
    pub fn record_bug(&mut self, report: impl Into<String>) {
        self.num_of_found_bugs += 1;
        self.bug_reports.insert(report.into());
    }

    /// Records one explored schedule of `steps` scheduling points.
    pub fn record_schedule(&mut self, fair: bool, steps: u64, hit_max_steps: bool) {
        if fair {
            self.num_of_explored_fair_schedules += 1;
            self.total_explored_fair_steps += steps;
            self.min_explored_fair_steps = Some(min_of(self.min_explored_fair_steps, Some(steps)));
            self.max_explored_fair_steps = self.max_explored_fair_steps.max(steps);
            self.max_fair_steps_hit_in_fair_tests += u64::from(hit_max_steps);
        } else {
            self.num_of_explored_unfair_schedules += 1;
            self.total_explored_unfair_steps += steps;
            self.min_explored_unfair_steps =
                Some(min_of(self.min_explored_unfair_steps, Some(steps)));
            self.max_explored_unfair_steps = self.max_explored_unfair_steps.max(steps);
            self.max_unfair_steps_hit_in_unfair_tests += u64::from(hit_max_steps);
        }
    }

    pub fn explored_schedules(&self) -> u64 {
        self.num_of_explored_fair_schedules + self.num_of_explored_unfair_schedules
    }

    /// Folds `other` into `self`. Counts add, sets union, minimums and
    /// maximums combine; the coverage graph follows [`CoverageInfo::merge`].
    pub fn merge(&mut self, other: TestReport) {
        self.num_of_found_bugs += other.num_of_found_bugs;
        self.bug_reports.extend(other.bug_reports);
        self.coverage.merge(other.coverage);

        self.num_of_explored_fair_schedules += other.num_of_explored_fair_schedules;
        self.num_of_explored_unfair_schedules += other.num_of_explored_unfair_schedules;

        self.total_explored_fair_steps += other.total_explored_fair_steps;
        if other.min_explored_fair_steps.is_some() {
            self.min_explored_fair_steps = Some(min_of(
                self.min_explored_fair_steps,
                other.min_explored_fair_steps,
            ));
        }
        self.max_explored_fair_steps = self
            .max_explored_fair_steps
            .max(other.max_explored_fair_steps);

        self.total_explored_unfair_steps += other.total_explored_unfair_steps;
        if other.min_explored_unfair_steps.is_some() {
            self.min_explored_unfair_steps = Some(min_of(
                self.min_explored_unfair_steps,
                other.min_explored_unfair_steps,
            ));
        }
        self.max_explored_unfair_steps = self
            .max_explored_unfair_steps
            .max(other.max_explored_unfair_steps);

        self.max_fair_steps_hit_in_fair_tests += other.max_fair_steps_hit_in_fair_tests;
        self.max_unfair_steps_hit_in_unfair_tests += other.max_unfair_steps_hit_in_unfair_tests;

        self.internal_errors.extend(other.internal_errors);
    }

    /// Renders the report as text, each line starting with `prefix`.
    pub fn text(&self, config: &ExploreConfig, prefix: &str) -> String {
        let mut out = String::new();
        let explored = self.explored_schedules();

        let _ = writeln!(out, "{prefix} Testing statistics:");
        let _ = writeln!(out, "{prefix} Found {} bug(s).", self.num_of_found_bugs);
        let _ = writeln!(out, "{prefix} Scheduling statistics:");
        let _ = writeln!(
            out,
            "{prefix} Explored {explored} schedule(s): {} fair and {} unfair.",
            self.num_of_explored_fair_schedules, self.num_of_explored_unfair_schedules
        );

        if explored > 0 {
            let _ = writeln!(
                out,
                "{prefix} Found {:.2}% buggy schedules.",
                percentage(self.num_of_found_bugs, explored)
            );
        }

        if self.num_of_explored_fair_schedules > 0 {
            steps_text(
                &mut out,
                prefix,
                "fair",
                self.num_of_explored_fair_schedules,
                self.total_explored_fair_steps,
                self.min_explored_fair_steps.unwrap_or(0),
                self.max_explored_fair_steps,
            );
            if self.max_fair_steps_hit_in_fair_tests > 0 {
                let _ = writeln!(
                    out,
                    "{prefix} Exceeded the max-steps bound of '{}' in {:.2}% of the fair schedules.",
                    config.max_fair_steps,
                    percentage(
                        self.max_fair_steps_hit_in_fair_tests,
                        self.num_of_explored_fair_schedules
                    )
                );
            }
        }

        if self.num_of_explored_unfair_schedules > 0 {
            steps_text(
                &mut out,
                prefix,
                "unfair",
                self.num_of_explored_unfair_schedules,
                self.total_explored_unfair_steps,
                self.min_explored_unfair_steps.unwrap_or(0),
                self.max_explored_unfair_steps,
            );
            if self.max_unfair_steps_hit_in_unfair_tests > 0 {
                let _ = writeln!(
                    out,
                    "{prefix} Exceeded the max-steps bound of '{}' in {:.2}% of the unfair schedules.",
                    config.max_unfair_steps,
                    percentage(
                        self.max_unfair_steps_hit_in_unfair_tests,
                        self.num_of_explored_unfair_schedules
                    )
                );
            }
        }

        for error in &self.internal_errors {
            let _ = writeln!(out, "{prefix} Internal error: {error}");
        }

        out
    }
}

fn min_of(a: Option<u64>, b: Option<u64>) -> u64 {
    match (a, b) {
        (Some(a), Some(b)) => a.min(b),
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => 0,
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    part as f64 * 100.0 / whole as f64
}

fn steps_text(
    out: &mut String,
    prefix: &str,
    kind: &str,
    schedules: u64,
    total: u64,
    min: u64,
    max: u64,
) {
    let _ = writeln!(
        out,
        "{prefix} Number of scheduling points in {kind} terminating schedules: \
         {min} (min), {} (avg), {max} (max).",
        total / schedules
    );
}
