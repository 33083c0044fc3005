//! The reproducible `.schedule` trace format.
//!
//! A schedule file is line oriented. Directive lines come first, in a fixed
//! order, followed by one line per recorded choice:
//!
//! ```text
//! --fair-scheduling
//! --liveness-temperature-threshold:50000
//! --test-method:Tests.Deadlock
//! (0)
//! (1)
//! True
//! 42
//! ```
//!
//! Lines are joined with `\n` and there is no trailing newline. Choice lines
//! are positional: a replaying strategy hands them back to the runtime one at
//! a time, so their order must match the order in which choices are requested.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::config::ExploreConfig;
use crate::schedule::{ScheduleStep, ScheduleTrace};

const FAIR_SCHEDULING: &str = "--fair-scheduling";
const LIVENESS_THRESHOLD: &str = "--liveness-temperature-threshold:";
const TEST_METHOD: &str = "--test-method:";

/// Errors raised while parsing a schedule file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReproParseError {
    #[error("line {line}: directive '{directive}' after the first choice line")]
    DirectiveAfterStep { line: usize, directive: String },

    #[error("line {line}: duplicate directive '{directive}'")]
    DuplicateDirective { line: usize, directive: String },

    #[error("line {line}: invalid liveness temperature threshold '{value}'")]
    InvalidThreshold { line: usize, value: String },

    #[error("line {line}: empty test method name")]
    EmptyTestMethod { line: usize },

    #[error("line {line}: unrecognised schedule line '{text}'")]
    UnrecognisedLine { line: usize, text: String },
}

/// A decoded (or to-be-encoded) reproducible trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReproducibleTrace {
    /// The strategy scheduled fairly.
    pub fair_scheduling: bool,
    /// Liveness checking was enabled with this temperature threshold.
    pub liveness_temperature_threshold: Option<u64>,
    /// The targeted test method.
    pub test_method: Option<String>,
    /// The recorded choices, in recording order.
    pub steps: ScheduleTrace,
}

impl ReproducibleTrace {
    /// Captures the replay-relevant settings of a run together with the
    /// choices recorded during the buggy iteration.
    pub fn capture(config: &ExploreConfig, fair_scheduling: bool, steps: &ScheduleTrace) -> Self {
        Self {
            fair_scheduling,
            liveness_temperature_threshold: config
                .liveness_checking
                .then_some(config.liveness_temperature_threshold),
            test_method: config
                .test_method
                .as_ref()
                .filter(|name| !name.is_empty())
                .cloned(),
            steps: steps.clone(),
        }
    }

    /// Number of directive lines this trace encodes to.
    pub fn directive_count(&self) -> usize {
        usize::from(self.fair_scheduling)
            + usize::from(self.liveness_temperature_threshold.is_some())
            + usize::from(self.test_method.is_some())
    }

    fn lines(&self) -> impl Iterator<Item = String> + '_ {
        let directives = [
            self.fair_scheduling.then(|| FAIR_SCHEDULING.to_string()),
            self.liveness_temperature_threshold
                .map(|threshold| format!("{LIVENESS_THRESHOLD}{threshold}")),
            self.test_method
                .as_ref()
                .map(|name| format!("{TEST_METHOD}{name}")),
        ];

        directives
            .into_iter()
            .flatten()
            .chain(self.steps.iter().map(ToString::to_string))
    }
}

impl fmt::Display for ReproducibleTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.lines().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&line)?;
        }
        Ok(())
    }
}

impl FromStr for ReproducibleTrace {
    type Err = ReproParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut trace = ReproducibleTrace::default();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with("--") {
                if !trace.steps.is_empty() {
                    return Err(ReproParseError::DirectiveAfterStep {
                        line: line_no,
                        directive: line.to_string(),
                    });
                }
                parse_directive(&mut trace, line, line_no)?;
                continue;
            }

            trace.steps.push(parse_step(line, line_no)?);
        }

        Ok(trace)
    }
}

fn parse_directive(
    trace: &mut ReproducibleTrace,
    line: &str,
    line_no: usize,
) -> Result<(), ReproParseError> {
    let duplicate = || ReproParseError::DuplicateDirective {
        line: line_no,
        directive: line.to_string(),
    };

    if line == FAIR_SCHEDULING {
        if trace.fair_scheduling {
            return Err(duplicate());
        }
        trace.fair_scheduling = true;
    } else if let Some(value) = line.strip_prefix(LIVENESS_THRESHOLD) {
        if trace.liveness_temperature_threshold.is_some() {
            return Err(duplicate());
        }
        let threshold = value
            .parse::<u64>()
            .map_err(|_| ReproParseError::InvalidThreshold {
                line: line_no,
                value: value.to_string(),
            })?;
        trace.liveness_temperature_threshold = Some(threshold);
    } else if let Some(name) = line.strip_prefix(TEST_METHOD) {
        if trace.test_method.is_some() {
            return Err(duplicate());
        }
        if name.is_empty() {
            return Err(ReproParseError::EmptyTestMethod { line: line_no });
        }
        trace.test_method = Some(name.to_string());
    } else {
        return Err(ReproParseError::UnrecognisedLine {
            line: line_no,
            text: line.to_string(),
        });
    }
    Ok(())
}

fn parse_step(line: &str, line_no: usize) -> Result<ScheduleStep, ReproParseError> {
    let unrecognised = || ReproParseError::UnrecognisedLine {
        line: line_no,
        text: line.to_string(),
    };

    if let Some(inner) = line.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        return inner
            .trim()
            .parse()
            .map(ScheduleStep::SchedulingChoice)
            .map_err(|_| unrecognised());
    }
    if line.eq_ignore_ascii_case("true") {
        return Ok(ScheduleStep::BooleanChoice(true));
    }
    if line.eq_ignore_ascii_case("false") {
        return Ok(ScheduleStep::BooleanChoice(false));
    }
    line.parse()
        .map(ScheduleStep::IntegerChoice)
        .map_err(|_| unrecognised())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_steps() -> ScheduleTrace {
        let mut steps = ScheduleTrace::new();
        steps.add_scheduling_choice(0);
        steps.add_scheduling_choice(1);
        steps.add_boolean_choice(true);
        steps.add_integer_choice(42);
        steps
    }

    #[test]
    fn encodes_directives_before_steps() {
        let config = ExploreConfig::default()
            .with_liveness(true, 500)
            .with_test_method("Tests.Deadlock");
        let trace = ReproducibleTrace::capture(&config, true, &sample_steps());

        assert_eq!(
            trace.to_string(),
            "--fair-scheduling\n\
             --liveness-temperature-threshold:500\n\
             --test-method:Tests.Deadlock\n\
             (0)\n(1)\nTrue\n42"
        );
        assert_eq!(trace.directive_count(), 3);
    }

    #[test]
    fn omits_disabled_directives() {
        let config = ExploreConfig::default().with_liveness(false, 500);
        let trace = ReproducibleTrace::capture(&config, false, &sample_steps());

        assert_eq!(trace.to_string(), "(0)\n(1)\nTrue\n42");
        assert_eq!(trace.directive_count(), 0);
    }

    #[test]
    fn empty_trace_has_no_trailing_newline() {
        let config = ExploreConfig::default().with_liveness(false, 1);
        let trace = ReproducibleTrace::capture(&config, true, &ScheduleTrace::new());
        assert_eq!(trace.to_string(), "--fair-scheduling");
    }

    #[test]
    fn parses_encoded_trace() {
        let config = ExploreConfig::default()
            .with_liveness(true, 77)
            .with_test_method("Run");
        let original = ReproducibleTrace::capture(&config, true, &sample_steps());

        let parsed: ReproducibleTrace = original.to_string().parse().expect("valid schedule");
        assert_eq!(parsed, original);
    }

    #[test]
    fn tolerates_crlf_and_lowercase_booleans() {
        let parsed: ReproducibleTrace = "--fair-scheduling\r\n(4)\r\nfalse\r\n\r\n-3\r\n"
            .parse()
            .expect("valid schedule");

        assert!(parsed.fair_scheduling);
        assert_eq!(
            parsed.steps.steps(),
            &[
                ScheduleStep::SchedulingChoice(4),
                ScheduleStep::BooleanChoice(false),
                ScheduleStep::IntegerChoice(-3),
            ]
        );
    }

    #[test]
    fn rejects_directive_after_step() {
        let err = "(1)\n--fair-scheduling"
            .parse::<ReproducibleTrace>()
            .unwrap_err();
        assert_eq!(
            err,
            ReproParseError::DirectiveAfterStep {
                line: 2,
                directive: "--fair-scheduling".to_string()
            }
        );
    }

    #[test]
    fn rejects_garbage_lines() {
        assert!(matches!(
            "(x)".parse::<ReproducibleTrace>(),
            Err(ReproParseError::UnrecognisedLine { line: 1, .. })
        ));
        assert!(matches!(
            "--seed:4".parse::<ReproducibleTrace>(),
            Err(ReproParseError::UnrecognisedLine { line: 1, .. })
        ));
        assert!(matches!(
            "--liveness-temperature-threshold:hot".parse::<ReproducibleTrace>(),
            Err(ReproParseError::InvalidThreshold { line: 1, .. })
        ));
        assert!(matches!(
            "--test-method:".parse::<ReproducibleTrace>(),
            Err(ReproParseError::EmptyTestMethod { line: 1 })
        ));
        assert!(matches!(
            "--fair-scheduling\n--fair-scheduling".parse::<ReproducibleTrace>(),
            Err(ReproParseError::DuplicateDirective { line: 2, .. })
        ));
    }
}
