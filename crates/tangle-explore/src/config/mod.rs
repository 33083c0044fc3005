//! Run parameters for an exploration.
//!
//! [`ExploreConfig`] is read-only once an engine has been built from it. It can
//! be assembled in code with the `with_*` builders or loaded from layered
//! sources with [`ConfigLoader`]:
//! 1. Environment variables (`TANGLE_*`, highest precedence)
//! 2. tangle.local.toml (gitignored, local overrides)
//! 3. tangle.toml (project config)
//! 4. ~/.config/tangle/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, Paths};

/// The scheduling strategy family used for an exploration.
///
/// The engine only needs the kind for reporting; the strategy object itself is
/// supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Random,
    Pct,
    FairPct,
    ProbabilisticRandom,
    Dfs,
    Portfolio,
    Replay,
}

impl StrategyKind {
    /// Returns true if strategies of this kind are driven by a random seed.
    pub fn is_seeded(self) -> bool {
        matches!(
            self,
            Self::Random | Self::Pct | Self::FairPct | Self::ProbabilisticRandom
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Pct => "pct",
            Self::FairPct => "fair-pct",
            Self::ProbabilisticRandom => "probabilistic-random",
            Self::Dfs => "dfs",
            Self::Portfolio => "portfolio",
            Self::Replay => "replay",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for an exploration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    /// Number of iterations to run.
    pub iterations: u64,
    /// Wall-clock budget in seconds (0 = none).
    pub timeout_secs: u64,
    /// Strategy family, for reporting.
    pub strategy: StrategyKind,
    /// Seed of the strategy's random generator, if any.
    pub seed: Option<u64>,
    /// Let program output reach the console instead of capturing it.
    pub verbose: bool,
    /// Keep exploring after a bug has been found.
    pub full_exploration: bool,
    /// Advance the strategy seed by one between iterations.
    pub incremental_seed: bool,
    /// Record a structured XML log of every iteration.
    pub xml_log: bool,
    /// Retain the activity coverage graph.
    pub report_activity_coverage: bool,
    /// Check liveness properties.
    pub liveness_checking: bool,
    /// Temperature at which a hot monitor is reported as a liveness bug.
    pub liveness_temperature_threshold: u64,
    /// Name of the test method to run, if more than one is registered.
    pub test_method: Option<String>,
    /// Scheduling step bound for fair schedules.
    pub max_fair_steps: u64,
    /// Scheduling step bound for unfair schedules.
    pub max_unfair_steps: u64,
    /// Identifier of this testing process, for log lines.
    pub testing_process_id: u32,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            timeout_secs: 0,
            strategy: StrategyKind::Random,
            seed: None,
            verbose: false,
            full_exploration: false,
            incremental_seed: false,
            xml_log: false,
            report_activity_coverage: false,
            liveness_checking: true,
            liveness_temperature_threshold: 50_000,
            test_method: None,
            max_fair_steps: 100_000,
            max_unfair_steps: 10_000,
            testing_process_id: 0,
        }
    }
}

impl ExploreConfig {
    /// Sets the number of iterations.
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the wall-clock timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the strategy kind and its seed.
    pub fn with_strategy(mut self, strategy: StrategyKind, seed: Option<u64>) -> Self {
        self.strategy = strategy;
        self.seed = seed;
        self
    }

    /// Enables verbose output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enables full exploration.
    pub fn with_full_exploration(mut self, full: bool) -> Self {
        self.full_exploration = full;
        self
    }

    /// Enables seed incrementing between iterations.
    pub fn with_incremental_seed(mut self, incremental: bool) -> Self {
        self.incremental_seed = incremental;
        self
    }

    /// Enables the structured XML log.
    pub fn with_xml_log(mut self, enabled: bool) -> Self {
        self.xml_log = enabled;
        self
    }

    /// Enables activity coverage reporting.
    pub fn with_activity_coverage(mut self, enabled: bool) -> Self {
        self.report_activity_coverage = enabled;
        self
    }

    /// Configures liveness checking.
    pub fn with_liveness(mut self, enabled: bool, temperature_threshold: u64) -> Self {
        self.liveness_checking = enabled;
        self.liveness_temperature_threshold = temperature_threshold;
        self
    }

    /// Targets a specific test method.
    pub fn with_test_method(mut self, name: impl Into<String>) -> Self {
        self.test_method = Some(name.into());
        self
    }

    /// Returns the configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Checks semantic constraints the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ValidationError(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.max_fair_steps == 0 || self.max_unfair_steps == 0 {
            return Err(ConfigError::ValidationError(
                "scheduling step bounds must be positive".to_string(),
            ));
        }
        if self.max_unfair_steps > self.max_fair_steps {
            return Err(ConfigError::ValidationError(format!(
                "max_unfair_steps ({}) must not exceed max_fair_steps ({})",
                self.max_unfair_steps, self.max_fair_steps
            )));
        }
        if self.liveness_checking && self.liveness_temperature_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "liveness_temperature_threshold must be positive when liveness checking is enabled"
                    .to_string(),
            ));
        }
        if self
            .test_method
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "test_method must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExploreConfig::default();
        assert_eq!(config.iterations, 1);
        assert!(config.liveness_checking);
        assert!(config.timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = ExploreConfig::default().with_iterations(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_step_bounds_checked() {
        let mut config = ExploreConfig::default();
        config.max_unfair_steps = config.max_fair_steps + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_test_method_rejected() {
        let config = ExploreConfig::default().with_test_method("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_kind_names() {
        assert_eq!(StrategyKind::FairPct.to_string(), "fair-pct");
        assert!(StrategyKind::Pct.is_seeded());
        assert!(!StrategyKind::Dfs.is_seeded());
        assert!(!StrategyKind::Replay.is_seeded());
    }

    #[test]
    fn test_timeout_conversion() {
        let config = ExploreConfig::default().with_timeout_secs(30);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }
}
