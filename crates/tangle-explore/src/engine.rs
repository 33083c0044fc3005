//! The exploration driver.
//!
//! [`BugFindingEngine`] runs the program under test again and again, one
//! controlled-runtime iteration at a time, until the iteration budget is used
//! up, the strategy runs dry, a bug is found (unless exploring fully) or the
//! caller cancels.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::ExploreConfig;
use crate::coverage::CoverageGraph;
use crate::error::{ExploreError, TestFailure};
use crate::log::{ConsoleLog, LogSink};
use crate::print_guard::PrintGuard;
use crate::report::TestReport;
use crate::runtime::RuntimeFactory;
use crate::stdio::ConsoleStreams;
use crate::strategy::Strategy;
use crate::test_method::{TestMethod, TestRegistry};

/// Callback run after every iteration with its 0-based index.
pub type IterationCallback = Box<dyn FnMut(u64) + Send>;

/// How many iterations an exploration may run. Chosen once, at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationLimit {
    /// At most this many iterations.
    FixedCount(u64),
    /// Until the cancellation token fires.
    UntilCancelled,
}

impl ExplorationLimit {
    /// A run configured for exactly one iteration with a timeout explores
    /// until the timeout instead.
    pub fn for_config(config: &ExploreConfig) -> Self {
        if config.iterations == 1 && config.timeout_secs > 0 {
            Self::UntilCancelled
        } else {
            Self::FixedCount(config.iterations)
        }
    }

    /// Returns true if iteration `iteration` (0-based) may start.
    pub fn allows(self, iteration: u64) -> bool {
        match self {
            Self::FixedCount(count) => iteration < count,
            Self::UntilCancelled => true,
        }
    }
}

/// Drives the exploration of one test method.
pub struct BugFindingEngine {
    pub(crate) config: ExploreConfig,
    pub(crate) test: Arc<dyn TestMethod>,
    pub(crate) factory: Box<dyn RuntimeFactory>,
    pub(crate) strategy: Box<dyn Strategy>,
    pub(crate) logger: Box<dyn LogSink>,
    default_logger: bool,
    pub(crate) streams: ConsoleStreams,
    pub(crate) callbacks: Vec<IterationCallback>,
    pub(crate) print_guard: PrintGuard,
    pub(crate) report: TestReport,
    pub(crate) readable_trace: String,
    pub(crate) reproducible_trace: String,
    pub(crate) graph: Option<CoverageGraph>,
    pub(crate) xml_log: String,
    pub(crate) started: Instant,
}

impl BugFindingEngine {
    /// Creates an engine for `test`.
    ///
    /// Logs to the process console until [`with_logger`](Self::with_logger)
    /// or [`with_streams`](Self::with_streams) says otherwise.
    pub fn new(
        config: ExploreConfig,
        test: Arc<dyn TestMethod>,
        factory: impl RuntimeFactory + 'static,
        strategy: impl Strategy + 'static,
    ) -> Result<Self, ExploreError> {
        config.validate()?;
        let streams = ConsoleStreams::stdio();
        Ok(Self {
            config,
            test,
            factory: Box::new(factory),
            strategy: Box::new(strategy),
            logger: Box::new(ConsoleLog::new(streams.clone())),
            default_logger: true,
            streams,
            callbacks: Vec::new(),
            print_guard: PrintGuard::new(),
            report: TestReport::new(),
            readable_trace: String::new(),
            reproducible_trace: String::new(),
            graph: None,
            xml_log: String::new(),
            started: Instant::now(),
        })
    }

    /// Creates an engine for the test `config.test_method` selects from
    /// `registry`.
    pub fn from_registry(
        config: ExploreConfig,
        registry: &TestRegistry,
        factory: impl RuntimeFactory + 'static,
        strategy: impl Strategy + 'static,
    ) -> Result<Self, ExploreError> {
        let test = registry.resolve(config.test_method.as_deref())?;
        Self::new(config, test, factory, strategy)
    }

    /// Replaces the engine log.
    pub fn with_logger(mut self, logger: impl LogSink + 'static) -> Self {
        self.logger = Box::new(logger);
        self.default_logger = false;
        self
    }

    /// Replaces the console streams shared with the runtime.
    pub fn with_streams(mut self, streams: ConsoleStreams) -> Self {
        if self.default_logger {
            self.logger = Box::new(ConsoleLog::new(streams.clone()));
        }
        self.streams = streams;
        self
    }

    /// Registers a callback to run after every iteration, in registration
    /// order.
    pub fn register_per_iteration_callback(&mut self, callback: impl FnMut(u64) + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn config(&self) -> &ExploreConfig {
        &self.config
    }

    /// Cumulative statistics.
    pub fn report(&self) -> &TestReport {
        &self.report
    }

    /// Cumulative statistics as text.
    pub fn report_text(&self) -> String {
        self.report.text(&self.config, "...")
    }

    /// Captured log of the buggy iteration, followed by the statistics.
    pub fn readable_trace(&self) -> &str {
        &self.readable_trace
    }

    /// The `.schedule` encoding of the buggy iteration.
    pub fn reproducible_trace(&self) -> &str {
        &self.reproducible_trace
    }

    /// Coverage graph of the latest iteration.
    pub fn graph(&self) -> Option<&CoverageGraph> {
        self.graph.as_ref()
    }

    /// XML log of the latest iteration.
    pub fn xml_log(&self) -> &str {
        &self.xml_log
    }

    /// Explores with the configured timeout, if any, as the only cancellation
    /// trigger.
    pub async fn run(&mut self) -> Result<(), ExploreError> {
        let cancel = CancellationToken::new();
        let timer = self.config.timeout().map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::info!(?timeout, "exploration timed out");
                cancel.cancel();
            })
        });

        let result = self.explore(&cancel).await;

        if let Some(timer) = timer {
            timer.abort();
        }
        result
    }

    /// Runs the exploration loop until it ends or `cancel` fires.
    ///
    /// Cancellation is observed between iterations and while waiting for an
    /// iteration to complete; either way it ends the exploration cleanly.
    pub async fn explore(&mut self, cancel: &CancellationToken) -> Result<(), ExploreError> {
        self.started = Instant::now();
        let limit = ExplorationLimit::for_config(&self.config);

        let banner = self.banner();
        self.logger.write_line(&banner);
        tracing::info!(
            test = self.test.name(),
            strategy = %self.config.strategy,
            description = %self.strategy.description(),
            ?limit,
            "exploration started"
        );

        if let Err(failure) = self.test.initialize_all_iterations() {
            let failure = failure.innermost();
            if !cancelled_by_request(&failure, cancel) {
                return Err(ExploreError::setup(self.test.name(), failure.to_string()));
            }
            tracing::debug!("initialization cancelled");
            return Ok(());
        }

        match self.explore_iterations(limit, cancel).await {
            Ok(()) => {}
            Err(ExploreError::Test(failure)) => {
                let failure = failure.innermost();
                if !cancelled_by_request(&failure, cancel) {
                    tracing::error!(error = %failure, "exploration aborted");
                    return Err(ExploreError::Test(failure));
                }
                tracing::debug!("in-flight iteration cancelled");
            }
            Err(error) => return Err(error),
        }

        if let Err(failure) = self.test.dispose_all_iterations() {
            let failure = failure.innermost();
            if !cancelled_by_request(&failure, cancel) {
                return Err(ExploreError::Test(failure));
            }
            tracing::debug!("disposal cancelled");
        }

        tracing::info!(
            bugs = self.report.num_of_found_bugs,
            schedules = self.report.explored_schedules(),
            cancelled = cancel.is_cancelled(),
            "exploration finished"
        );
        Ok(())
    }

    async fn explore_iterations(
        &mut self,
        limit: ExplorationLimit,
        cancel: &CancellationToken,
    ) -> Result<(), ExploreError> {
        let mut iteration = 0;
        while limit.allows(iteration) {
            // The timeout fires from another task; give it a chance to run.
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                break;
            }

            self.run_iteration(iteration, cancel).await?;

            if !self.config.full_exploration && self.report.num_of_found_bugs > 0 {
                break;
            }
            if !self.strategy.prepare_for_next_iteration() {
                tracing::debug!(iteration, "strategy has nothing left to explore");
                break;
            }
            if self.config.incremental_seed {
                if let Some(seed) = self.strategy.seed() {
                    self.strategy.set_seed(seed.wrapping_add(1));
                }
            }

            iteration += 1;
        }
        Ok(())
    }

    fn banner(&self) -> String {
        let seed = if self.config.strategy.is_seeded() {
            self.strategy
                .seed()
                .or(self.config.seed)
                .map(|seed| format!(" (seed:{seed})"))
                .unwrap_or_default()
        } else {
            String::new()
        };
        format!(
            "... Task {} is using '{}' strategy{seed}.",
            self.config.testing_process_id, self.config.strategy
        )
    }
}

/// A cancellation failure is only expected once cancellation was requested.
fn cancelled_by_request(failure: &TestFailure, cancel: &CancellationToken) -> bool {
    failure.is_cancellation() && cancel.is_cancelled()
}
