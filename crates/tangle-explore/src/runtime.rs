//! Contracts of the controlled runtime.
//!
//! The controlled runtime multiplexes the concurrent operations of the program
//! under test and asks its [`Strategy`] at every scheduling point. The engine
//! creates one runtime per iteration through a [`RuntimeFactory`]; the runtime
//! borrows the strategy for its whole lifetime, so two runtimes can never be
//! alive at once.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ExploreConfig;
use crate::coverage::CoverageInfo;
use crate::error::{ExploreError, TestFailure};
use crate::log::LogSink;
use crate::report::TestReport;
use crate::schedule::ScheduleTrace;
use crate::stdio::ConsoleStreams;
use crate::strategy::Strategy;
use crate::test_method::TestMethod;
use crate::xml::RuntimeLog;

/// Builds a fresh controlled runtime for each iteration.
pub trait RuntimeFactory: Send + Sync {
    /// Creates a runtime bound to `strategy` for one iteration.
    ///
    /// # Arguments
    ///
    /// * `config` - Run parameters (step bounds, liveness threshold)
    /// * `strategy` - The strategy answering every choice of this iteration
    /// * `streams` - Console streams the program under test writes to
    fn create<'a>(
        &self,
        config: &'a ExploreConfig,
        strategy: &'a mut dyn Strategy,
        streams: ConsoleStreams,
    ) -> Result<Box<dyn ControlledRuntime + 'a>, ExploreError>;
}

/// A runtime executing one iteration of the program under test.
///
/// Dropping the runtime releases everything it holds.
#[async_trait]
pub trait ControlledRuntime: Send {
    /// Replaces the runtime's human-readable log.
    fn set_logger(&mut self, logger: Box<dyn LogSink>);

    /// Adds a structured log receiving every runtime event.
    fn register_log(&mut self, log: Box<dyn RuntimeLog>);

    /// Starts the test body. Returns once it has been scheduled, not once it
    /// has finished.
    fn run_test(&mut self, test: Arc<dyn TestMethod>) -> Result<(), TestFailure>;

    /// Waits until every operation of the iteration has completed, or the
    /// iteration was stopped by a bug or the strategy.
    async fn wait(&mut self) -> Result<(), TestFailure>;

    fn scheduler(&self) -> &dyn SchedulerHandle;

    /// Reports a liveness bug if a monitor is still hot.
    fn check_no_monitor_in_hot_state_at_termination(&mut self);

    /// Tells the registered logs that the iteration is over.
    fn log_completion(&mut self);

    /// Activity observed during this iteration.
    fn coverage_info(&self) -> CoverageInfo;
}

/// Read access to the scheduler of a controlled runtime.
pub trait SchedulerHandle {
    fn bug_found(&self) -> bool;

    /// Description of the found bug.
    fn bug_report(&self) -> Option<&str>;

    /// Choices made so far in this iteration.
    fn schedule_trace(&self) -> &ScheduleTrace;

    /// Statistics of this iteration.
    fn report(&self) -> TestReport;
}
