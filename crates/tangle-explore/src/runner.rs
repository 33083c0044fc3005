//! One iteration, end to end.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::BugFindingEngine;
use crate::error::{ExploreError, TestFailure};
use crate::log::InMemoryLog;
use crate::repro::ReproducibleTrace;
use crate::stdio::SharedBuffer;
use crate::xml::XmlLogFormatter;

/// Prefix of the statistics appended to a readable trace.
const STRATEGY_LOG_PREFIX: &str = "<StrategyLog>";

impl BugFindingEngine {
    /// Runs iteration `iteration` (0-based) on a fresh controlled runtime.
    ///
    /// The runtime, the captured log and the stream redirection are torn down
    /// before this returns, whatever the outcome.
    pub(crate) async fn run_iteration(
        &mut self,
        iteration: u64,
        cancel: &CancellationToken,
    ) -> Result<(), ExploreError> {
        let Self {
            config,
            test,
            factory,
            strategy,
            logger,
            streams,
            callbacks,
            print_guard,
            report,
            readable_trace,
            reproducible_trace,
            graph,
            xml_log,
            ..
        } = self;

        if print_guard.should_print(iteration + 1) {
            logger.write_line(&format!("..... Iteration #{}", iteration + 1));
            if logger.flushes_console() {
                if let Err(error) = streams.flush_out() {
                    tracing::warn!(%error, "failed to flush console");
                }
            }
        }

        let fair = strategy.is_fair();
        let mut runtime = factory.create(config, strategy.as_mut(), streams.clone())?;

        let runtime_log = (!config.verbose).then(InMemoryLog::new);
        if let Some(log) = &runtime_log {
            runtime.set_logger(Box::new(log.clone()));
        }
        let redirect = runtime_log.as_ref().map(|_| streams.redirect_to_null());

        let xml_buffer = if config.xml_log {
            let buffer = SharedBuffer::new();
            runtime.register_log(Box::new(XmlLogFormatter::new(buffer.clone())?));
            Some(buffer)
        } else {
            None
        };

        let outcome = async {
            runtime.run_test(Arc::clone(test))?;
            tokio::select! {
                result = runtime.wait() => result?,
                () = cancel.cancelled() => return Err(TestFailure::Cancelled.into()),
            }

            test.dispose_current_iteration()?;
            for callback in callbacks.iter_mut() {
                callback(iteration);
            }

            if !runtime.scheduler().bug_found() {
                runtime.check_no_monitor_in_hot_state_at_termination();
            }

            if runtime.scheduler().bug_found() {
                let bug = runtime
                    .scheduler()
                    .bug_report()
                    .unwrap_or("unknown bug")
                    .to_string();
                logger.write_line(&format!("Error: {bug}"));
                tracing::error!(iteration = iteration + 1, %bug, "bug found");
            }

            runtime.log_completion();

            let mut iteration_report = runtime.scheduler().report();
            let mut coverage = runtime.coverage_info();
            *graph = coverage.coverage_graph.clone();
            if !config.report_activity_coverage {
                coverage.coverage_graph = None;
            }
            iteration_report.coverage.merge(coverage);
            report.merge(iteration_report);

            if !config.full_exploration && report.num_of_found_bugs > 0 {
                if let Some(log) = &runtime_log {
                    *readable_trace = log.contents();
                    readable_trace.push_str(&report.text(config, STRATEGY_LOG_PREFIX));
                }
                *reproducible_trace =
                    ReproducibleTrace::capture(config, fair, runtime.scheduler().schedule_trace())
                        .to_string();
            }

            Ok::<(), ExploreError>(())
        }
        .await;

        drop(redirect);

        let bug_found = runtime.scheduler().bug_found();
        if config.full_exploration && bug_found {
            logger.write_line(&format!(
                "..... Iteration #{} triggered bug #{} [task-{}]",
                iteration + 1,
                report.num_of_found_bugs,
                config.testing_process_id
            ));
        }

        drop(runtime_log);
        drop(runtime);

        if let Some(buffer) = xml_buffer {
            *xml_log = buffer.contents();
        }

        tracing::debug!(iteration = iteration + 1, bug_found, "iteration finished");
        outcome
    }
}
