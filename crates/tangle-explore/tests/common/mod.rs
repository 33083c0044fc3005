//! Scripted collaborators for driving the engine in tests.
//!
//! The mock runtime plays a tiny "program" per iteration: it requests the
//! choices listed in its [`Behavior`], records them, and ends the way the
//! behavior says (cleanly, with a bug, with a failure, or never).

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tangle_explore::{
    ConsoleStreams, ControlledRuntime, CoverageGraph, CoverageInfo, ExploreConfig, ExploreError,
    LogSink, RuntimeFactory, RuntimeLog, RuntimeLogEvent, ScheduleTrace, SchedulerHandle,
    Strategy, TestFailure, TestMethod, TestReport,
};

// ============================================================================
// Behavior
// ============================================================================

/// A choice the scripted program asks for.
#[derive(Debug, Clone)]
pub enum Choice {
    Schedule(Vec<u64>),
    Boolean,
    Integer(i64),
}

/// What one iteration of the scripted program does.
#[derive(Clone, Default)]
pub struct Behavior {
    pub choices: Vec<Choice>,
    pub bug: Option<String>,
    pub hot_monitor: bool,
    pub wait_error: Option<fn() -> TestFailure>,
    pub hang: bool,
    pub graph: bool,
}

impl Behavior {
    pub fn clean() -> Self {
        Self {
            choices: vec![Choice::Schedule(vec![0, 1]), Choice::Schedule(vec![1])],
            ..Self::default()
        }
    }

    pub fn buggy(report: &str) -> Self {
        Self {
            bug: Some(report.to_string()),
            ..Self::clean()
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }
}

type Plan = Box<dyn Fn(u64) -> Behavior + Send + Sync>;

// ============================================================================
// Observer
// ============================================================================

/// Observations shared between the test and the mocks.
#[derive(Default)]
pub struct Observer {
    pub runtimes_created: AtomicU64,
    pub alive: AtomicU64,
    pub max_alive: AtomicU64,
    pub hot_checks: AtomicU64,
    pub seeds: Mutex<Vec<u64>>,
}

impl Observer {
    pub fn iterations(&self) -> u64 {
        self.runtimes_created.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Runtime
// ============================================================================

pub struct MockFactory {
    plan: Plan,
    observer: Arc<Observer>,
}

impl MockFactory {
    pub fn new(observer: &Arc<Observer>, plan: impl Fn(u64) -> Behavior + Send + Sync + 'static) -> Self {
        Self {
            plan: Box::new(plan),
            observer: Arc::clone(observer),
        }
    }
}

impl RuntimeFactory for MockFactory {
    fn create<'a>(
        &self,
        _config: &'a ExploreConfig,
        strategy: &'a mut dyn Strategy,
        streams: ConsoleStreams,
    ) -> Result<Box<dyn ControlledRuntime + 'a>, ExploreError> {
        let iteration = self.observer.runtimes_created.fetch_add(1, Ordering::SeqCst);
        let alive = self.observer.alive.fetch_add(1, Ordering::SeqCst) + 1;
        self.observer.max_alive.fetch_max(alive, Ordering::SeqCst);

        Ok(Box::new(MockRuntime {
            fair: strategy.is_fair(),
            strategy,
            streams,
            iteration,
            behavior: (self.plan)(iteration),
            trace: ScheduleTrace::new(),
            bug: None,
            logger: None,
            logs: Vec::new(),
            observer: Arc::clone(&self.observer),
        }))
    }
}

pub struct MockRuntime<'a> {
    strategy: &'a mut dyn Strategy,
    fair: bool,
    streams: ConsoleStreams,
    iteration: u64,
    behavior: Behavior,
    trace: ScheduleTrace,
    bug: Option<String>,
    logger: Option<Box<dyn LogSink>>,
    logs: Vec<Box<dyn RuntimeLog>>,
    observer: Arc<Observer>,
}

impl MockRuntime<'_> {
    fn log(&mut self, line: &str) {
        if let Some(logger) = &mut self.logger {
            logger.write_line(line);
        } else {
            let _ = self.streams.write_out_line(line);
        }
    }

    fn emit(&mut self, event: &RuntimeLogEvent) {
        for log in &mut self.logs {
            log.on_event(event);
        }
    }

    fn play(&mut self) {
        for choice in self.behavior.choices.clone() {
            match choice {
                Choice::Schedule(ready) => {
                    let current = ready.first().copied().unwrap_or_default();
                    let Some(id) = self.strategy.next_operation(&ready, current) else {
                        return;
                    };
                    self.trace.add_scheduling_choice(id);
                    self.log(&format!("<ScheduleLog> Operation '{id}' is scheduled."));
                    self.emit(&RuntimeLogEvent::OperationScheduled { id });
                }
                Choice::Boolean => {
                    let Some(value) = self.strategy.next_boolean(2) else {
                        return;
                    };
                    self.trace.add_boolean_choice(value);
                    self.emit(&RuntimeLogEvent::RandomBoolean { value });
                }
                Choice::Integer(max) => {
                    let Some(value) = self.strategy.next_integer(max) else {
                        return;
                    };
                    self.trace.add_integer_choice(value);
                    self.emit(&RuntimeLogEvent::RandomInteger { value });
                }
            }
        }
    }
}

#[async_trait]
impl<'a> ControlledRuntime for MockRuntime<'a> {
    fn set_logger(&mut self, logger: Box<dyn LogSink>) {
        self.logger = Some(logger);
    }

    fn register_log(&mut self, log: Box<dyn RuntimeLog>) {
        self.logs.push(log);
    }

    fn run_test(&mut self, test: Arc<dyn TestMethod>) -> Result<(), TestFailure> {
        let _ = self.streams.write_out_line("program output");
        self.log(&format!(
            "<TestLog> Running test '{}' (iteration {}).",
            test.name(),
            self.iteration
        ));
        self.play();
        if let Some(bug) = self.behavior.bug.clone() {
            self.log(&format!("<ErrorLog> {bug}"));
            self.emit(&RuntimeLogEvent::AssertionFailure {
                message: bug.clone(),
            });
            self.bug = Some(bug);
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<(), TestFailure> {
        if self.behavior.hang {
            std::future::pending::<()>().await;
        }
        match self.behavior.wait_error {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }

    fn scheduler(&self) -> &dyn SchedulerHandle {
        self
    }

    fn check_no_monitor_in_hot_state_at_termination(&mut self) {
        self.observer.hot_checks.fetch_add(1, Ordering::SeqCst);
        if self.behavior.hot_monitor {
            self.bug = Some(
                "Monitor 'Liveness' detected liveness bug in hot state 'Waiting' \
                 at the end of program execution."
                    .to_string(),
            );
        }
    }

    fn log_completion(&mut self) {
        for log in &mut self.logs {
            log.on_completion();
        }
    }

    fn coverage_info(&self) -> CoverageInfo {
        let mut coverage = CoverageInfo::new();
        coverage.add_event("Client", "Init", "Ping");
        if self.behavior.graph {
            let mut graph = CoverageGraph::new();
            graph.add_link("Client", "Server", Some(format!("iteration {}", self.iteration)));
            coverage.coverage_graph = Some(graph);
        }
        coverage
    }
}

impl SchedulerHandle for MockRuntime<'_> {
    fn bug_found(&self) -> bool {
        self.bug.is_some()
    }

    fn bug_report(&self) -> Option<&str> {
        self.bug.as_deref()
    }

    fn schedule_trace(&self) -> &ScheduleTrace {
        &self.trace
    }

    fn report(&self) -> TestReport {
        let mut report = TestReport::new();
        report.record_schedule(self.fair, self.trace.scheduling_steps() as u64, false);
        if let Some(bug) = &self.bug {
            report.record_bug(bug.clone());
        }
        report
    }
}

impl Drop for MockRuntime<'_> {
    fn drop(&mut self) {
        self.observer.alive.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Strategy
// ============================================================================

/// Picks the last ready operation, `true`, and the largest integer.
pub struct ScriptedStrategy {
    /// Further iterations the strategy agrees to; `None` is unlimited.
    budget: Option<u64>,
    seed: Option<u64>,
    fair: bool,
    observer: Arc<Observer>,
}

impl ScriptedStrategy {
    pub fn new(observer: &Arc<Observer>) -> Self {
        Self {
            budget: None,
            seed: None,
            fair: false,
            observer: Arc::clone(observer),
        }
    }

    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn fair(mut self) -> Self {
        self.fair = true;
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn prepare_for_next_iteration(&mut self) -> bool {
        match &mut self.budget {
            Some(0) => false,
            Some(budget) => {
                *budget -= 1;
                true
            }
            None => true,
        }
    }

    fn is_fair(&self) -> bool {
        self.fair
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn set_seed(&mut self, seed: u64) {
        self.observer.seeds.lock().unwrap().push(seed);
        self.seed = Some(seed);
    }

    fn description(&self) -> String {
        "scripted".to_string()
    }

    fn next_operation(&mut self, ready: &[u64], _current: u64) -> Option<u64> {
        ready.last().copied()
    }

    fn next_boolean(&mut self, _max: u64) -> Option<bool> {
        Some(true)
    }

    fn next_integer(&mut self, max: i64) -> Option<i64> {
        Some((max - 1).max(0))
    }
}

// ============================================================================
// Test method
// ============================================================================

#[derive(Default)]
pub struct Hooks {
    pub initialized: AtomicU64,
    pub disposed_iterations: AtomicU64,
    pub disposed_all: AtomicU64,
}

pub struct MockTest {
    name: String,
    hooks: Arc<Hooks>,
    initialize_failure: Option<fn() -> TestFailure>,
    dispose_all_failure: Option<fn() -> TestFailure>,
}

impl MockTest {
    pub fn new(name: &str, hooks: &Arc<Hooks>) -> Self {
        Self {
            name: name.to_string(),
            hooks: Arc::clone(hooks),
            initialize_failure: None,
            dispose_all_failure: None,
        }
    }

    pub fn failing_initialize(self) -> Self {
        self.with_initialize_failure(|| {
            TestFailure::Assertion("fixture unavailable".to_string()).invocation()
        })
    }

    pub fn with_initialize_failure(mut self, failure: fn() -> TestFailure) -> Self {
        self.initialize_failure = Some(failure);
        self
    }

    pub fn with_dispose_all_failure(mut self, failure: fn() -> TestFailure) -> Self {
        self.dispose_all_failure = Some(failure);
        self
    }
}

impl TestMethod for MockTest {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize_all_iterations(&self) -> Result<(), TestFailure> {
        self.hooks.initialized.fetch_add(1, Ordering::SeqCst);
        match self.initialize_failure {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }

    fn dispose_current_iteration(&self) -> Result<(), TestFailure> {
        self.hooks.disposed_iterations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn dispose_all_iterations(&self) -> Result<(), TestFailure> {
        self.hooks.disposed_all.fetch_add(1, Ordering::SeqCst);
        match self.dispose_all_failure {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

pub fn count(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::SeqCst)
}
