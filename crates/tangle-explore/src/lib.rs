//! # tangle-explore: Systematic Concurrency Exploration
//!
//! This crate drives a program under test through many deterministic
//! executions, each under a different sequence of scheduling and
//! nondeterministic choices, and reports the bugs it finds together with a
//! trace that replays the failing execution exactly.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      BugFindingEngine                         │
//! │   explore(): ExplorationLimit, cancellation, stop policy      │
//! │                                                               │
//! │   run_iteration()                                             │
//! │   ┌────────────┐   ┌──────────────────┐   ┌────────────────┐  │
//! │   │ PrintGuard │   │ ControlledRuntime│   │ ConsoleStreams │  │
//! │   │ (progress) │   │ + Strategy       │   │ (redirection)  │  │
//! │   └────────────┘   └──────────────────┘   └────────────────┘  │
//! │                                                               │
//! │   TestReport (merge)   ReproducibleTrace   Artifacts (emit)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The controlled runtime, the exploring strategies and the program under
//! test are supplied by the caller through [`RuntimeFactory`], [`Strategy`]
//! and [`TestMethod`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use tangle_explore::{BugFindingEngine, ExploreConfig};
//!
//! let config = ExploreConfig::default().with_iterations(1_000);
//! let mut engine = BugFindingEngine::new(config, test, factory, strategy)?;
//!
//! engine.run().await?;
//! println!("{}", engine.report_text());
//! engine.try_emit_traces("out/", "Program")?;
//! ```
//!
//! ## Key Concepts
//!
//! - **Iteration**: one complete execution under one fixed sequence of choices
//! - **`ScheduleTrace`**: the ordered choices of one iteration
//! - **`ReproducibleTrace`**: the `.schedule` file replaying a buggy iteration
//! - **Full exploration**: keep going after the first bug

#![allow(clippy::format_push_string)] // Report and trace text building
#![allow(clippy::struct_field_names)] // Report counters mirror their meaning
#![allow(clippy::uninlined_format_args)] // Format string style preference

pub mod artifacts;
pub mod config;
pub mod coverage;
mod engine;
mod error;
pub mod log;
mod print_guard;
pub mod report;
pub mod repro;
mod runner;
pub mod runtime;
pub mod schedule;
pub mod stdio;
pub mod strategy;
pub mod test_method;
pub mod xml;

pub use artifacts::next_artifact_index;
pub use config::{ConfigError, ConfigLoader, ExploreConfig, StrategyKind};
pub use coverage::{CoverageGraph, CoverageInfo};
pub use engine::{BugFindingEngine, ExplorationLimit, IterationCallback};
pub use error::{ExploreError, MAX_UNWRAP_DEPTH, TestFailure};
pub use log::{ConsoleLog, InMemoryLog, LogSink, TracingLog};
pub use print_guard::PrintGuard;
pub use report::TestReport;
pub use repro::{ReproParseError, ReproducibleTrace};
pub use runtime::{ControlledRuntime, RuntimeFactory, SchedulerHandle};
pub use schedule::{OperationId, ScheduleStep, ScheduleTrace};
pub use stdio::{ConsoleStreams, RedirectGuard, SharedBuffer};
pub use strategy::{ReplayStrategy, Strategy};
pub use test_method::{TestMethod, TestRegistry};
pub use xml::{RuntimeLog, RuntimeLogEvent, XmlLogFormatter};
