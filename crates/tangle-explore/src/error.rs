//! Error types for the exploration engine.
//!
//! Two layers:
//!
//! - [`TestFailure`] is raised by the program under test (or by the controlled
//!   runtime on its behalf). Failures can arrive wrapped in invocation and
//!   aggregation layers; [`TestFailure::innermost`] walks that chain, bounded by
//!   [`MAX_UNWRAP_DEPTH`], to the cause worth presenting.
//! - [`ExploreError`] is what the engine itself returns. Infrastructure failures
//!   (I/O, configuration, schedule parsing) are not recovered from; they abort
//!   the run.

use std::any::Any;

use thiserror::Error;

use crate::config::ConfigError;
use crate::repro::ReproParseError;

/// Upper bound on the number of wrapping layers peeled off by
/// [`TestFailure::innermost`].
pub const MAX_UNWRAP_DEPTH: usize = 64;

/// A failure raised by the program under test.
#[derive(Debug, Error)]
pub enum TestFailure {
    /// The test entry point failed; the real cause is `inner`.
    #[error("test invocation failed: {inner}")]
    Invocation { inner: Box<TestFailure> },

    /// Several concurrent operations failed. Only the first is presented.
    #[error("{} error(s) occurred", inner.len())]
    Aggregate { inner: Vec<TestFailure> },

    /// The iteration was cancelled.
    #[error("the exploration was cancelled")]
    Cancelled,

    /// An assertion inside the program under test did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// The program under test panicked.
    #[error("test panicked: {0}")]
    Panic(String),

    /// Any other error surfaced by test code.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TestFailure {
    /// Wraps an arbitrary error raised by test code.
    pub fn other(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(error.into())
    }

    /// Wraps this failure in an invocation layer.
    pub fn invocation(self) -> Self {
        Self::Invocation {
            inner: Box::new(self),
        }
    }

    /// Builds a failure from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panic(message)
    }

    /// Returns true if this failure is the cancellation signal.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Peels invocation and aggregation layers off until the innermost cause
    /// is reached, or [`MAX_UNWRAP_DEPTH`] layers have been removed.
    ///
    /// An aggregate contributes its first inner failure. An empty aggregate is
    /// its own innermost cause.
    pub fn innermost(self) -> Self {
        let mut current = self;
        for _ in 0..MAX_UNWRAP_DEPTH {
            current = match current {
                Self::Invocation { inner } => *inner,
                Self::Aggregate { mut inner } if !inner.is_empty() => inner.remove(0),
                other => return other,
            };
        }
        current
    }
}

/// Errors returned by the exploration engine.
#[derive(Debug, Error)]
pub enum ExploreError {
    /// The program under test could not be located or initialized.
    #[error("failed to set up test '{test}': {reason}")]
    Setup { test: String, reason: String },

    /// The program under test failed outside of a reported bug.
    #[error("test failure: {0}")]
    Test(#[from] TestFailure),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid schedule: {0}")]
    Schedule(#[from] ReproParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExploreError {
    /// Builds a setup failure.
    pub fn setup(test: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Setup {
            test: test.into(),
            reason: reason.into(),
        }
    }
}
