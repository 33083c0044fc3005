//! Line-oriented log sinks.
//!
//! The engine reports progress through a [`LogSink`]. The controlled runtime
//! gets one too; during non-verbose iterations that is an [`InMemoryLog`] whose
//! contents become the readable trace of a buggy run.

use std::sync::{Arc, Mutex, PoisonError};

use crate::stdio::ConsoleStreams;

/// Destination for human-readable log lines.
pub trait LogSink: Send {
    /// Writes one line. Sinks never fail; lost lines are not fatal.
    fn write_line(&mut self, line: &str);

    /// Returns true if this sink writes to the console, so the console should
    /// be flushed after progress lines.
    fn flushes_console(&self) -> bool {
        false
    }
}

/// Writes lines to the console output stream.
///
/// Engine lines stay visible while the program's own output is redirected.
#[derive(Debug, Clone)]
pub struct ConsoleLog {
    streams: ConsoleStreams,
}

impl ConsoleLog {
    pub fn new(streams: ConsoleStreams) -> Self {
        Self { streams }
    }
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new(ConsoleStreams::stdio())
    }
}

impl LogSink for ConsoleLog {
    fn write_line(&mut self, line: &str) {
        if let Err(error) = self.streams.write_console_line(line) {
            tracing::warn!(%error, "failed to write log line to console");
        }
    }

    fn flushes_console(&self) -> bool {
        true
    }
}

/// Emits every line as a `tracing` info event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn write_line(&mut self, line: &str) {
        tracing::info!(target: "tangle", "{line}");
    }
}

/// Buffers lines in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLog {
    buffer: Arc<Mutex<String>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, one `\n`-terminated line per write.
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl LogSink for InMemoryLog {
    fn write_line(&mut self, line: &str) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push_str(line);
        buffer.push('\n');
    }
}
