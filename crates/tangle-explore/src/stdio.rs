//! Shared console streams with scoped redirection.
//!
//! The engine, the console log sink and the controlled runtime all write
//! program output through one [`ConsoleStreams`] handle. Silencing an iteration
//! swaps both writers for sinks and hands back a [`RedirectGuard`]; the
//! originals come back when the guard is dropped, including during unwinding.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type BoxedWriter = Box<dyn Write + Send>;

struct StreamState {
    out: BoxedWriter,
    err: BoxedWriter,
    /// Writers displaced by active redirections, innermost last.
    saved: Vec<(BoxedWriter, BoxedWriter)>,
}

/// Cloneable handle over the output and error writers.
#[derive(Clone)]
pub struct ConsoleStreams {
    state: Arc<Mutex<StreamState>>,
}

impl ConsoleStreams {
    /// Streams over the process standard output and error.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// Streams over arbitrary writers.
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(StreamState {
                out: Box::new(out),
                err: Box::new(err),
                saved: Vec::new(),
            })),
        }
    }

    /// Streams writing into in-memory buffers, for capture scoped to one call.
    pub fn captured() -> (Self, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        (Self::new(out.clone(), err.clone()), out, err)
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discards everything written to either stream until the returned guard
    /// is dropped.
    pub fn redirect_to_null(&self) -> RedirectGuard {
        let mut state = self.lock();
        let out = std::mem::replace(&mut state.out, Box::new(io::sink()));
        let err = std::mem::replace(&mut state.err, Box::new(io::sink()));
        state.saved.push((out, err));
        RedirectGuard {
            streams: self.clone(),
        }
    }

    /// Returns true while at least one redirection is active.
    pub fn is_redirected(&self) -> bool {
        !self.lock().saved.is_empty()
    }

    /// Writer handle for the output stream.
    pub fn out(&self) -> ConsoleWriter {
        ConsoleWriter {
            streams: self.clone(),
            target: Target::Out,
        }
    }

    /// Writer handle for the error stream.
    pub fn err(&self) -> ConsoleWriter {
        ConsoleWriter {
            streams: self.clone(),
            target: Target::Err,
        }
    }

    /// Writes a line to the output stream.
    pub fn write_out_line(&self, line: &str) -> io::Result<()> {
        writeln!(self.lock().out, "{line}")
    }

    /// Writes a line to the error stream.
    pub fn write_err_line(&self, line: &str) -> io::Result<()> {
        writeln!(self.lock().err, "{line}")
    }

    /// Writes a line to the caller's output stream, bypassing any active
    /// redirection.
    pub fn write_console_line(&self, line: &str) -> io::Result<()> {
        let mut state = self.lock();
        let state = &mut *state;
        let out = match state.saved.first_mut() {
            Some((out, _)) => out,
            None => &mut state.out,
        };
        writeln!(out, "{line}")?;
        out.flush()
    }

    /// Flushes the output stream, or the caller's stream while redirected.
    pub fn flush_out(&self) -> io::Result<()> {
        let mut state = self.lock();
        let state = &mut *state;
        match state.saved.first_mut() {
            Some((out, _)) => out.flush(),
            None => state.out.flush(),
        }
    }
}

impl Default for ConsoleStreams {
    fn default() -> Self {
        Self::stdio()
    }
}

impl fmt::Debug for ConsoleStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleStreams")
            .field("redirected", &self.is_redirected())
            .finish_non_exhaustive()
    }
}

/// Restores the writers displaced by [`ConsoleStreams::redirect_to_null`].
#[must_use = "the streams are restored as soon as the guard is dropped"]
pub struct RedirectGuard {
    streams: ConsoleStreams,
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        let mut state = self.streams.lock();
        if let Some((out, err)) = state.saved.pop() {
            state.out = out;
            state.err = err;
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Out,
    Err,
}

/// A [`Write`] handle bound to one of the console streams.
///
/// Every write goes to whatever writer is current at the time, so a handle
/// taken before a redirection follows it.
#[derive(Clone)]
pub struct ConsoleWriter {
    streams: ConsoleStreams,
    target: Target,
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.streams.lock();
        match self.target {
            Target::Out => state.out.write(buf),
            Target::Err => state.err.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.streams.lock();
        match self.target {
            Target::Out => state.out.flush(),
            Target::Err => state.err.flush(),
        }
    }
}

/// A cloneable in-memory byte buffer implementing [`Write`].
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffered bytes as (lossy) UTF-8.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear(&self) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
