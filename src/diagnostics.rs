//! Line-oriented sink for messages about the logging setup itself.
//!
//! The setup can not log through the backend it is about to configure,
//! so it writes its own lines, each prefixed with [`PREFIX`],
//! to the process's standard error stream by default.

use std::{
    fmt,
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

/// Prefix of every diagnostic line.
pub const PREFIX: &str = "[Logging setup] ";

/// Receives complete diagnostic lines.
///
/// Each call gets one line that already carries the prefix and the
/// terminating newline, so implementations can write it with a single call.
pub trait DiagnosticSink: Send + Sync {
    /// Appends a line.
    fn write_line(&self, line: &str);
}

/// Writes diagnostic lines to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn write_line(&self, line: &str) {
        let stderr = std::io::stderr();
        let mut lock = stderr.lock();
        lock.write_all(line.as_bytes()).ok();
        lock.flush().ok();
    }
}

/// Collects diagnostic lines in memory.
///
/// Cloning is cheap; all clones share the same buffer, so a clone can be
/// handed to a [`LoggingSystem`](crate::LoggingSystem) while the original
/// is used to inspect what was written.
#[derive(Clone, Debug, Default)]
pub struct BufferSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the lines written so far, without the trailing newlines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of lines written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// True if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if some line contains the given fragment.
    #[must_use]
    pub fn contains(&self, fragment: &str) -> bool {
        self.lines().iter().any(|line| line.contains(fragment))
    }

    /// Forgets all lines.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl DiagnosticSink for BufferSink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(line.trim_end_matches('\n').to_string());
    }
}

// The sink plus the switch for verbose output.
pub(crate) struct Diagnostics {
    verbose: AtomicBool,
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub(crate) fn new(sink: Arc<dyn DiagnosticSink>, verbose: bool) -> Self {
        Self {
            verbose: AtomicBool::new(verbose),
            sink,
        }
    }

    pub(crate) fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    pub(crate) fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    // Trace of the resolution process, only written if verbose output is switched on.
    pub(crate) fn log_logging(&self, args: fmt::Arguments) {
        if self.is_verbose() {
            self.log_always(args);
        }
    }

    // Warnings and conflicts.
    pub(crate) fn log_always(&self, args: fmt::Arguments) {
        let mut line = String::with_capacity(80);
        line.push_str(PREFIX);
        fmt::write(&mut line, args).ok();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.sink.write_line(&line);
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("verbose", &self.is_verbose())
            .finish_non_exhaustive()
    }
}
