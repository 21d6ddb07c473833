//! Append-only capture of tool output
//!
//! Every stdout and stderr line of a run ends up here, in arrival order per
//! stream, and is later embedded verbatim in the run report.

use std::sync::Arc;

use parking_lot::Mutex;

/// Append-only text buffer of output lines.
///
/// Each line is stored followed by a newline, so the buffer can be written
/// into a report as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogAccumulator {
    text: String,
    lines: usize,
}

impl LogAccumulator {
    /// Create an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line. A trailing `\r` (robocopy writes CRLF) is dropped.
    pub fn push_line(&mut self, line: &str) {
        self.text.push_str(line.strip_suffix('\r').unwrap_or(line));
        self.text.push('\n');
        self.lines += 1;
    }

    /// The full accumulated text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of lines appended so far
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.lines
    }

    /// Returns true if nothing has been appended
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines == 0
    }
}

/// A `LogAccumulator` shared between the stdout and stderr readers.
#[derive(Debug, Clone, Default)]
pub struct SharedLog {
    inner: Arc<Mutex<LogAccumulator>>,
}

impl SharedLog {
    /// Create an empty shared log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line
    pub fn push_line(&self, line: &str) {
        self.inner.lock().push_line(line);
    }

    /// Copy of the text accumulated so far
    #[must_use]
    pub fn snapshot(&self) -> String {
        self.inner.lock().as_str().to_string()
    }

    /// Number of lines appended so far
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.inner.lock().line_count()
    }
}
