//! Output sinks.
//!
//! A sink receives the child's output one line at a time. Sinks are total:
//! they never report failure back to the pump, since a logging fault must not
//! interrupt draining the process.

use std::sync::Mutex;

use tracing::{debug, error, info, trace, warn};

/// Destination for one stream of process output.
pub trait OutputSink: Send + Sync {
  /// Accept one line, without its line terminator.
  fn consume_line(&self, line: &str);
}

impl<F> OutputSink for F
where
  F: Fn(&str) + Send + Sync,
{
  fn consume_line(&self, line: &str) {
    self(line)
  }
}

/// Log level a [`LogSink`] records lines at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Trace,
  Debug,
  Info,
  Warn,
  Error,
}

/// Routes each line into the `tracing` log at a fixed severity.
#[derive(Debug, Clone)]
pub struct LogSink {
  tool: String,
  severity: Severity,
}

impl LogSink {
  pub fn new(tool: impl Into<String>, severity: Severity) -> Self {
    Self {
      tool: tool.into(),
      severity,
    }
  }

  /// The standard sink for a tool's standard output.
  pub fn info(tool: impl Into<String>) -> Self {
    Self::new(tool, Severity::Info)
  }

  /// The standard sink for a tool's standard error.
  pub fn error(tool: impl Into<String>) -> Self {
    Self::new(tool, Severity::Error)
  }

  pub fn severity(&self) -> Severity {
    self.severity
  }
}

impl OutputSink for LogSink {
  fn consume_line(&self, line: &str) {
    let tool = self.tool.as_str();
    match self.severity {
      Severity::Trace => trace!(tool, "{}", line),
      Severity::Debug => debug!(tool, "{}", line),
      Severity::Info => info!(tool, "{}", line),
      Severity::Warn => warn!(tool, "{}", line),
      Severity::Error => error!(tool, "{}", line),
    }
  }
}

/// Keeps every line in memory, for callers that inspect tool output.
#[derive(Debug, Default)]
pub struct CaptureSink {
  lines: Mutex<Vec<String>>,
}

impl CaptureSink {
  pub fn new() -> Self {
    Self::default()
  }

  /// A copy of the lines received so far, in arrival order.
  pub fn lines(&self) -> Vec<String> {
    self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
  }

  /// Consume the sink and return the captured lines.
  pub fn into_lines(self) -> Vec<String> {
    self.lines.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl OutputSink for CaptureSink {
  fn consume_line(&self, line: &str) {
    self
      .lines
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .push(line.to_string());
  }
}
