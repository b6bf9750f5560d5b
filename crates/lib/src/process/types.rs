//! Types for process execution.
//!
//! This module defines the command description, result, error and
//! configuration types shared by the runner and the stream pumps.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// One external command to run.
///
/// The first element of `argv` is the program; the rest are its arguments.
/// Environment entries are overlaid onto the inherited environment, so any
/// variable not named here passes through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
  /// Program followed by its arguments.
  pub argv: Vec<String>,

  /// Directory the process runs in.
  pub working_dir: PathBuf,

  /// Variables set on top of the inherited environment.
  pub env: BTreeMap<String, String>,

  /// Text written to standard input before it is closed.
  pub stdin: Option<String>,

  /// Name used in log messages. Defaults to the program's file name.
  pub name: Option<String>,
}

impl CommandSpec {
  /// Create a spec for `program` with no arguments, running in `.`.
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      argv: vec![program.into()],
      working_dir: PathBuf::from("."),
      env: BTreeMap::new(),
      stdin: None,
      name: None,
    }
  }

  /// Create a spec from a full argument vector.
  ///
  /// The vector may be empty; the runner rejects it at execution time.
  pub fn from_argv<I, S>(argv: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      argv: argv.into_iter().map(Into::into).collect(),
      ..Self::new("")
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.argv.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.argv.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_dir = dir.into();
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn stdin(mut self, input: impl Into<String>) -> Self {
    self.stdin = Some(input.into());
    self
  }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// The program path, or `None` when the argument vector is empty.
  pub fn program(&self) -> Option<&str> {
    self.argv.first().map(String::as_str).filter(|p| !p.is_empty())
  }

  /// Arguments after the program.
  pub fn arguments(&self) -> &[String] {
    self.argv.get(1..).unwrap_or_default()
  }

  /// Name for log messages: the explicit name, else the program's file name.
  pub fn display_name(&self) -> String {
    if let Some(name) = &self.name {
      return name.clone();
    }
    match self.program() {
      Some(program) => Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string()),
      None => "<empty command>".to_string(),
    }
  }

  /// The argument vector joined with spaces, for diagnostics.
  pub fn command_line(&self) -> String {
    self.argv.join(" ")
  }
}

/// Outcome of one completed invocation.
///
/// All textual output has already been delivered to the sinks by the time
/// this value exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
  /// Exit status. Signal terminations on Unix are reported as `128 + signal`.
  pub exit_code: i32,
}

impl ExecutionResult {
  pub fn success(&self) -> bool {
    self.exit_code == 0
  }
}

/// Which output stream of the child a pump is draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
  Stdin,
  Stdout,
  Stderr,
}

impl StreamKind {
  fn io_verb(&self) -> &'static str {
    match self {
      StreamKind::Stdin => "write",
      StreamKind::Stdout | StreamKind::Stderr => "read",
    }
  }
}

impl std::fmt::Display for StreamKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      StreamKind::Stdin => write!(f, "stdin"),
      StreamKind::Stdout => write!(f, "stdout"),
      StreamKind::Stderr => write!(f, "stderr"),
    }
  }
}

/// Lifecycle of a single invocation.
///
/// Exactly one terminal state (`Completed` or `Failed`) is reached per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
  Idle,
  Spawning,
  Running,
  /// The process has exited; the pumps are still flushing.
  Draining,
  Completed(i32),
  Failed,
}

impl std::fmt::Display for RunState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RunState::Idle => write!(f, "idle"),
      RunState::Spawning => write!(f, "spawning"),
      RunState::Running => write!(f, "running"),
      RunState::Draining => write!(f, "draining"),
      RunState::Completed(code) => write!(f, "completed({})", code),
      RunState::Failed => write!(f, "failed"),
    }
  }
}

/// Errors that can occur while running an external command.
///
/// A non-zero exit status is not an error; it is returned in
/// [`ExecutionResult`] and judged by the caller.
#[derive(Debug, Error)]
pub enum ProcessError {
  /// The argument vector was empty.
  #[error("command has no program to run")]
  EmptyCommand,

  /// The configured working directory does not exist.
  #[error("working directory does not exist: {}", .0.display())]
  WorkingDirNotFound(PathBuf),

  /// The process could not be launched.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  /// Reading or writing a child stream failed mid-flight.
  #[error("failed to {} {stream}: {source}", .stream.io_verb())]
  StreamIo {
    stream: StreamKind,
    #[source]
    source: io::Error,
  },

  /// Waiting on the child failed at the OS level.
  #[error("failed to wait for process: {0}")]
  Wait(#[source] io::Error),

  /// The wait was cancelled before the process exited or its output drained.
  #[error("interrupted while waiting for process")]
  Interrupted,
}

impl ProcessError {
  /// True for the errors raised before or during launch.
  pub fn is_spawn_error(&self) -> bool {
    matches!(
      self,
      ProcessError::EmptyCommand | ProcessError::WorkingDirNotFound(_) | ProcessError::Spawn { .. }
    )
  }
}

/// Configuration for a [`ProcessRunner`](super::ProcessRunner).
#[derive(Debug, Clone)]
pub struct RunnerOptions {
  /// Kill the child when the wait is cancelled.
  pub kill_on_cancel: bool,

  /// Start the child in its own process group and kill the whole group on
  /// cancellation. Unix only; ignored elsewhere.
  ///
  /// A child in its own group no longer receives terminal signals such as
  /// Ctrl-C, so callers enabling this should forward those as cancellation.
  pub process_group: bool,
}

impl Default for RunnerOptions {
  fn default() -> Self {
    Self {
      kill_on_cancel: true,
      process_group: false,
    }
  }
}
