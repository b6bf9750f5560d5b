//! Process runner.
//!
//! Runs one external command per call: spawns it, pumps both output streams
//! into sinks concurrently, feeds the optional input payload, waits for exit
//! and for both pumps to drain, then reports the exit status.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, debug, error, trace, warn};

use super::cancel::CancelToken;
use super::pump::pump;
use super::sink::OutputSink;
use super::types::{CommandSpec, ExecutionResult, ProcessError, RunState, RunnerOptions, StreamKind};

/// Executes external commands.
///
/// The runner holds only configuration, so one instance can serve any number
/// of invocations; each call owns its child process and its two pump tasks.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
  options: RunnerOptions,
}

impl ProcessRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_options(options: RunnerOptions) -> Self {
    Self { options }
  }

  pub fn kill_on_cancel(mut self, enabled: bool) -> Self {
    self.options.kill_on_cancel = enabled;
    self
  }

  pub fn process_group(mut self, enabled: bool) -> Self {
    self.options.process_group = enabled;
    self
  }

  pub fn options(&self) -> &RunnerOptions {
    &self.options
  }

  /// Run `spec` to completion.
  ///
  /// Returns once the process has exited and both output streams have been
  /// drained into their sinks. A non-zero exit status is returned as data.
  pub async fn execute(
    &self,
    spec: &CommandSpec,
    stdout: Arc<dyn OutputSink>,
    stderr: Arc<dyn OutputSink>,
  ) -> Result<ExecutionResult, ProcessError> {
    self.execute_with_cancel(spec, stdout, stderr, &CancelToken::new()).await
  }

  /// Run `spec` to completion unless `cancel` fires first.
  ///
  /// On cancellation the call fails with [`ProcessError::Interrupted`]. The
  /// child is killed first when [`RunnerOptions::kill_on_cancel`] is set;
  /// otherwise it is left running.
  pub async fn execute_with_cancel(
    &self,
    spec: &CommandSpec,
    stdout: Arc<dyn OutputSink>,
    stderr: Arc<dyn OutputSink>,
    cancel: &CancelToken,
  ) -> Result<ExecutionResult, ProcessError> {
    let name = spec.display_name();
    trace!(tool = %name, state = %RunState::Idle, "invocation state");

    let Some(program) = spec.program() else {
      trace!(tool = %name, state = %RunState::Failed, "invocation state");
      return Err(ProcessError::EmptyCommand);
    };

    log_configuration(&name, spec);

    if !spec.working_dir.is_dir() {
      trace!(tool = %name, state = %RunState::Failed, "invocation state");
      return Err(ProcessError::WorkingDirNotFound(spec.working_dir.clone()));
    }

    trace!(tool = %name, state = %RunState::Spawning, "invocation state");
    let mut child = self
      .spawn(program, spec)
      .inspect_err(|_| trace!(tool = %name, state = %RunState::Failed, "invocation state"))?;
    // Captured now: the child reports no id once it has been reaped.
    let pid = child.id();
    trace!(tool = %name, state = %RunState::Running, pid = ?pid, "invocation state");

    let mut stdout_pump = spawn_pump(child.stdout.take(), stdout, StreamKind::Stdout);
    let mut stderr_pump = spawn_pump(child.stderr.take(), stderr, StreamKind::Stderr);

    let waited = tokio::select! {
      result = feed_and_wait(&mut child, spec.stdin.as_deref()) => Some(result),
      _ = cancel.cancelled() => None,
    };

    let status = match waited {
      Some(Ok(status)) => status,
      Some(Err(err)) => {
        abort_pumps(&stdout_pump, &stderr_pump);
        self.terminate(&mut child, pid, &name).await;
        trace!(tool = %name, state = %RunState::Failed, "invocation state");
        return Err(err);
      }
      None => {
        abort_pumps(&stdout_pump, &stderr_pump);
        self.interrupted(&mut child, pid, &name).await;
        return Err(ProcessError::Interrupted);
      }
    };

    trace!(tool = %name, state = %RunState::Draining, "invocation state");

    // Output still buffered in the pipes must reach the sinks before we return.
    let drained = tokio::select! {
      results = async { tokio::join!(&mut stdout_pump, &mut stderr_pump) } => Some(results),
      _ = cancel.cancelled() => None,
    };

    let Some((stdout_done, stderr_done)) = drained else {
      abort_pumps(&stdout_pump, &stderr_pump);
      self.interrupted(&mut child, pid, &name).await;
      return Err(ProcessError::Interrupted);
    };

    let (stdout_lines, stderr_lines) = pump_outcome(stdout_done, StreamKind::Stdout)
      .and_then(|out| Ok((out, pump_outcome(stderr_done, StreamKind::Stderr)?)))
      .inspect_err(|_| trace!(tool = %name, state = %RunState::Failed, "invocation state"))?;

    let exit_code = exit_code(status);
    if exit_code == 0 {
      debug!(tool = %name, stdout_lines, stderr_lines, "{} returned zero exit code", name);
    } else {
      error!(tool = %name, stdout_lines, stderr_lines, "{} returned non-zero exit code ({})", name, exit_code);
    }
    trace!(tool = %name, state = %RunState::Completed(exit_code), "invocation state");

    Ok(ExecutionResult { exit_code })
  }

  fn spawn(&self, program: &str, spec: &CommandSpec) -> Result<Child, ProcessError> {
    let mut command = Command::new(program);
    command
      .args(spec.arguments())
      .current_dir(&spec.working_dir)
      .envs(&spec.env)
      .stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(self.options.kill_on_cancel);

    #[cfg(unix)]
    {
      if self.options.process_group {
        command.process_group(0);
      }
    }

    command.spawn().map_err(|source| ProcessError::Spawn {
      program: program.to_string(),
      source,
    })
  }

  async fn interrupted(&self, child: &mut Child, pid: Option<u32>, name: &str) {
    if self.options.kill_on_cancel {
      warn!(tool = %name, pid = ?pid, "wait interrupted, killing process");
      self.terminate(child, pid, name).await;
    } else {
      warn!(tool = %name, pid = ?pid, "wait interrupted, process left running");
    }
    trace!(tool = %name, state = %RunState::Failed, "invocation state");
  }

  /// Kill the child (and its process group when configured) and reap it.
  async fn terminate(&self, child: &mut Child, pid: Option<u32>, name: &str) {
    #[cfg(not(unix))]
    let _ = pid;

    #[cfg(unix)]
    {
      if self.options.process_group
        && let Some(pid) = pid
        && let Err(err) = kill_process_group(pid)
      {
        debug!(tool = %name, pid, error = %err, "failed to kill process group");
      }
    }

    if let Err(err) = child.kill().await {
      debug!(tool = %name, error = %err, "failed to kill process");
    }
  }
}

fn log_configuration(name: &str, spec: &CommandSpec) {
  let working_dir = std::path::absolute(&spec.working_dir).unwrap_or_else(|_| spec.working_dir.clone());

  debug!(tool = %name, command = %spec.command_line(), "{} command line", name);
  debug!(tool = %name, working_dir = %working_dir.display(), "working directory");

  if !spec.env.is_empty() {
    debug!(tool = %name, env = ?spec.env, "environment variables");
  }

  if let Some(input) = &spec.stdin {
    debug!(tool = %name, stdin = %input, "standard input");
  }
}

fn spawn_pump<R>(
  reader: Option<R>,
  sink: Arc<dyn OutputSink>,
  stream: StreamKind,
) -> JoinHandle<io::Result<u64>>
where
  R: AsyncRead + Unpin + Send + 'static,
{
  let task = async move {
    match reader {
      Some(reader) => pump(reader, sink, stream).await,
      None => Err(io::Error::other(format!("{} pipe unavailable", stream))),
    }
  };
  tokio::spawn(task.in_current_span())
}

fn abort_pumps(stdout: &JoinHandle<io::Result<u64>>, stderr: &JoinHandle<io::Result<u64>>) {
  stdout.abort();
  stderr.abort();
}

fn pump_outcome(joined: Result<io::Result<u64>, JoinError>, stream: StreamKind) -> Result<u64, ProcessError> {
  match joined {
    Ok(Ok(lines)) => Ok(lines),
    Ok(Err(source)) => Err(ProcessError::StreamIo { stream, source }),
    Err(join_err) => Err(ProcessError::StreamIo {
      stream,
      source: io::Error::other(join_err),
    }),
  }
}

/// Write the input payload (if any), close stdin, then wait for exit.
async fn feed_and_wait(child: &mut Child, input: Option<&str>) -> Result<ExitStatus, ProcessError> {
  if let Some(input) = input
    && let Some(mut stdin) = child.stdin.take()
  {
    match write_input(&mut stdin, input).await {
      Ok(()) => {}
      // The process closed its end without reading everything; that is an
      // ordinary end of stream, not a failure.
      Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
        debug!("process closed stdin before consuming all input");
      }
      Err(source) => {
        return Err(ProcessError::StreamIo {
          stream: StreamKind::Stdin,
          source,
        });
      }
    }
    drop(stdin);
  }

  child.wait().await.map_err(ProcessError::Wait)
}

async fn write_input(stdin: &mut ChildStdin, input: &str) -> io::Result<()> {
  stdin.write_all(input.as_bytes()).await?;
  stdin.flush().await
}

fn exit_code(status: ExitStatus) -> i32 {
  if let Some(code) = status.code() {
    return code;
  }

  #[cfg(unix)]
  {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = status.signal() {
      return 128 + signal;
    }
  }

  -1
}

#[cfg(unix)]
fn kill_process_group(pid: u32) -> io::Result<()> {
  use rustix::process::{Pid, Signal};

  let pid = i32::try_from(pid)
    .ok()
    .and_then(Pid::from_raw)
    .ok_or_else(|| io::Error::other(format!("invalid pid {}", pid)))?;
  rustix::process::kill_process_group(pid, Signal::KILL).map_err(io::Error::from)
}
