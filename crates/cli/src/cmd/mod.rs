mod exec;
mod regen;
mod stale;

pub use exec::{ExecArgs, cmd_exec};
pub use regen::{RegenArgs, cmd_regen};
pub use stale::{StaleArgs, cmd_stale};

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::task::JoinHandle;
use tracing::warn;

use toolrun_lib::process::{CancelToken, CommandSpec};

/// Options describing the command to run, shared by `exec` and `regen`.
#[derive(Debug, Args)]
pub struct CommandArgs {
  /// Directory to run the command in
  #[arg(long, value_name = "DIR", default_value = ".")]
  cwd: PathBuf,

  /// Set an environment variable for the command (repeatable)
  #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
  env: Vec<(String, String)>,

  /// Text to write to the command's standard input
  #[arg(long, value_name = "TEXT", conflicts_with = "stdin_file")]
  stdin: Option<String>,

  /// File whose contents are written to the command's standard input
  #[arg(long, value_name = "PATH")]
  stdin_file: Option<PathBuf>,

  /// Name used for the command in log messages
  #[arg(long)]
  name: Option<String>,

  /// Stop the command after this long (e.g. "30s", "5m")
  #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,

  /// Program and arguments, after `--`
  #[arg(last = true, required = true, value_name = "COMMAND")]
  command: Vec<String>,
}

impl CommandArgs {
  /// Build the command description, reading the input file if one was given.
  pub fn to_spec(&self) -> Result<CommandSpec> {
    let mut spec = CommandSpec::from_argv(self.command.iter().cloned()).working_dir(&self.cwd);

    for (key, value) in &self.env {
      spec = spec.env(key, value);
    }

    if let Some(text) = &self.stdin {
      spec = spec.stdin(text);
    } else if let Some(path) = &self.stdin_file {
      let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read stdin file {}", path.display()))?;
      spec = spec.stdin(text);
    }

    if let Some(name) = &self.name {
      spec = spec.name(name);
    }

    Ok(spec)
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.timeout
  }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
  match s.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
  }
}

/// Cancel `token` on Ctrl-C or when `timeout` elapses.
///
/// The returned task must be aborted once the command has finished.
fn spawn_cancel_watcher(token: CancelToken, timeout: Option<Duration>) -> JoinHandle<()> {
  tokio::spawn(async move {
    let deadline = async {
      match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
      }
    };

    tokio::select! {
      Ok(()) = tokio::signal::ctrl_c() => {
        warn!("interrupted, stopping command");
      }
      _ = deadline => {
        if let Some(duration) = timeout {
          warn!(timeout = %humantime::format_duration(duration), "command timed out, stopping it");
        }
      }
    }

    token.cancel();
  })
}
