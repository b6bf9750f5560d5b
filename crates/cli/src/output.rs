//! Terminal output for toolrun commands.
//!
//! Each command ends with one summary line. Its symbol, color and stream
//! follow from a [`Status`]: results go to stdout, while warnings and
//! failures go to stderr alongside the tool's own log lines.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use toolrun_lib::invoke::Outcome;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// How a summary line is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  /// The tool ran and succeeded.
  Done,
  /// Nothing needed to run.
  UpToDate,
  /// Work is needed or a tolerated failure occurred.
  Warning,
  Failed,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::UpToDate => "•",
      Status::Warning => "⚠",
      Status::Failed => "✗",
    }
  }
}

pub fn print_status(status: Status, message: &str) {
  let symbol = status.symbol();
  match status {
    Status::Done => println!("{} {}", symbol.if_supports_color(Stream::Stdout, |s| s.green()), message),
    Status::UpToDate => println!("{} {}", symbol.if_supports_color(Stream::Stdout, |s| s.blue()), message),
    Status::Warning => eprintln!(
      "{} {}",
      symbol.if_supports_color(Stream::Stderr, |s| s.yellow()),
      message.if_supports_color(Stream::Stderr, |s| s.yellow())
    ),
    Status::Failed => eprintln!(
      "{} {}",
      symbol.if_supports_color(Stream::Stderr, |s| s.red()),
      message.if_supports_color(Stream::Stderr, |s| s.red())
    ),
  }
}

/// Summary of a finished `exec` run.
pub fn run_summary(tool: &str, exit_code: i32, elapsed: Duration) -> (Status, String) {
  if exit_code == 0 {
    (Status::Done, format!("{} finished in {}", tool, format_duration(elapsed)))
  } else {
    (
      Status::Failed,
      format!("{} exited with code {} after {}", tool, exit_code, format_duration(elapsed)),
    )
  }
}

/// Summary of one `regen` outcome.
pub fn outcome_summary(tool: &str, artifact: &Path, outcome: Outcome) -> (Status, String) {
  match outcome {
    Outcome::UpToDate => (Status::UpToDate, format!("{} is up to date", artifact.display())),
    Outcome::Regenerated => (Status::Done, format!("Regenerated {}", artifact.display())),
    Outcome::FailedTolerated { exit_code } => (
      Status::Warning,
      format!(
        "{} failed with exit code {}, {} may be out of date",
        tool,
        exit_code,
        artifact.display()
      ),
    ),
  }
}

/// Summary of a `stale` check.
pub fn staleness_summary(artifact: &Path, stale: bool) -> (Status, String) {
  if stale {
    (Status::Warning, format!("{} is stale", artifact.display()))
  } else {
    (Status::UpToDate, format!("{} is up to date", artifact.display()))
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    format!("{}m {}s", secs / 60, secs % 60)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
