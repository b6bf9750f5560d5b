//! Implementation of the `toolrun regen` command.
//!
//! Checks the artifact against its sources and runs the tool only when the
//! artifact is missing or out of date. `{artifact}` and `{root}` in the
//! command's arguments are replaced before it runs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use toolrun_lib::invoke::{Artifact, BoxError, FailurePolicy, InvokeError, ToolInvocation, expand_placeholders};
use toolrun_lib::process::{CancelToken, CommandSpec, LogSink, ProcessRunner};
use toolrun_lib::stale::{SourceSet, StalenessChecker};

use super::{CommandArgs, spawn_cancel_watcher};
use crate::output::{OutputFormat, Status, outcome_summary, print_json, print_status};

#[derive(Debug, Args)]
pub struct RegenArgs {
  /// Directory the source pattern is matched under
  #[arg(long, value_name = "DIR")]
  root: PathBuf,

  /// Glob selecting the sources, relative to the root (e.g. "**/*.h")
  #[arg(long, value_name = "GLOB")]
  pattern: String,

  /// The file the tool generates
  #[arg(long, value_name = "PATH")]
  artifact: PathBuf,

  /// Run the tool even if the artifact is up to date
  #[arg(short, long)]
  force: bool,

  /// Treat a failing tool as a warning instead of an error
  #[arg(long)]
  warn_only: bool,

  /// Ignore version-control and editor scratch files among the sources
  #[arg(long)]
  default_excludes: bool,

  /// Output format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(flatten)]
  command: CommandArgs,
}

pub fn cmd_regen(args: RegenArgs) -> Result<i32> {
  let template = args.command.to_spec()?;
  let tool = template.display_name();
  let artifact = Artifact::new(SourceSet::new(&args.root, &args.pattern), &args.artifact);

  let policy = if args.warn_only {
    FailurePolicy::Warn
  } else {
    FailurePolicy::Fatal
  };

  let invocation = ToolInvocation::new(tool.clone(), |artifact: &Artifact| -> Result<CommandSpec, BoxError> {
    let mut spec = template.clone();
    spec.argv = spec.argv.iter().map(|arg| expand_placeholders(arg, artifact)).collect();
    Ok(spec)
  })
  .failure_policy(policy)
  .force(args.force)
  .checker(StalenessChecker::new().default_excludes(args.default_excludes));

  let runner = ProcessRunner::new().process_group(true);
  let cancel = CancelToken::new();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(async {
    let watcher = spawn_cancel_watcher(cancel.clone(), args.command.timeout());
    let outcome = invocation
      .refresh_with_cancel(
        &artifact,
        &runner,
        Arc::new(LogSink::info(tool.clone())),
        Arc::new(LogSink::error(tool.clone())),
        &cancel,
      )
      .await;
    watcher.abort();
    outcome
  });

  let outcome = match outcome {
    Ok(outcome) => outcome,
    Err(InvokeError::ToolFailed { exit_code, .. }) => {
      if args.output.is_json() {
        print_json(&serde_json::json!({
          "tool": tool,
          "artifact": args.artifact,
          "result": { "outcome": "failed", "exit_code": exit_code },
        }))?;
      } else {
        print_status(Status::Failed, &format!("{} failed with exit code {}", tool, exit_code));
      }
      return Ok(exit_code);
    }
    Err(err) => return Err(err).with_context(|| format!("Failed to regenerate {}", args.artifact.display())),
  };

  if args.output.is_json() {
    print_json(&serde_json::json!({
      "tool": tool,
      "artifact": args.artifact,
      "result": outcome,
    }))?;
    return Ok(0);
  }

  let (status, message) = outcome_summary(&tool, &args.artifact, outcome);
  print_status(status, &message);

  Ok(0)
}
