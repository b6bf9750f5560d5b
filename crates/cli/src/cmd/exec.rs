//! Implementation of the `toolrun exec` command.
//!
//! Runs a single command with its standard output logged at INFO and its
//! standard error logged at ERROR, then exits with the command's status.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use toolrun_lib::process::{CancelToken, LogSink, ProcessRunner};

use super::{CommandArgs, spawn_cancel_watcher};
use crate::output::{OutputFormat, print_json, print_status, run_summary};

#[derive(Debug, Args)]
pub struct ExecArgs {
  #[command(flatten)]
  command: CommandArgs,

  /// Output format for the summary
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

/// Execute the exec command, returning the exit status to report.
pub fn cmd_exec(args: ExecArgs) -> Result<i32> {
  let spec = args.command.to_spec()?;
  let name = spec.display_name();

  let runner = ProcessRunner::new().process_group(true);
  let cancel = CancelToken::new();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let started = Instant::now();
  let result = rt.block_on(async {
    let watcher = spawn_cancel_watcher(cancel.clone(), args.command.timeout());
    let result = runner
      .execute_with_cancel(
        &spec,
        Arc::new(LogSink::info(name.clone())),
        Arc::new(LogSink::error(name.clone())),
        &cancel,
      )
      .await;
    watcher.abort();
    result
  });
  let elapsed = started.elapsed();

  let result = result.with_context(|| format!("Failed to run {}", name))?;

  if args.output.is_json() {
    print_json(&serde_json::json!({
      "command": spec,
      "exit_code": result.exit_code,
      "success": result.success(),
      "duration_ms": elapsed.as_millis() as u64,
    }))?;
  } else {
    let (status, message) = run_summary(&name, result.exit_code, elapsed);
    print_status(status, &message);
  }

  Ok(result.exit_code)
}
