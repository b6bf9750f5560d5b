//! Implementation of the `toolrun stale` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use toolrun_lib::stale::{SourceSet, StalenessChecker};

use crate::output::{OutputFormat, print_json, print_status, staleness_summary};

#[derive(Debug, Args)]
pub struct StaleArgs {
  /// Directory the source pattern is matched under
  #[arg(long, value_name = "DIR")]
  root: PathBuf,

  /// Glob selecting the sources, relative to the root (e.g. "**/*.h")
  #[arg(long, value_name = "GLOB")]
  pattern: String,

  /// Ignore version-control and editor scratch files among the sources
  #[arg(long)]
  default_excludes: bool,

  /// Output format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// The derived file to check
  artifact: PathBuf,
}

pub fn cmd_stale(args: StaleArgs) -> Result<i32> {
  let sources = SourceSet::new(&args.root, &args.pattern);
  let stale = StalenessChecker::new()
    .default_excludes(args.default_excludes)
    .is_stale(&sources, &args.artifact)
    .with_context(|| format!("Failed to check {}", args.artifact.display()))?;

  if args.output.is_json() {
    print_json(&serde_json::json!({
      "artifact": args.artifact,
      "root": args.root,
      "pattern": args.pattern,
      "stale": stale,
    }))?;
  } else {
    let (status, message) = staleness_summary(&args.artifact, stale);
    print_status(status, &message);
  }

  Ok(0)
}
