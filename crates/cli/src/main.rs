mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{ExecArgs, RegenArgs, StaleArgs};

/// toolrun - run external build tools and regenerate stale artifacts
#[derive(Parser)]
#[command(name = "toolrun")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one command, streaming its output through the log
  Exec(ExecArgs),

  /// Report whether an artifact is older than its sources
  Stale(StaleArgs),

  /// Run a tool only when its artifact is stale
  Regen(RegenArgs),
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  init_tracing(cli.verbose);

  let code = match cli.command {
    Commands::Exec(args) => cmd::cmd_exec(args)?,
    Commands::Stale(args) => cmd::cmd_stale(args)?,
    Commands::Regen(args) => cmd::cmd_regen(args)?,
  };

  if code != 0 {
    std::process::exit(code);
  }
  Ok(())
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();
}
