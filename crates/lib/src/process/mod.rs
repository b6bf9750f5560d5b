//! Process execution.
//!
//! This module runs external tools: one command per invocation, both output
//! streams drained concurrently into [`OutputSink`]s, an optional input
//! payload, and a faithful exit status.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use toolrun_lib::process::{CommandSpec, LogSink, ProcessRunner};
//!
//! # async fn run() -> Result<(), toolrun_lib::process::ProcessError> {
//! let spec = CommandSpec::new("cppcheck").arg("--xml").working_dir("src");
//! let result = ProcessRunner::new()
//!   .execute(&spec, Arc::new(LogSink::info("cppcheck")), Arc::new(LogSink::error("cppcheck")))
//!   .await?;
//! assert!(result.success());
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod pump;
pub mod runner;
pub mod sink;
pub mod types;

pub use cancel::CancelToken;
pub use runner::ProcessRunner;
pub use sink::{CaptureSink, LogSink, OutputSink, Severity};
pub use types::{CommandSpec, ExecutionResult, ProcessError, RunState, RunnerOptions, StreamKind};
