//! Staleness-gated tool invocation.
//!
//! Binds the staleness checker to the process runner: an artifact whose
//! sources have not changed is skipped, otherwise the tool's command line is
//! built by a caller-supplied function, run, and its exit status judged by the
//! invocation's [`FailurePolicy`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::consts::{ARTIFACT_PLACEHOLDER, ROOT_PLACEHOLDER};
use crate::process::{CancelToken, CommandSpec, OutputSink, ProcessError, ProcessRunner};
use crate::stale::{SourceSet, StaleError, StalenessChecker};

/// Error type returned by command builders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A derived file and the sources it is generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub sources: SourceSet,
  pub path: PathBuf,
}

impl Artifact {
  pub fn new(sources: SourceSet, path: impl Into<PathBuf>) -> Self {
    Self {
      sources,
      path: path.into(),
    }
  }
}

/// How a non-zero exit status is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
  /// The failure is returned as [`InvokeError::ToolFailed`].
  #[default]
  Fatal,
  /// The failure is logged as a warning and the invocation continues.
  Warn,
}

/// What happened to one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  /// The artifact was newer than all its sources; the tool was not run.
  UpToDate,
  /// The tool ran and exited with status 0.
  Regenerated,
  /// The tool failed but the policy tolerates failures.
  FailedTolerated { exit_code: i32 },
}

/// Errors that can occur while refreshing an artifact.
#[derive(Debug, Error)]
pub enum InvokeError {
  #[error("staleness check failed: {0}")]
  Stale(#[from] StaleError),

  #[error("failed to build command line for {tool}: {source}")]
  Arguments {
    tool: String,
    #[source]
    source: BoxError,
  },

  #[error("{tool} could not be run: {source}")]
  Process {
    tool: String,
    #[source]
    source: ProcessError,
  },

  #[error("{tool} failed with exit code {exit_code}")]
  ToolFailed { tool: String, exit_code: i32 },
}

/// One tool integration: how to build its command line and how to judge it.
pub struct ToolInvocation<F> {
  tool: String,
  build_command: F,
  failure_policy: FailurePolicy,
  force: bool,
  checker: StalenessChecker,
}

impl<F> ToolInvocation<F>
where
  F: Fn(&Artifact) -> Result<CommandSpec, BoxError>,
{
  pub fn new(tool: impl Into<String>, build_command: F) -> Self {
    Self {
      tool: tool.into(),
      build_command,
      failure_policy: FailurePolicy::default(),
      force: false,
      checker: StalenessChecker::default(),
    }
  }

  pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
    self.failure_policy = policy;
    self
  }

  /// Run the tool even when the artifact is up to date.
  pub fn force(mut self, force: bool) -> Self {
    self.force = force;
    self
  }

  pub fn checker(mut self, checker: StalenessChecker) -> Self {
    self.checker = checker;
    self
  }

  pub fn tool(&self) -> &str {
    &self.tool
  }

  /// Bring one artifact up to date.
  pub async fn refresh(
    &self,
    artifact: &Artifact,
    runner: &ProcessRunner,
    stdout: Arc<dyn OutputSink>,
    stderr: Arc<dyn OutputSink>,
  ) -> Result<Outcome, InvokeError> {
    self
      .refresh_with_cancel(artifact, runner, stdout, stderr, &CancelToken::new())
      .await
  }

  /// Bring one artifact up to date unless `cancel` fires while the tool runs.
  pub async fn refresh_with_cancel(
    &self,
    artifact: &Artifact,
    runner: &ProcessRunner,
    stdout: Arc<dyn OutputSink>,
    stderr: Arc<dyn OutputSink>,
    cancel: &CancelToken,
  ) -> Result<Outcome, InvokeError> {
    if !self.force && !self.checker.is_stale(&artifact.sources, &artifact.path)? {
      info!(
        tool = %self.tool,
        artifact = %artifact.path.display(),
        "skipping {} as {} is up to date", self.tool, artifact.path.display()
      );
      return Ok(Outcome::UpToDate);
    }

    let spec = (self.build_command)(artifact).map_err(|source| InvokeError::Arguments {
      tool: self.tool.clone(),
      source,
    })?;
    let spec = if spec.name.is_none() { spec.name(self.tool.clone()) } else { spec };

    info!(tool = %self.tool, artifact = %artifact.path.display(), "executing {}", self.tool);

    let result = runner
      .execute_with_cancel(&spec, stdout, stderr, cancel)
      .await
      .map_err(|source| InvokeError::Process {
        tool: self.tool.clone(),
        source,
      })?;

    if result.success() {
      info!(tool = %self.tool, artifact = %artifact.path.display(), "{} succeeded", self.tool);
      return Ok(Outcome::Regenerated);
    }

    match self.failure_policy {
      FailurePolicy::Fatal => Err(InvokeError::ToolFailed {
        tool: self.tool.clone(),
        exit_code: result.exit_code,
      }),
      FailurePolicy::Warn => {
        warn!(
          tool = %self.tool,
          exit_code = result.exit_code,
          "{} failed, continuing as failures are treated as warnings", self.tool
        );
        Ok(Outcome::FailedTolerated {
          exit_code: result.exit_code,
        })
      }
    }
  }

  /// Refresh each artifact in order, stopping at the first error.
  pub async fn refresh_all(
    &self,
    artifacts: &[Artifact],
    runner: &ProcessRunner,
    stdout: Arc<dyn OutputSink>,
    stderr: Arc<dyn OutputSink>,
  ) -> Result<Vec<Outcome>, InvokeError> {
    let mut outcomes = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
      outcomes.push(self.refresh(artifact, runner, stdout.clone(), stderr.clone()).await?);
    }
    Ok(outcomes)
  }
}

/// Replace `{artifact}` and `{root}` in a command-line template argument.
pub fn expand_placeholders(arg: &str, artifact: &Artifact) -> String {
  arg
    .replace(ARTIFACT_PLACEHOLDER, &path_arg(&artifact.path))
    .replace(ROOT_PLACEHOLDER, &path_arg(artifact.sources.root()))
}

fn path_arg(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}
