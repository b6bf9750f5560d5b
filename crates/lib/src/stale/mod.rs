//! Staleness checking.
//!
//! Decides from modification times whether a derived artifact must be
//! regenerated. An artifact is stale when it does not exist or when any of
//! its matched sources was modified strictly after it. An empty source set
//! never makes an artifact stale.
//!
//! Only timestamps are compared. Clock skew or a touch without a change can
//! give the wrong answer; that is accepted in exchange for a check that costs
//! one `stat` per source.

pub mod source_set;

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::debug;

pub use source_set::SourceSet;

/// Errors that can occur while checking staleness.
#[derive(Debug, Error)]
pub enum StaleError {
  /// The inclusion pattern is not a valid glob.
  #[error("invalid source pattern {pattern}: {source}")]
  Pattern {
    pattern: String,
    #[source]
    source: globset::Error,
  },

  /// Walking the source root failed.
  #[error("failed to scan sources under {}: {source}", root.display())]
  Walk {
    root: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  /// A file's modification time could not be read.
  #[error("failed to read modification time of {}: {source}", path.display())]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Compares an artifact's modification time against its sources.
#[derive(Debug, Clone, Default)]
pub struct StalenessChecker {
  default_excludes: bool,
}


impl StalenessChecker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether version-control and editor scratch files are ignored when
  /// resolving sources. Off by default, so every file the pattern matches
  /// counts.
  pub fn default_excludes(mut self, enabled: bool) -> Self {
    self.default_excludes = enabled;
    self
  }

  /// Returns true when `artifact` is missing or older than any matched source.
  ///
  /// A missing artifact is reported stale without resolving the sources.
  pub fn is_stale(&self, sources: &SourceSet, artifact: &Path) -> Result<bool, StaleError> {
    let artifact_modified = match modified(artifact) {
      Ok(time) => time,
      Err(err) if err.kind() == io::ErrorKind::NotFound => {
        debug!(artifact = %artifact.display(), "artifact does not exist");
        return Ok(true);
      }
      Err(source) => {
        return Err(StaleError::Metadata {
          path: artifact.to_path_buf(),
          source,
        });
      }
    };

    debug!(
      artifact = %artifact.display(),
      modified = %humantime::format_rfc3339_millis(artifact_modified),
      "artifact last modified"
    );

    for source in sources.resolve_with(self.default_excludes)? {
      let source_modified = modified(&source).map_err(|err| StaleError::Metadata {
        path: source.clone(),
        source: err,
      })?;

      debug!(
        source = %source.display(),
        modified = %humantime::format_rfc3339_millis(source_modified),
        "source last modified"
      );

      if source_modified > artifact_modified {
        debug!(source = %source.display(), artifact = %artifact.display(), "source is newer than artifact");
        return Ok(true);
      }
    }

    Ok(false)
  }
}

/// Check staleness with the default checker.
pub fn is_stale(sources: &SourceSet, artifact: &Path) -> Result<bool, StaleError> {
  StalenessChecker::default().is_stale(sources, artifact)
}

fn modified(path: &Path) -> io::Result<SystemTime> {
  std::fs::metadata(path)?.modified()
}
