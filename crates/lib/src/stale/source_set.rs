//! Source sets: a root directory plus one inclusion glob.
//!
//! Patterns are matched against paths relative to the root. `*` stays within
//! one directory level and `**` crosses levels, so `*.h` only matches headers
//! directly under the root while `**/*.h` matches them at any depth.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use super::StaleError;

/// Directory names skipped entirely when default excludes are on.
const DEFAULT_EXCLUDED_DIRS: &[&str] = &[".git", ".svn", ".hg", ".bzr", "CVS", "SCCS", "_darcs"];

/// File name patterns skipped when default excludes are on.
const DEFAULT_EXCLUDED_FILES: &[&str] = &[
  "*~",
  "#*#",
  ".#*",
  "%*%",
  "._*",
  ".DS_Store",
  ".cvsignore",
  ".gitignore",
  ".gitattributes",
  ".hgignore",
  "vssver.scc",
];

/// Candidate inputs of one artifact, resolved lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
  root: PathBuf,
  pattern: String,
}

impl SourceSet {
  pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
    Self {
      root: root.into(),
      pattern: pattern.into(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn pattern(&self) -> &str {
    &self.pattern
  }

  /// Resolve to every file the pattern matches.
  pub fn resolve(&self) -> Result<Vec<PathBuf>, StaleError> {
    self.resolve_with(false)
  }

  /// Resolve to the matching files, optionally skipping version-control and
  /// editor scratch files. A root that does not exist yields an empty set.
  /// Broken symlinks and symlink loops are skipped. Order is unspecified.
  pub fn resolve_with(&self, default_excludes: bool) -> Result<Vec<PathBuf>, StaleError> {
    let matcher = compile(&self.pattern)?;

    if !self.root.is_dir() {
      debug!(root = %self.root.display(), "source root does not exist, no sources matched");
      return Ok(Vec::new());
    }

    let excluded_files = if default_excludes {
      Some(default_file_excludes()?)
    } else {
      None
    };

    let walker = WalkDir::new(&self.root)
      .follow_links(true)
      .into_iter()
      .filter_entry(|entry| {
        !(default_excludes && entry.depth() > 0 && entry.file_type().is_dir() && is_excluded_dir(entry.file_name()))
      });

    let mut matched = Vec::new();
    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(err) if is_skippable(&err) => {
          debug!(path = ?err.path(), error = %err, "skipping unreadable link");
          continue;
        }
        Err(source) => {
          return Err(StaleError::Walk {
            root: self.root.clone(),
            source,
          });
        }
      };

      if !entry.file_type().is_file() {
        continue;
      }

      if let Some(excluded) = &excluded_files
        && excluded.is_match(entry.file_name())
      {
        continue;
      }

      let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
      if matcher.is_match(relative) {
        matched.push(entry.into_path());
      }
    }

    debug!(
      root = %self.root.display(),
      pattern = %self.pattern,
      count = matched.len(),
      "resolved source set"
    );
    Ok(matched)
  }
}

fn compile(pattern: &str) -> Result<GlobMatcher, StaleError> {
  GlobBuilder::new(pattern)
    .literal_separator(true)
    .build()
    .map(|glob| glob.compile_matcher())
    .map_err(|source| StaleError::Pattern {
      pattern: pattern.to_string(),
      source,
    })
}

fn default_file_excludes() -> Result<GlobSet, StaleError> {
  let mut builder = GlobSetBuilder::new();
  for pattern in DEFAULT_EXCLUDED_FILES {
    builder.add(Glob::new(pattern).map_err(|source| StaleError::Pattern {
      pattern: pattern.to_string(),
      source,
    })?);
  }
  builder.build().map_err(|source| StaleError::Pattern {
    pattern: DEFAULT_EXCLUDED_FILES.join(","),
    source,
  })
}

/// Dangling links and link cycles are neither files nor directories, so they
/// cannot be sources.
fn is_skippable(err: &walkdir::Error) -> bool {
  if err.loop_ancestor().is_some() {
    return true;
  }
  err.depth() > 0 && err.io_error().is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

fn is_excluded_dir(name: &OsStr) -> bool {
  DEFAULT_EXCLUDED_DIRS.iter().any(|excluded| name == OsStr::new(excluded))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeSet;
  use tempfile::TempDir;

  fn write(root: &Path, relative: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "").unwrap();
  }

  fn resolved(set: &SourceSet, default_excludes: bool) -> BTreeSet<String> {
    set
      .resolve_with(default_excludes)
      .unwrap()
      .into_iter()
      .map(|p| {
        p.strip_prefix(set.root())
          .unwrap()
          .to_string_lossy()
          .replace('\\', "/")
      })
      .collect()
  }

  fn resolved_default(set: &SourceSet) -> BTreeSet<String> {
    resolved(set, false)
  }

  fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn single_star_stays_in_root() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.h");
    write(temp.path(), "b.cpp");
    write(temp.path(), "nested/c.h");

    let set = SourceSet::new(temp.path(), "*.h");
    assert_eq!(resolved(&set, true), names(&["a.h"]));
  }

  #[test]
  fn double_star_crosses_directories() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.h");
    write(temp.path(), "nested/deeper/c.h");
    write(temp.path(), "nested/d.cpp");

    let set = SourceSet::new(temp.path(), "**/*.h");
    assert_eq!(resolved(&set, true), names(&["a.h", "nested/deeper/c.h"]));
  }

  #[test]
  fn directories_are_never_matched() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("looks_like.h")).unwrap();

    let set = SourceSet::new(temp.path(), "*.h");
    assert!(resolved(&set, true).is_empty());
  }

  #[test]
  fn default_excludes_skip_vcs_and_scratch_files() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "real.h");
    write(temp.path(), ".git/objects/x.h");
    write(temp.path(), "CVS/y.h");
    write(temp.path(), "real.h~");
    write(temp.path(), ".#real.h");

    let set = SourceSet::new(temp.path(), "**/*.h*");
    assert_eq!(resolved(&set, true), names(&["real.h"]));
    assert_eq!(
      resolved(&set, false),
      names(&["real.h", ".git/objects/x.h", "CVS/y.h", "real.h~", ".#real.h"])
    );
  }

  #[test]
  fn missing_root_resolves_to_nothing() {
    let temp = TempDir::new().unwrap();
    let set = SourceSet::new(temp.path().join("missing"), "*.h");
    assert!(set.resolve().unwrap().is_empty());
  }

  #[test]
  fn default_excludes_are_off_for_resolve() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "CVS/Entries.h");
    write(temp.path(), ".gitignore");

    assert_eq!(
      resolved_default(&SourceSet::new(temp.path(), "**/*.h")),
      names(&["CVS/Entries.h"])
    );
    assert_eq!(resolved_default(&SourceSet::new(temp.path(), ".gitignore")), names(&[".gitignore"]));
  }

  #[cfg(unix)]
  #[test]
  fn dangling_symlink_is_skipped() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "spec.h");
    std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("stale-link")).unwrap();
    std::os::unix::fs::symlink(temp.path().join("gone.h"), temp.path().join("dangling.h")).unwrap();

    let set = SourceSet::new(temp.path(), "*.h");
    assert_eq!(resolved_default(&set), names(&["spec.h"]));
  }

  #[cfg(unix)]
  #[test]
  fn symlink_loop_is_skipped() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "nested/spec.h");
    std::os::unix::fs::symlink(temp.path(), temp.path().join("nested/back")).unwrap();

    let set = SourceSet::new(temp.path(), "**/*.h");
    assert_eq!(resolved_default(&set), names(&["nested/spec.h"]));
  }

  #[cfg(unix)]
  #[test]
  fn symlinked_file_is_followed() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "real/spec.h");
    std::os::unix::fs::symlink(temp.path().join("real/spec.h"), temp.path().join("linked.h")).unwrap();

    let set = SourceSet::new(temp.path(), "*.h");
    assert_eq!(resolved_default(&set), names(&["linked.h"]));
  }

  #[test]
  fn invalid_pattern_is_an_error() {
    let temp = TempDir::new().unwrap();
    let set = SourceSet::new(temp.path(), "[unclosed");
    assert!(matches!(set.resolve(), Err(StaleError::Pattern { .. })));
  }
}
