//! CLI smoke tests for toolrun.
//!
//! These tests verify that all CLI commands run without panicking and
//! return appropriate exit codes.

use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the toolrun binary.
fn toolrun_cmd() -> Command {
  cargo_bin_cmd!("toolrun")
}

fn write_at(path: &Path, time: SystemTime) {
  std::fs::write(path, "content").unwrap();
  File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
}

/// A source tree with `spec.h` and a `runner.cpp` newer than it.
fn fresh_tree() -> TempDir {
  let temp = TempDir::new().unwrap();
  let now = SystemTime::now();
  write_at(&temp.path().join("spec.h"), now - Duration::from_secs(60));
  write_at(&temp.path().join("runner.cpp"), now);
  temp
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  toolrun_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  toolrun_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("toolrun"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["exec", "stale", "regen"] {
    toolrun_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// exec
// =============================================================================

#[test]
fn exec_requires_a_command() {
  toolrun_cmd().arg("exec").assert().failure();
}

#[cfg(unix)]
#[test]
fn exec_logs_tool_output() {
  toolrun_cmd()
    .args(["exec", "--", "/bin/sh", "-c", "echo to-stdout; echo to-stderr >&2"])
    .env("NO_COLOR", "1")
    .assert()
    .success()
    .stderr(predicate::str::contains("to-stdout"))
    .stderr(predicate::str::contains("to-stderr"))
    .stderr(predicate::str::contains("ERROR"));
}

#[cfg(unix)]
#[test]
fn exec_propagates_exit_code() {
  toolrun_cmd()
    .args(["exec", "--", "/bin/sh", "-c", "exit 3"])
    .assert()
    .code(3)
    .stderr(predicate::str::contains("exited with code 3"));
}

#[cfg(unix)]
#[test]
fn exec_passes_env_and_stdin() {
  toolrun_cmd()
    .args([
      "exec",
      "-e",
      "GREETING=hello",
      "--stdin",
      "from-stdin",
      "--",
      "/bin/sh",
      "-c",
      "echo \"$GREETING\"; cat",
    ])
    .assert()
    .success()
    .stderr(predicate::str::contains("hello"))
    .stderr(predicate::str::contains("from-stdin"));
}

#[cfg(unix)]
#[test]
fn exec_runs_in_cwd() {
  let temp = TempDir::new().unwrap();

  toolrun_cmd()
    .arg("exec")
    .arg("--cwd")
    .arg(temp.path())
    .args(["--", "/usr/bin/touch", "marker"])
    .assert()
    .success();

  assert!(temp.path().join("marker").exists());
}

#[test]
fn exec_missing_program_fails() {
  toolrun_cmd()
    .args(["exec", "--", "definitely-not-a-real-program-xyz"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("definitely-not-a-real-program-xyz"));
}

#[cfg(unix)]
#[test]
fn exec_json_summary() {
  toolrun_cmd()
    .args(["exec", "-o", "json", "--", "/bin/sh", "-c", "exit 0"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"exit_code\": 0"))
    .stdout(predicate::str::contains("\"success\": true"));
}

#[cfg(unix)]
#[test]
fn exec_timeout_stops_command() {
  toolrun_cmd()
    .args(["exec", "--timeout", "200ms", "--", "/bin/sh", "-c", "sleep 30"])
    .timeout(Duration::from_secs(20))
    .assert()
    .failure()
    .stderr(predicate::str::contains("timed out"));
}

#[test]
fn exec_rejects_bad_env_pair() {
  toolrun_cmd()
    .args(["exec", "-e", "NOEQUALS", "--", "true"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("KEY=VALUE"));
}

// =============================================================================
// stale
// =============================================================================

#[test]
fn stale_reports_missing_artifact() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("spec.h"), "").unwrap();

  toolrun_cmd()
    .arg("stale")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "*.h"])
    .arg(temp.path().join("runner.cpp"))
    .assert()
    .success()
    .stderr(predicate::str::contains("is stale"));
}

#[test]
fn stale_reports_fresh_artifact() {
  let temp = fresh_tree();

  toolrun_cmd()
    .arg("stale")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "*.h"])
    .arg(temp.path().join("runner.cpp"))
    .assert()
    .success()
    .stdout(predicate::str::contains("is up to date"));
}

#[test]
fn stale_json_output() {
  let temp = fresh_tree();
  write_at(&temp.path().join("spec.h"), SystemTime::now() + Duration::from_secs(60));

  toolrun_cmd()
    .arg("stale")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "*.h", "-o", "json"])
    .arg(temp.path().join("runner.cpp"))
    .assert()
    .success()
    .stdout(predicate::str::contains("\"stale\": true"));
}

#[test]
fn stale_default_excludes_are_opt_in() {
  let temp = fresh_tree();
  std::fs::create_dir(temp.path().join("CVS")).unwrap();
  write_at(
    &temp.path().join("CVS/Entries.h"),
    SystemTime::now() + Duration::from_secs(60),
  );

  toolrun_cmd()
    .arg("stale")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "**/*.h"])
    .arg(temp.path().join("runner.cpp"))
    .assert()
    .success()
    .stderr(predicate::str::contains("is stale"));

  toolrun_cmd()
    .arg("stale")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "**/*.h", "--default-excludes"])
    .arg(temp.path().join("runner.cpp"))
    .assert()
    .success()
    .stdout(predicate::str::contains("is up to date"));
}

#[test]
fn stale_invalid_pattern_fails() {
  let temp = fresh_tree();

  toolrun_cmd()
    .arg("stale")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "[unclosed"])
    .arg(temp.path().join("runner.cpp"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid source pattern"));
}

// =============================================================================
// regen
// =============================================================================

#[cfg(unix)]
#[test]
fn regen_creates_missing_artifact() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("spec.h"), "").unwrap();
  let artifact = temp.path().join("runner.cpp");

  toolrun_cmd()
    .arg("regen")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "*.h"])
    .arg("--artifact")
    .arg(&artifact)
    .args(["--", "/usr/bin/touch", "{artifact}"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Regenerated"));

  assert!(artifact.exists());
}

#[cfg(unix)]
#[test]
fn regen_skips_fresh_artifact() {
  let temp = fresh_tree();
  let marker = temp.path().join("ran");

  toolrun_cmd()
    .arg("regen")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "*.h"])
    .arg("--artifact")
    .arg(temp.path().join("runner.cpp"))
    .arg("--")
    .arg("/usr/bin/touch")
    .arg(&marker)
    .assert()
    .success()
    .stdout(predicate::str::contains("is up to date"))
    .stderr(predicate::str::contains("skipping touch as"));

  assert!(!marker.exists());
}

#[cfg(unix)]
#[test]
fn regen_force_runs_fresh_artifact() {
  let temp = fresh_tree();
  let marker = temp.path().join("ran");

  toolrun_cmd()
    .arg("regen")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "*.h", "--force"])
    .arg("--artifact")
    .arg(temp.path().join("runner.cpp"))
    .arg("--")
    .arg("/usr/bin/touch")
    .arg(&marker)
    .assert()
    .success();

  assert!(marker.exists());
}

#[cfg(unix)]
#[test]
fn regen_failure_is_fatal_by_default() {
  let temp = TempDir::new().unwrap();

  toolrun_cmd()
    .arg("regen")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "*.h"])
    .arg("--artifact")
    .arg(temp.path().join("report.xml"))
    .args(["--", "/bin/sh", "-c", "exit 2"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("failed with exit code 2"));
}

#[cfg(unix)]
#[test]
fn regen_warn_only_tolerates_failure() {
  let temp = TempDir::new().unwrap();

  toolrun_cmd()
    .arg("regen")
    .arg("--root")
    .arg(temp.path())
    .args(["--pattern", "*.h", "--warn-only"])
    .arg("--artifact")
    .arg(temp.path().join("report.xml"))
    .args(["--", "/bin/sh", "-c", "exit 2"])
    .assert()
    .success()
    .stderr(predicate::str::contains("may be out of date"));
}
