//! Test utilities for toolrun-lib.
//!
//! This module provides cross-platform helpers for tests that need to spawn
//! shell commands or use platform-specific binaries.

use crate::process::CommandSpec;

/// Returns a command that runs a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> CommandSpec {
  CommandSpec::new("/bin/sh").arg("-c").arg(script)
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> CommandSpec {
  CommandSpec::new("cmd.exe").arg("/C").arg(script)
}

/// Returns a command that echoes an environment variable.
///
/// Since environment variable expansion requires a shell, this wraps the
/// echo in the platform shell.
#[cfg(unix)]
pub fn shell_echo_env(var: &str) -> CommandSpec {
  shell_cmd(&format!("echo \"${}\"", var))
}

#[cfg(windows)]
pub fn shell_echo_env(var: &str) -> CommandSpec {
  shell_cmd(&format!("echo %{}%", var))
}

/// Returns a command that creates a marker file in the current directory.
#[cfg(unix)]
pub fn touch_file(filename: &str) -> CommandSpec {
  CommandSpec::new("/usr/bin/touch").arg(filename)
}

#[cfg(windows)]
pub fn touch_file(filename: &str) -> CommandSpec {
  // Use PowerShell to create an empty file - more reliable than cmd.exe approaches
  CommandSpec::new("powershell.exe").arg("-NoProfile").arg("-Command").arg(format!(
    "New-Item -ItemType File -Path '{}' -Force | Out-Null",
    filename
  ))
}

/// Returns a command that copies its standard input to standard output.
#[cfg(unix)]
pub fn cat_stdin() -> CommandSpec {
  CommandSpec::new("/bin/cat")
}

#[cfg(windows)]
pub fn cat_stdin() -> CommandSpec {
  CommandSpec::new("findstr.exe").arg("^")
}

/// Returns a command that exits with the given status and prints nothing.
pub fn exit_with(code: i32) -> CommandSpec {
  shell_cmd(&format!("exit {}", code))
}
