//! Test helpers for spawning cross-platform shell commands.

pub mod testutil;
