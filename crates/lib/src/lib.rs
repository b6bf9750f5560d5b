//! toolrun-lib: Core execution primitives for driving native build tools
//!
//! This crate provides the building blocks every tool integration uses:
//! - `process`: run one external command, stream its output into sinks, report its exit status
//! - `stale`: decide from modification times whether a derived artifact must be regenerated
//! - `invoke`: the glue that skips fresh artifacts and runs the tool for stale ones

pub mod consts;
pub mod invoke;
pub mod process;
pub mod stale;

#[cfg(test)]
mod util;
