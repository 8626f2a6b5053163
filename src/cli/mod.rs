//! Line-oriented command shell over a [`Session`](crate::session::Session).
//!
//! Each input line is split with shell quoting rules; the first word names the command.
//! Failures are reported inline and the shell keeps reading.

pub mod commands;
pub mod context;
pub mod output;
pub mod shell;

pub use context::{CommandError, LoopControl, ShellContext};
pub use shell::{run_cli, run_script, RunSummary};

#[cfg(test)]
mod tests;
