//! Command line interface for release_action.
//!
//! Parses arguments and workflow inputs, runs the selected command and
//! reports progress with colored output.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, PreviousArgs, ReleaseArgs};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
