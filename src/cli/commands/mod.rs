//! Command execution.
//!
//! Maps command results to process exit codes and prints recovery
//! suggestions for failures.

mod previous;
mod release;

use crate::cli::{Args, Command, OutputManager};
use crate::error::Result;

use previous::execute_previous;
use release::execute_release;

/// Execute the command selected by `args`, returning the exit code
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.verbose, args.quiet);

    if let Err(validation_error) = args.validate() {
        output.error(&validation_error.to_string());
        output.suggestions(&validation_error.recovery_suggestions());
        return Ok(1);
    }

    let result = match &args.command {
        Command::Release(release_args) => execute_release(release_args, &output).await,
        Command::Previous(previous_args) => execute_previous(previous_args, &output).await,
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            output.error(&format!("Command '{}' failed: {}", args.command.name(), e));
            output.suggestions(&e.recovery_suggestions());
            Ok(1)
        }
    }
}
