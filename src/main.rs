//! Release Action - build-numbered GitHub releases with per-branch state.

use release_action::cli;
use release_action::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Never quiet for fatal errors
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));
            output.suggestions(&e.recovery_suggestions());

            process::exit(1);
        }
    }
}
