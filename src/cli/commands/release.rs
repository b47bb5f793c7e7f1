//! `release` command: run the release pipeline for the current commit.

use crate::cli::{OutputManager, ReleaseArgs};
use crate::config::{EnvConfig, RunContext};
use crate::error::Result;
use crate::forge::{GitHubClient, GitHubConfig, NotifySink};
use crate::orchestrator::{ReleaseOrchestrator, ReleaseOutcome};
use crate::state::StateConfig;
use std::path::PathBuf;

pub(super) async fn execute_release(args: &ReleaseArgs, output: &OutputManager) -> Result<i32> {
    let env = EnvConfig::from_process();
    let inputs = args.to_inputs()?;
    let context = RunContext::from_env(&env)?;

    let client = GitHubClient::new(GitHubConfig::from_env(
        &env,
        &context.repo.owner,
        &context.repo.repo,
    )?)?;

    let default_branch = match client.default_branch().await {
        Ok(branch) => branch,
        Err(e) => {
            log::warn!(
                "Could not read default branch of {}: {}; assuming {}",
                context.repo.full_name(),
                e,
                context.branch
            );
            context.branch.clone()
        }
    };

    let workflow_succeeded = match context.run_id {
        Some(run_id) => client.workflow_succeeded(run_id).await.unwrap_or_else(|e| {
            log::warn!("Could not read status of run {}: {}; assuming success", run_id, e);
            true
        }),
        None => true,
    };
    log::info!(
        "Workflow status is: {}",
        if workflow_succeeded { "success" } else { "failure" }
    );

    let context = context
        .with_default_branch(default_branch)
        .with_workflow_status(workflow_succeeded);
    let notifier = NotifySink::from_url(args.webhook().as_deref());

    output.section(&format!(
        "Releasing {} on {}",
        context.repo.full_name(),
        context.branch
    ));

    let outcome = ReleaseOrchestrator::new(&client, &client, &notifier, context, inputs)
        .with_state_config(StateConfig::from_env(&env))
        .run()
        .await?;

    report(&outcome, output);
    outcome
        .outputs()
        .write(env.get("GITHUB_OUTPUT").map(PathBuf::from).as_deref())?;

    if let Some(e) = &outcome.state_error {
        output.error(&e.to_string());
        output.suggestions(&e.recovery_suggestions());
        return Ok(1);
    }

    Ok(0)
}

fn report(outcome: &ReleaseOutcome, output: &OutputManager) {
    output.info(&format!("Tag {} ({})", outcome.tag, outcome.name));
    output.indent(&format!(
        "{} change(s){}",
        outcome.changes.len(),
        match outcome.changes.truncated() {
            0 => String::new(),
            n => format!(", {} more not listed", n),
        }
    ));
    if let Some(diagnostic) = &outcome.change_diagnostic {
        output.warn(&format!("Changelog is empty: {}", diagnostic));
    }

    match &outcome.release {
        Some(release) => output.success(&format!("Release created: {}", release.html_url)),
        None => output.info("Release creation disabled"),
    }
    for (key, artifact) in &outcome.downloads {
        output.indent(&format!("{} → {} (sha256 {})", key, artifact.name, artifact.content_hash));
    }
    if let Some(path) = &outcome.metadata_path {
        output.indent(&format!("Metadata saved to {}", path.display()));
    }
    if let Some(state) = &outcome.state {
        output.success(&state.format_result());
    }
}
