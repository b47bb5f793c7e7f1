//! `previous` command: report the last release recorded for a branch.

use crate::cli::{OutputManager, PreviousArgs};
use crate::config::{EnvConfig, RepoRef, branch_from_ref};
use crate::error::{ConfigError, Result};
use crate::forge::{GitHubClient, GitHubConfig};
use crate::orchestrator::StepOutputs;
use crate::state::{BranchStateMap, PreviousRelease, ReleaseStateStore, StateConfig};
use std::path::PathBuf;

pub(super) async fn execute_previous(args: &PreviousArgs, output: &OutputManager) -> Result<i32> {
    let env = EnvConfig::from_process();
    let branch = resolve_branch(args, &env)?;

    let previous = match &args.data {
        Some(data) => PreviousRelease::lookup(&BranchStateMap::parse("data", data)?, &branch)?,
        None => {
            let repo = RepoRef::from_env(&env)?;
            let client = GitHubClient::new(GitHubConfig::from_env(&env, &repo.owner, &repo.repo)?)?;
            ReleaseStateStore::new(&client, StateConfig::from_env(&env))
                .previous(&branch)
                .await?
        }
    };

    output.success(&format!(
        "Previous release on {}: {} at {}",
        branch, previous.release, previous.commit
    ));

    let mut outputs = StepOutputs::new();
    outputs.set("previousCommit", previous.commit.clone());
    outputs.set("previousRelease", previous.release.clone());
    if let Some(next) = previous.next_release {
        outputs.set("currentRelease", next.to_string());
    }
    outputs.write(env.get("GITHUB_OUTPUT").map(PathBuf::from).as_deref())?;

    Ok(0)
}

fn resolve_branch(args: &PreviousArgs, env: &EnvConfig) -> Result<String> {
    if let Some(branch) = &args.branch {
        return Ok(branch.trim().to_string());
    }

    env.get("GITHUB_REF_NAME")
        .or_else(|| env.get("GITHUB_REF").map(|r| branch_from_ref(&r).to_string()))
        .ok_or_else(|| {
            ConfigError::MissingEnv {
                name: "GITHUB_REF_NAME".to_string(),
            }
            .into()
        })
}
