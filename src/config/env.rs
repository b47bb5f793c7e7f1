//! Environment snapshot and run identity.

use crate::error::{ConfigError, Result};
use std::collections::HashMap;

/// Snapshot of the process environment taken once at startup.
///
/// Components read variables through this instead of `std::env` so tests can
/// supply their own values.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    vars: HashMap<String, String>,
}

impl EnvConfig {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a non-empty variable
    pub fn get(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Get a variable that must be present
    pub fn require(&self, name: &str) -> Result<String> {
        self.get(name).ok_or_else(|| {
            ConfigError::MissingEnv {
                name: name.to_string(),
            }
            .into()
        })
    }
}

/// Repository the run belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Web base URL of the forge (e.g. `https://github.com`)
    pub server_url: String,
}

impl RepoRef {
    /// Read `GITHUB_REPOSITORY` and `GITHUB_SERVER_URL`
    pub fn from_env(env: &EnvConfig) -> Result<Self> {
        let repository = env.require("GITHUB_REPOSITORY")?;
        let (owner, repo) = repository.split_once('/').ok_or_else(|| ConfigError::InvalidInput {
            name: "GITHUB_REPOSITORY".to_string(),
            value: repository.clone(),
            reason: "expected owner/repo".to_string(),
        })?;

        let server_url = env
            .get("GITHUB_SERVER_URL")
            .unwrap_or_else(|| "https://github.com".to_string());

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Browser URL of a single commit
    pub fn commit_url(&self, sha: &str) -> String {
        format!("{}/{}/{}/commit/{}", self.server_url, self.owner, self.repo, sha)
    }

    /// Browser URL comparing two revisions
    pub fn compare_url(&self, base: &str, head: &str) -> String {
        format!(
            "{}/{}/{}/compare/{}...{}",
            self.server_url, self.owner, self.repo, base, head
        )
    }
}

/// Identity of the pipeline run, read from the environment
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Repository being released
    pub repo: RepoRef,
    /// Branch the run executes on
    pub branch: String,
    /// Repository default branch
    pub default_branch: String,
    /// Commit being released
    pub head_commit: String,
    /// Monotonic run counter supplied by the pipeline
    pub run_number: Option<u64>,
    /// Identifier of the current workflow run
    pub run_id: Option<u64>,
    /// Whether every job step so far in this run succeeded
    pub workflow_succeeded: bool,
}

impl RunContext {
    /// Read run identity from the environment.
    ///
    /// `GITHUB_REPOSITORY`, `GITHUB_REF` and `GITHUB_SHA` are required. The
    /// default branch is not known from the environment; it starts out equal
    /// to the current branch until [`RunContext::with_default_branch`] is applied.
    pub fn from_env(env: &EnvConfig) -> Result<Self> {
        let repo = RepoRef::from_env(env)?;
        let git_ref = env.require("GITHUB_REF")?;
        let head_commit = env.require("GITHUB_SHA")?;
        let branch = branch_from_ref(&git_ref).to_string();

        log::info!("Using repo {} on branch {}", repo.full_name(), branch);

        Ok(Self {
            repo,
            default_branch: branch.clone(),
            branch,
            head_commit,
            run_number: env.get("GITHUB_RUN_NUMBER").and_then(|v| v.parse().ok()),
            run_id: env.get("GITHUB_RUN_ID").and_then(|v| v.parse().ok()),
            workflow_succeeded: true,
        })
    }

    /// Set the repository default branch
    pub fn with_default_branch(mut self, default_branch: impl Into<String>) -> Self {
        self.default_branch = default_branch.into();
        self
    }

    /// Record the workflow status observed before releasing
    pub fn with_workflow_status(mut self, succeeded: bool) -> Self {
        self.workflow_succeeded = succeeded;
        self
    }

    /// Whether this run is on the repository default branch
    pub fn on_default_branch(&self) -> bool {
        self.branch == self.default_branch
    }
}

/// Branch name of a `refs/heads/...` ref; other refs are returned unchanged
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix("refs/heads/").unwrap_or(git_ref)
}
