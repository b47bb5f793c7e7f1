//! Read-modify-write-verify persistence of branch state.
//!
//! The backing [`VariableStore`] is eventually consistent, so a write only
//! counts once a later read returns exactly what was written.

use super::branch_state::{BranchState, BranchStateMap, PreviousRelease};
use crate::config::EnvConfig;
use crate::error::{Result, StateError};
use crate::forge::VariableStore;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, Instant};

/// Variable holding the branch state mapping
pub const STATE_KEY: &str = "releaseAction_prevRelease";

/// Configuration for branch state persistence
#[derive(Debug, Clone)]
pub struct StateConfig {
    /// Variable holding the mapping
    pub key: String,
    /// Write/verify attempts before giving up
    pub max_attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            key: STATE_KEY.to_string(),
            max_attempts: 10,
            backoff: Duration::from_secs(5),
        }
    }
}

impl StateConfig {
    /// Parse a count from the environment, clamped to `[1, max]`
    fn parse_env(env: &EnvConfig, var_name: &str, default: u64, max: u64) -> u64 {
        env.get(var_name)
            .and_then(|s| s.parse::<u64>().ok())
            .map(|v| v.clamp(1, max))
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env(env: &EnvConfig) -> Self {
        let defaults = Self::default();
        let max_attempts = Self::parse_env(env, "RELEASE_ACTION_STATE_ATTEMPTS", 10, 30);
        let backoff = Self::parse_env(env, "RELEASE_ACTION_STATE_BACKOFF_SECS", 5, 60);

        Self {
            max_attempts: u32::try_from(max_attempts).unwrap_or(defaults.max_attempts),
            backoff: Duration::from_secs(backoff),
            ..defaults
        }
    }
}

/// Result of loading a branch's state
#[derive(Debug, Clone)]
pub struct LoadStateResult {
    /// State of the branch, if it has been released before
    pub state: Option<BranchState>,
    /// Whether the mapping had to be created
    pub created: bool,
    /// Problems found while loading
    pub warnings: Vec<String>,
}

impl LoadStateResult {
    /// Format load result for display
    pub fn format_result(&self) -> String {
        let mut result = match (&self.state, self.created) {
            (_, true) => "Branch state created".to_string(),
            (Some(state), false) => format!(
                "Previous release {} at {}",
                state.last_tag_base, state.last_commit
            ),
            (None, false) => "No previous release on this branch".to_string(),
        };

        if !self.warnings.is_empty() {
            result.push_str(&format!(" ({} warnings)", self.warnings.len()));
        }

        result
    }
}

/// Result of a verified branch state write
#[derive(Debug, Clone)]
pub struct CommitStateResult {
    /// State now recorded for the branch
    pub state: BranchState,
    /// Attempts used, starting at 1
    pub attempts: u32,
    /// Time spent including pauses
    pub duration: Duration,
}

impl CommitStateResult {
    /// Format commit result for display
    pub fn format_result(&self) -> String {
        format!(
            "Branch state saved: {} at {} ({} attempt(s), {:.1}s)",
            self.state.last_tag_base,
            self.state.last_commit,
            self.attempts,
            self.duration.as_secs_f64()
        )
    }
}

/// Branch state persisted in a [`VariableStore`]
pub struct ReleaseStateStore<'a, S> {
    store: &'a S,
    config: StateConfig,
    /// Set once this instance has created the variable; later misses are
    /// read lag, not absence
    created: AtomicBool,
}

impl<'a, S: VariableStore> ReleaseStateStore<'a, S> {
    /// Create a state store over `store`
    pub fn new(store: &'a S, config: StateConfig) -> Self {
        Self {
            store,
            config,
            created: AtomicBool::new(false),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Read the mapping, creating it empty when absent.
    ///
    /// A corrupted value is treated as empty and reported as a warning. A
    /// variable this instance already created is never created twice.
    async fn read_map(&self) -> Result<(BranchStateMap, bool, Option<String>)> {
        let key = &self.config.key;
        let Some(raw) = self.store.get(key).await? else {
            if self.created.load(Ordering::Relaxed) {
                log::debug!("Variable {} not visible yet, treating it as empty", key);
                return Ok((BranchStateMap::default(), false, None));
            }
            log::info!("Variable {} not found, creating it", key);
            self.store.create(key, "{}").await?;
            self.created.store(true, Ordering::Relaxed);
            return Ok((BranchStateMap::default(), true, None));
        };

        match BranchStateMap::parse(key, &raw) {
            Ok(map) => Ok((map, false, None)),
            Err(e) => {
                log::warn!("{}; treating it as empty", e);
                Ok((BranchStateMap::default(), false, Some(e.to_string())))
            }
        }
    }

    /// State recorded for `branch`
    pub async fn load(&self, branch: &str) -> Result<LoadStateResult> {
        let (map, created, warning) = self.read_map().await?;
        let state = map.get(branch).cloned();

        match &state {
            Some(s) => log::info!(
                "Found previous release for {}: commit {} tag base {}",
                branch,
                s.last_commit,
                s.last_tag_base
            ),
            None => log::info!("No previous release recorded for {}", branch),
        }

        Ok(LoadStateResult {
            state,
            created,
            warnings: warning.into_iter().collect(),
        })
    }

    /// Previous release of `branch`; an error when none is recorded.
    ///
    /// Read only: a missing mapping is not created and a corrupted one is an error.
    pub async fn previous(&self, branch: &str) -> Result<PreviousRelease> {
        let key = &self.config.key;
        let map = match self.store.get(key).await? {
            Some(raw) => BranchStateMap::parse(key, &raw)?,
            None => BranchStateMap::default(),
        };
        PreviousRelease::lookup(&map, branch)
    }

    /// Record `{commit, base}` for `branch` and verify it reads back.
    ///
    /// Pauses `backoff` between attempts, never before the first or after the
    /// last. Fails with [`StateError::VerificationFailed`] once
    /// `max_attempts` attempts have not read back equal.
    pub async fn commit(&self, branch: &str, commit: &str, base: &str) -> Result<CommitStateResult> {
        let desired = BranchState::new(commit, base);
        let start = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.write_and_verify(branch, &desired).await {
                Ok(true) => {
                    log::info!(
                        "Stored branch state for {} in {} on attempt {}",
                        branch,
                        self.config.key,
                        attempt
                    );
                    return Ok(CommitStateResult {
                        state: desired,
                        attempts: attempt,
                        duration: start.elapsed(),
                    });
                }
                Ok(false) => log::warn!(
                    "Branch state for {} in {} did not read back as written (attempt {}/{})",
                    branch,
                    self.config.key,
                    attempt,
                    max_attempts
                ),
                Err(e) => log::warn!(
                    "Writing branch state for {} in {} failed (attempt {}/{}): {}",
                    branch,
                    self.config.key,
                    attempt,
                    max_attempts,
                    e
                ),
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.backoff).await;
            }
        }

        Err(StateError::VerificationFailed {
            branch: branch.to_string(),
            key: self.config.key.clone(),
            attempts: max_attempts,
        }
        .into())
    }

    async fn write_and_verify(&self, branch: &str, desired: &BranchState) -> Result<bool> {
        let key = &self.config.key;
        let (mut map, _, _) = self.read_map().await?;
        map.set(branch, desired.clone());

        let written = map.to_json()?;
        self.store.update(key, &written).await?;

        let read_back = self.store.get(key).await?;
        Ok(read_back
            .and_then(|raw| BranchStateMap::parse(key, &raw).ok())
            .is_some_and(|current| current == map))
    }
}
