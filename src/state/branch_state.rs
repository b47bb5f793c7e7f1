//! Persisted per-branch release state.

use crate::error::{Result, StateError};
use crate::tag::BuildNumber;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Last released commit and tag base of one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchState {
    /// Commit of the last release
    #[serde(rename = "c")]
    pub last_commit: String,
    /// Tag base of the last release
    #[serde(rename = "t")]
    pub last_tag_base: String,
}

impl BranchState {
    /// Create a branch state
    pub fn new(last_commit: impl Into<String>, last_tag_base: impl Into<String>) -> Self {
        Self {
            last_commit: last_commit.into(),
            last_tag_base: last_tag_base.into(),
        }
    }
}

/// Mapping of branch name to [`BranchState`], stored as one JSON value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchStateMap {
    branches: BTreeMap<String, BranchState>,
}

impl BranchStateMap {
    /// Parse the stored value; `key` only labels the error
    pub fn parse(key: &str, raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| {
            StateError::Corrupted {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Serialize for storage
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// State recorded for `branch`
    pub fn get(&self, branch: &str) -> Option<&BranchState> {
        self.branches.get(branch)
    }

    /// Record state for `branch`, replacing any previous entry
    pub fn set(&mut self, branch: impl Into<String>, state: BranchState) {
        self.branches.insert(branch.into(), state);
    }

    /// Number of branches recorded
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Whether no branch is recorded
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Previous release of a branch, as reported by the `previous` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousRelease {
    /// Commit of the previous release
    pub commit: String,
    /// Tag base of the previous release
    pub release: String,
    /// Next build number when the previous base is numeric
    pub next_release: Option<u64>,
}

impl PreviousRelease {
    /// Look up `branch` in `map`
    pub fn lookup(map: &BranchStateMap, branch: &str) -> Result<Self> {
        let state = map.get(branch).ok_or_else(|| StateError::BranchNotFound {
            branch: branch.to_string(),
        })?;

        let next_release = match BuildNumber::from_base(&state.last_tag_base) {
            BuildNumber::Number(n) => n.checked_add(1),
            BuildNumber::Text(_) => None,
        };

        Ok(Self {
            commit: state.last_commit.clone(),
            release: state.last_tag_base.clone(),
            next_release,
        })
    }
}
