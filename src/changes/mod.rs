//! Changelog assembly.
//!
//! Selects the commit range since the previous release, reshapes the commits
//! into [`Change`] entries and applies the configured limit. Changelog
//! generation is best effort: failures produce an empty [`ChangeSet`] with a
//! diagnostic, never an error.

mod notes;

pub use notes::{escape_markdown, render_release_notes};

use crate::forge::{CommitRange, CommitRecord, HistoryProvider};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::sync::LazyLock;

static CO_AUTHOR_TRAILER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Co-authored-by: (.*) <(.*)>").expect("co-author pattern is valid")
});

/// One commit, shaped for the changelog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Full commit id
    #[serde(rename = "commit")]
    pub commit_id: String,
    /// First line of the message
    pub summary: String,
    /// Full message
    #[serde(rename = "message")]
    pub full_message: String,
    /// Committer timestamp in milliseconds since the epoch; written as a
    /// decimal string, empty when unknown
    #[serde(rename = "timestamp", serialize_with = "serialize_epoch")]
    pub timestamp_epoch: Option<i64>,
    /// Author login, empty when the author has no forge account
    pub author: String,
    /// Co-author names, deduplicated in order of appearance
    #[serde(rename = "coauthors")]
    pub co_authors: Vec<String>,
}

impl Change {
    /// Shape a commit record
    pub fn from_record(record: CommitRecord) -> Self {
        let summary = record.message.lines().next().unwrap_or_default().to_string();
        let co_authors = extract_co_authors(&record.message);

        Self {
            commit_id: record.sha,
            summary,
            timestamp_epoch: record.committed_at.map(|t| t.timestamp_millis()),
            author: record.author_login.unwrap_or_default(),
            co_authors,
            full_message: record.message,
        }
    }

    /// Abbreviated commit id
    pub fn short_id(&self) -> &str {
        short_sha(&self.commit_id)
    }
}

fn serialize_epoch<S: Serializer>(
    value: &Option<i64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(millis) => serializer.collect_str(millis),
        None => serializer.serialize_str(""),
    }
}

/// First seven characters of a commit id
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Names from `Co-authored-by: Name <email>` trailers, first occurrence wins, empty names dropped
pub fn extract_co_authors(message: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in CO_AUTHOR_TRAILER.captures_iter(message) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Ordered changes since the previous release, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
    truncated: usize,
}

impl ChangeSet {
    /// Build from changes, keeping only the oldest `limit` when a positive limit is set
    pub fn new(mut changes: Vec<Change>, limit: Option<usize>) -> Self {
        let mut truncated = 0;
        if let Some(limit) = limit.filter(|l| *l > 0)
            && changes.len() > limit
        {
            truncated = changes.len() - limit;
            changes.truncate(limit);
        }

        Self { changes, truncated }
    }

    /// Empty change set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Retained changes
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Number of changes dropped by the limit
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    /// Number of retained changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether no change is retained
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Oldest retained change
    pub fn first(&self) -> Option<&Change> {
        self.changes.first()
    }

    /// Newest retained change
    pub fn last(&self) -> Option<&Change> {
        self.changes.last()
    }
}

/// Inputs for one changelog build
#[derive(Debug, Clone, Copy)]
pub struct ChangeRequest<'a> {
    /// Commit of the previous release on this branch
    pub prior_commit: Option<&'a str>,
    /// Commit being released
    pub head_commit: &'a str,
    /// Branch being released
    pub branch: &'a str,
    /// Repository default branch
    pub default_branch: &'a str,
    /// Maximum changes to keep
    pub change_limit: Option<usize>,
}

/// Result of a changelog build
#[derive(Debug, Clone, Default)]
pub struct ChangeSetOutcome {
    /// The changes, possibly empty
    pub changes: ChangeSet,
    /// Range that was queried
    pub range: Option<CommitRange>,
    /// Why the change set is degraded, if it is
    pub diagnostic: Option<String>,
}

/// Builds change sets from a history provider
pub struct ChangeSetBuilder<'a, H> {
    history: &'a H,
}

impl<'a, H: HistoryProvider> ChangeSetBuilder<'a, H> {
    /// Create a builder over `history`
    pub fn new(history: &'a H) -> Self {
        Self { history }
    }

    /// Select the commit range to query.
    ///
    /// Never fails; a branch whose merge base cannot be found falls back to
    /// the head commit alone.
    pub async fn resolve_range(&self, request: &ChangeRequest<'_>) -> CommitRange {
        if let Some(prior) = request.prior_commit {
            return CommitRange::new(prior, request.head_commit);
        }

        if request.branch == request.default_branch {
            return CommitRange::single(request.head_commit);
        }

        match self
            .history
            .compare(request.default_branch, request.branch)
            .await
        {
            Ok(commits) => match commits.first() {
                Some(first) => CommitRange::new(format!("{}^", first.sha), request.head_commit),
                None => {
                    log::info!(
                        "Branch {} has no commits ahead of {}, using head commit only",
                        request.branch,
                        request.default_branch
                    );
                    CommitRange::single(request.head_commit)
                }
            },
            Err(e) => {
                log::warn!(
                    "Could not find where {} diverged from {}: {}; using head commit only",
                    request.branch,
                    request.default_branch,
                    e
                );
                CommitRange::single(request.head_commit)
            }
        }
    }

    /// Build the change set for `request`
    pub async fn build(&self, request: &ChangeRequest<'_>) -> ChangeSetOutcome {
        let range = self.resolve_range(request).await;

        match self.history.log(&range).await {
            Ok(records) => {
                let changes: Vec<Change> = records.into_iter().map(Change::from_record).collect();
                log::info!("Found {} changes in commit range {}", changes.len(), range);

                ChangeSetOutcome {
                    changes: ChangeSet::new(changes, request.change_limit),
                    range: Some(range),
                    diagnostic: None,
                }
            }
            Err(e) => {
                log::warn!(
                    "Using empty changes as they could not be found for range {}: {}",
                    range,
                    e
                );
                ChangeSetOutcome {
                    changes: ChangeSet::empty(),
                    diagnostic: Some(format!("commit range {} unavailable: {}", range, e)),
                    range: Some(range),
                }
            }
        }
    }
}
