//! Collaborator traits the release engine consumes.
//!
//! The engine never talks to a forge directly: it is handed implementations
//! of these traits. [`super::GitHubClient`] implements all of them against the
//! GitHub REST API; tests substitute in-memory fakes.

use crate::error::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;

/// Repository-scoped key/value persistence.
///
/// Eventually consistent: a read right after a write may still return the old value.
pub trait VariableStore {
    /// Read a variable; `Ok(None)` when it does not exist
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>>;

    /// Create a variable that does not exist yet
    fn create(&self, key: &str, value: &str) -> impl Future<Output = Result<()>>;

    /// Overwrite an existing variable
    fn update(&self, key: &str, value: &str) -> impl Future<Output = Result<()>>;
}

/// One commit as reported by the history provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Full commit id
    pub sha: String,
    /// Full commit message
    pub message: String,
    /// Committer timestamp
    pub committed_at: Option<DateTime<Utc>>,
    /// Forge login of the author, when the author is a known account
    pub author_login: Option<String>,
}

/// Half-open commit range `(base, head]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    /// Exclusive lower bound (a revision expression, may end in `^`)
    pub base: String,
    /// Inclusive upper bound
    pub head: String,
}

impl CommitRange {
    /// Create a range
    pub fn new(base: impl Into<String>, head: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            head: head.into(),
        }
    }

    /// Range containing only `head`
    pub fn single(head: &str) -> Self {
        Self::new(format!("{}^", head), head)
    }
}

impl std::fmt::Display for CommitRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}...{}", self.base, self.head)
    }
}

/// Version-control history
pub trait HistoryProvider {
    /// Commits reachable from `head` but not from `base`, oldest first
    fn compare(&self, base: &str, head: &str) -> impl Future<Output = Result<Vec<CommitRecord>>>;

    /// Commits in `range`, oldest first
    fn log(&self, range: &CommitRange) -> impl Future<Output = Result<Vec<CommitRecord>>> {
        self.compare(&range.base, &range.head)
    }
}

/// Parameters for creating a release record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// Tag to create
    pub tag_name: String,
    /// Branch or commit the tag points at
    pub target_commitish: String,
    /// Display name
    pub name: String,
    /// Markdown body
    pub body: String,
    /// Create as draft
    pub draft: bool,
    /// Mark as prerelease
    pub prerelease: bool,
    /// Discussion category to open
    pub discussion_category: Option<String>,
    /// Let the forge append generated notes
    pub generate_release_notes: bool,
    /// `true`, `false`, `legacy`, or omitted
    pub make_latest: Option<String>,
}

/// A created release record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRelease {
    /// Release id
    pub id: u64,
    /// Browser URL
    pub html_url: String,
    /// API URL
    pub api_url: String,
    /// Upload endpoint for assets
    pub upload_url: String,
    /// Assets listing URL
    pub assets_url: String,
}

/// Release record creation
pub trait ReleaseRegistry {
    /// Create a release.
    ///
    /// Fails with `ForgeError::ReleaseExists` when the tag is taken and
    /// `ForgeError::CategoryNotFound` for an unknown discussion category.
    fn create_release(
        &self,
        request: &ReleaseRequest,
    ) -> impl Future<Output = Result<CreatedRelease>>;
}

/// Content of an uploaded asset
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Stream from a file on disk
    File(PathBuf),
    /// In-memory content
    Bytes(Bytes),
}

/// An uploaded asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Asset id
    pub id: u64,
    /// Download URL
    pub url: String,
}

/// Asset upload
pub trait AssetRegistry {
    /// Upload `source` as `name` on `release`.
    ///
    /// Fails with `ForgeError::AssetConflict` when the name is taken.
    fn upload_asset(
        &self,
        release: &CreatedRelease,
        name: &str,
        source: AssetSource,
    ) -> impl Future<Output = Result<UploadedAsset>>;
}

/// Summary of a finished release handed to notifiers
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// `owner/repo`
    pub repository: String,
    /// Release name
    pub name: String,
    /// Full tag
    pub tag: String,
    /// Release page, when a release record was created
    pub url: Option<String>,
    /// Release body
    pub body: String,
    /// Prerelease flag
    pub prerelease: bool,
    /// Names of the uploaded assets
    pub assets: Vec<String>,
}

/// Best-effort release announcements
pub trait Notifier {
    /// Announce a release
    fn publish(&self, notification: &Notification) -> impl Future<Output = Result<()>>;
}
