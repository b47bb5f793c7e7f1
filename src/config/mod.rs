//! Run configuration.
//!
//! Raw inputs are resolved here, at the boundary, into typed settings. The
//! `"auto"` sentinel becomes [`Setting::Auto`] and is never compared as a
//! string past this point.

mod env;
pub mod inputs;

pub use env::{EnvConfig, RepoRef, RunContext, branch_from_ref};

use crate::artifacts::ArtifactDescriptor;
use crate::tag::TagPolicy;
use std::path::PathBuf;

/// A configuration value that is either derived automatically or given literally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    /// Derive the value from run context
    Auto,
    /// Use this exact value
    Literal(T),
}

impl Setting<String> {
    /// Interpret a raw input, mapping `"auto"` to [`Setting::Auto`]
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "auto" {
            Setting::Auto
        } else {
            Setting::Literal(raw.to_string())
        }
    }
}

impl Setting<bool> {
    /// Interpret a raw boolean-or-auto input; anything but `"true"` is false
    pub fn parse_flag(raw: &str) -> Self {
        match raw.trim() {
            "auto" => Setting::Auto,
            value => Setting::Literal(value == "true"),
        }
    }
}

impl<T> Setting<T> {
    /// Resolve to a concrete value, computing the automatic one lazily
    pub fn resolve_with(self, auto: impl FnOnce() -> T) -> T {
        match self {
            Setting::Auto => auto(),
            Setting::Literal(value) => value,
        }
    }
}

/// Policy for marking the release as the repository's latest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestPolicy {
    /// Latest unless it is a prerelease
    Auto,
    /// Always latest
    True,
    /// Never latest
    False,
    /// Forge's legacy date-based rule
    Legacy,
    /// Leave the decision to the forge
    Unset,
}

impl LatestPolicy {
    /// Interpret the `latestRelease` input
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "auto" => LatestPolicy::Auto,
            "true" => LatestPolicy::True,
            "false" => LatestPolicy::False,
            "legacy" => LatestPolicy::Legacy,
            _ => LatestPolicy::Unset,
        }
    }

    /// Value sent to the forge, or `None` to omit the field.
    ///
    /// A run with a failed step is never marked latest.
    pub fn resolve(self, prerelease: bool, workflow_succeeded: bool) -> Option<&'static str> {
        if !workflow_succeeded {
            return Some("false");
        }

        match self {
            LatestPolicy::Auto if prerelease => Some("false"),
            LatestPolicy::Auto | LatestPolicy::True => Some("true"),
            LatestPolicy::False => Some("false"),
            LatestPolicy::Legacy => Some("legacy"),
            LatestPolicy::Unset => None,
        }
    }
}

/// Settings for the release record and its side outputs
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    /// Create the release record and upload assets
    pub enabled: bool,
    /// Release name template
    pub name: Setting<String>,
    /// File whose contents replace the generated changelog body
    pub body_path: Option<PathBuf>,
    /// Prerelease flag
    pub prerelease: Setting<bool>,
    /// Create as draft
    pub draft: bool,
    /// Ask the forge to append its own generated notes
    pub generate_release_notes: bool,
    /// Discussion category to open for the release
    pub discussion_category: Option<String>,
    /// Latest-release policy
    pub latest: LatestPolicy,
    /// Upload `release.json` alongside the artifacts
    pub include_info: bool,
    /// Write the metadata snapshot to disk
    pub save_metadata: bool,
    /// Where the metadata snapshot is written
    pub metadata_path: PathBuf,
    /// Project name recorded in the metadata snapshot
    pub project: Setting<String>,
    /// Version recorded in the metadata snapshot
    pub version: Setting<String>,
    /// Maximum number of changes kept in the changelog
    pub change_limit: Option<usize>,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            name: Setting::Auto,
            body_path: None,
            prerelease: Setting::Auto,
            draft: false,
            generate_release_notes: false,
            discussion_category: None,
            latest: LatestPolicy::Auto,
            include_info: true,
            save_metadata: false,
            metadata_path: PathBuf::from("metadata.json"),
            project: Setting::Auto,
            version: Setting::Auto,
            change_limit: None,
        }
    }
}

/// Everything a release run is configured with
#[derive(Debug, Clone)]
pub struct ActionInputs {
    /// Tag policy
    pub tag: TagPolicy,
    /// Release settings
    pub release: ReleaseSettings,
    /// Artifacts to publish, in upload order
    pub files: Vec<ArtifactDescriptor>,
}
