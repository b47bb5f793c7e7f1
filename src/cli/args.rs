//! Command line argument parsing and validation.
//!
//! Every option doubles as a workflow input: clap reads `INPUT_<NAME>` from
//! the environment, the way the runner passes `with:` values to an action.

use crate::config::inputs::{
    parse_bool_input, parse_file_entries, parse_limit, parse_optional,
};
use crate::config::{ActionInputs, LatestPolicy, ReleaseSettings, Setting};
use crate::error::{CliError, Result};
use crate::tag::TagPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build-numbered GitHub releases with per-branch state
#[derive(Parser, Debug)]
#[command(
    name = "release_action",
    version,
    about = "Build-numbered GitHub releases with per-branch state",
    long_about = "Create a GitHub release for the current workflow commit.

The tag base increments per branch; the last released commit and tag base are
kept in the repository variable releaseAction_prevRelease.

Usage:
  release_action release --files build/libs/app.jar
  release_action previous --branch main"
)]
pub struct Args {
    /// Show debug-level progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a release for the current commit and record it in branch state
    Release(Box<ReleaseArgs>),

    /// Print the previous release recorded for a branch
    Previous(PreviousArgs),
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Release(_) => "release",
            Command::Previous(_) => "previous",
        }
    }
}

/// Inputs of the `release` command
#[derive(clap::Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Tag base, or "auto" to continue from the previous release
    #[arg(long, env = "INPUT_TAGBASE", default_value = "auto")]
    pub tag_base: String,

    /// Tag prefix, or "auto" for the branch name
    #[arg(long, env = "INPUT_TAGPREFIX", default_value = "auto")]
    pub tag_prefix: String,

    /// Text between tag prefix and base
    #[arg(long, env = "INPUT_TAGSEPARATOR", default_value = "-")]
    pub tag_separator: String,

    /// Advance numeric tag bases by one
    #[arg(long, env = "INPUT_TAGINCREMENT", default_value = "true")]
    pub tag_increment: String,

    /// Files to upload: `label:path` or `path`, newline or comma separated
    #[arg(long, env = "INPUT_FILES", default_value = "")]
    pub files: String,

    /// Create the release record and upload files
    #[arg(long, env = "INPUT_RELEASEENABLED", default_value = "true")]
    pub release_enabled: String,

    /// Release name template, or "auto"
    #[arg(long, env = "INPUT_RELEASENAME", default_value = "auto")]
    pub release_name: String,

    /// File used as release body instead of the generated changelog
    #[arg(long, env = "INPUT_RELEASEBODYPATH", default_value = "")]
    pub release_body_path: String,

    /// "true", "false" or "auto" (prerelease off the default branch)
    #[arg(long, env = "INPUT_PRERELEASE", default_value = "auto")]
    pub pre_release: String,

    /// Create the release as a draft
    #[arg(long, env = "INPUT_DRAFTRELEASE", default_value = "false")]
    pub draft_release: String,

    /// Let GitHub append its generated release notes
    #[arg(long, env = "INPUT_GHRELEASENOTES", default_value = "false")]
    pub gh_release_notes: String,

    /// Discussion category to open, or "none"
    #[arg(long, env = "INPUT_DISCUSSIONCATEGORY", default_value = "none")]
    pub discussion_category: String,

    /// "true", "false", "legacy" or "auto"
    #[arg(long, env = "INPUT_LATESTRELEASE", default_value = "auto")]
    pub latest_release: String,

    /// Upload release.json next to the files
    #[arg(long, env = "INPUT_INCLUDERELEASEINFO", default_value = "true")]
    pub include_release_info: String,

    /// Write a metadata snapshot to disk
    #[arg(long, env = "INPUT_SAVEMETADATA", default_value = "false")]
    pub save_metadata: String,

    /// Metadata snapshot path
    #[arg(long, env = "INPUT_METADATAPATH", default_value = "metadata.json")]
    pub metadata_path: PathBuf,

    /// Project name in the metadata snapshot, or "auto"
    #[arg(long, env = "INPUT_RELEASEPROJECT", default_value = "auto")]
    pub release_project: String,

    /// Version in the metadata snapshot, or "auto"
    #[arg(long, env = "INPUT_RELEASEVERSION", default_value = "auto")]
    pub release_version: String,

    /// Maximum changes listed in the changelog
    #[arg(long, env = "INPUT_RELEASECHANGELIMIT", default_value = "")]
    pub release_change_limit: String,

    /// Webhook receiving a JSON release summary, or "none"
    #[arg(long, env = "INPUT_NOTIFYWEBHOOK", default_value = "none")]
    pub notify_webhook: String,
}

impl ReleaseArgs {
    /// Resolve raw inputs into typed settings
    pub fn to_inputs(&self) -> Result<ActionInputs> {
        let tag = TagPolicy {
            base: Setting::parse(&self.tag_base),
            prefix: Setting::parse(&self.tag_prefix),
            separator: self.tag_separator.clone(),
            increment: parse_bool_input("tagIncrement", &self.tag_increment)?,
        };

        let release = ReleaseSettings {
            enabled: parse_bool_input("releaseEnabled", &self.release_enabled)?,
            name: Setting::parse(&self.release_name),
            body_path: parse_optional(&self.release_body_path).map(PathBuf::from),
            prerelease: Setting::parse_flag(&self.pre_release),
            draft: parse_bool_input("draftRelease", &self.draft_release)?,
            generate_release_notes: parse_bool_input("ghReleaseNotes", &self.gh_release_notes)?,
            discussion_category: parse_optional(&self.discussion_category),
            latest: LatestPolicy::parse(&self.latest_release),
            include_info: parse_bool_input("includeReleaseInfo", &self.include_release_info)?,
            save_metadata: parse_bool_input("saveMetadata", &self.save_metadata)?,
            metadata_path: self.metadata_path.clone(),
            project: Setting::parse(&self.release_project),
            version: Setting::parse(&self.release_version),
            change_limit: parse_limit(&self.release_change_limit),
        };

        Ok(ActionInputs {
            tag,
            release,
            files: parse_file_entries(&self.files),
        })
    }

    /// Webhook URL when one is configured
    pub fn webhook(&self) -> Option<String> {
        parse_optional(&self.notify_webhook)
    }
}

/// Inputs of the `previous` command
#[derive(clap::Args, Debug, Clone)]
pub struct PreviousArgs {
    /// Branch to look up; defaults to the workflow branch
    #[arg(long, env = "INPUT_BRANCH")]
    pub branch: Option<String>,

    /// Branch state JSON; read from the repository variable when omitted
    #[arg(long, env = "INPUT_DATA")]
    pub data: Option<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Release(args) => {
                if args.tag_separator.contains(char::is_whitespace) {
                    return Err(CliError::InvalidArguments {
                        reason: format!("tag separator '{}' contains whitespace", args.tag_separator),
                    }
                    .into());
                }
                args.to_inputs().map(|_| ())
            }
            Command::Previous(args) => {
                if let Some(branch) = &args.branch
                    && branch.trim().is_empty()
                {
                    return Err(CliError::InvalidArguments {
                        reason: "branch must not be empty".to_string(),
                    }
                    .into());
                }
                Ok(())
            }
        }
    }
}
