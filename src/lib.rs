//! # Release Action
//!
//! Build-numbered releases for GitHub repositories.
//!
//! Each run resolves a tag from the branch's previous release, assembles a
//! changelog since that release, creates the release with its artifacts and
//! then records the new release in a repository variable. That variable is
//! eventually consistent, so the write is verified by reading it back.
//!
//! ## Features
//!
//! - **Per-branch numbering**: `main-41` is followed by `main-42`
//! - **Changelog**: commits since the last release, with co-authors
//! - **Artifact naming**: colliding labels stay addressable via path hashes
//! - **Verified state**: branch state is retried until it reads back as written
//!
//! ## Usage
//!
//! ```bash
//! release_action release --files "jar:build/libs/app.jar"
//! release_action previous --branch main
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod artifacts;
pub mod changes;
pub mod cli;
pub mod config;
pub mod error;
pub mod forge;
pub mod orchestrator;
pub mod state;
pub mod tag;

pub use artifacts::{ArtifactDescriptor, ArtifactNamer, NamedArtifact, PublishedArtifact};
pub use changes::{Change, ChangeSet, ChangeSetBuilder};
pub use cli::Args;
pub use config::{ActionInputs, EnvConfig, RunContext, Setting};
pub use error::{ReleaseError, Result};
pub use forge::{GitHubClient, HistoryProvider, Notifier, VariableStore};
pub use orchestrator::{ReleaseOrchestrator, ReleaseOutcome};
pub use state::{BranchState, ReleaseStateStore, StateConfig};
pub use tag::{ResolvedTag, TagPolicy, TagResolver};
