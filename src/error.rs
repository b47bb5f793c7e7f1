//! Error types for release_action operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.
//! Every variant names the key, branch, tag or path it concerns.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for release_action operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release_action operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Configuration and run-identity errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Variable store errors
    #[error("Variable store error: {0}")]
    Store(#[from] StoreError),

    /// Forge (release registry, asset registry, history) errors
    #[error("Forge error: {0}")]
    Forge(#[from] ForgeError),

    /// Branch state errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment identifier is not set
    #[error("Required environment variable {name} is not defined")]
    MissingEnv {
        /// Variable name
        name: String,
    },

    /// An input value could not be interpreted
    #[error("Invalid value '{value}' for input {name}: {reason}")]
    InvalidInput {
        /// Input name
        name: String,
        /// Offending value
        value: String,
        /// Reason for the error
        reason: String,
    },

    /// Release body file could not be read
    #[error("Failed to read release body from {path}: {reason}")]
    BodyUnreadable {
        /// Path to the body file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Variable store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Request to the store failed
    #[error("Request for variable '{key}' failed: {reason}")]
    Request {
        /// Variable key
        key: String,
        /// Reason for the error
        reason: String,
    },

    /// Store answered with an unexpected status
    #[error("Variable '{key}' {operation} returned HTTP {status}: {message}")]
    Rejected {
        /// Variable key
        key: String,
        /// Operation attempted (get, create, update)
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response message
        message: String,
    },
}

/// Forge errors
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Release tag already taken
    #[error("Release {tag} already exists")]
    ReleaseExists {
        /// Full tag name
        tag: String,
    },

    /// Discussion category referenced by the release does not exist
    #[error("Specified discussion category {category} does not exist")]
    CategoryNotFound {
        /// Category name
        category: String,
    },

    /// Asset name already present on the release
    #[error("Asset '{name}' already exists on release {release_id}")]
    AssetConflict {
        /// Asset name
        name: String,
        /// Release identifier
        release_id: u64,
    },

    /// Network or transport failure
    #[error("Forge request '{operation}' failed: {reason}")]
    Transport {
        /// Operation that failed
        operation: String,
        /// Reason for the error
        reason: String,
    },

    /// Forge answered with an unexpected status
    #[error("Forge request '{operation}' returned HTTP {status}: {message}")]
    Api {
        /// Operation that failed
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response message
        message: String,
    },

    /// Artifact file could not be read for upload
    #[error("Failed to read artifact {path}: {reason}")]
    ArtifactUnreadable {
        /// Artifact path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Branch state errors
#[derive(Error, Debug)]
pub enum StateError {
    /// Persisted mapping is not valid branch state JSON
    #[error("Branch state in variable '{key}' is corrupted: {reason}")]
    Corrupted {
        /// Variable key
        key: String,
        /// Reason for the error
        reason: String,
    },

    /// Write never read back equal within the retry bound
    #[error(
        "Branch state for '{branch}' in variable '{key}' could not be verified after {attempts} attempt(s)"
    )]
    VerificationFailed {
        /// Branch name
        branch: String,
        /// Variable key
        key: String,
        /// Attempts made
        attempts: u32,
    },

    /// No state recorded for the branch
    #[error("No data found for branch {branch}")]
    BranchNotFound {
        /// Branch name
        branch: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Writing step outputs failed
    #[error("Failed to write outputs to {path}: {reason}")]
    OutputFailed {
        /// Output file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Config(ConfigError::MissingEnv { name }) => vec![
                format!("Run inside a workflow that defines {}", name),
                format!("Export {} manually when running locally", name),
            ],
            ReleaseError::Forge(ForgeError::ReleaseExists { tag }) => vec![
                format!("Delete the existing release and tag {}", tag),
                "Set tagBase to a new value or enable tagIncrement".to_string(),
            ],
            ReleaseError::Forge(ForgeError::CategoryNotFound { category }) => vec![
                format!("Create the discussion category '{}' in the repository", category),
                "Set discussionCategory to 'none' to skip discussions".to_string(),
            ],
            ReleaseError::Forge(ForgeError::AssetConflict { name, .. }) => vec![
                format!("Give '{}' a unique file name", name),
                "Remove the existing asset from the release".to_string(),
            ],
            ReleaseError::State(StateError::VerificationFailed { key, .. }) => vec![
                format!("Inspect the repository variable '{}'", key),
                "Check for concurrent releases on the same branch".to_string(),
            ],
            ReleaseError::State(StateError::Corrupted { key, .. }) => vec![
                format!("Reset the repository variable '{}' to {{}}", key),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check whether this error must abort the run
    ///
    /// Branch state inconsistency is surfaced but never aborts a release that
    /// has already been published.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ReleaseError::State(StateError::VerificationFailed { .. })
        )
    }
}
