//! Artifact naming and digests.
//!
//! Labels name artifacts in published metadata. When a batch reuses a label,
//! every artifact additionally gets `label-<hash of its path>` so each stays
//! addressable.

use crate::error::{ForgeError, Result};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// An artifact as configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Label used as the key in published metadata
    pub label: String,
    /// Local file path
    pub path: PathBuf,
}

impl ArtifactDescriptor {
    /// Create a descriptor
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Remote asset name: the file name of the path
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Whether the file exists right now
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// An uploaded artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    /// Metadata key (plain label or disambiguated)
    #[serde(skip)]
    pub key: String,
    /// Remote asset name
    pub name: String,
    /// Remote asset id, written as a decimal string
    #[serde(rename = "id", serialize_with = "serialize_id")]
    pub remote_id: u64,
    /// Download URL
    pub url: String,
    /// SHA-256 of the content, hex encoded
    #[serde(rename = "sha256")]
    pub content_hash: String,
}

/// First 7 hex characters of the SHA-256 of a path string.
///
/// Stable across runs for identical paths; says nothing about content.
pub fn short_hash(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(7);
    hash
}

/// Full SHA-256 of a file's content, hex encoded
pub async fn sha256_file(path: &Path) -> Result<String> {
    let unreadable = |e: std::io::Error| ForgeError::ArtifactUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut file = tokio::fs::File::open(path).await.map_err(unreadable)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await.map_err(unreadable)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// An existing artifact together with its metadata keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArtifact {
    /// The artifact
    pub descriptor: ArtifactDescriptor,
    /// Keys it is published under: `label-<hash>` first when labels repeat, then the plain label
    pub keys: Vec<String>,
}

/// Resolves label collisions across one publish batch
#[derive(Debug, Clone)]
pub struct ArtifactNamer<'a> {
    artifacts: &'a [ArtifactDescriptor],
    duplicates: bool,
}

impl<'a> ArtifactNamer<'a> {
    /// Inspect a batch for repeated labels
    pub fn new(artifacts: &'a [ArtifactDescriptor]) -> Self {
        let mut seen = HashSet::new();
        let duplicates = artifacts.iter().any(|a| !seen.insert(a.label.as_str()));

        if duplicates {
            log::info!("Artifact labels repeat, adding path-hash keys");
        }

        Self {
            artifacts,
            duplicates,
        }
    }

    /// Whether any label repeats
    pub fn has_duplicates(&self) -> bool {
        self.duplicates
    }

    fn keys_for(&self, artifact: &ArtifactDescriptor) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if self.duplicates {
            keys.push(format!("{}-{}", artifact.label, short_hash(&artifact.path)));
        }
        keys.push(artifact.label.clone());
        keys
    }

    /// Keys for every artifact of the batch, in input order.
    ///
    /// Missing files are skipped. Collisions are decided over the whole
    /// batch, so a skipped file still forces hashed keys on its label.
    pub fn assign(&self) -> Vec<NamedArtifact> {
        self.artifacts
            .iter()
            .filter(|artifact| {
                let exists = artifact.exists();
                if !exists {
                    log::info!("File {} does not exist, skipping", artifact.path.display());
                }
                exists
            })
            .map(|artifact| NamedArtifact {
                keys: self.keys_for(artifact),
                descriptor: artifact.clone(),
            })
            .collect()
    }
}

fn serialize_id<S: Serializer>(id: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}
