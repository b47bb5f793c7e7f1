//! Release metadata documents: the on-disk snapshot and `release.json`.

use crate::artifacts::{NamedArtifact, PublishedArtifact, sha256_file};
use crate::changes::{Change, ChangeSet};
use crate::error::Result;
use crate::tag::BuildNumber;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the release info asset
pub const RELEASE_INFO_ASSET: &str = "release.json";

/// Change entry in the metadata snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSummary {
    /// Full commit id
    pub commit: String,
    /// First line of the message
    pub summary: String,
    /// Full message
    pub message: String,
}

/// Local file entry in the metadata snapshot
#[derive(Debug, Clone, Serialize)]
pub struct FileDigest {
    /// File name
    pub name: String,
    /// SHA-256 of the content, hex encoded
    pub sha256: String,
}

/// Snapshot written to disk for out-of-band publication
#[derive(Debug, Clone, Serialize)]
pub struct MetadataSnapshot {
    /// Project name
    pub project: String,
    /// Repository name
    pub repo: String,
    /// Version label
    pub version: String,
    /// Build number
    pub number: BuildNumber,
    /// Changes in this release
    pub changes: Vec<ChangeSummary>,
    /// Local artifacts by plain label
    pub downloads: BTreeMap<String, FileDigest>,
}

impl MetadataSnapshot {
    /// Hash the assigned artifacts and assemble the snapshot.
    ///
    /// Keys are plain labels; a repeated label keeps the last artifact.
    pub async fn collect(
        project: String,
        repo: String,
        version: String,
        number: BuildNumber,
        changes: &ChangeSet,
        artifacts: &[NamedArtifact],
    ) -> Result<Self> {
        let mut downloads = BTreeMap::new();
        for artifact in artifacts {
            let file = &artifact.descriptor;
            downloads.insert(
                file.label.clone(),
                FileDigest {
                    name: file.file_name(),
                    sha256: sha256_file(&file.path).await?,
                },
            );
        }

        Ok(Self {
            project,
            repo,
            version,
            number,
            changes: changes
                .changes()
                .iter()
                .map(|c| ChangeSummary {
                    commit: c.commit_id.clone(),
                    summary: c.summary.clone(),
                    message: c.full_message.clone(),
                })
                .collect(),
            downloads,
        })
    }

    /// Write as indented JSON
    pub async fn save(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, to_indented_json(self)?).await?;
        log::info!("Saved metadata to {}", path.display());
        Ok(())
    }
}

/// Document uploaded as `release.json`
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseInfo {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Released branch
    pub branch: String,
    /// Release id
    pub id: String,
    /// Release page
    pub url: String,
    /// Build number
    pub build: BuildNumber,
    /// Full tag
    pub tag: String,
    /// Milliseconds since the epoch
    pub timestamp: String,
    /// Prerelease flag
    pub prerelease: bool,
    /// Changes in this release
    pub changes: Vec<Change>,
    /// Uploaded artifacts by key
    pub downloads: BTreeMap<String, PublishedArtifact>,
}

impl ReleaseInfo {
    /// Serialize as indented JSON
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        to_indented_json(self)
    }
}

fn to_indented_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}
