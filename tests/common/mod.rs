//! In-memory collaborators for integration tests.

#![allow(dead_code)]

use release_action::config::{EnvConfig, RunContext};
use release_action::error::{ForgeError, Result, StoreError};
use release_action::forge::{
    AssetRegistry, AssetSource, CommitRecord, CreatedRelease, HistoryProvider, Notification,
    Notifier, ReleaseRegistry, ReleaseRequest, UploadedAsset, VariableStore,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Variable store that can lag behind its own writes
#[derive(Default)]
pub struct FakeStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    committed: HashMap<String, String>,
    visible: HashMap<String, String>,
    stale_reads: usize,
    hidden_after_create: usize,
    frozen: bool,
    fail_reads: bool,
    gets: usize,
    creates: usize,
    updates: usize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap();
            inner.committed.insert(key.to_string(), value.to_string());
            inner.visible.insert(key.to_string(), value.to_string());
        }
        store
    }

    /// The next `n` reads return the value from before the latest writes
    pub fn stale_for(self, n: usize) -> Self {
        self.inner.lock().unwrap().stale_reads = n;
        self
    }

    /// A created variable stays invisible for the next `n` reads
    pub fn hidden_after_create(self, n: usize) -> Self {
        self.inner.lock().unwrap().hidden_after_create = n;
        self
    }

    /// Reads never observe updates
    pub fn frozen(self) -> Self {
        self.inner.lock().unwrap().frozen = true;
        self
    }

    /// Every read fails with a transport error
    pub fn failing_reads(self) -> Self {
        self.inner.lock().unwrap().fail_reads = true;
        self
    }

    /// Value as last written, regardless of read visibility
    pub fn committed(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().committed.get(key).cloned()
    }

    pub fn committed_json(&self, key: &str) -> serde_json::Value {
        serde_json::from_str(&self.committed(key).expect("variable written")).unwrap()
    }

    pub fn creates(&self) -> usize {
        self.inner.lock().unwrap().creates
    }

    pub fn updates(&self) -> usize {
        self.inner.lock().unwrap().updates
    }

    pub fn gets(&self) -> usize {
        self.inner.lock().unwrap().gets
    }
}

impl VariableStore for FakeStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        inner.gets += 1;
        if inner.fail_reads {
            return Err(StoreError::Request {
                key: key.to_string(),
                reason: "connection reset".to_string(),
            }
            .into());
        }

        if inner.stale_reads > 0 {
            inner.stale_reads -= 1;
        } else if !inner.frozen {
            inner.visible = inner.committed.clone();
        }
        Ok(inner.visible.get(key).cloned())
    }

    async fn create(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.creates += 1;
        if inner.committed.contains_key(key) {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                operation: "create".to_string(),
                status: 409,
                message: "Already exists".to_string(),
            }
            .into());
        }

        inner.committed.insert(key.to_string(), value.to_string());
        if inner.hidden_after_create > 0 {
            inner.stale_reads = inner.hidden_after_create;
        } else {
            inner.visible.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn update(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.updates += 1;
        inner.committed.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Scripted history, release and asset registry
#[derive(Default)]
pub struct FakeForge {
    history: Mutex<HashMap<(String, String), Vec<CommitRecord>>>,
    compares: Mutex<Vec<(String, String)>>,
    existing_tags: Mutex<HashSet<String>>,
    releases: Mutex<Vec<ReleaseRequest>>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeForge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, base: &str, head: &str, commits: Vec<CommitRecord>) -> Self {
        self.history
            .lock()
            .unwrap()
            .insert((base.to_string(), head.to_string()), commits);
        self
    }

    pub fn with_existing_tag(self, tag: &str) -> Self {
        self.existing_tags.lock().unwrap().insert(tag.to_string());
        self
    }

    pub fn compares(&self) -> Vec<(String, String)> {
        self.compares.lock().unwrap().clone()
    }

    pub fn releases(&self) -> Vec<ReleaseRequest> {
        self.releases.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn upload_names(&self) -> Vec<String> {
        self.uploads().into_iter().map(|(name, _)| name).collect()
    }
}

impl HistoryProvider for FakeForge {
    async fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitRecord>> {
        self.compares
            .lock()
            .unwrap()
            .push((base.to_string(), head.to_string()));

        self.history
            .lock()
            .unwrap()
            .get(&(base.to_string(), head.to_string()))
            .cloned()
            .ok_or_else(|| {
                ForgeError::Api {
                    operation: "compare_commits".to_string(),
                    status: 404,
                    message: format!("No common ancestor between {} and {}", base, head),
                }
                .into()
            })
    }
}

impl ReleaseRegistry for FakeForge {
    async fn create_release(&self, request: &ReleaseRequest) -> Result<CreatedRelease> {
        if !self.existing_tags.lock().unwrap().insert(request.tag_name.clone()) {
            return Err(ForgeError::ReleaseExists {
                tag: request.tag_name.clone(),
            }
            .into());
        }

        let mut releases = self.releases.lock().unwrap();
        releases.push(request.clone());
        let id = releases.len() as u64;

        Ok(CreatedRelease {
            id,
            html_url: format!("https://github.com/octo/widgets/releases/tag/{}", request.tag_name),
            api_url: format!("https://api.github.com/repos/octo/widgets/releases/{}", id),
            upload_url: format!(
                "https://uploads.github.com/repos/octo/widgets/releases/{}/assets{{?name,label}}",
                id
            ),
            assets_url: format!("https://api.github.com/repos/octo/widgets/releases/{}/assets", id),
        })
    }
}

impl AssetRegistry for FakeForge {
    async fn upload_asset(
        &self,
        release: &CreatedRelease,
        name: &str,
        source: AssetSource,
    ) -> Result<UploadedAsset> {
        let content = match source {
            AssetSource::File(path) => std::fs::read(&path).map_err(|e| ForgeError::ArtifactUnreadable {
                path,
                reason: e.to_string(),
            })?,
            AssetSource::Bytes(bytes) => bytes.to_vec(),
        };

        let mut uploads = self.uploads.lock().unwrap();
        if uploads.iter().any(|(existing, _)| existing == name) {
            return Err(ForgeError::AssetConflict {
                name: name.to_string(),
                release_id: release.id,
            }
            .into());
        }
        uploads.push((name.to_string(), content));

        Ok(UploadedAsset {
            id: 1000 + uploads.len() as u64,
            url: format!("https://github.com/octo/widgets/releases/download/{}", name),
        })
    }
}

/// Records notifications; optionally fails every publish
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(ForgeError::Transport {
                operation: "notify_webhook".to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

pub fn commit(sha: &str, message: &str, author: &str) -> CommitRecord {
    CommitRecord {
        sha: sha.to_string(),
        message: message.to_string(),
        committed_at: None,
        author_login: Some(author.to_string()),
    }
}

pub fn context(branch: &str, head: &str, default_branch: &str) -> RunContext {
    let env = EnvConfig::from_pairs([
        ("GITHUB_REPOSITORY", "octo/widgets".to_string()),
        ("GITHUB_REF", format!("refs/heads/{}", branch)),
        ("GITHUB_SHA", head.to_string()),
        ("GITHUB_RUN_NUMBER", "900".to_string()),
    ]);
    RunContext::from_env(&env)
        .unwrap()
        .with_default_branch(default_branch)
}
