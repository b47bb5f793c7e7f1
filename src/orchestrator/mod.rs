//! End-to-end release pipeline.
//!
//! One run: load branch state, resolve the tag, build the changelog, create
//! the release, publish artifacts, then record the new branch state. Only
//! configuration, release creation and upload failures abort the run; a
//! degraded changelog or an unverified state write is reported instead.

mod metadata;
mod outputs;

pub use metadata::{ChangeSummary, FileDigest, MetadataSnapshot, RELEASE_INFO_ASSET, ReleaseInfo};
pub use outputs::StepOutputs;

use crate::artifacts::{ArtifactNamer, NamedArtifact, PublishedArtifact, sha256_file};
use crate::changes::{ChangeRequest, ChangeSet, ChangeSetBuilder, render_release_notes};
use crate::config::{ActionInputs, RunContext, Setting};
use crate::error::{ConfigError, ReleaseError, Result};
use crate::forge::{
    AssetRegistry, AssetSource, CreatedRelease, HistoryProvider, Notification, Notifier,
    ReleaseRegistry, ReleaseRequest, VariableStore,
};
use crate::state::{CommitStateResult, ReleaseStateStore, StateConfig};
use crate::tag::{ResolvedTag, TagResolver};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What a release run produced
#[derive(Debug)]
pub struct ReleaseOutcome {
    /// Tag of this release
    pub tag: ResolvedTag,
    /// Release name
    pub name: String,
    /// Prerelease flag
    pub prerelease: bool,
    /// Changes since the previous release
    pub changes: ChangeSet,
    /// Why the changelog is degraded, if it is
    pub change_diagnostic: Option<String>,
    /// Created release record; `None` when creation is disabled
    pub release: Option<CreatedRelease>,
    /// Uploaded artifacts keyed by metadata key
    pub downloads: BTreeMap<String, PublishedArtifact>,
    /// Where the metadata snapshot was written
    pub metadata_path: Option<PathBuf>,
    /// Verified branch state write
    pub state: Option<CommitStateResult>,
    /// Branch state write that could not be verified
    pub state_error: Option<ReleaseError>,
}

impl ReleaseOutcome {
    /// Whether every step, including the branch state write, succeeded
    pub fn is_success(&self) -> bool {
        self.state_error.is_none()
    }

    /// Outputs for later workflow steps
    pub fn outputs(&self) -> StepOutputs {
        let mut outputs = StepOutputs::new();
        if let Some(release) = &self.release {
            outputs.set("releaseID", release.id.to_string());
            outputs.set("releaseBrowserURL", release.html_url.clone());
            outputs.set("releaseAPIURL", release.api_url.clone());
            outputs.set("releaseUploadURL", release.upload_url.clone());
            outputs.set("releaseAssetsURL", release.assets_url.clone());
        }
        outputs.set("tag", self.tag.name());
        outputs.set("tagBase", self.tag.base());
        outputs
    }
}

/// Runs the release pipeline against injected collaborators
pub struct ReleaseOrchestrator<'a, S, F, N> {
    store: &'a S,
    forge: &'a F,
    notifier: &'a N,
    context: RunContext,
    inputs: ActionInputs,
    state_config: StateConfig,
}

impl<'a, S, F, N> ReleaseOrchestrator<'a, S, F, N>
where
    S: VariableStore,
    F: HistoryProvider + ReleaseRegistry + AssetRegistry,
    N: Notifier,
{
    /// Create an orchestrator
    pub fn new(
        store: &'a S,
        forge: &'a F,
        notifier: &'a N,
        context: RunContext,
        inputs: ActionInputs,
    ) -> Self {
        Self {
            store,
            forge,
            notifier,
            context,
            inputs,
            state_config: StateConfig::default(),
        }
    }

    /// Override branch state persistence settings
    pub fn with_state_config(mut self, config: StateConfig) -> Self {
        self.state_config = config;
        self
    }

    /// Execute the pipeline
    pub async fn run(&self) -> Result<ReleaseOutcome> {
        let ctx = &self.context;
        let settings = &self.inputs.release;
        let state_store = ReleaseStateStore::new(self.store, self.state_config.clone());

        let loaded = state_store.load(&ctx.branch).await?;
        log::info!("{}", loaded.format_result());
        let prior = loaded.state.as_ref();

        let tag = TagResolver::new(&ctx.branch)
            .with_run_counter(ctx.run_number)
            .resolve(&self.inputs.tag, prior.map(|s| s.last_tag_base.as_str()));

        let change_outcome = ChangeSetBuilder::new(self.forge)
            .build(&ChangeRequest {
                prior_commit: prior.map(|s| s.last_commit.as_str()),
                head_commit: &ctx.head_commit,
                branch: &ctx.branch,
                default_branch: &ctx.default_branch,
                change_limit: settings.change_limit,
            })
            .await;
        let changes = change_outcome.changes;

        let body = self.release_body(&changes).await?;
        let name = release_name(&settings.name, &tag, &ctx.branch);
        let prerelease = settings
            .prerelease
            .clone()
            .resolve_with(|| !ctx.on_default_branch());
        let make_latest = settings.latest.resolve(prerelease, ctx.workflow_succeeded);

        log::info!(
            "Using release name {} with prerelease: {}, draft: {}, make latest: {:?}",
            name,
            prerelease,
            settings.draft,
            make_latest
        );

        let release = if settings.enabled {
            let created = self
                .forge
                .create_release(&ReleaseRequest {
                    tag_name: tag.name(),
                    target_commitish: ctx.head_commit.clone(),
                    name: name.clone(),
                    body: body.clone(),
                    draft: settings.draft,
                    prerelease,
                    discussion_category: settings.discussion_category.clone(),
                    generate_release_notes: settings.generate_release_notes,
                    make_latest: make_latest.map(str::to_string),
                })
                .await?;
            log::info!("Created release {} at {}", tag, created.html_url);
            Some(created)
        } else {
            log::info!("Release creation disabled, skipping release and uploads");
            None
        };

        let artifacts = ArtifactNamer::new(&self.inputs.files).assign();

        let metadata_path = if settings.save_metadata {
            let snapshot = MetadataSnapshot::collect(
                settings
                    .project
                    .clone()
                    .resolve_with(|| ctx.repo.repo.to_lowercase()),
                ctx.repo.repo.clone(),
                settings.version.clone().resolve_with(|| tag.base().to_string()),
                tag.build_number(),
                &changes,
                &artifacts,
            )
            .await?;
            snapshot.save(&settings.metadata_path).await?;
            Some(settings.metadata_path.clone())
        } else {
            None
        };

        let mut downloads = BTreeMap::new();
        if let Some(created) = &release {
            downloads = self.upload_artifacts(created, &artifacts).await?;

            if settings.include_info {
                self.upload_release_info(created, &tag, prerelease, &changes, &downloads)
                    .await?;
            }
        }

        let (state, state_error) = match state_store
            .commit(&ctx.branch, &ctx.head_commit, tag.base())
            .await
        {
            Ok(committed) => {
                log::info!("{}", committed.format_result());
                (Some(committed), None)
            }
            Err(e) if !e.is_fatal() => {
                log::error!("{}", e);
                (None, Some(e))
            }
            Err(e) => return Err(e),
        };

        let notification = Notification {
            repository: ctx.repo.full_name(),
            name: name.clone(),
            tag: tag.name(),
            url: release.as_ref().map(|r| r.html_url.clone()),
            body,
            prerelease,
            assets: downloads.values().map(|a| a.name.clone()).collect(),
        };
        if let Err(e) = self.notifier.publish(&notification).await {
            log::warn!("Release notification for {} failed: {}", tag, e);
        }

        Ok(ReleaseOutcome {
            tag,
            name,
            prerelease,
            changes,
            change_diagnostic: change_outcome.diagnostic,
            release,
            downloads,
            metadata_path,
            state,
            state_error,
        })
    }

    async fn release_body(&self, changes: &ChangeSet) -> Result<String> {
        if let Some(path) = &self.inputs.release.body_path
            && tokio::fs::try_exists(path).await.unwrap_or(false)
        {
            return read_body(path).await;
        }

        Ok(render_release_notes(&self.context.repo, changes))
    }

    /// Upload in input order, one at a time
    async fn upload_artifacts(
        &self,
        release: &CreatedRelease,
        artifacts: &[NamedArtifact],
    ) -> Result<BTreeMap<String, PublishedArtifact>> {
        let mut downloads = BTreeMap::new();

        for artifact in artifacts {
            let file = &artifact.descriptor;
            let name = file.file_name();
            let content_hash = sha256_file(&file.path).await?;
            let asset = self
                .forge
                .upload_asset(release, &name, AssetSource::File(file.path.clone()))
                .await?;
            log::info!("Uploaded {} as {}", file.path.display(), name);

            for key in &artifact.keys {
                downloads.insert(
                    key.clone(),
                    PublishedArtifact {
                        key: key.clone(),
                        name: name.clone(),
                        remote_id: asset.id,
                        url: asset.url.clone(),
                        content_hash: content_hash.clone(),
                    },
                );
            }
        }

        log::info!("Uploaded {} files to {}", artifacts.len(), release.html_url);
        Ok(downloads)
    }

    async fn upload_release_info(
        &self,
        release: &CreatedRelease,
        tag: &ResolvedTag,
        prerelease: bool,
        changes: &ChangeSet,
        downloads: &BTreeMap<String, PublishedArtifact>,
    ) -> Result<()> {
        let ctx = &self.context;
        let info = ReleaseInfo {
            owner: ctx.repo.owner.clone(),
            repo: ctx.repo.repo.clone(),
            branch: ctx.branch.clone(),
            id: release.id.to_string(),
            url: release.html_url.clone(),
            build: tag.build_number(),
            tag: tag.name(),
            timestamp: chrono::Utc::now().timestamp_millis().to_string(),
            prerelease,
            changes: changes.changes().to_vec(),
            downloads: downloads.clone(),
        };

        self.forge
            .upload_asset(
                release,
                RELEASE_INFO_ASSET,
                AssetSource::Bytes(Bytes::from(info.to_bytes()?)),
            )
            .await?;
        log::info!("Uploaded release data to {}", release.html_url);
        Ok(())
    }
}

/// Expand the name template; `auto` becomes `Build <base> (<branch>)`
pub fn release_name(template: &Setting<String>, tag: &ResolvedTag, branch: &str) -> String {
    match template {
        Setting::Auto => format!("Build {} ({})", tag.base(), branch),
        Setting::Literal(template) => template
            .replace("${tagBase}", tag.base())
            .replace("${tagPrefix}", tag.prefix())
            .replace("${tagSeparator}", tag.separator())
            .replace("${branch}", branch),
    }
}

async fn read_body(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        ConfigError::BodyUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}
