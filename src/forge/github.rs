//! GitHub REST implementation of the forge collaborators.

use super::operations::{
    AssetRegistry, AssetSource, CommitRecord, CreatedRelease, HistoryProvider, ReleaseRegistry,
    ReleaseRequest, UploadedAsset, VariableStore,
};
use crate::config::EnvConfig;
use crate::error::{ConfigError, ForgeError, ReleaseError, Result, StoreError};
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use url::Url;

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// Connection settings for the GitHub API
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST API base URL
    pub api_url: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Access token
    pub token: String,
}

impl GitHubConfig {
    /// Read API settings for `owner/repo` from the environment.
    ///
    /// The token comes from `GITHUB_TOKEN`, falling back to `GH_TOKEN`.
    pub fn from_env(env: &EnvConfig, owner: &str, repo: &str) -> Result<Self> {
        let token = env
            .get("GITHUB_TOKEN")
            .or_else(|| env.get("GH_TOKEN"))
            .ok_or_else(|| ConfigError::MissingEnv {
                name: "GITHUB_TOKEN".to_string(),
            })?;

        let api_url = env
            .get("GITHUB_API_URL")
            .unwrap_or_else(|| "https://api.github.com".to_string());

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token,
        })
    }
}

/// GitHub client backing the variable store, history, release and asset ports
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    config: GitHubConfig,
}

#[derive(Serialize)]
struct VariableBody<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct VariableResponse {
    value: String,
}

#[derive(Deserialize)]
struct RepositoryResponse {
    default_branch: String,
}

#[derive(Deserialize)]
struct ComparePage {
    #[serde(default)]
    total_commits: usize,
    #[serde(default)]
    commits: Vec<CompareCommit>,
}

#[derive(Deserialize)]
struct CompareCommit {
    sha: String,
    commit: GitCommit,
    author: Option<Account>,
}

#[derive(Deserialize)]
struct GitCommit {
    message: String,
    committer: Option<GitSignature>,
}

#[derive(Deserialize)]
struct GitSignature {
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct Account {
    login: String,
}

#[derive(Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    target_commitish: &'a str,
    name: &'a str,
    body: &'a str,
    draft: bool,
    prerelease: bool,
    generate_release_notes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    discussion_category_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    make_latest: Option<&'a str>,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    id: u64,
    html_url: String,
    url: String,
    upload_url: String,
    assets_url: String,
}

#[derive(Deserialize)]
struct AssetResponse {
    id: u64,
    browser_download_url: String,
}

#[derive(Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Deserialize)]
struct Job {
    #[serde(default)]
    steps: Vec<JobStep>,
}

#[derive(Deserialize)]
struct JobStep {
    conclusion: Option<String>,
}

impl GitHubClient {
    /// Create a client with authentication and API version headers preset
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.token)).map_err(|e| {
            ConfigError::InvalidInput {
                name: "GITHUB_TOKEN".to_string(),
                value: "<redacted>".to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| transport("client_init", e))?;

        Ok(Self { http, config })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.config.api_url, self.config.owner, self.config.repo, path
        )
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| transport(operation, e))
    }

    /// Name of the repository default branch
    pub async fn default_branch(&self) -> Result<String> {
        let response = self
            .send("get_repository", self.http.get(self.repo_url("")))
            .await?;
        let repository: RepositoryResponse = parse_ok("get_repository", response).await?;
        Ok(repository.default_branch)
    }

    /// Whether every step of every job in `run_id` has avoided failure so far
    pub async fn workflow_succeeded(&self, run_id: u64) -> Result<bool> {
        let url = self.repo_url(&format!("/actions/runs/{}/jobs", run_id));
        let response = self.send("list_jobs", self.http.get(url)).await?;
        let jobs: JobsResponse = parse_ok("list_jobs", response).await?;

        let failed = jobs
            .jobs
            .iter()
            .flat_map(|job| job.steps.iter())
            .any(|step| step.conclusion.as_deref() == Some("failure"));

        Ok(!failed)
    }

    async fn store_request(
        &self,
        key: &str,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Response> {
        request.send().await.map_err(|e| {
            ReleaseError::Store(StoreError::Request {
                key: key.to_string(),
                reason: format!("{} failed: {}", operation, e),
            })
        })
    }
}

impl VariableStore for GitHubClient {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = self.repo_url(&format!("/actions/variables/{}", key));
        let response = self.store_request(key, "get", self.http.get(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = store_ok(key, "get", response).await?;
        let variable: VariableResponse = response.json().await.map_err(|e| StoreError::Request {
            key: key.to_string(),
            reason: format!("invalid response: {}", e),
        })?;

        Ok(Some(variable.value))
    }

    async fn create(&self, key: &str, value: &str) -> Result<()> {
        let url = self.repo_url("/actions/variables");
        let request = self.http.post(url).json(&VariableBody { name: key, value });
        let response = self.store_request(key, "create", request).await?;
        store_ok(key, "create", response).await?;

        log::debug!("Created variable {}", key);
        Ok(())
    }

    async fn update(&self, key: &str, value: &str) -> Result<()> {
        let url = self.repo_url(&format!("/actions/variables/{}", key));
        let request = self.http.patch(url).json(&VariableBody { name: key, value });
        let response = self.store_request(key, "update", request).await?;
        store_ok(key, "update", response).await?;

        log::debug!("Updated variable {}", key);
        Ok(())
    }
}

impl HistoryProvider for GitHubClient {
    async fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitRecord>> {
        let url = self.repo_url(&format!("/compare/{}...{}", base, head));
        let mut records = Vec::new();
        let mut page = 1usize;

        loop {
            let request = self
                .http
                .get(&url)
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let response = self.send("compare_commits", request).await?;
            let body: ComparePage = parse_ok("compare_commits", response).await?;

            let fetched = body.commits.len();
            records.extend(body.commits.into_iter().map(|c| CommitRecord {
                sha: c.sha,
                message: c.commit.message,
                committed_at: c.commit.committer.and_then(|s| s.date),
                author_login: c.author.map(|a| a.login),
            }));

            if fetched < PAGE_SIZE || records.len() >= body.total_commits {
                break;
            }
            page += 1;
        }

        log::debug!("Compared {}...{}: {} commits", base, head, records.len());
        Ok(records)
    }
}

impl ReleaseRegistry for GitHubClient {
    async fn create_release(&self, request: &ReleaseRequest) -> Result<CreatedRelease> {
        let body = CreateReleaseBody {
            tag_name: &request.tag_name,
            target_commitish: &request.target_commitish,
            name: &request.name,
            body: &request.body,
            draft: request.draft,
            prerelease: request.prerelease,
            generate_release_notes: request.generate_release_notes,
            discussion_category_name: request.discussion_category.as_deref(),
            make_latest: request.make_latest.as_deref(),
        };

        let response = self
            .send("create_release", self.http.post(self.repo_url("/releases")).json(&body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNPROCESSABLE_ENTITY if message.contains("already_exists") => {
                    ForgeError::ReleaseExists {
                        tag: request.tag_name.clone(),
                    }
                }
                StatusCode::NOT_FOUND if request.discussion_category.is_some() => {
                    ForgeError::CategoryNotFound {
                        category: request.discussion_category.clone().unwrap_or_default(),
                    }
                }
                _ => ForgeError::Api {
                    operation: "create_release".to_string(),
                    status: status.as_u16(),
                    message,
                },
            }
            .into());
        }

        let release: ReleaseResponse = response
            .json()
            .await
            .map_err(|e| transport("create_release", e))?;

        Ok(CreatedRelease {
            id: release.id,
            html_url: release.html_url,
            api_url: release.url,
            upload_url: release.upload_url,
            assets_url: release.assets_url,
        })
    }
}

impl AssetRegistry for GitHubClient {
    async fn upload_asset(
        &self,
        release: &CreatedRelease,
        name: &str,
        source: AssetSource,
    ) -> Result<UploadedAsset> {
        let endpoint = upload_endpoint(&release.upload_url, name)?;

        let (body, length) = match source {
            AssetSource::File(path) => {
                let unreadable = |e: std::io::Error| ForgeError::ArtifactUnreadable {
                    path: path.clone(),
                    reason: e.to_string(),
                };
                let file = tokio::fs::File::open(&path).await.map_err(unreadable)?;
                let length = file.metadata().await.map_err(unreadable)?.len();
                (reqwest::Body::wrap_stream(ReaderStream::new(file)), length)
            }
            AssetSource::Bytes(bytes) => {
                let length = bytes.len() as u64;
                (reqwest::Body::from(bytes), length)
            }
        };

        let request = self
            .http
            .post(endpoint)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, length)
            .body(body);

        let response = self.send("upload_asset", request).await?;
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ForgeError::AssetConflict {
                name: name.to_string(),
                release_id: release.id,
            }
            .into());
        }

        let asset: AssetResponse = parse_ok("upload_asset", response).await?;
        Ok(UploadedAsset {
            id: asset.id,
            url: asset.browser_download_url,
        })
    }
}

/// Upload URL for asset `name`: the template suffix (`{?name,label}`) is
/// dropped and `name` added as a query parameter
pub fn upload_endpoint(upload_url: &str, name: &str) -> Result<Url> {
    let base = upload_url
        .split_once('{')
        .map(|(base, _)| base)
        .unwrap_or(upload_url);

    let mut url = Url::parse(base).map_err(|e| ForgeError::Transport {
        operation: "upload_asset".to_string(),
        reason: format!("invalid upload URL {}: {}", base, e),
    })?;
    url.query_pairs_mut().append_pair("name", name);
    Ok(url)
}

fn transport(operation: &str, error: reqwest::Error) -> ReleaseError {
    ForgeError::Transport {
        operation: operation.to_string(),
        reason: error.to_string(),
    }
    .into()
}

async fn parse_ok<T: serde::de::DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ForgeError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            message,
        }
        .into());
    }

    response.json().await.map_err(|e| transport(operation, e))
}

async fn store_ok(key: &str, operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        key: key.to_string(),
        operation: operation.to_string(),
        status: status.as_u16(),
        message,
    }
    .into())
}
