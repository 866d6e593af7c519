#![doc = "GitHub integration: bridges the review-host traits from model-sync-core to the GitHub REST API."]
//
//! # Review host (CLI <-> Core)
//!
//! [`GitHubClient`] implements both [`ReviewDiffSource`] (list the files of a pull request)
//! and [`ReviewRequester`] (open a pull request) for one `owner/name` repository.
//!
//! - Construct it with the API base URL, the repository identifier and a token.
//! - All transport, serialization and status handling stays inside this module; the
//!   orchestrator only ever sees [`SyncError::ReviewRequest`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use model_sync_core::contract::{NewReviewRequest, ReviewDiffSource, ReviewRequester};
use model_sync_core::SyncError;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const PER_PAGE: usize = 100;
// GitHub stops listing pull request files after 3000 entries.
const MAX_PAGES: usize = 30;

pub struct GitHubClient {
    http: Client,
    api_url: String,
    owner: String,
    repo: String,
    token: SecretString,
}

#[derive(Debug, Deserialize)]
struct PullFile {
    filename: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct CreatePull<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedPull {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

impl GitHubClient {
    /// `repository` is the `owner/name` identifier of the target repository.
    pub fn new(api_url: &str, repository: &str, token: SecretString) -> Result<Self> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| anyhow!("repository must be in 'owner/name' format, got {repository:?}"))?;
        let http = Client::builder()
            .user_agent(concat!("model-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building GitHub HTTP client")?;
        tracing::info!(
            api_url,
            owner,
            repo,
            token_set = !token.expose_secret().is_empty(),
            "Initialized GitHubClient"
        );
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token,
        })
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.token.expose_secret())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn pulls_url(&self) -> String {
        format!("{}/repos/{}/{}/pulls", self.api_url, self.owner, self.repo)
    }
}

/// Turn a non-success response into a readable message, preferring GitHub's own error text.
async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&text) {
        Ok(api) => {
            let details: Vec<String> = api.errors.into_iter().filter_map(|e| e.message).collect();
            if details.is_empty() {
                format!("HTTP {status}: {}", api.message)
            } else {
                format!("HTTP {status}: {} ({})", api.message, details.join("; "))
            }
        }
        Err(_) => format!("HTTP {status}: {text}"),
    }
}

#[async_trait]
impl ReviewDiffSource for GitHubClient {
    async fn changed_files(&self, review_id: u64) -> Result<Vec<String>, SyncError> {
        tracing::info!(
            owner = %self.owner,
            repo = %self.repo,
            review_id,
            "Listing pull request files"
        );
        let url = format!("{}/{review_id}/files", self.pulls_url());
        let mut files = Vec::new();

        for page in 1..=MAX_PAGES {
            let response = self
                .authorised(self.http.get(&url))
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(error = ?e, review_id, "Failed to reach GitHub");
                    SyncError::ReviewRequest(format!("failed to reach GitHub: {e}"))
                })?;

            if !response.status().is_success() {
                let detail = describe_failure(response).await;
                tracing::error!(review_id, detail = %detail, "Failed to list pull request files");
                return Err(SyncError::ReviewRequest(detail));
            }

            let batch: Vec<PullFile> = response.json().await.map_err(|e| {
                SyncError::ReviewRequest(format!("malformed pull request file list: {e}"))
            })?;
            let size = batch.len();
            files.extend(
                batch
                    .into_iter()
                    .filter(|f| f.status != "removed")
                    .map(|f| f.filename),
            );
            if size < PER_PAGE {
                break;
            }
        }

        tracing::info!(review_id, count = files.len(), "Fetched pull request files");
        Ok(files)
    }
}

#[async_trait]
impl ReviewRequester for GitHubClient {
    async fn open<'a>(&self, request: NewReviewRequest<'a>) -> Result<String, SyncError> {
        tracing::info!(
            head = request.head_branch,
            base = request.base_branch,
            title = request.title,
            "Creating pull request"
        );
        let body = CreatePull {
            title: request.title,
            head: request.head_branch,
            base: request.base_branch,
            body: request.body,
        };
        let response = self
            .authorised(self.http.post(self.pulls_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Failed to reach GitHub");
                SyncError::ReviewRequest(format!("failed to reach GitHub: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = describe_failure(response).await;
            tracing::error!(detail = %detail, "GitHub refused to create pull request");
            return Err(SyncError::ReviewRequest(detail));
        }

        let created: CreatedPull = response.json().await.map_err(|e| {
            SyncError::ReviewRequest(format!("malformed create pull request response: {e}"))
        })?;
        tracing::info!(url = %created.html_url, "Successfully created pull request");
        Ok(created.html_url)
    }
}
