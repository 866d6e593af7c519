use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::mapper::NamingRule;

/// Identity used for the synchronisation commit when the working copy has none configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Immutable configuration for one synchronisation run.
///
/// Built once by the caller and handed to every component by reference. The
/// credentials handle is a [`SecretString`], so it never shows up in `Debug`
/// output or log fields.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Remote to clone, without credentials.
    pub source_url: String,
    /// Branch the rewritten client models are committed to.
    pub target_branch: String,
    /// Branch the review request targets (and the working copy starts from).
    pub base_branch: String,
    /// Local path owned by the working copy.
    pub working_copy: PathBuf,
    /// Flat directory of client model files, relative to the working copy root.
    pub client_dir: PathBuf,
    /// Only server paths starting with this prefix are considered.
    pub server_prefix: String,
    pub naming: NamingRule,
    pub credentials: SecretString,
    pub author: Option<CommitAuthor>,
    pub commit_message: String,
    pub review_title: String,
    pub review_body: String,
    /// Extra instructions forwarded to the transformation service (formatting, conventions).
    pub style_instructions: Option<String>,
    /// Upper bound on concurrent transformations. 1 keeps the run strictly sequential.
    pub workers: usize,
}

impl PipelineContext {
    pub fn new(
        source_url: impl Into<String>,
        working_copy: impl Into<PathBuf>,
        credentials: SecretString,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            target_branch: "auto-model-sync".to_string(),
            base_branch: "main".to_string(),
            working_copy: working_copy.into(),
            client_dir: PathBuf::new(),
            server_prefix: String::new(),
            naming: NamingRule::default(),
            credentials,
            author: None,
            commit_message: "Update client models".to_string(),
            review_title: "Update client models".to_string(),
            review_body: "This pull request was created automatically to keep client models in sync with the server models.".to_string(),
            style_instructions: None,
            workers: 1,
        }
    }

    #[must_use]
    pub fn with_branches(mut self, target: impl Into<String>, base: impl Into<String>) -> Self {
        self.target_branch = target.into();
        self.base_branch = base.into();
        self
    }

    #[must_use]
    pub fn with_client_dir(mut self, client_dir: impl Into<PathBuf>) -> Self {
        self.client_dir = client_dir.into();
        self
    }

    #[must_use]
    pub fn with_server_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.server_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_naming(mut self, naming: NamingRule) -> Self {
        self.naming = naming;
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: Option<CommitAuthor>) -> Self {
        self.author = author;
        self
    }

    #[must_use]
    pub fn with_messages(
        mut self,
        commit_message: impl Into<String>,
        review_title: impl Into<String>,
        review_body: impl Into<String>,
    ) -> Self {
        self.commit_message = commit_message.into();
        self.review_title = review_title.into();
        self.review_body = review_body.into();
        self
    }

    #[must_use]
    pub fn with_style_instructions(mut self, instructions: Option<String>) -> Self {
        self.style_instructions = instructions;
        self
    }

    /// Sets the worker count; zero is treated as one.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Absolute location of the client model directory inside the working copy.
    pub fn client_dir_path(&self) -> PathBuf {
        self.working_copy.join(&self.client_dir)
    }

    pub fn trace_loaded(&self) {
        info!(
            source_url = %crate::repository::redact_url(&self.source_url),
            target_branch = %self.target_branch,
            base_branch = %self.base_branch,
            working_copy = %self.working_copy.display(),
            client_dir = %self.client_dir.display(),
            server_prefix = %self.server_prefix,
            workers = self.workers,
            "Loaded PipelineContext"
        );
        debug!(?self, "PipelineContext loaded (full debug)");
    }
}
