//! # contract: narrow interfaces to the pipeline's external collaborators
//!
//! The synchronisation pipeline talks to four outside systems: a version-control
//! remote, the review-hosting platform (twice: to list a review's files and to
//! open a new review) and a generative transformation service. Each one is a
//! small async trait here, so the orchestrator can be driven by real adapters
//! in the binary and by generated mocks in tests.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; with the `test-export-mocks` feature
//!   (on by default) the `Mock*` types are available to downstream test suites.
//!
//! ## Errors
//! - All methods report failures as [`SyncError`] variants, already classified
//!   (fatal, benign, per-file) so the orchestrator never inspects adapter errors.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::SyncError;

/// A local checkout owned by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub root: PathBuf,
    /// True when an existing checkout at the destination was fetched and reused.
    pub reused: bool,
}

impl WorkingCopy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reused: false,
        }
    }
}

/// Input for one transformation call.
pub struct TransformRequest<'a> {
    /// Full text of the changed server model.
    pub server_model: &'a str,
    /// Full text of the current client model.
    pub client_model: &'a str,
    /// Optional formatting or convention hints for the generated code.
    pub style_instructions: Option<&'a str>,
}

/// The minimal data needed to open a review request.
pub struct NewReviewRequest<'a> {
    pub head_branch: &'a str,
    pub base_branch: &'a str,
    pub title: &'a str,
    pub body: &'a str,
}

/// Working copy lifecycle against a version-control remote.
///
/// Every method mutates state outside the process (local disk, remote) and nothing
/// is rolled back when a later step fails.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryController: Send + Sync {
    /// Obtain a full working copy of `source_url` at `destination`, checked out at `reference`.
    async fn acquire(
        &self,
        source_url: &str,
        destination: &Path,
        reference: &str,
    ) -> Result<WorkingCopy, SyncError>;

    /// Fetch the head of review request `review_id` and return its revision id.
    ///
    /// The working tree is left untouched.
    async fn fetch_review_head(
        &self,
        working_copy: &WorkingCopy,
        review_id: u64,
    ) -> Result<String, SyncError>;

    /// Read a repository-relative file as it is at `revision`.
    async fn read_file_at(
        &self,
        working_copy: &WorkingCopy,
        revision: &str,
        path: &str,
    ) -> Result<String, SyncError>;

    /// Create and switch to a new local branch from the current head.
    async fn branch(&self, working_copy: &WorkingCopy, name: &str) -> Result<(), SyncError>;

    /// Stage everything, commit with `message` and push `branch` with upstream tracking.
    ///
    /// Returns [`SyncError::NoChanges`] when nothing was staged.
    async fn commit_and_push(
        &self,
        working_copy: &WorkingCopy,
        message: &str,
        branch: &str,
    ) -> Result<(), SyncError>;
}

/// Lists the files touched by an existing review request.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReviewDiffSource: Send + Sync {
    async fn changed_files(&self, review_id: u64) -> Result<Vec<String>, SyncError>;
}

/// Opens review requests on the hosting platform.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReviewRequester: Send + Sync {
    /// Create a review request from `head_branch` into `base_branch`, returning its URL.
    async fn open<'a>(&self, request: NewReviewRequest<'a>) -> Result<String, SyncError>;
}

/// Rewrites a client model so it matches a server model.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Returns the replacement client model text, trimmed and non-empty.
    async fn transform<'a>(&self, request: TransformRequest<'a>) -> Result<String, SyncError>;
}
