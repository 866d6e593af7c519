//! Error taxonomy for the synchronisation pipeline.
//!
//! Every collaborator trait in [`crate::contract`] reports failures as a [`SyncError`],
//! so the orchestrator can decide between aborting the run, terminating benignly,
//! or recording a per-file failure without inspecting adapter-specific error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::outcome::PipelineOutcome;

/// All errors that can arise while synchronising client models.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The working copy could not be cloned, fetched or reused.
    #[error("failed to acquire working copy: {0}")]
    Acquisition(String),

    /// The branch to create already exists in the working copy.
    #[error("branch '{0}' already exists in the working copy")]
    BranchConflict(String),

    /// Nothing was staged at commit time. Callers treat this as a benign abort.
    #[error("no changes staged for commit")]
    NoChanges,

    /// The remote refused the push (non-fast-forward, permissions, ...).
    #[error("push of branch '{branch}' was rejected: {detail}")]
    PushRejected { branch: String, detail: String },

    /// The transformation service failed or returned an unusable response.
    #[error("transformation service error: {0}")]
    TransformationService(String),

    /// The hosting platform refused to create (or list) a review request.
    #[error("review request error: {0}")]
    ReviewRequest(String),

    /// A required credential was not present in the environment.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// A git invocation failed outside of the classified cases above.
    #[error("git error: {0}")]
    Git(String),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller cancelled the run.
    #[error("synchronisation cancelled")]
    Cancelled,
}

impl SyncError {
    /// True for failures that mean "nothing to do" rather than "something broke".
    pub fn is_benign(&self) -> bool {
        matches!(self, SyncError::NoChanges)
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// A fatal pipeline error together with whatever outcome had accumulated when it occurred.
///
/// Push rejections, review-request failures and cancellations happen after files were
/// already rewritten, so the caller still needs to see which files were touched.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct SyncFailure {
    #[source]
    pub error: SyncError,
    pub outcome: PipelineOutcome,
}

impl SyncFailure {
    pub fn new(error: SyncError, outcome: PipelineOutcome) -> Self {
        Self { error, outcome }
    }

    /// A failure that happened before any per-file work was attempted.
    pub fn early(error: SyncError) -> Self {
        Self::new(error, PipelineOutcome::default())
    }
}
