use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info};

/// How a run ended. Everything except `Completed` is a benign no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Files were updated, committed and pushed.
    #[default]
    Completed,
    /// The change set was empty after filtering.
    NoChangesDetected,
    /// Files were processed but none ended up updated.
    NothingUpdated,
    /// The commit step found an empty index.
    NothingToCommit,
}

/// A mapped client file whose transformation or write-back failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub server_path: String,
    pub client_path: PathBuf,
    pub detail: String,
}

/// The single artifact a run returns to its caller.
///
/// Client paths are relative to the working copy root; skipped entries are the
/// server paths that had no client counterpart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub updated: Vec<PathBuf>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedFile>,
    pub review_url: Option<String>,
    pub termination: Termination,
}

impl PipelineOutcome {
    pub fn is_noop(&self) -> bool {
        self.termination != Termination::Completed
    }

    pub fn trace_summary(&self) {
        info!(
            updated = self.updated.len(),
            skipped = self.skipped.len(),
            failed = self.failed.len(),
            termination = ?self.termination,
            review_url = self.review_url.as_deref().unwrap_or("<none>"),
            "[SYNC] Pipeline outcome"
        );
        match serde_json::to_string_pretty(self) {
            Ok(json) => debug!(json = %json, "[SYNC][DEBUG] Pipeline outcome as JSON"),
            Err(e) => error!(error = ?e, "[SYNC][DEBUG] Failed to serialize outcome as JSON"),
        }
    }
}
