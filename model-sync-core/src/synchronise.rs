//! High-level pipeline: working copy → change set → mapping → transformation → commit → review.
//!
//! [`SyncOrchestrator`] sequences the collaborators from [`crate::contract`] for a single run
//! described by a [`PipelineContext`]:
//!   - Acquires the working copy and creates the sync branch (both fatal on failure)
//!   - Resolves the change set; an empty set ends the run as a no-op
//!   - Maps every changed server model to a client model up front; unmapped paths are skipped
//!     and a client model claimed by an earlier server model is not rewritten twice
//!   - In review-request mode, reads server models at the review's head revision
//!   - Transforms and atomically rewrites each mapped client file. A failure on one file is
//!     recorded and the next file is still attempted
//!   - Commits and pushes once if anything was updated, then opens a review request
//!
//! # Errors
//! Failures after the per-file step (push rejected, review request refused, cancellation) are
//! returned as a [`SyncFailure`] carrying the outcome accumulated so far. Nothing is rolled back:
//! a created or pushed branch stays where it is.
//!
//! # Concurrency
//! Transformations run through a buffered stream bounded by `PipelineContext::workers`, so the
//! outcome lists keep change set order regardless of completion order.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::changeset::{self, ChangeSet, ChangeSource};
use crate::config::PipelineContext;
use crate::contract::{
    NewReviewRequest, RepositoryController, ReviewDiffSource, ReviewRequester, TransformRequest,
    Transformer, WorkingCopy,
};
use crate::error::{io_err, SyncError, SyncFailure};
use crate::mapper::{self, FileMapping};
use crate::outcome::{FailedFile, PipelineOutcome, Termination};
use crate::writer::atomic_write;

/// Result of processing one changed server model.
#[derive(Debug)]
enum FileResult {
    Updated(PathBuf),
    Skipped(String),
    Failed(FailedFile),
    Cancelled,
}

enum Planned {
    Skip(String),
    Conflict(FailedFile),
    Rewrite(FileMapping),
}

/// Sequences one synchronisation run over the given collaborators.
pub struct SyncOrchestrator<'a> {
    repository: &'a dyn RepositoryController,
    diff_source: &'a dyn ReviewDiffSource,
    reviews: &'a dyn ReviewRequester,
    transformer: &'a dyn Transformer,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        repository: &'a dyn RepositoryController,
        diff_source: &'a dyn ReviewDiffSource,
        reviews: &'a dyn ReviewRequester,
        transformer: &'a dyn Transformer,
    ) -> Self {
        Self {
            repository,
            diff_source,
            reviews,
            transformer,
        }
    }

    pub async fn run(
        &self,
        ctx: &PipelineContext,
        source: &ChangeSource,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, SyncFailure> {
        info!("[SYNC] Starting client model synchronisation");
        ctx.trace_loaded();

        // --- Step 1: Acquire ---
        let wc = guarded(
            cancel,
            self.repository
                .acquire(&ctx.source_url, &ctx.working_copy, &ctx.base_branch),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Failed to acquire working copy");
            SyncFailure::early(e)
        })?;
        info!(path = %wc.root.display(), reused = wc.reused, "[SYNC] Working copy ready");

        // --- Step 2: Branch ---
        self.repository
            .branch(&wc, &ctx.target_branch)
            .await
            .map_err(|e| {
                error!(error = %e, branch = %ctx.target_branch, "[SYNC][ERROR] Failed to create branch");
                SyncFailure::early(e)
            })?;

        // --- Step 3: Resolve ---
        let change_set = guarded(
            cancel,
            changeset::resolve(source, &ctx.server_prefix, self.diff_source),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Failed to resolve change set");
            SyncFailure::early(e)
        })?;

        let mut outcome = PipelineOutcome::default();
        if change_set.is_empty() {
            info!("[SYNC] No server model changes under prefix, nothing to do");
            outcome.termination = Termination::NoChangesDetected;
            outcome.trace_summary();
            return Ok(outcome);
        }

        // Review mode reads server models as the review proposes them, not as the base has them.
        let server_revision = match source {
            ChangeSource::ReviewRequest(id) => Some(
                guarded(cancel, self.repository.fetch_review_head(&wc, *id))
                    .await
                    .map_err(|e| {
                        error!(error = %e, review_id = id, "[SYNC][ERROR] Failed to fetch review head");
                        SyncFailure::early(e)
                    })?,
            ),
            ChangeSource::Explicit(_) => None,
        };

        // --- Step 4: Map, transform, write back ---
        let planned = plan(ctx, &wc, change_set);
        let wc = &wc;
        let server_revision = server_revision.as_deref();
        let mut cancelled = false;
        let mut results = stream::iter(planned)
            .map(|planned| async move {
                match planned {
                    Planned::Skip(server_path) => FileResult::Skipped(server_path),
                    Planned::Conflict(failed) => FileResult::Failed(failed),
                    Planned::Rewrite(mapping) => {
                        self.process_file(ctx, wc, mapping, server_revision, cancel)
                            .await
                    }
                }
            })
            .buffered(ctx.workers);
        while let Some(result) = results.next().await {
            match result {
                FileResult::Updated(path) => outcome.updated.push(path),
                FileResult::Skipped(path) => outcome.skipped.push(path),
                FileResult::Failed(failed) => outcome.failed.push(failed),
                FileResult::Cancelled => cancelled = true,
            }
        }
        drop(results);

        if cancelled {
            warn!("[SYNC] Run cancelled during transformation");
            return Err(SyncFailure::new(SyncError::Cancelled, outcome));
        }

        // --- Step 5: Anything to publish? ---
        if outcome.updated.is_empty() {
            info!(
                skipped = outcome.skipped.len(),
                failed = outcome.failed.len(),
                "[SYNC] No client model was updated, skipping commit and review request"
            );
            outcome.termination = Termination::NothingUpdated;
            outcome.trace_summary();
            return Ok(outcome);
        }

        // --- Step 6: Commit & push ---
        match guarded(
            cancel,
            self.repository
                .commit_and_push(wc, &ctx.commit_message, &ctx.target_branch),
        )
        .await
        {
            Ok(()) => info!(branch = %ctx.target_branch, "[SYNC] Changes committed and pushed"),
            Err(SyncError::NoChanges) => {
                warn!("[SYNC] Commit found nothing staged, ending run without review request");
                outcome.termination = Termination::NothingToCommit;
                outcome.trace_summary();
                return Ok(outcome);
            }
            Err(e) => {
                error!(error = %e, "[SYNC][ERROR] Commit/push failed");
                return Err(SyncFailure::new(e, outcome));
            }
        }

        // --- Step 7: Review request ---
        let request = NewReviewRequest {
            head_branch: &ctx.target_branch,
            base_branch: &ctx.base_branch,
            title: &ctx.review_title,
            body: &ctx.review_body,
        };
        match guarded(cancel, self.reviews.open(request)).await {
            Ok(url) => {
                info!(url = %url, "[SYNC] Review request opened");
                outcome.review_url = Some(url);
            }
            Err(e) => {
                error!(
                    error = %e,
                    branch = %ctx.target_branch,
                    "[SYNC][ERROR] Review request failed; the branch is already pushed"
                );
                return Err(SyncFailure::new(e, outcome));
            }
        }

        outcome.termination = Termination::Completed;
        outcome.trace_summary();
        Ok(outcome)
    }

    async fn process_file(
        &self,
        ctx: &PipelineContext,
        wc: &WorkingCopy,
        mapping: FileMapping,
        server_revision: Option<&str>,
        cancel: &CancellationToken,
    ) -> FileResult {
        if cancel.is_cancelled() {
            return FileResult::Cancelled;
        }

        info!(
            server_path = %mapping.server_path,
            client_path = %mapping.client_path.display(),
            "[SYNC] Updating client model"
        );
        let client_abs = wc.root.join(&mapping.client_path);
        let fail = |detail: String| {
            error!(
                server_path = %mapping.server_path,
                client_path = %mapping.client_path.display(),
                detail = %detail,
                "[SYNC][ERROR] Client model update failed"
            );
            FileResult::Failed(FailedFile {
                server_path: mapping.server_path.clone(),
                client_path: mapping.client_path.clone(),
                detail,
            })
        };

        let server_model = match server_revision {
            Some(revision) => {
                let read = self
                    .repository
                    .read_file_at(wc, revision, &mapping.server_path);
                match guarded(cancel, read).await {
                    Ok(content) => content,
                    Err(SyncError::Cancelled) => return FileResult::Cancelled,
                    Err(e) => return fail(e.to_string()),
                }
            }
            None => {
                let server_abs = wc.root.join(&mapping.server_path);
                match tokio::fs::read_to_string(&server_abs).await {
                    Ok(content) => content,
                    Err(e) => return fail(io_err(&server_abs, e).to_string()),
                }
            }
        };
        let client_model = match tokio::fs::read_to_string(&client_abs).await {
            Ok(content) => content,
            Err(e) => return fail(io_err(&client_abs, e).to_string()),
        };

        let request = TransformRequest {
            server_model: &server_model,
            client_model: &client_model,
            style_instructions: ctx.style_instructions.as_deref(),
        };
        let new_content = match guarded(cancel, self.transformer.transform(request)).await {
            Ok(content) => content,
            Err(SyncError::Cancelled) => return FileResult::Cancelled,
            Err(e) => return fail(e.to_string()),
        };

        match atomic_write(&client_abs, &new_content) {
            Ok(()) => {
                info!(client_path = %mapping.client_path.display(), "[SYNC] Client model rewritten");
                FileResult::Updated(mapping.client_path.clone())
            }
            Err(e) => fail(e.to_string()),
        }
    }
}

/// Map every changed path before anything is transformed.
///
/// Each client model is claimed by the first server model that maps to it; later server
/// models mapping to the same client file are recorded as failed and never transformed.
fn plan(ctx: &PipelineContext, wc: &WorkingCopy, change_set: ChangeSet) -> Vec<Planned> {
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    let mut planned = Vec::with_capacity(change_set.len());
    for server_path in change_set {
        let mapping = mapper::map(&server_path, &wc.root, &ctx.client_dir, &ctx.naming);
        if !mapping.exists {
            warn!(
                server_path = %server_path,
                candidate = %mapping.client_path.display(),
                "[SYNC] No matching client model, skipping"
            );
            planned.push(Planned::Skip(server_path));
            continue;
        }
        if let Some(owner) = claimed.get(&mapping.client_path) {
            warn!(
                server_path = %server_path,
                client_path = %mapping.client_path.display(),
                owner = %owner,
                "[SYNC] Client model already targeted by another server model"
            );
            planned.push(Planned::Conflict(FailedFile {
                detail: format!("client model already targeted by {owner}"),
                server_path,
                client_path: mapping.client_path,
            }));
            continue;
        }
        claimed.insert(mapping.client_path.clone(), server_path);
        planned.push(Planned::Rewrite(mapping));
    }
    planned
}

/// Await `fut` unless `cancel` fires first.
async fn guarded<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}
