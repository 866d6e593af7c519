use std::path::Path;
use std::process::Output;
use std::sync::OnceLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;

use crate::config::CommitAuthor;
use crate::contract::{RepositoryController, WorkingCopy};
use crate::error::{io_err, SyncError};

/// [`RepositoryController`] backed by the `git` binary.
///
/// HTTPS remotes get the access token embedded as `x-access-token:<token>@host`;
/// SSH and local-path remotes are used unchanged. Remote URLs and git's stderr are
/// redacted before they reach a log line or an error message.
pub struct GitRepository {
    credentials: Option<SecretString>,
    author: Option<CommitAuthor>,
}

impl GitRepository {
    pub fn new(credentials: Option<SecretString>, author: Option<CommitAuthor>) -> Self {
        Self {
            credentials,
            author,
        }
    }

    fn remote_url(&self, source_url: &str) -> String {
        match &self.credentials {
            Some(token) => authenticated_url(source_url, token.expose_secret()),
            None => source_url.to_string(),
        }
    }

    /// Redact credentials from git output, including the raw token if git echoed it.
    fn scrub(&self, text: &str) -> String {
        let redacted = redact_url(text);
        match &self.credentials {
            Some(token) if !token.expose_secret().is_empty() => {
                redacted.replace(token.expose_secret(), "***")
            }
            _ => redacted,
        }
    }

    async fn git(&self, dir: Option<&Path>, args: &[&str]) -> Result<Output, SyncError> {
        let mut cmd = Command::new("git");
        if let Some(dir) = dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        cmd.output().await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to launch git process");
            SyncError::Git(format!("failed to run git: {e}"))
        })
    }

    fn stderr(&self, output: &Output) -> String {
        self.scrub(String::from_utf8_lossy(&output.stderr).trim())
    }

    async fn is_work_tree(&self, dir: &Path) -> bool {
        self.git(Some(dir), &["rev-parse", "--is-inside-work-tree"])
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn reuse(
        &self,
        remote: &str,
        destination: &Path,
        reference: &str,
    ) -> Result<WorkingCopy, SyncError> {
        let origin_ref = format!("origin/{reference}");
        // Discard tracked and untracked leftovers of an earlier run.
        let steps: [&[&str]; 5] = [
            &["remote", "set-url", "origin", remote],
            &["fetch", "origin"],
            &["reset", "--hard"],
            &["clean", "-fd"],
            &["checkout", "-B", reference, origin_ref.as_str()],
        ];

        for args in steps {
            let output = self.git(Some(destination), args).await?;
            if !output.status.success() {
                let detail = self.stderr(&output);
                tracing::error!(
                    path = %destination.display(),
                    step = args[0],
                    stderr = %detail,
                    "Failed to refresh existing working copy"
                );
                return Err(SyncError::Acquisition(format!(
                    "git {} failed in {}: {detail}",
                    args[0],
                    destination.display()
                )));
            }
        }

        tracing::info!(
            path = %destination.display(),
            reference,
            "Reused existing working copy"
        );
        Ok(WorkingCopy {
            root: destination.to_path_buf(),
            reused: true,
        })
    }
}

#[async_trait::async_trait]
impl RepositoryController for GitRepository {
    async fn acquire(
        &self,
        source_url: &str,
        destination: &Path,
        reference: &str,
    ) -> Result<WorkingCopy, SyncError> {
        let remote = self.remote_url(source_url);
        let display_url = redact_url(source_url);

        if destination.exists() {
            let populated = std::fs::read_dir(destination)
                .map_err(|e| io_err(destination, e))?
                .next()
                .is_some();
            if populated {
                if !destination.join(".git").exists() || !self.is_work_tree(destination).await {
                    tracing::error!(
                        path = %destination.display(),
                        "Destination is not empty and is not a git working copy"
                    );
                    return Err(SyncError::Acquisition(format!(
                        "destination {} is not empty and is not a git working copy",
                        destination.display()
                    )));
                }
                return self.reuse(&remote, destination, reference).await;
            }
        } else if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
                tracing::debug!(path = %parent.display(), "Created working copy parent directory");
            }
        }

        let dest_str = destination.to_string_lossy();
        let output = self
            .git(None, &["clone", remote.as_str(), dest_str.as_ref()])
            .await?;
        if !output.status.success() {
            let detail = self.stderr(&output);
            tracing::error!(
                repo_url = %display_url,
                path = %destination.display(),
                stderr = %detail,
                "Git clone exited with non-zero code: {}", output.status
            );
            return Err(SyncError::Acquisition(format!(
                "git clone of {display_url} failed: {detail}"
            )));
        }
        tracing::info!(
            repo_url = %display_url,
            path = %destination.display(),
            "Successfully cloned git repository"
        );

        let output = self.git(Some(destination), &["checkout", reference]).await?;
        if !output.status.success() {
            let detail = self.stderr(&output);
            tracing::error!(
                repo_url = %display_url,
                reference,
                stderr = %detail,
                "Git checkout exited with non-zero code: {}", output.status
            );
            return Err(SyncError::Acquisition(format!(
                "checkout of '{reference}' failed: {detail}"
            )));
        }
        tracing::info!(reference, "Checked out git reference");

        Ok(WorkingCopy::new(destination))
    }

    async fn fetch_review_head(
        &self,
        working_copy: &WorkingCopy,
        review_id: u64,
    ) -> Result<String, SyncError> {
        let refspec = format!("refs/pull/{review_id}/head");
        let output = self
            .git(Some(&working_copy.root), &["fetch", "origin", refspec.as_str()])
            .await?;
        if !output.status.success() {
            let detail = self.stderr(&output);
            tracing::error!(review_id, stderr = %detail, "Failed to fetch review request head");
            return Err(SyncError::Acquisition(format!(
                "fetch of review request #{review_id} failed: {detail}"
            )));
        }

        let output = self
            .git(Some(&working_copy.root), &["rev-parse", "FETCH_HEAD"])
            .await?;
        if !output.status.success() {
            return Err(SyncError::Git(format!(
                "git rev-parse FETCH_HEAD failed: {}",
                self.stderr(&output)
            )));
        }
        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::info!(review_id, revision = %revision, "Fetched review request head");
        Ok(revision)
    }

    async fn read_file_at(
        &self,
        working_copy: &WorkingCopy,
        revision: &str,
        path: &str,
    ) -> Result<String, SyncError> {
        let object = format!("{revision}:{path}");
        let output = self
            .git(Some(&working_copy.root), &["show", object.as_str()])
            .await?;
        if !output.status.success() {
            return Err(SyncError::Git(format!(
                "{path} is not readable at {revision}: {}",
                self.stderr(&output)
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| SyncError::Git(format!("{path} at {revision} is not UTF-8: {e}")))
    }

    async fn branch(&self, working_copy: &WorkingCopy, name: &str) -> Result<(), SyncError> {
        let local_ref = format!("refs/heads/{name}");
        let exists = self
            .git(
                Some(&working_copy.root),
                &["rev-parse", "--verify", "--quiet", local_ref.as_str()],
            )
            .await?;
        if exists.status.success() {
            tracing::error!(branch = name, "Branch already exists in working copy");
            return Err(SyncError::BranchConflict(name.to_string()));
        }

        let output = self
            .git(Some(&working_copy.root), &["checkout", "-b", name])
            .await?;
        if !output.status.success() {
            let detail = self.stderr(&output);
            if detail.contains("already exists") {
                return Err(SyncError::BranchConflict(name.to_string()));
            }
            return Err(SyncError::Git(format!(
                "git checkout -b {name} failed: {detail}"
            )));
        }
        tracing::info!(branch = name, "Created and switched to branch");
        Ok(())
    }

    async fn commit_and_push(
        &self,
        working_copy: &WorkingCopy,
        message: &str,
        branch: &str,
    ) -> Result<(), SyncError> {
        let root = working_copy.root.as_path();

        let output = self.git(Some(root), &["add", "-A"]).await?;
        if !output.status.success() {
            return Err(SyncError::Git(format!(
                "git add failed: {}",
                self.stderr(&output)
            )));
        }

        let staged = self
            .git(Some(root), &["diff", "--cached", "--quiet"])
            .await?;
        match staged.status.code() {
            Some(0) => {
                tracing::warn!(branch, "Nothing staged, skipping commit");
                return Err(SyncError::NoChanges);
            }
            Some(1) => {}
            _ => {
                return Err(SyncError::Git(format!(
                    "git diff --cached failed: {}",
                    self.stderr(&staged)
                )))
            }
        }

        let mut commit_args: Vec<String> = Vec::new();
        if let Some(author) = &self.author {
            commit_args.extend([
                "-c".to_string(),
                format!("user.name={}", author.name),
                "-c".to_string(),
                format!("user.email={}", author.email),
            ]);
        }
        commit_args.extend(["commit".to_string(), "-m".to_string(), message.to_string()]);
        let commit_args: Vec<&str> = commit_args.iter().map(String::as_str).collect();
        let output = self.git(Some(root), &commit_args).await?;
        if !output.status.success() {
            return Err(SyncError::Git(format!(
                "git commit failed: {}",
                self.stderr(&output)
            )));
        }
        tracing::info!(branch, "Committed staged changes");

        let output = self
            .git(Some(root), &["push", "-u", "origin", branch])
            .await?;
        if !output.status.success() {
            let detail = self.stderr(&output);
            tracing::error!(branch, stderr = %detail, "Push rejected by remote");
            return Err(SyncError::PushRejected {
                branch: branch.to_string(),
                detail,
            });
        }
        tracing::info!(branch, "Pushed branch with upstream tracking");
        Ok(())
    }
}

/// Embed `token` into an HTTPS remote URL. Other URL forms are returned unchanged.
pub fn authenticated_url(url: &str, token: &str) -> String {
    match url.strip_prefix("https://") {
        Some(rest) if !token.is_empty() => {
            let authority = rest.split('/').next().unwrap_or(rest);
            if authority.contains('@') {
                url.to_string()
            } else {
                format!("https://x-access-token:{token}@{rest}")
            }
        }
        _ => url.to_string(),
    }
}

/// Replace any `user:password@` section of URLs in `text` with `***@`.
pub fn redact_url(text: &str) -> String {
    static USERINFO: OnceLock<Regex> = OnceLock::new();
    let re = USERINFO.get_or_init(|| {
        Regex::new(r"(?i)\b([a-z][a-z0-9+.-]*://)[^/@\s]+@").expect("userinfo regex")
    });
    re.replace_all(text, "${1}***@").into_owned()
}
