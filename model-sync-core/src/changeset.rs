//! Change detection: which server model files need their client counterparts rewritten.

use std::path::{Component, Path};

use tracing::{debug, info, warn};

use crate::contract::ReviewDiffSource;
use crate::error::SyncError;

/// Where the list of changed server models comes from. The two modes are exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSource {
    /// Repository-relative paths supplied by the caller.
    Explicit(Vec<String>),
    /// The file list of an existing review request on the hosting platform.
    ReviewRequest(u64),
}

/// Ordered, deduplicated server model paths. Insertion order is discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: Vec<String>,
}

impl ChangeSet {
    /// Builds a change set from `candidates`, keeping paths under `prefix` and the first
    /// occurrence of each duplicate.
    pub fn filtered<I, S>(candidates: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefix = normalise(prefix);
        let mut paths: Vec<String> = Vec::new();
        for candidate in candidates {
            let path = normalise(candidate.as_ref());
            if path.is_empty() || !path.starts_with(prefix) {
                continue;
            }
            if escapes_working_copy(path) {
                warn!(path, "Ignoring server model path outside the working copy");
                continue;
            }
            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl IntoIterator for ChangeSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

/// Absolute paths and `..` components could resolve outside the working copy.
fn escapes_working_copy(path: &str) -> bool {
    Path::new(path).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

fn normalise(path: &str) -> &str {
    let trimmed = path.trim();
    trimmed.strip_prefix("./").unwrap_or(trimmed)
}

/// Resolve the change set for a run.
///
/// An empty result is not an error; the orchestrator treats it as a clean no-op.
pub async fn resolve<D>(
    source: &ChangeSource,
    prefix: &str,
    diff_source: &D,
) -> Result<ChangeSet, SyncError>
where
    D: ReviewDiffSource + ?Sized,
{
    let change_set = match source {
        ChangeSource::Explicit(files) => {
            debug!(supplied = files.len(), "Resolving change set from explicit file list");
            ChangeSet::filtered(files, prefix)
        }
        ChangeSource::ReviewRequest(id) => {
            debug!(review_id = id, "Resolving change set from review request diff");
            let files = diff_source.changed_files(*id).await?;
            debug!(review_id = id, listed = files.len(), "Review request files listed");
            ChangeSet::filtered(files, prefix)
        }
    };
    info!(
        prefix,
        changed = change_set.len(),
        "Resolved server model change set"
    );
    Ok(change_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockReviewDiffSource;

    #[test]
    fn filtered_keeps_prefix_matches_in_order() {
        let set = ChangeSet::filtered(
            ["models/User.py", "app.py", "models/Support.py", "./models/Users.py"],
            "models/",
        );
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec!["models/User.py", "models/Support.py", "models/Users.py"]
        );
    }

    #[test]
    fn filtered_deduplicates_keeping_first() {
        let set = ChangeSet::filtered(
            ["models/B.py", "models/A.py", "models/B.py"],
            "models",
        );
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["models/B.py", "models/A.py"]);
    }

    #[test]
    fn paths_leaving_the_working_copy_are_dropped() {
        let set = ChangeSet::filtered(
            [
                "models/../../etc/x.py",
                "models/sub/../User.py",
                "/models/Abs.py",
                "models/Support.py",
            ],
            "",
        );
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["models/Support.py"]);
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let set = ChangeSet::filtered(["a.py", "b/c.py"], "");
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn explicit_mode_never_queries_the_platform() {
        let mut diff = MockReviewDiffSource::new();
        diff.expect_changed_files().never();

        let set = resolve(
            &ChangeSource::Explicit(vec!["docs/readme.md".into()]),
            "models/",
            &diff,
        )
        .await
        .unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn review_mode_filters_platform_listing() {
        let mut diff = MockReviewDiffSource::new();
        diff.expect_changed_files()
            .withf(|id| *id == 42)
            .times(1)
            .returning(|_| {
                Ok(vec![
                    "README.md".to_string(),
                    "models/models.py".to_string(),
                ])
            });

        let set = resolve(&ChangeSource::ReviewRequest(42), "models/", &diff)
            .await
            .unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["models/models.py"]);
    }

    #[tokio::test]
    async fn review_mode_propagates_platform_errors() {
        let mut diff = MockReviewDiffSource::new();
        diff.expect_changed_files()
            .returning(|_| Err(SyncError::ReviewRequest("404 Not Found".into())));

        let err = resolve(&ChangeSource::ReviewRequest(7), "", &diff)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ReviewRequest(_)));
    }
}
