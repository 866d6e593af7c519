//! Server model → client model file mapping.
//!
//! The rule is deliberately simple: the server file's stem, optionally suffixed, with the
//! client platform's extension, looked up in one flat directory. Nested client directories
//! and one-to-many relationships between models and files are not handled.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Naming convention linking server model files to client model files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRule {
    /// Extension of server model files, without the dot.
    pub server_extension: String,
    /// Extension of client model files, without the dot.
    pub client_extension: String,
    /// Appended to the stem for the primary candidate (`User` → `UserModel`).
    pub client_suffix: String,
}

impl Default for NamingRule {
    fn default() -> Self {
        Self {
            server_extension: "py".to_string(),
            client_extension: "swift".to_string(),
            client_suffix: "Model".to_string(),
        }
    }
}

/// A server model paired with its client counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    pub server_path: String,
    /// Relative to the working copy root.
    pub client_path: PathBuf,
    pub exists: bool,
}

/// Candidate client file names for a server path, in lookup order.
///
/// Pure: depends only on the path string and the rule.
pub fn candidate_names(server_path: &str, rule: &NamingRule) -> Vec<String> {
    let base = server_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(server_path);
    let server_suffix = format!(".{}", rule.server_extension);
    let stem = match base.strip_suffix(server_suffix.as_str()) {
        Some(stem) if !stem.is_empty() => stem,
        _ => match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => base,
        },
    };

    let mut names = Vec::with_capacity(2);
    if !rule.client_suffix.is_empty() {
        names.push(format!(
            "{stem}{}.{}",
            rule.client_suffix, rule.client_extension
        ));
    }
    names.push(format!("{stem}.{}", rule.client_extension));
    names
}

/// Map one server model file to its client model file under `client_dir`.
///
/// `working_copy` is the root that `client_dir` is relative to. The first existing
/// candidate wins; when nothing exists the primary candidate is reported with
/// `exists = false`.
pub fn map(
    server_path: &str,
    working_copy: &Path,
    client_dir: &Path,
    rule: &NamingRule,
) -> FileMapping {
    let candidates = candidate_names(server_path, rule);
    let found = candidates
        .iter()
        .map(|name| client_dir.join(name))
        .find(|relative| working_copy.join(relative).is_file());

    match found {
        Some(client_path) => FileMapping {
            server_path: server_path.to_string(),
            client_path,
            exists: true,
        },
        None => FileMapping {
            server_path: server_path.to_string(),
            client_path: client_dir.join(&candidates[0]),
            exists: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn candidates_use_suffix_first_then_plain_stem() {
        let rule = NamingRule::default();
        assert_eq!(
            candidate_names("models/User.py", &rule),
            vec!["UserModel.swift".to_string(), "User.swift".to_string()]
        );
    }

    #[test]
    fn candidates_without_suffix_only_use_stem() {
        let rule = NamingRule {
            server_extension: "kt".into(),
            client_extension: "ts".into(),
            client_suffix: String::new(),
        };
        assert_eq!(candidate_names("api/Order.kt", &rule), vec!["Order.ts"]);
    }

    #[test]
    fn candidates_handle_names_without_extension() {
        let rule = NamingRule::default();
        assert_eq!(candidate_names("models/Account", &rule)[1], "Account.swift");
    }

    #[test]
    fn map_finds_suffixed_client_file() {
        let wc = tempdir().unwrap();
        fs::create_dir_all(wc.path().join("Client")).unwrap();
        fs::write(wc.path().join("Client/UserModel.swift"), "struct User {}").unwrap();

        let m = map(
            "models/User.py",
            wc.path(),
            Path::new("Client"),
            &NamingRule::default(),
        );
        assert!(m.exists);
        assert_eq!(m.client_path, PathBuf::from("Client/UserModel.swift"));
        assert_eq!(m.server_path, "models/User.py");
    }

    #[test]
    fn map_falls_back_to_plain_stem() {
        let wc = tempdir().unwrap();
        fs::write(wc.path().join("Order.swift"), "struct Order {}").unwrap();

        let m = map("models/Order.py", wc.path(), Path::new(""), &NamingRule::default());
        assert!(m.exists);
        assert_eq!(m.client_path, PathBuf::from("Order.swift"));
    }

    #[test]
    fn map_reports_missing_counterpart() {
        let wc = tempdir().unwrap();
        let m = map("models/Ghost.py", wc.path(), Path::new("Client"), &NamingRule::default());
        assert!(!m.exists);
        assert_eq!(m.client_path, PathBuf::from("Client/GhostModel.swift"));
    }

    #[test]
    fn map_does_not_search_subdirectories() {
        let wc = tempdir().unwrap();
        fs::create_dir_all(wc.path().join("Client/Nested")).unwrap();
        fs::write(wc.path().join("Client/Nested/UserModel.swift"), "").unwrap();

        let m = map("models/User.py", wc.path(), Path::new("Client"), &NamingRule::default());
        assert!(!m.exists);
    }

    #[test]
    fn map_is_deterministic() {
        let wc = tempdir().unwrap();
        fs::write(wc.path().join("UserModel.swift"), "").unwrap();
        let rule = NamingRule::default();
        let first = map("models/User.py", wc.path(), Path::new(""), &rule);
        let second = map("models/User.py", wc.path(), Path::new(""), &rule);
        assert_eq!(first, second);
    }
}
