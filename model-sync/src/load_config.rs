/// `load_config` module: loads the optional YAML config file and the required environment secrets.
///
/// This module is the only place where user-supplied YAML is parsed into typed structs.
///
/// # Responsibilities
/// - Parse the YAML config file into [`CliConfig`]; every key has a default, so the file is optional
/// - Read secrets (GitHub and transformation service tokens) from the environment only
/// - Fail before any remote interaction when a required credential is missing
///
/// # Errors
/// File and YAML errors use `anyhow::Error` and surface at the CLI boundary. A missing
/// credential is reported as [`SyncError::MissingCredential`].
use anyhow::Result;
use model_sync_core::config::CommitAuthor;
use model_sync_core::mapper::NamingRule;
use model_sync_core::SyncError;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub workspace: WorkspaceSection,
    pub naming: NamingRule,
    pub transformation: TransformationSection,
    pub github: GitHubSection,
    pub commit: Option<CommitAuthor>,
    pub workers: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            workspace: WorkspaceSection::default(),
            naming: NamingRule::default(),
            transformation: TransformationSection::default(),
            github: GitHubSection::default(),
            commit: None,
            workers: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkspaceSection {
    /// Where the working copy is cloned.
    pub workdir: PathBuf,
    /// Client model directory, relative to the repository root.
    pub client_dir: PathBuf,
    /// Only server models under this prefix are synchronised.
    pub server_prefix: String,
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("temp_repo"),
            client_dir: PathBuf::from("sample/Sample App/Model"),
            server_prefix: "models/".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TransformationSection {
    pub base_url: String,
    pub model: String,
    pub style_instructions: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TransformationSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/".to_string(),
            model: "gpt-4.1".to_string(),
            style_instructions: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub api_url: String,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com/".to_string(),
        }
    }
}

/// Secrets read from the environment. Never logged.
pub struct Credentials {
    pub github_token: SecretString,
    pub openai_api_key: SecretString,
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    Ok(config)
}

/// Reads the required credentials from the environment.
pub fn load_credentials() -> Result<Credentials, SyncError> {
    let github_token = required_secret(GITHUB_TOKEN_VAR)?;
    let openai_api_key = required_secret(OPENAI_API_KEY_VAR)?;
    info!("Credentials loaded from environment");
    Ok(Credentials {
        github_token,
        openai_api_key,
    })
}

fn required_secret(name: &str) -> Result<SecretString, SyncError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => {
            error!(variable = name, "Required credential missing in environment");
            Err(SyncError::MissingCredential(format!(
                "{name} environment variable not set"
            )))
        }
    }
}
