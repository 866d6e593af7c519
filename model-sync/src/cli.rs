///
/// This module implements the CLI for model-sync: command parsing, argument validation,
/// wiring of the concrete adapters, and user-visible output.
///
/// All pipeline logic (change detection, mapping, orchestration, git) lives in
/// [`model-sync-core`]. This module is strictly glue.
///
/// ## How To Use
/// - Command-line users: `model-sync sync --help`.
/// - Programmatic / integration use: call [`run`] with a constructed [`Cli`].
///
/// Exit status is success for completed runs and benign no-ops, failure for anything fatal.
///
/// [`model-sync-core`]: ../../model-sync-core/
use crate::completion::ChatCompletionsClient;
use crate::github::GitHubClient;
use crate::load_config::{load_config, load_credentials, CliConfig};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use model_sync_core::changeset::ChangeSource;
use model_sync_core::config::PipelineContext;
use model_sync_core::repository::GitRepository;
use model_sync_core::synchronise::SyncOrchestrator;
use model_sync_core::{PipelineOutcome, SyncError};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// CLI for model-sync: keep client data models in sync with server models.
#[derive(Parser)]
#[clap(
    name = "model-sync",
    version,
    about = "Rewrite client data models after server model changes and propose them as a pull request"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone the repository, update client models for changed server models, push and open a pull request
    Sync(SyncArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Repository URL to clone (HTTPS URLs get the GitHub token embedded)
    #[clap(long)]
    pub repo_url: String,
    /// Repository in 'owner/name' format
    #[clap(long)]
    pub repo_name: String,
    /// Branch the updated client models are committed to
    #[clap(long, default_value = "auto-model-sync")]
    pub branch: String,
    /// Base branch for the pull request
    #[clap(long, default_value = "main")]
    pub base: String,
    #[clap(long, default_value = "Update client models")]
    pub commit_message: String,
    #[clap(long, default_value = "Update client models")]
    pub pr_title: String,
    #[clap(
        long,
        default_value = "This PR was automatically created to keep client models in sync with the server models."
    )]
    pub pr_body: String,
    /// Changed server model file (repeatable)
    #[clap(long = "file", required_unless_present = "pr", conflicts_with = "pr")]
    pub files: Vec<String>,
    /// Take the changed files from this pull request instead of --file; server models are read at its head
    #[clap(long)]
    pub pr: Option<u64>,
    /// Optional YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Overrides workspace.workdir
    #[clap(long)]
    pub workdir: Option<PathBuf>,
    /// Overrides workspace.client_dir
    #[clap(long)]
    pub client_dir: Option<PathBuf>,
    /// Overrides workspace.server_prefix
    #[clap(long)]
    pub server_prefix: Option<String>,
    /// Overrides workers
    #[clap(long)]
    pub workers: Option<usize>,
    /// Print the outcome as JSON
    #[clap(long)]
    pub json: bool,
}

impl SyncArgs {
    fn change_source(&self) -> ChangeSource {
        match self.pr {
            Some(number) => ChangeSource::ReviewRequest(number),
            None => ChangeSource::Explicit(self.files.clone()),
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync(args) => sync(args).await,
    }
}

async fn sync(args: SyncArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => CliConfig::default(),
    };
    apply_overrides(&mut config, &args);

    // Secrets are checked before anything touches the network or the disk.
    let credentials = load_credentials()?;

    let github = GitHubClient::new(
        &config.github.api_url,
        &args.repo_name,
        credentials.github_token.clone(),
    )?;
    let transformer =
        ChatCompletionsClient::new(&config.transformation, credentials.openai_api_key)?;
    let repository = GitRepository::new(
        Some(credentials.github_token.clone()),
        config.commit.clone(),
    );

    let ctx = PipelineContext::new(
        args.repo_url.clone(),
        config.workspace.workdir.clone(),
        credentials.github_token,
    )
    .with_branches(args.branch.clone(), args.base.clone())
    .with_client_dir(config.workspace.client_dir.clone())
    .with_server_prefix(config.workspace.server_prefix.clone())
    .with_naming(config.naming.clone())
    .with_author(config.commit.clone())
    .with_messages(
        args.commit_message.clone(),
        args.pr_title.clone(),
        args.pr_body.clone(),
    )
    .with_style_instructions(config.transformation.style_instructions.clone())
    .with_workers(config.workers);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling synchronisation");
            on_interrupt.cancel();
        }
    });

    tracing::info!(command = "sync", "Starting synchronisation process");
    let orchestrator = SyncOrchestrator::new(&repository, &github, &github, &transformer);
    match orchestrator.run(&ctx, &args.change_source(), &cancel).await {
        Ok(outcome) => {
            tracing::info!(command = "sync", noop = outcome.is_noop(), "Synchronisation complete");
            report(&outcome, args.json)?;
            Ok(())
        }
        Err(failure) => {
            tracing::error!(command = "sync", error = %failure.error, "Synchronisation failed");
            report(&failure.outcome, args.json)?;
            let context = failure_context(&failure.error, &ctx.target_branch);
            Err(anyhow::Error::new(failure.error).context(context))
        }
    }
}

fn failure_context(error: &SyncError, branch: &str) -> String {
    match error {
        SyncError::ReviewRequest(_) => format!(
            "synchronisation failed: branch '{branch}' is already pushed; \
             open the pull request manually or rerun once the cause is fixed"
        ),
        _ => "synchronisation failed".to_string(),
    }
}

fn apply_overrides(config: &mut CliConfig, args: &SyncArgs) {
    if let Some(workdir) = &args.workdir {
        config.workspace.workdir = workdir.clone();
    }
    if let Some(client_dir) = &args.client_dir {
        config.workspace.client_dir = client_dir.clone();
    }
    if let Some(prefix) = &args.server_prefix {
        config.workspace.server_prefix = prefix.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
}

fn report(outcome: &PipelineOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    if outcome.is_noop() {
        println!("Synchronise finished without changes ({:?})", outcome.termination);
    } else {
        println!("Synchronise finished");
    }
    for path in &outcome.updated {
        println!("  updated  {}", path.display());
    }
    for path in &outcome.skipped {
        println!("  skipped  {path} (no matching client model)");
    }
    for failed in &outcome.failed {
        println!(
            "  failed   {} ({}): {}",
            failed.client_path.display(),
            failed.server_path,
            failed.detail
        );
    }
    if let Some(url) = &outcome.review_url {
        println!("Pull request created: {url}");
    }
    Ok(())
}
