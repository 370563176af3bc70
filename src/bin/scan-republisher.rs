//! Scan Republisher CLI
//!
//! Republishes captured build scan dumps to a Develocity server, gated on
//! contributor terms-of-service acceptance

use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use scan_republisher::core::config::{
    DevelocityConfig, GateConfig, GitHubConfig, LayoutConfig, RepublishConfig,
};
use scan_republisher::core::traits::{ArtifactStore, OutcomeReporter};
use scan_republisher::gate::{
    AcceptanceGate, GitHubContentsStore, GitHubPullRequestClient, TriggerEvent,
};
use scan_republisher::{
    AccessCredentialProvider, BatchTally, BuildMetadata, BuildTool, RepublishOrchestrator,
    ScanDumpRepository, SummaryReporter,
};
use std::path::PathBuf;
use std::process;

const ENV_KEY_HOME: &str = "HOME";
const ENV_KEY_RUNNER_TMP: &str = "RUNNER_TEMP";
const ENV_KEY_STEP_SUMMARY: &str = "GITHUB_STEP_SUMMARY";

/// Build scan republication assistant
#[derive(Parser)]
#[command(name = "scan-republisher")]
#[command(version = "0.1.0")]
#[command(about = "Republishes captured build scans behind a contributor acceptance gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DevelocityArgs {
    /// Develocity server URL the scans are republished to
    #[arg(long)]
    develocity_url: String,

    /// Accept untrusted server certificates
    #[arg(long)]
    develocity_allow_untrusted: bool,

    /// Access key in `host=key;host2=key2` form; empty publishes anonymously
    #[arg(long, default_value = "")]
    develocity_access_key: String,

    /// Requested short-lived token expiry in hours
    #[arg(long, default_value = "")]
    develocity_token_expiry: String,
}

#[derive(Args)]
struct GitHubArgs {
    /// Repository owner
    #[arg(long)]
    github_owner: String,

    /// Repository name
    #[arg(long)]
    github_repo: String,

    /// API token used for all GitHub calls
    #[arg(long)]
    github_token: String,

    /// API base URL
    #[arg(long, default_value = "https://api.github.com")]
    github_api_url: String,
}

#[derive(Args)]
struct GateArgs {
    /// Accept only whitelisted contributors, never touching the registry
    #[arg(long)]
    white_list_only: bool,

    /// Comma-separated list of always-accepted contributor names
    #[arg(long, default_value = "")]
    white_list: String,

    /// Repository path of the acceptance registry file
    #[arg(long, default_value = ".github/develocity-tos-acceptance.json")]
    tos_acceptance_file: String,

    /// Branch holding the acceptance registry file
    #[arg(long, default_value = "main")]
    tos_acceptance_file_branch: String,

    /// Exact comment body a contributor posts to accept the terms
    #[arg(long, default_value = "I have read and accept the Terms Of Service")]
    pr_comment_tos_acceptance_request: String,

    /// Prefix identifying an already-posted acceptance-missing comment
    #[arg(long, default_value = "Please accept the Terms Of Service to get your build scans published")]
    pr_comment_tos_acceptance_missing: String,

    /// Body the triggering comment is edited to once acceptance is recorded
    #[arg(long, default_value = "All Good! Your build scans will be published")]
    pr_comment_tos_acceptance_validation: String,
}

#[derive(Args)]
struct TriggerArgs {
    /// Id of the issue comment that triggered this run, when one did
    #[arg(long)]
    comment_id: Option<u64>,

    /// Body of the triggering issue comment
    #[arg(long)]
    comment_body: Option<String>,
}

impl TriggerArgs {
    fn event(&self) -> TriggerEvent {
        match (self.comment_id, &self.comment_body) {
            (Some(comment_id), Some(body)) => TriggerEvent::IssueComment {
                comment_id,
                body: body.clone(),
            },
            _ => TriggerEvent::WorkflowRun,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Gate, republish every captured dump, and report the outcome
    Publish {
        /// Build tool the dumps were captured with (gradle, maven, npm)
        #[arg(long)]
        tool: BuildTool,

        /// Pull request the dumps belong to
        #[arg(long)]
        pr_number: u64,

        /// Build workflow run id; its consumed artifact is deleted afterwards
        #[arg(long)]
        run_id: Option<u64>,

        #[command(flatten)]
        develocity: DevelocityArgs,

        #[command(flatten)]
        github: GitHubArgs,

        #[command(flatten)]
        gate: GateArgs,

        #[command(flatten)]
        trigger: TriggerArgs,

        /// Home directory holding the captured dumps (defaults to $HOME)
        #[arg(long)]
        home_dir: Option<PathBuf>,

        /// Scratch directory for the publisher project (defaults to $RUNNER_TEMP)
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Run the publish subprocesses with debug logging
        #[arg(long)]
        debug: bool,

        /// Do not post the summary as a pull request comment
        #[arg(long)]
        skip_comment: bool,

        /// Do not attach the summary to the workflow run page
        #[arg(long)]
        skip_summary: bool,
    },

    /// Evaluate the acceptance gate without publishing anything
    CheckAcceptance {
        /// Pull request to evaluate
        #[arg(long)]
        pr_number: u64,

        #[command(flatten)]
        github: GitHubArgs,

        #[command(flatten)]
        gate: GateArgs,

        #[command(flatten)]
        trigger: TriggerArgs,
    },

    /// List the captured dumps without publishing them
    Discover {
        /// Build tool the dumps were captured with (gradle, maven, npm)
        #[arg(long)]
        tool: BuildTool,

        /// Home directory holding the captured dumps (defaults to $HOME)
        #[arg(long)]
        home_dir: Option<PathBuf>,
    },
}

impl DevelocityArgs {
    fn into_config(self) -> DevelocityConfig {
        DevelocityConfig {
            url: self.develocity_url,
            allow_untrusted: self.develocity_allow_untrusted,
            access_key: self.develocity_access_key,
            token_expiry: self.develocity_token_expiry,
        }
    }
}

impl GitHubArgs {
    fn into_config(self) -> GitHubConfig {
        GitHubConfig {
            owner: self.github_owner,
            repo: self.github_repo,
            token: self.github_token,
            api_url: self.github_api_url,
        }
    }
}

impl GateArgs {
    fn into_config(self) -> GateConfig {
        GateConfig {
            whitelist_only: self.white_list_only,
            white_list: self.white_list,
            acceptance_file: self.tos_acceptance_file,
            acceptance_branch: self.tos_acceptance_file_branch,
            comment_acceptance_request: self.pr_comment_tos_acceptance_request,
            comment_acceptance_missing: self.pr_comment_tos_acceptance_missing,
            comment_acceptance_validation: self.pr_comment_tos_acceptance_validation,
        }
    }
}

fn resolve_layout(home_dir: Option<PathBuf>, work_dir: Option<PathBuf>) -> Result<LayoutConfig> {
    let home_dir = match home_dir {
        Some(dir) => dir,
        None => std::env::var(ENV_KEY_HOME)
            .map(PathBuf::from)
            .map_err(|_| anyhow::anyhow!("{} is not defined in the environment", ENV_KEY_HOME))?,
    };
    let work_dir = match work_dir {
        Some(dir) => dir,
        None => std::env::var(ENV_KEY_RUNNER_TMP)
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir()),
    };
    Ok(LayoutConfig { home_dir, work_dir })
}

/// Delivers the rendered summary to the pull request and the run page
struct ActionsReporter<'a> {
    client: &'a GitHubPullRequestClient,
}

#[async_trait]
impl OutcomeReporter for ActionsReporter<'_> {
    async fn post_comment(&self, issue_number: u64, body: &str) -> Result<()> {
        use scan_republisher::core::traits::PullRequestClient;
        self.client.create_comment(issue_number, body).await
    }

    async fn add_page_summary(&self, title: &str, body: &str) -> Result<()> {
        match std::env::var(ENV_KEY_STEP_SUMMARY) {
            Ok(path) => {
                let section = format!("<h2>{}</h2>\n{}\n", title, body);
                let mut existing = std::fs::read_to_string(&path).unwrap_or_default();
                existing.push_str(&section);
                std::fs::write(&path, existing)?;
            }
            Err(_) => {
                println!("\n## {}\n{}", title, body);
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let result = run().await;

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish {
            tool,
            pr_number,
            run_id,
            develocity,
            github,
            gate,
            trigger,
            home_dir,
            work_dir,
            debug,
            skip_comment,
            skip_summary,
        } => {
            let config = RepublishConfig {
                develocity: develocity.into_config(),
                github: github.into_config(),
                gate: gate.into_config(),
                layout: resolve_layout(home_dir, work_dir)?,
                skip_comment,
                skip_summary,
            };
            publish_command(config, tool, pr_number, run_id, trigger.event(), debug).await
        }
        Commands::CheckAcceptance {
            pr_number,
            github,
            gate,
            trigger,
        } => {
            check_acceptance_command(
                github.into_config(),
                gate.into_config(),
                pr_number,
                trigger.event(),
            )
            .await
        }
        Commands::Discover { tool, home_dir } => {
            let layout = resolve_layout(home_dir, None)?;
            discover_command(tool, layout)
        }
    }
}

async fn publish_command(
    config: RepublishConfig,
    tool: BuildTool,
    pr_number: u64,
    run_id: Option<u64>,
    event: TriggerEvent,
    debug: bool,
) -> Result<i32> {
    println!("\n🚀 scan-republisher\n");

    let client = GitHubPullRequestClient::new(&config.github)?;
    let store = GitHubContentsStore::new(&config.github, &config.gate)?;
    let gate = AcceptanceGate::new(&config.gate, &store, &client, event);

    if !gate.is_accepted(pr_number).await? {
        println!("⚠️  Skipping publication: terms of service not accepted yet");
        return Ok(0);
    }

    let provider = AccessCredentialProvider::new(config.develocity.allow_untrusted)?;
    let credential = provider
        .resolve(
            &config.develocity.access_key,
            &config.develocity.token_expiry,
        )
        .await;

    let orchestrator = RepublishOrchestrator::new(
        tool,
        config.develocity.clone(),
        config.layout.clone(),
        credential,
        debug,
    );
    let outcomes = orchestrator.republish_all()?;

    let tally = BatchTally::of(&outcomes);
    if tally.all_succeeded() {
        println!("\n✅ Published {} build scan(s)", tally.published);
    } else {
        println!(
            "\n⚠️  Published {} build scan(s), {} failed",
            tally.published, tally.failed
        );
    }

    let metadata_dir = tool.build_scan_metadata_dir(&config.layout.home_dir);
    let builds = BuildMetadata::load_all(&metadata_dir)?;
    let reporter = ActionsReporter { client: &client };
    SummaryReporter::new(&config, &reporter)
        .report(pr_number, builds, &outcomes)
        .await?;

    if let Some(run_id) = run_id {
        if let Err(e) = delete_consumed_artifact(&client, run_id, tool).await {
            eprintln!("⚠️  Failed to delete consumed artifact: {}", e);
        }
    }

    Ok(if tally.all_succeeded() { 0 } else { 1 })
}

async fn delete_consumed_artifact(
    store: &dyn ArtifactStore,
    run_id: u64,
    tool: BuildTool,
) -> Result<()> {
    match store.find_artifact(run_id, tool.artifact_name()).await? {
        Some(artifact_id) => {
            println!("🗑️  Deleting consumed artifact {}", tool.artifact_name());
            store.delete_artifact(artifact_id).await
        }
        None => Ok(()),
    }
}

async fn check_acceptance_command(
    github: GitHubConfig,
    gate_config: GateConfig,
    pr_number: u64,
    event: TriggerEvent,
) -> Result<i32> {
    println!("\n🔍 Acceptance Check\n");

    let client = GitHubPullRequestClient::new(&github)?;
    let store = GitHubContentsStore::new(&github, &gate_config)?;
    let gate = AcceptanceGate::new(&gate_config, &store, &client, event);

    let state = gate.check(pr_number).await?;
    println!("Gate state for PR #{}: {:?}", pr_number, state);

    Ok(if state.is_accepted() { 0 } else { 1 })
}

fn discover_command(tool: BuildTool, layout: LayoutConfig) -> Result<i32> {
    println!("\n🔍 Scan Dump Discovery\n");

    let data_dir = tool.build_scan_data_dir(&layout.home_dir);
    let dumps = ScanDumpRepository::new().discover(&data_dir)?;

    if dumps.is_empty() {
        println!("⚠️  No scan dump found under {}", data_dir.display());
        return Ok(0);
    }

    for dump in &dumps {
        println!(
            "📦 build id {} (version {}): {}",
            dump.build_id,
            dump.version,
            dump.path.display()
        );
    }
    println!("\n{} scan dump(s) found", dumps.len());

    Ok(0)
}
