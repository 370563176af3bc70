//! Republication orchestrator
//!
//! Drives the whole batch: discover dumps, probe the toolchain once, scaffold
//! the ephemeral publisher project, then run one publish subprocess per dump
//! in the discovery order. The loop is strictly sequential because every
//! iteration rewrites the single shared plugin descriptor before spawning.

use crate::auth::provider::Credential;
use crate::core::config::{DevelocityConfig, LayoutConfig};
use crate::core::error::RepublishError;
use crate::orchestration::outcome::PublishOutcome;
use crate::scans::dump::ScanDump;
use crate::scans::repository::ScanDumpRepository;
use crate::security::command_executor::{CommandError, CommandRunner, SafeCommandExecutor};
use crate::tools::build_tool::BuildTool;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Flag telling the capture plugin inside the subprocess that this run is a
/// republication, so it must not capture a new scan of its own
const ENV_KEY_IS_REPUBLICATION: &str = "IS_BUILD_SCAN_REPUBLICATION";
const ENV_KEY_MAVEN_OPTS: &str = "MAVEN_OPTS";
const ENV_KEY_ACCESS_KEY: &str = "DEVELOCITY_ACCESS_KEY";
const ENV_KEY_BUILD_ID: &str = "BUILD_ID";
const ENV_KEY_DATA_DIR: &str = "BUILD_SCAN_DATA_DIR";
const ENV_KEY_DATA_COPY_DIR: &str = "BUILD_SCAN_DATA_COPY_DIR";
const ENV_KEY_METADATA_DIR: &str = "BUILD_SCAN_METADATA_DIR";
const ENV_KEY_METADATA_COPY_DIR: &str = "BUILD_SCAN_METADATA_COPY_DIR";

/// Publishes every captured dump of one build tool to the configured server
pub struct RepublishOrchestrator {
    tool: BuildTool,
    develocity: DevelocityConfig,
    layout: LayoutConfig,
    credential: Credential,
    debug: bool,
}

impl RepublishOrchestrator {
    pub fn new(
        tool: BuildTool,
        develocity: DevelocityConfig,
        layout: LayoutConfig,
        credential: Credential,
        debug: bool,
    ) -> Self {
        Self {
            tool,
            develocity,
            layout,
            credential,
            debug,
        }
    }

    /// Publish every discovered dump, returning one outcome per dump.
    ///
    /// An empty discovery is not an error; the batch simply has nothing to
    /// publish. Toolchain probe failures abort the whole batch since no dump
    /// could possibly publish without the tools.
    pub fn republish_all(&self) -> Result<Vec<PublishOutcome>, RepublishError> {
        if !self.tool.supports_republication() {
            return Err(RepublishError::ToolNotSupported {
                tool: self.tool.to_string(),
            });
        }

        let data_dir = self.tool.build_scan_data_dir(&self.layout.home_dir);
        let dumps = ScanDumpRepository::new().discover(&data_dir)?;
        if dumps.is_empty() {
            println!("ℹ️  Skipping the publication: no scan dump found");
            return Ok(Vec::new());
        }

        let project_dir = self.tool.publisher_project_dir(&self.layout.work_dir);
        fs::create_dir_all(&project_dir)?;
        self.tool.scaffold(&project_dir, &self.develocity)?;

        let executor = SafeCommandExecutor::new(&project_dir)?;
        self.publish_batch(&executor, &project_dir, &dumps)
    }

    /// Probe the toolchain once, then publish the dumps in order. One outcome
    /// per dump; a failed dump never aborts the rest of the batch.
    pub fn publish_batch(
        &self,
        runner: &dyn CommandRunner,
        project_dir: &Path,
        dumps: &[ScanDump],
    ) -> Result<Vec<PublishOutcome>, RepublishError> {
        self.probe(runner, "java", &["-version"])?;
        self.probe(runner, self.tool.command(), self.tool.version_probe_args())?;

        let total = dumps.len();
        let mut outcomes = Vec::with_capacity(total);
        for (idx, dump) in dumps.iter().enumerate() {
            println!(
                "📦 Publishing {} ({}/{})",
                dump.path.display(),
                idx + 1,
                total
            );
            outcomes.push(self.publish_one(runner, project_dir, dump));
        }

        Ok(outcomes)
    }

    /// Version probe, also surfacing the tool version in the job log
    fn probe(
        &self,
        runner: &dyn CommandRunner,
        command: &str,
        args: &[&str],
    ) -> Result<(), RepublishError> {
        let output = match runner.run(command, args, &HashMap::new()) {
            Ok(output) => output,
            Err(CommandError::ExecutionFailed(message)) => {
                return Err(RepublishError::ToolNotFound {
                    tool: command.to_string(),
                    message,
                });
            }
            Err(other) => return Err(other.into()),
        };

        // Version banners commonly land on stderr; only the combination of a
        // failing exit status and stderr content counts as a broken tool.
        if !output.success && !output.stderr.trim().is_empty() {
            return Err(RepublishError::ToolNotFound {
                tool: command.to_string(),
                message: output.stderr.trim().to_string(),
            });
        }

        print!("{}", output.stdout);
        Ok(())
    }

    /// One dump, never letting its failure escape the batch
    fn publish_one(
        &self,
        runner: &dyn CommandRunner,
        project_dir: &Path,
        dump: &ScanDump,
    ) -> PublishOutcome {
        match self.try_publish(runner, project_dir, dump) {
            Ok(outcome) => outcome,
            Err(error) => {
                eprintln!(
                    "⚠️  Could not trigger publication job for build id {}: {}",
                    dump.build_id, error
                );
                PublishOutcome::failed(dump.build_id.clone(), dump.version.clone(), error.to_string())
            }
        }
    }

    fn try_publish(
        &self,
        runner: &dyn CommandRunner,
        project_dir: &Path,
        dump: &ScanDump,
    ) -> Result<PublishOutcome, RepublishError> {
        self.tool
            .write_descriptor(project_dir, &dump.version, &self.develocity)?;

        let args = self.tool.publish_args(self.debug);
        let env = self.publish_env(&dump.build_id);
        let output = runner.run(self.tool.command(), &args, &env)?;

        let stderr = output.stderr.trim();
        if !output.success && !stderr.is_empty() {
            eprintln!(
                "⚠️  Publication job failed for build id {}: {}",
                dump.build_id, stderr
            );
            return Ok(PublishOutcome::failed(
                dump.build_id.clone(),
                dump.version.clone(),
                stderr.to_string(),
            ));
        }

        let scan_link = extract_scan_link(&output.stdout, &self.develocity.url);
        Ok(PublishOutcome::published(
            dump.build_id.clone(),
            dump.version.clone(),
            scan_link,
        ))
    }

    /// Environment contract of the publish subprocess
    fn publish_env(&self, build_id: &str) -> HashMap<String, String> {
        let home = &self.layout.home_dir;
        let work = &self.layout.work_dir;

        let mut env = HashMap::new();
        env.insert(ENV_KEY_IS_REPUBLICATION.to_string(), "true".to_string());
        env.insert(
            ENV_KEY_MAVEN_OPTS.to_string(),
            std::env::var(ENV_KEY_MAVEN_OPTS).unwrap_or_default(),
        );
        env.insert(
            ENV_KEY_ACCESS_KEY.to_string(),
            self.credential.expose().to_string(),
        );
        env.insert(ENV_KEY_BUILD_ID.to_string(), build_id.to_string());
        env.insert(
            ENV_KEY_DATA_DIR.to_string(),
            self.tool.build_scan_data_dir(home).display().to_string(),
        );
        env.insert(
            ENV_KEY_DATA_COPY_DIR.to_string(),
            self.tool.build_scan_data_copy_dir(work).display().to_string(),
        );
        env.insert(
            ENV_KEY_METADATA_DIR.to_string(),
            self.tool.build_scan_metadata_dir(home).display().to_string(),
        );
        env.insert(
            ENV_KEY_METADATA_COPY_DIR.to_string(),
            self.tool
                .build_scan_metadata_copy_dir(work)
                .display()
                .to_string(),
        );
        env
    }
}

/// Extract the scan link from the subprocess output: the first trimmed line
/// that starts with the server URL and carries a scan path
pub fn extract_scan_link(stdout: &str, server_url: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(server_url) && line.contains("/s/"))
        .map(str::to_string)
}
