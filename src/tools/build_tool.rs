//! Build tool variants
//!
//! One orchestrator, pluggable tool: each variant carries the command name,
//! publish task, descriptor template, and directory layout the capture side
//! used. The descriptor template holds a placeholder that gets substituted
//! with each dump's capture-plugin version right before the publish run.

use crate::core::config::DevelocityConfig;
use crate::core::error::RepublishError;
use std::fs;
use std::path::{Path, PathBuf};

/// Token substituted with the dump's plugin/extension version
pub const VERSION_PLACEHOLDER: &str = "REPLACE_ME";

/// Directory name of the ephemeral publisher project
pub const PUBLISHER_PROJECT_DIR: &str = "build-scan-publish";

const BUILD_SCAN_DATA_DIR: &str = "build-scan-data";
const BUILD_SCAN_METADATA_DIR: &str = "build-scan-metadata";

/// The build tool a batch of dumps was captured with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTool {
    Gradle,
    Maven,
    Npm,
}

impl std::fmt::Display for BuildTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Gradle => "Gradle",
            Self::Maven => "Maven",
            Self::Npm => "npm",
        })
    }
}

impl std::str::FromStr for BuildTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gradle" => Ok(Self::Gradle),
            "maven" | "mvn" => Ok(Self::Maven),
            "npm" => Ok(Self::Npm),
            other => Err(format!("unknown build tool '{}'", other)),
        }
    }
}

impl BuildTool {
    /// Executable name on the runner
    pub fn command(&self) -> &'static str {
        match self {
            Self::Gradle => "gradle",
            Self::Maven => "mvn",
            Self::Npm => "npm",
        }
    }

    /// Workflow artifact the capture stage uploaded the dumps under
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Self::Gradle => "gradle-build-scan-data",
            Self::Maven => "maven-build-scan-data",
            Self::Npm => "npm-build-scan-data",
        }
    }

    /// npm captures scans but carries no republish task
    pub fn supports_republication(&self) -> bool {
        !matches!(self, Self::Npm)
    }

    /// Arguments for the tool's own version probe
    pub fn version_probe_args(&self) -> &'static [&'static str] {
        match self {
            Self::Npm => &["--version"],
            _ => &["-version"],
        }
    }

    /// Publish task invocation
    pub fn publish_args(&self, debug: bool) -> Vec<&'static str> {
        let mut args = match self {
            Self::Gradle => vec!["buildScanPublishPrevious"],
            Self::Maven => vec!["gradle-enterprise:build-scan-publish-previous"],
            Self::Npm => vec![],
        };
        if debug {
            args.push(match self {
                Self::Gradle => "--debug",
                _ => "-X",
            });
        }
        args
    }

    /// Where the capture mechanism left the scan dumps
    pub fn build_scan_data_dir(&self, home_dir: &Path) -> PathBuf {
        self.develocity_dir(home_dir).join(BUILD_SCAN_DATA_DIR)
    }

    /// Where the capture mechanism left the per-build metadata
    pub fn build_scan_metadata_dir(&self, home_dir: &Path) -> PathBuf {
        self.develocity_dir(home_dir).join(BUILD_SCAN_METADATA_DIR)
    }

    fn develocity_dir(&self, home_dir: &Path) -> PathBuf {
        match self {
            Self::Gradle => home_dir.join(".gradle"),
            Self::Maven => home_dir.join(".m2").join(".gradle-enterprise"),
            Self::Npm => home_dir.join(".develocity").join("npm").join(".develocity"),
        }
    }

    /// Per-tool work directory under the run's scratch directory
    pub fn work_dir(&self, base_work_dir: &Path) -> PathBuf {
        base_work_dir.join(self.artifact_name())
    }

    /// Copy of the data directory uploaded alongside the artifact
    pub fn build_scan_data_copy_dir(&self, base_work_dir: &Path) -> PathBuf {
        self.work_dir(base_work_dir).join(BUILD_SCAN_DATA_DIR)
    }

    /// Copy of the metadata directory uploaded alongside the artifact
    pub fn build_scan_metadata_copy_dir(&self, base_work_dir: &Path) -> PathBuf {
        self.work_dir(base_work_dir).join(BUILD_SCAN_METADATA_DIR)
    }

    /// Directory of the ephemeral publisher project
    pub fn publisher_project_dir(&self, base_work_dir: &Path) -> PathBuf {
        self.work_dir(base_work_dir).join(PUBLISHER_PROJECT_DIR)
    }

    /// Path of the shared plugin/extension descriptor inside the project
    pub fn descriptor_path(&self, project_dir: &Path) -> PathBuf {
        match self {
            Self::Gradle => project_dir.join("settings.gradle"),
            Self::Maven => project_dir.join(".mvn").join("extensions.xml"),
            Self::Npm => project_dir.join("descriptor.unsupported"),
        }
    }

    /// Descriptor template with the version placeholder still in place
    pub fn descriptor_template(&self, develocity: &DevelocityConfig) -> String {
        match self {
            Self::Gradle => format!(
                "plugins {{\n    id 'com.gradle.enterprise' version '{}'\n}}\n\n\
                 gradleEnterprise {{\n    server = '{}'\n    allowUntrustedServer = {}\n}}\n",
                VERSION_PLACEHOLDER, develocity.url, develocity.allow_untrusted
            ),
            Self::Maven => format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                 <extensions>\n\
                 \x20   <extension>\n\
                 \x20       <groupId>com.gradle</groupId>\n\
                 \x20       <artifactId>gradle-enterprise-maven-extension</artifactId>\n\
                 \x20       <version>{}</version>\n\
                 \x20   </extension>\n\
                 </extensions>\n",
                VERSION_PLACEHOLDER
            ),
            Self::Npm => String::new(),
        }
    }

    /// Regenerate the shared descriptor for one dump
    ///
    /// There is exactly one descriptor file at a time, overwritten on every
    /// iteration; that is why the publish loop must stay sequential.
    pub fn write_descriptor(
        &self,
        project_dir: &Path,
        version: &str,
        develocity: &DevelocityConfig,
    ) -> Result<(), RepublishError> {
        let content = self
            .descriptor_template(develocity)
            .replace(VERSION_PLACEHOLDER, version);
        let path = self.descriptor_path(project_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Create the publisher project directory and its static files
    ///
    /// Idempotent: re-running against an unchanged directory rewrites
    /// byte-identical content.
    pub fn scaffold(
        &self,
        project_dir: &Path,
        develocity: &DevelocityConfig,
    ) -> Result<(), RepublishError> {
        fs::create_dir_all(project_dir)?;

        if let Self::Maven = self {
            let mvn_dir = project_dir.join(".mvn");
            fs::create_dir_all(&mvn_dir)?;
            fs::write(project_dir.join("pom.xml"), self.maven_pom())?;
            fs::write(
                mvn_dir.join("gradle-enterprise.xml"),
                self.maven_server_configuration(develocity),
            )?;
        }

        Ok(())
    }

    fn maven_pom(&self) -> String {
        format!(
            "<project xmlns=\"http://maven.apache.org/POM/4.0.0\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 http://maven.apache.org/maven-v4_0_0.xsd\">\n\
             \x20   <modelVersion>4.0.0</modelVersion>\n\
             \x20   <groupId>com.gradle</groupId>\n\
             \x20   <artifactId>{}</artifactId>\n\
             \x20   <version>1.0</version>\n\
             \x20   <name>Build Scan Publisher</name>\n\
             </project>\n",
            self.artifact_name()
        )
    }

    fn maven_server_configuration(&self, develocity: &DevelocityConfig) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\" ?>\n\
             <gradleEnterprise\n\
             \x20   xmlns=\"https://www.gradle.com/gradle-enterprise-maven\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"https://www.gradle.com/gradle-enterprise-maven https://www.gradle.com/schema/gradle-enterprise-maven.xsd\">\n\
             \x20   <server>\n\
             \x20       <url>{}</url>\n\
             \x20       <allowUntrusted>{}</allowUntrusted>\n\
             \x20   </server>\n\
             </gradleEnterprise>\n",
            develocity.url, develocity.allow_untrusted
        )
    }
}
