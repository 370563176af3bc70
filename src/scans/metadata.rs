//! Build metadata loading
//!
//! The capture extension writes one `<buildId>.txt` properties file per build
//! directly under the metadata directory; the build id is the file stem, not
//! part of the file content. The parse is typed and fails fast when a
//! required field is absent, instead of surfacing empty values in the
//! rendered summary later.

use crate::core::error::RepublishError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// Extension of the per-build metadata files
pub const BUILD_METADATA_EXTENSION: &str = "txt";

/// Describes the original build a dump was captured from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub pr_number: u64,
    pub project_id: String,
    pub workflow_name: String,
    pub job_name: String,
    pub build_tool_version: String,
    pub requested_tasks: String,
    pub build_id: String,
    pub build_failure: bool,
    pub build_timestamp: String,
    /// Present when the capture extension recorded a link, or filled in
    /// after republication
    pub build_scan_link: Option<String>,
}

impl BuildMetadata {
    /// Parse a metadata properties file; the build id is the file stem
    pub fn parse(file: &Path) -> Result<Self, RepublishError> {
        let build_id = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| RepublishError::MetadataParse {
                file: file.to_path_buf(),
                field: "build id".to_string(),
            })?;
        let content = std::fs::read_to_string(file)?;
        let properties = parse_properties(&content);

        let required = |key: &str| -> Result<String, RepublishError> {
            properties
                .get(key)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or_else(|| RepublishError::MetadataParse {
                    file: file.to_path_buf(),
                    field: key.to_string(),
                })
        };

        let pr_number = required("PR_NUMBER")?.parse::<u64>().map_err(|_| {
            RepublishError::MetadataParse {
                file: file.to_path_buf(),
                field: "PR_NUMBER".to_string(),
            }
        })?;

        Ok(Self {
            pr_number,
            workflow_name: required("WORKFLOW_NAME")?,
            job_name: required("JOB_NAME")?,
            requested_tasks: required("REQUESTED_TASKS")?,
            project_id: properties.get("PROJECT_ID").cloned().unwrap_or_default(),
            build_tool_version: properties
                .get("BUILD_TOOL_VERSION")
                .cloned()
                .unwrap_or_default(),
            build_failure: properties
                .get("BUILD_FAILURE")
                .map(|value| value == "true")
                .unwrap_or(false),
            build_timestamp: properties.get("TIMESTAMP").cloned().unwrap_or_default(),
            build_id,
            build_scan_link: properties
                .get("BUILD_SCAN_LINK")
                .filter(|value| !value.is_empty())
                .cloned(),
        })
    }

    /// Load every `<buildId>.txt` directly under `root`, ordered by job name
    /// then capture timestamp
    pub fn load_all(root: &Path) -> Result<Vec<Self>, RepublishError> {
        let mut files: Vec<_> = WalkDir::new(root)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .map(|ext| ext == BUILD_METADATA_EXTENSION)
                        .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));

        let mut builds = files
            .iter()
            .map(|file| Self::parse(file))
            .collect::<Result<Vec<_>, _>>()?;
        builds.sort_by(|a, b| {
            a.job_name
                .cmp(&b.job_name)
                .then_with(|| a.build_timestamp.cmp(&b.build_timestamp))
        });
        Ok(builds)
    }
}

/// Minimal Java-properties reader: `KEY=value` lines, `#`/`!` comments
fn parse_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            line.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
