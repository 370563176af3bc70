//! Configuration structures for scan-republisher
//!
//! Everything the run depends on is carried explicitly here; components never
//! read process-wide state behind the caller's back. The one exception is the
//! documented legacy access-key environment fallback, which lives in
//! `auth::provider` because it is part of that component's contract.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepublishConfig {
    /// Develocity server settings
    pub develocity: DevelocityConfig,

    /// GitHub repository and API settings
    pub github: GitHubConfig,

    /// Contributor acceptance gate settings
    pub gate: GateConfig,

    /// Local filesystem layout
    pub layout: LayoutConfig,

    /// Skip posting the pull request summary comment
    #[serde(default)]
    pub skip_comment: bool,

    /// Skip writing the workflow page summary
    #[serde(default)]
    pub skip_summary: bool,
}

/// Develocity server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DevelocityConfig {
    /// Server URL the republished scans are sent to
    pub url: String,

    /// Accept untrusted server certificates
    #[serde(default)]
    pub allow_untrusted: bool,

    /// Access key in `host=key;host2=key2` form; empty for anonymous
    #[serde(default)]
    pub access_key: String,

    /// Requested short-lived token expiry in hours; empty uses server default
    #[serde(default)]
    pub token_expiry: String,
}

/// GitHub repository and API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubConfig {
    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// API token used for all GitHub calls
    pub token: String,

    /// API base URL, overridable for tests
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Contributor acceptance gate settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateConfig {
    /// Accept only whitelisted contributors, skipping persistence entirely
    #[serde(default)]
    pub whitelist_only: bool,

    /// Comma-separated list of always-accepted contributor names
    #[serde(default)]
    pub white_list: String,

    /// Repository path of the acceptance registry file
    pub acceptance_file: String,

    /// Branch holding the acceptance registry file
    pub acceptance_branch: String,

    /// Exact comment body a contributor posts to accept the terms
    pub comment_acceptance_request: String,

    /// Prefix identifying an already-posted "acceptance missing" comment
    pub comment_acceptance_missing: String,

    /// Body the triggering comment is edited to once acceptance is recorded
    pub comment_acceptance_validation: String,
}

impl GateConfig {
    /// Check a contributor name against the comma-separated whitelist
    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.white_list
            .split(',')
            .map(str::trim)
            .any(|entry| !entry.is_empty() && entry == name)
    }
}

/// Local filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    /// User home directory, resolved once by the caller
    pub home_dir: PathBuf,

    /// Scratch directory for the ephemeral publisher project
    pub work_dir: PathBuf,
}
