//! Error handling for build scan republication
//!
//! The taxonomy separates run-aborting failures (missing tooling, gate
//! persistence problems) from per-dump publish failures, which are never
//! errors: those are recorded as failed `PublishOutcome`s instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for republication runs
#[derive(Error, Debug)]
pub enum RepublishError {
    // Pre-flight errors
    #[error("'{tool}' execution failed: {message}")]
    ToolNotFound { tool: String, message: String },

    #[error("build scan republication is not supported for {tool}")]
    ToolNotSupported { tool: String },

    // Discovery errors
    #[error("could not parse scan dump path: {}", path.display())]
    DumpPathUnparseable { path: PathBuf },

    #[error("unexpected build scan metadata content in {}: missing '{field}'", file.display())]
    MetadataParse { file: PathBuf, field: String },

    // Gate errors
    #[error("could not read or write the acceptance registry: {message}")]
    RegistryPersistence { message: String },

    #[error("submitter of pull request #{pr_number} not found")]
    SubmitterNotFound { pr_number: u64 },

    #[error("GitHub API call failed: {message}")]
    GitHubApi { message: String },

    // Wrapped infrastructure errors
    #[error("command execution rejected: {0}")]
    Command(#[from] crate::security::CommandError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RepublishError {
    /// Check if this error aborts the whole run
    ///
    /// Everything in this taxonomy is fatal; recoverable publish failures
    /// never become a `RepublishError` in the first place. Kept explicit so
    /// callers do not have to know that convention.
    pub fn is_fatal(&self) -> bool {
        true
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ToolNotFound { .. } => "TOOL_NOT_FOUND",
            Self::ToolNotSupported { .. } => "TOOL_NOT_SUPPORTED",
            Self::DumpPathUnparseable { .. } => "DUMP_PATH_UNPARSEABLE",
            Self::MetadataParse { .. } => "METADATA_PARSE",
            Self::RegistryPersistence { .. } => "REGISTRY_PERSISTENCE",
            Self::SubmitterNotFound { .. } => "SUBMITTER_NOT_FOUND",
            Self::GitHubApi { .. } => "GITHUB_API",
            Self::Command(_) => "COMMAND_REJECTED",
            Self::Io(_) => "IO",
            Self::Http(_) => "HTTP",
        }
    }
}
