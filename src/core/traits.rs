//! Collaborator seams for the republication workflow
//!
//! The gate and the reporting glue talk to the CI platform through these
//! traits; production code wires in the reqwest-backed GitHub client, tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A pull request submitter as resolved from the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    /// Platform user id
    pub id: u64,
    /// Login name
    pub name: String,
    /// Pull request creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Pull request and issue-comment operations used by the acceptance gate
#[async_trait]
pub trait PullRequestClient: Send + Sync {
    /// Resolve the submitter of a pull request; `None` when the platform
    /// returns no user for it
    async fn pull_request_submitter(&self, pr_number: u64) -> anyhow::Result<Option<Submitter>>;

    /// Resolve the author id of an issue comment
    async fn comment_author(&self, comment_id: u64) -> anyhow::Result<Option<u64>>;

    /// List the bodies of all comments on an issue, oldest first
    async fn list_comment_bodies(&self, issue_number: u64) -> anyhow::Result<Vec<String>>;

    /// Post a new comment on an issue
    async fn create_comment(&self, issue_number: u64, body: &str) -> anyhow::Result<()>;

    /// Replace the body of an existing comment in place
    async fn update_comment(&self, comment_id: u64, body: &str) -> anyhow::Result<()>;
}

/// Workflow artifact operations; upload/download mechanics stay on the
/// platform side, this crate only resolves and deletes consumed artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Resolve the id of an artifact a workflow run produced under `name`;
    /// `None` when the run produced no artifact under that name
    async fn find_artifact(&self, run_id: u64, name: &str) -> anyhow::Result<Option<u64>>;

    /// Delete a consumed artifact by id
    async fn delete_artifact(&self, artifact_id: u64) -> anyhow::Result<()>;
}

/// Consumer of the per-run outcome summary
#[async_trait]
pub trait OutcomeReporter: Send + Sync {
    /// Post the rendered summary as a pull request comment
    async fn post_comment(&self, issue_number: u64, body: &str) -> anyhow::Result<()>;

    /// Attach the rendered summary to the workflow run page
    async fn add_page_summary(&self, title: &str, body: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullReporter;

    #[async_trait]
    impl OutcomeReporter for NullReporter {
        async fn post_comment(&self, _issue_number: u64, _body: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn add_page_summary(&self, _title: &str, _body: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reporter_trait_is_object_safe() {
        let reporter: Box<dyn OutcomeReporter> = Box::new(NullReporter);
        reporter.post_comment(1, "summary").await.unwrap();
        reporter.add_page_summary("Builds", "summary").await.unwrap();
    }

    #[test]
    fn test_submitter_equality() {
        let a = Submitter {
            id: 42,
            name: "alice".to_string(),
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        };
        assert_eq!(a, a.clone());
    }
}
