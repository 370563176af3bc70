//! GitHub REST implementations of the platform collaborator seams

use crate::core::config::GitHubConfig;
use crate::core::traits::{ArtifactStore, PullRequestClient, Submitter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Pull request and comment operations over the GitHub REST API
pub struct GitHubPullRequestClient {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

#[derive(Deserialize)]
struct UserResponse {
    id: u64,
    login: String,
}

#[derive(Deserialize)]
struct PullRequestResponse {
    user: Option<UserResponse>,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CommentResponse {
    user: Option<UserResponse>,
}

#[derive(Deserialize)]
struct CommentBodyResponse {
    body: Option<String>,
}

#[derive(Deserialize)]
struct ArtifactResponse {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct ArtifactListResponse {
    artifacts: Vec<ArtifactResponse>,
}

impl GitHubPullRequestClient {
    pub fn new(github: &GitHubConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_url: github.api_url.clone(),
            owner: github.owner.clone(),
            repo: github.repo.clone(),
            token: github.token.clone(),
        })
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.owner, self.repo, suffix
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scan-republisher")
    }

    async fn check_status(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GitHub returned HTTP {}", status.as_u16());
        }
        Ok(response)
    }
}

#[async_trait]
impl PullRequestClient for GitHubPullRequestClient {
    async fn pull_request_submitter(&self, pr_number: u64) -> anyhow::Result<Option<Submitter>> {
        let url = self.repo_url(&format!("pulls/{}", pr_number));
        let response = Self::check_status(self.request(self.http.get(url)).send().await?).await?;
        let pull: PullRequestResponse = response.json().await?;

        Ok(pull.user.map(|user| Submitter {
            id: user.id,
            name: user.login,
            created_at: pull.created_at,
        }))
    }

    async fn comment_author(&self, comment_id: u64) -> anyhow::Result<Option<u64>> {
        let url = self.repo_url(&format!("issues/comments/{}", comment_id));
        let response = Self::check_status(self.request(self.http.get(url)).send().await?).await?;
        let comment: CommentResponse = response.json().await?;

        Ok(comment.user.map(|user| user.id))
    }

    async fn list_comment_bodies(&self, issue_number: u64) -> anyhow::Result<Vec<String>> {
        let url = self.repo_url(&format!("issues/{}/comments", issue_number));
        let response = Self::check_status(self.request(self.http.get(url)).send().await?).await?;
        let comments: Vec<CommentBodyResponse> = response.json().await?;

        Ok(comments
            .into_iter()
            .filter_map(|comment| comment.body)
            .collect())
    }

    async fn create_comment(&self, issue_number: u64, body: &str) -> anyhow::Result<()> {
        let url = self.repo_url(&format!("issues/{}/comments", issue_number));
        let response = self
            .request(self.http.post(url))
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> anyhow::Result<()> {
        let url = self.repo_url(&format!("issues/comments/{}", comment_id));
        let response = self
            .request(self.http.patch(url))
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for GitHubPullRequestClient {
    async fn find_artifact(&self, run_id: u64, name: &str) -> anyhow::Result<Option<u64>> {
        let url = self.repo_url(&format!("actions/runs/{}/artifacts", run_id));
        let response = Self::check_status(self.request(self.http.get(url)).send().await?).await?;
        let list: ArtifactListResponse = response.json().await?;

        Ok(list
            .artifacts
            .into_iter()
            .find(|artifact| artifact.name == name)
            .map(|artifact| artifact.id))
    }

    async fn delete_artifact(&self, artifact_id: u64) -> anyhow::Result<()> {
        let url = self.repo_url(&format!("actions/artifacts/{}", artifact_id));
        let response = self.request(self.http.delete(url)).send().await?;
        // An expired or already-deleted artifact is not a failure
        if response.status() == reqwest::StatusCode::GONE {
            return Ok(());
        }
        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubPullRequestClient {
        GitHubPullRequestClient::new(&GitHubConfig {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            token: "t".to_string(),
            api_url: "https://api.github.com".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_repo_url_shape() {
        assert_eq!(
            client().repo_url("pulls/12"),
            "https://api.github.com/repos/acme/widgets/pulls/12"
        );
    }

    #[test]
    fn test_pull_request_response_parses_without_user() {
        let pull: PullRequestResponse =
            serde_json::from_str(r#"{"user": null, "created_at": "2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(pull.user.is_none());
    }

    #[test]
    fn test_artifact_list_parses_and_matches_by_name() {
        let list: ArtifactListResponse = serde_json::from_str(
            r#"{"artifacts": [{"id": 11, "name": "other"}, {"id": 12, "name": "maven-build-scan-data"}]}"#,
        )
        .unwrap();
        let id = list
            .artifacts
            .into_iter()
            .find(|a| a.name == "maven-build-scan-data")
            .map(|a| a.id);
        assert_eq!(id, Some(12));
    }

    #[test]
    fn test_comment_bodies_skip_null_bodies() {
        let comments: Vec<CommentBodyResponse> =
            serde_json::from_str(r#"[{"body": "hello"}, {"body": null}]"#).unwrap();
        let bodies: Vec<_> = comments.into_iter().filter_map(|c| c.body).collect();
        assert_eq!(bodies, vec!["hello"]);
    }
}
