//! Acceptance registry persistence
//!
//! The registry lives as a JSON file in the repository itself, read and
//! written through the platform's contents API. Content is base64 on the
//! wire in both directions; the file's blob sha is the optimistic-concurrency
//! revision token.

use crate::core::config::{GateConfig, GitHubConfig};
use crate::gate::contributor::ContributorsRegistry;
use async_trait::async_trait;
use base64::prelude::{Engine, BASE64_STANDARD};
use serde::Deserialize;
use thiserror::Error;

/// Errors a registry store can surface
///
/// `NotFound` and `Conflict` are ordinary control flow for the gate; anything
/// else is fatal and fails the gate check closed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("registry file not found")]
    NotFound,

    #[error("registry revision is stale")]
    Conflict,

    #[error("registry store error: {0}")]
    Other(String),
}

/// Persistence seam for the acceptance registry
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Load the registry and its current revision token
    async fn load(&self) -> Result<ContributorsRegistry, StoreError>;

    /// Write the registry back, supplying the loaded revision token
    async fn save(&self, registry: &ContributorsRegistry, message: &str) -> Result<(), StoreError>;
}

/// Registry store backed by the GitHub repository contents API
pub struct GitHubContentsStore {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
    path: String,
    branch: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    content: String,
}

impl GitHubContentsStore {
    pub fn new(github: &GitHubConfig, gate: &GateConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_url: github.api_url.clone(),
            owner: github.owner.clone(),
            repo: github.repo.clone(),
            token: github.token.clone(),
            path: gate.acceptance_file.clone(),
            branch: gate.acceptance_branch.clone(),
        })
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url, self.owner, self.repo, self.path
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "scan-republisher")
    }
}

#[async_trait]
impl RegistryStore for GitHubContentsStore {
    async fn load(&self) -> Result<ContributorsRegistry, StoreError> {
        let response = self
            .request(self.http.get(self.contents_url()))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !status.is_success() {
            return Err(StoreError::Other(format!(
                "loading {} returned HTTP {}",
                self.path,
                status.as_u16()
            )));
        }

        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let content = decode_content(&body.content)?;
        Ok(ContributorsRegistry::from_json(body.sha, &content))
    }

    async fn save(&self, registry: &ContributorsRegistry, message: &str) -> Result<(), StoreError> {
        let content = registry
            .to_json()
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64_STANDARD.encode(content),
            "branch": self.branch,
        });
        if !registry.revision.is_empty() {
            body["sha"] = serde_json::Value::String(registry.revision.clone());
        }

        let response = self
            .request(self.http.put(self.contents_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            return Err(StoreError::Conflict);
        }
        if !status.is_success() {
            return Err(StoreError::Other(format!(
                "writing {} returned HTTP {}",
                self.path,
                status.as_u16()
            )));
        }

        Ok(())
    }
}

/// Decode contents-API base64, which arrives newline-wrapped
fn decode_content(raw: &str) -> Result<String, StoreError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64_STANDARD
        .decode(compact)
        .map_err(|e| StoreError::Other(format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Other(format!("invalid UTF-8 content: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_plain() {
        let encoded = BASE64_STANDARD.encode("[]");
        assert_eq!(decode_content(&encoded).unwrap(), "[]");
    }

    #[test]
    fn test_decode_content_with_newlines() {
        // The contents API wraps base64 at 60 columns
        let encoded = BASE64_STANDARD.encode(r#"[{"id": 1}]"#);
        let wrapped = format!("{}\n{}\n", &encoded[..4], &encoded[4..]);
        assert_eq!(decode_content(&wrapped).unwrap(), r#"[{"id": 1}]"#);
    }

    #[test]
    fn test_decode_content_rejects_garbage() {
        assert!(matches!(
            decode_content("!!not-base64!!"),
            Err(StoreError::Other(_))
        ));
    }

    #[test]
    fn test_contents_url_shape() {
        let github = GitHubConfig {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            token: "t".to_string(),
            api_url: "https://api.github.com".to_string(),
        };
        let gate = GateConfig {
            whitelist_only: false,
            white_list: String::new(),
            acceptance_file: ".github/tos.json".to_string(),
            acceptance_branch: "main".to_string(),
            comment_acceptance_request: String::new(),
            comment_acceptance_missing: String::new(),
            comment_acceptance_validation: String::new(),
        };

        let store = GitHubContentsStore::new(&github, &gate).unwrap();
        assert_eq!(
            store.contents_url(),
            "https://api.github.com/repos/acme/widgets/contents/.github/tos.json"
        );
    }
}
