//! Short-lived token exchange
//!
//! Swaps a long-lived access key for short-lived tokens by POSTing to
//! `https://<host>/api/auth/token` with the key as a bearer credential. The
//! response body is the token text. Each host gets up to three attempts;
//! hosts that never answer are dropped from the result.

use crate::auth::access_key::{self, HostKey};
use crate::core::retry::{RetryManager, RetryOptions};

/// Exchanges access keys for short-lived tokens
pub struct TokenExchanger {
    http: reqwest::Client,
    retry: RetryManager,
}

impl TokenExchanger {
    pub fn new(allow_untrusted: bool) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(allow_untrusted)
            .build()?;

        Ok(Self {
            http,
            retry: RetryManager::new(RetryOptions::default()),
        })
    }

    /// Exchange every host entry of `raw_access_key`
    ///
    /// Returns the joined `host=token;…` string. Errors when the key parses
    /// to no entries or no host produced a token; the caller falls back to
    /// the original key in that case.
    pub async fn exchange_all(&self, raw_access_key: &str, expiry: &str) -> anyhow::Result<String> {
        let entries = access_key::parse(raw_access_key);
        if entries.is_empty() {
            anyhow::bail!("access key contains no host entries");
        }

        let mut tokens = Vec::new();
        for entry in &entries {
            match self.exchange_host(entry, expiry).await {
                Ok(token) => tokens.push(HostKey {
                    host: entry.host.clone(),
                    key: token,
                }),
                Err(error) => {
                    eprintln!(
                        "⚠️  Short-lived token request failed for {}: {}",
                        entry.host, error
                    );
                }
            }
        }

        if tokens.is_empty() {
            anyhow::bail!("no host returned a short-lived token");
        }

        Ok(access_key::join(&tokens))
    }

    async fn exchange_host(&self, entry: &HostKey, expiry: &str) -> anyhow::Result<String> {
        let mut url = format!("{}/api/auth/token", host_base_url(&entry.host));
        if !expiry.is_empty() {
            url.push_str(&format!("?expiresInHours={}", expiry));
        }

        self.retry
            .retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(&entry.key)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    anyhow::bail!("HTTP {} from {}", status.as_u16(), entry.host);
                }

                let token = response.text().await?;
                if token.is_empty() {
                    anyhow::bail!("empty token from {}", entry.host);
                }
                Ok(token)
            })
            .await
    }
}

fn host_base_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
