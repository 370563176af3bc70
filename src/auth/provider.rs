//! Access credential resolution
//!
//! Resolution never fails outward: it degrades through a fixed fallback
//! chain and logs warnings instead. The returned credential value is held
//! behind `SecretString` and must never be printed; the provenance tag is
//! what log lines get.

use crate::auth::short_lived_token::TokenExchanger;
use secrecy::{ExposeSecret, SecretString};
use std::env;

/// Current environment variable carrying an access key
pub const ENV_KEY_DEVELOCITY_ACCESS_KEY: &str = "DEVELOCITY_ACCESS_KEY";
/// Deprecated environment variable carrying an access key
pub const ENV_KEY_GRADLE_ENTERPRISE_ACCESS_KEY: &str = "GRADLE_ENTERPRISE_ACCESS_KEY";

/// Where a resolved credential came from; used only for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialProvenance {
    ShortLived,
    ProvidedKey,
    LegacyEnv,
    Anonymous,
}

/// An opaque credential for the remote reporting server
pub struct Credential {
    token: SecretString,
    provenance: CredentialProvenance,
}

impl Credential {
    pub fn new(token: String, provenance: CredentialProvenance) -> Self {
        Self {
            token: SecretString::new(token.into()),
            provenance,
        }
    }

    /// The raw credential value, for the subprocess environment only
    pub fn expose(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn provenance(&self) -> CredentialProvenance {
        self.provenance
    }

    pub fn is_empty(&self) -> bool {
        self.token.expose_secret().is_empty()
    }

    /// Masked rendering safe for log lines
    pub fn masked(&self) -> String {
        mask(self.token.expose_secret())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("provenance", &self.provenance)
            .finish()
    }
}

/// Mask a secret for logging: first and last three characters only
pub fn mask(value: &str) -> String {
    if value.chars().count() < 10 {
        return "****".to_string();
    }
    let head: String = value.chars().take(3).collect();
    let tail: String = value
        .chars()
        .rev()
        .take(3)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}...{}", head, tail)
}

/// Resolves the credential used against the remote reporting server
pub struct AccessCredentialProvider {
    exchanger: TokenExchanger,
}

impl AccessCredentialProvider {
    pub fn new(allow_untrusted: bool) -> anyhow::Result<Self> {
        Ok(Self {
            exchanger: TokenExchanger::new(allow_untrusted)?,
        })
    }

    /// Resolve a credential from the provided key or the environment
    ///
    /// Fallback chain: short-lived token exchange, the provided key itself,
    /// the current env var, the deprecated env var, anonymous.
    pub async fn resolve(&self, provided_key: &str, token_expiry: &str) -> Credential {
        if !provided_key.is_empty() {
            match self.exchanger.exchange_all(provided_key, token_expiry).await {
                Ok(tokens) => {
                    return Credential::new(tokens, CredentialProvenance::ShortLived);
                }
                Err(error) => {
                    eprintln!("⚠️  Failed to fetch short-lived token: {}", error);
                    println!("Falling back to using the access key from the input");
                    return Credential::new(
                        provided_key.to_string(),
                        CredentialProvenance::ProvidedKey,
                    );
                }
            }
        }

        if let Ok(key) = env::var(ENV_KEY_DEVELOCITY_ACCESS_KEY) {
            if !key.is_empty() {
                eprintln!(
                    "⚠️  The {} env var ({}) should be mapped to a short-lived token",
                    ENV_KEY_DEVELOCITY_ACCESS_KEY,
                    mask(&key)
                );
                return Credential::new(key, CredentialProvenance::LegacyEnv);
            }
        }

        if let Ok(key) = env::var(ENV_KEY_GRADLE_ENTERPRISE_ACCESS_KEY) {
            if !key.is_empty() {
                eprintln!(
                    "⚠️  The {} env var ({}) is deprecated",
                    ENV_KEY_GRADLE_ENTERPRISE_ACCESS_KEY,
                    mask(&key)
                );
                return Credential::new(key, CredentialProvenance::LegacyEnv);
            }
        }

        Credential::new(String::new(), CredentialProvenance::Anonymous)
    }
}
