//! Credential resolution for the remote reporting server

pub mod access_key;
pub mod provider;
pub mod short_lived_token;

pub use provider::{
    mask, AccessCredentialProvider, Credential, CredentialProvenance,
    ENV_KEY_DEVELOCITY_ACCESS_KEY, ENV_KEY_GRADLE_ENTERPRISE_ACCESS_KEY,
};
pub use short_lived_token::TokenExchanger;
