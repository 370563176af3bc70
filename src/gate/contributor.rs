//! Acceptance registry data model
//!
//! The registry is stored as a UTF-8 JSON array of contributors at a
//! configured path and branch in the repository; the store's revision token
//! (the blob sha) rides alongside for optimistic-concurrency writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contributor who accepted the terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Platform user id
    pub id: u64,

    /// Login name
    #[serde(alias = "login")]
    pub name: String,

    /// Pull request the acceptance was recorded on
    #[serde(rename = "pullRequestNo")]
    pub pull_request_no: u64,

    /// Creation timestamp of the accepted pull request
    pub created_at: DateTime<Utc>,
}

/// The loaded registry plus the revision token needed to write it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorsRegistry {
    /// Opaque revision supplied by the store at load time; must be passed
    /// back unchanged on write
    pub revision: String,
    pub list: Vec<Contributor>,
}

impl ContributorsRegistry {
    pub fn empty() -> Self {
        Self {
            revision: String::new(),
            list: Vec::new(),
        }
    }

    /// Check whether a user id is already registered
    pub fn contains_id(&self, id: u64) -> bool {
        self.list.iter().any(|contributor| contributor.id == id)
    }

    /// Serialize the contributor list the way it is stored
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.list)
    }

    /// Parse stored content; non-array content re-initializes to empty
    pub fn from_json(revision: String, content: &str) -> Self {
        let list = serde_json::from_str::<Vec<Contributor>>(content).unwrap_or_else(|_| {
            println!("Initializing acceptance registry data");
            Vec::new()
        });

        Self { revision, list }
    }
}
