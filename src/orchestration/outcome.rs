//! Per-dump publication outcomes

use serde::{Deserialize, Serialize};

/// Result of one dump's publication attempt
///
/// One failed dump never aborts the batch, so the orchestrator returns one of
/// these per dump instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Build id the dump was captured under
    pub build_id: String,

    /// Capture plugin/extension version the dump was written with
    pub version: String,

    /// Whether the publish subprocess was considered successful
    pub succeeded: bool,

    /// Scan link extracted from the subprocess output, when one was printed
    pub scan_link: Option<String>,

    /// Failure detail for the summary, present only when `succeeded` is false
    pub error_message: Option<String>,
}

impl PublishOutcome {
    pub fn published(build_id: String, version: String, scan_link: Option<String>) -> Self {
        Self {
            build_id,
            version,
            succeeded: true,
            scan_link,
            error_message: None,
        }
    }

    pub fn failed(build_id: String, version: String, error_message: String) -> Self {
        Self {
            build_id,
            version,
            succeeded: false,
            scan_link: None,
            error_message: Some(error_message),
        }
    }
}

/// Aggregate counts over a batch, for the final console line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchTally {
    pub published: usize,
    pub failed: usize,
}

impl BatchTally {
    pub fn of(outcomes: &[PublishOutcome]) -> Self {
        let published = outcomes.iter().filter(|o| o.succeeded).count();
        Self {
            published,
            failed: outcomes.len() - published,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
