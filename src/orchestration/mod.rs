pub mod outcome;
pub mod republisher;
pub mod summary;

pub use outcome::{BatchTally, PublishOutcome};
pub use republisher::RepublishOrchestrator;
pub use summary::SummaryReporter;
