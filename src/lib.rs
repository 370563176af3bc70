pub mod auth;
pub mod core;
pub mod gate;
pub mod orchestration;
pub mod scans;
pub mod security;
pub mod tools;

pub use crate::core::*;
pub use auth::{AccessCredentialProvider, Credential, CredentialProvenance, TokenExchanger};
pub use gate::{AcceptanceGate, GateState, TriggerEvent};
pub use orchestration::{BatchTally, PublishOutcome, RepublishOrchestrator, SummaryReporter};
pub use scans::{BuildMetadata, ScanDump, ScanDumpRepository};
pub use security::{CommandError, CommandOutput, CommandRunner, SafeCommandExecutor};
pub use tools::BuildTool;
