//! Contributor acceptance gate
//!
//! Governs whether a pull request contributor is authorized to trigger
//! republication; state is persisted as a JSON registry in the repository.

pub mod check;
pub mod contributor;
pub mod github;
pub mod persistence;

pub use check::{AcceptanceGate, GateState, TriggerEvent};
pub use contributor::{Contributor, ContributorsRegistry};
pub use github::GitHubPullRequestClient;
pub use persistence::{GitHubContentsStore, RegistryStore, StoreError};
