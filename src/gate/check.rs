//! Contributor acceptance gate
//!
//! Decides, per pull request, whether publication may proceed. In
//! whitelist-only mode the check is side-effect free; in terms-of-service
//! mode it reads and may update the persisted acceptance registry and drives
//! the comment protocol on the pull request. Any persistence failure other
//! than "not found" fails the check closed.

use crate::core::config::GateConfig;
use crate::core::error::RepublishError;
use crate::core::traits::{PullRequestClient, Submitter};
use crate::gate::contributor::{Contributor, ContributorsRegistry};
use crate::gate::persistence::{RegistryStore, StoreError};

/// Bounded attempts for a registry write racing a concurrent acceptance
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Gate check result; only `Whitelisted` and `Accepted` allow publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Unknown,
    Whitelisted,
    Accepted,
    Pending,
}

impl GateState {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Whitelisted | Self::Accepted)
    }
}

/// The CI event that triggered this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// A completed build workflow; no acceptance can be recorded
    WorkflowRun,
    /// An issue comment on the pull request
    IssueComment { comment_id: u64, body: String },
}

impl TriggerEvent {
    /// Only an issue comment whose body is exactly the acceptance phrase
    /// records an acceptance; any other event merely re-evaluates
    fn is_acceptance(&self, acceptance_phrase: &str) -> bool {
        matches!(self, Self::IssueComment { body, .. } if body == acceptance_phrase)
    }
}

/// Decides whether a contributor may trigger publication
pub struct AcceptanceGate<'a> {
    config: &'a GateConfig,
    store: &'a dyn RegistryStore,
    client: &'a dyn PullRequestClient,
    event: TriggerEvent,
}

impl<'a> AcceptanceGate<'a> {
    pub fn new(
        config: &'a GateConfig,
        store: &'a dyn RegistryStore,
        client: &'a dyn PullRequestClient,
        event: TriggerEvent,
    ) -> Self {
        Self {
            config,
            store,
            client,
            event,
        }
    }

    /// Terminal boolean outcome; `Pending` renders to `false`
    pub async fn is_accepted(&self, pr_number: u64) -> Result<bool, RepublishError> {
        Ok(self.check(pr_number).await?.is_accepted())
    }

    /// Full gate check with the resolved state
    pub async fn check(&self, pr_number: u64) -> Result<GateState, RepublishError> {
        if self.config.whitelist_only {
            self.check_whitelist(pr_number).await
        } else {
            self.check_tos(pr_number).await
        }
    }

    /// Whitelist-only mode: no persistence, no comments
    async fn check_whitelist(&self, pr_number: u64) -> Result<GateState, RepublishError> {
        let submitter = self.pull_request_submitter(pr_number).await?;

        if self.config.is_whitelisted(&submitter.name) {
            Ok(GateState::Whitelisted)
        } else {
            Ok(GateState::Pending)
        }
    }

    /// Terms-of-service mode
    async fn check_tos(&self, pr_number: u64) -> Result<GateState, RepublishError> {
        let mut registry = self.load_or_init().await?;
        let submitter = self.pull_request_submitter(pr_number).await?;

        if self.event.is_acceptance(&self.config.comment_acceptance_request) {
            if let TriggerEvent::IssueComment { comment_id, .. } = &self.event {
                let author = self
                    .client
                    .comment_author(*comment_id)
                    .await
                    .map_err(|e| RepublishError::GitHubApi {
                        message: e.to_string(),
                    })?;

                if author == Some(submitter.id) && !registry.contains_id(submitter.id) {
                    self.record_acceptance(&registry, &submitter, pr_number)
                        .await?;
                    self.client
                        .update_comment(*comment_id, &self.config.comment_acceptance_validation)
                        .await
                        .map_err(|e| RepublishError::GitHubApi {
                            message: e.to_string(),
                        })?;
                    // Reload so later checks in this run see the addition
                    registry = self.load_or_init().await?;
                }
            }
        }

        if self.config.is_whitelisted(&submitter.name) {
            return Ok(GateState::Whitelisted);
        }
        if registry.contains_id(submitter.id) {
            return Ok(GateState::Accepted);
        }

        self.request_acceptance_once(pr_number).await?;
        Ok(GateState::Pending)
    }

    async fn pull_request_submitter(&self, pr_number: u64) -> Result<Submitter, RepublishError> {
        self.client
            .pull_request_submitter(pr_number)
            .await
            .map_err(|e| RepublishError::GitHubApi {
                message: e.to_string(),
            })?
            .ok_or(RepublishError::SubmitterNotFound { pr_number })
    }

    /// Load the registry, initializing an empty one on first use
    async fn load_or_init(&self) -> Result<ContributorsRegistry, RepublishError> {
        match self.store.load().await {
            Ok(registry) => Ok(registry),
            Err(StoreError::NotFound) => {
                let empty = ContributorsRegistry::empty();
                self.store
                    .save(&empty, "Creating terms of service acceptance file")
                    .await
                    .map_err(|e| RepublishError::RegistryPersistence {
                        message: e.to_string(),
                    })?;
                Ok(empty)
            }
            Err(error) => Err(RepublishError::RegistryPersistence {
                message: error.to_string(),
            }),
        }
    }

    /// Append the submitter and persist, reloading on a stale revision
    ///
    /// A concurrent acceptance on another pull request can race this write;
    /// each reload re-checks membership so nobody is appended twice.
    async fn record_acceptance(
        &self,
        loaded: &ContributorsRegistry,
        submitter: &Submitter,
        pr_number: u64,
    ) -> Result<(), RepublishError> {
        let candidate = Contributor {
            id: submitter.id,
            name: submitter.name.clone(),
            pull_request_no: pr_number,
            created_at: submitter.created_at,
        };
        let message = format!(
            "@{} has accepted the terms of service in #{}",
            candidate.name, pr_number
        );

        let mut current = loaded.clone();
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            if current.contains_id(candidate.id) {
                return Ok(());
            }

            let mut updated = current.clone();
            updated.list.push(candidate.clone());

            match self.store.save(&updated, &message).await {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict) if attempt < MAX_WRITE_ATTEMPTS => {
                    current = self.load_or_init().await?;
                }
                Err(error) => {
                    return Err(RepublishError::RegistryPersistence {
                        message: error.to_string(),
                    });
                }
            }
        }

        Err(RepublishError::RegistryPersistence {
            message: "registry revision stayed stale after retries".to_string(),
        })
    }

    /// Post the acceptance-request comment unless one is already there
    async fn request_acceptance_once(&self, pr_number: u64) -> Result<(), RepublishError> {
        let bodies = self
            .client
            .list_comment_bodies(pr_number)
            .await
            .map_err(|e| RepublishError::GitHubApi {
                message: e.to_string(),
            })?;

        let already_requested = bodies
            .iter()
            .any(|body| body.starts_with(&self.config.comment_acceptance_missing));
        if already_requested {
            return Ok(());
        }

        let body = format!(
            "{}<br/><br/>{}",
            self.config.comment_acceptance_missing, self.config.comment_acceptance_request
        );
        self.client
            .create_comment(pr_number, &body)
            .await
            .map_err(|e| RepublishError::GitHubApi {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn gate_config(whitelist_only: bool, white_list: &str) -> GateConfig {
        GateConfig {
            whitelist_only,
            white_list: white_list.to_string(),
            acceptance_file: ".github/tos.json".to_string(),
            acceptance_branch: "main".to_string(),
            comment_acceptance_request: "I accept the terms".to_string(),
            comment_acceptance_missing: "Acceptance is missing".to_string(),
            comment_acceptance_validation: "Acceptance recorded, thank you!".to_string(),
        }
    }

    fn submitter(id: u64, name: &str) -> Submitter {
        Submitter {
            id,
            name: name.to_string(),
            created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
        }
    }

    /// In-memory registry store with optional conflict injection
    struct FakeStore {
        registry: Mutex<Option<Vec<Contributor>>>,
        revision: Mutex<u64>,
        conflicts_remaining: Mutex<u32>,
        loads: Mutex<u32>,
        saves: Mutex<u32>,
    }

    impl FakeStore {
        fn with_contributors(list: Vec<Contributor>) -> Self {
            Self {
                registry: Mutex::new(Some(list)),
                revision: Mutex::new(1),
                conflicts_remaining: Mutex::new(0),
                loads: Mutex::new(0),
                saves: Mutex::new(0),
            }
        }

        fn empty() -> Self {
            Self::with_contributors(Vec::new())
        }

        fn missing() -> Self {
            let store = Self::with_contributors(Vec::new());
            *store.registry.lock().unwrap() = None;
            store
        }

        fn inject_conflicts(&self, count: u32) {
            *self.conflicts_remaining.lock().unwrap() = count;
        }

        fn load_count(&self) -> u32 {
            *self.loads.lock().unwrap()
        }

        fn save_count(&self) -> u32 {
            *self.saves.lock().unwrap()
        }

        fn contributor_ids(&self) -> Vec<u64> {
            self.registry
                .lock()
                .unwrap()
                .as_ref()
                .map(|list| list.iter().map(|c| c.id).collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl RegistryStore for FakeStore {
        async fn load(&self) -> Result<ContributorsRegistry, StoreError> {
            *self.loads.lock().unwrap() += 1;
            match self.registry.lock().unwrap().as_ref() {
                Some(list) => Ok(ContributorsRegistry {
                    revision: self.revision.lock().unwrap().to_string(),
                    list: list.clone(),
                }),
                None => Err(StoreError::NotFound),
            }
        }

        async fn save(
            &self,
            registry: &ContributorsRegistry,
            _message: &str,
        ) -> Result<(), StoreError> {
            *self.saves.lock().unwrap() += 1;

            let mut conflicts = self.conflicts_remaining.lock().unwrap();
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(StoreError::Conflict);
            }

            *self.registry.lock().unwrap() = Some(registry.list.clone());
            *self.revision.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// Pull request client over a fixed submitter and a comment log
    struct FakeClient {
        submitter: Option<Submitter>,
        comment_authors: Vec<(u64, u64)>,
        existing_bodies: Mutex<Vec<String>>,
        created: Mutex<Vec<String>>,
        updated: Mutex<Vec<(u64, String)>>,
    }

    impl FakeClient {
        fn new(submitter: Submitter) -> Self {
            Self {
                submitter: Some(submitter),
                comment_authors: Vec::new(),
                existing_bodies: Mutex::new(Vec::new()),
                created: Mutex::new(Vec::new()),
                updated: Mutex::new(Vec::new()),
            }
        }

        fn with_comment_author(mut self, comment_id: u64, author_id: u64) -> Self {
            self.comment_authors.push((comment_id, author_id));
            self
        }

        fn with_existing_body(self, body: &str) -> Self {
            self.existing_bodies.lock().unwrap().push(body.to_string());
            self
        }
    }

    #[async_trait]
    impl PullRequestClient for FakeClient {
        async fn pull_request_submitter(
            &self,
            _pr_number: u64,
        ) -> anyhow::Result<Option<Submitter>> {
            Ok(self.submitter.clone())
        }

        async fn comment_author(&self, comment_id: u64) -> anyhow::Result<Option<u64>> {
            Ok(self
                .comment_authors
                .iter()
                .find(|(id, _)| *id == comment_id)
                .map(|(_, author)| *author))
        }

        async fn list_comment_bodies(&self, _issue_number: u64) -> anyhow::Result<Vec<String>> {
            Ok(self.existing_bodies.lock().unwrap().clone())
        }

        async fn create_comment(&self, _issue_number: u64, body: &str) -> anyhow::Result<()> {
            self.created.lock().unwrap().push(body.to_string());
            Ok(())
        }

        async fn update_comment(&self, comment_id: u64, body: &str) -> anyhow::Result<()> {
            self.updated
                .lock()
                .unwrap()
                .push((comment_id, body.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_whitelist_mode_accepts_listed_submitter_without_persistence() {
        let config = gate_config(true, "alice,bob");
        let store = FakeStore::empty();
        let client = FakeClient::new(submitter(1, "alice"));
        let gate = AcceptanceGate::new(&config, &store, &client, TriggerEvent::WorkflowRun);

        assert!(gate.is_accepted(12).await.unwrap());
        assert_eq!(store.load_count(), 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_whitelist_mode_rejects_unlisted_submitter() {
        let config = gate_config(true, "alice");
        let store = FakeStore::empty();
        let client = FakeClient::new(submitter(2, "mallory"));
        let gate = AcceptanceGate::new(&config, &store, &client, TriggerEvent::WorkflowRun);

        assert!(!gate.is_accepted(12).await.unwrap());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_tos_mode_acceptance_comment_registers_and_confirms() {
        let config = gate_config(false, "");
        let store = FakeStore::empty();
        let client =
            FakeClient::new(submitter(7, "carol")).with_comment_author(100, 7);
        let event = TriggerEvent::IssueComment {
            comment_id: 100,
            body: "I accept the terms".to_string(),
        };
        let gate = AcceptanceGate::new(&config, &store, &client, event);

        assert!(gate.is_accepted(12).await.unwrap());
        assert_eq!(store.contributor_ids(), vec![7]);
        let updated = client.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0], (100, "Acceptance recorded, thank you!".to_string()));
        assert!(client.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tos_mode_already_registered_is_idempotent() {
        let config = gate_config(false, "");
        let store = FakeStore::with_contributors(vec![Contributor {
            id: 7,
            name: "carol".to_string(),
            pull_request_no: 12,
            created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
        }]);
        let client =
            FakeClient::new(submitter(7, "carol")).with_comment_author(100, 7);
        let event = TriggerEvent::IssueComment {
            comment_id: 100,
            body: "I accept the terms".to_string(),
        };
        let gate = AcceptanceGate::new(&config, &store, &client, event);

        assert!(gate.is_accepted(12).await.unwrap());
        // Already registered: no write, no confirmation edit
        assert_eq!(store.save_count(), 0);
        assert!(client.updated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tos_mode_comment_from_another_user_does_not_register() {
        let config = gate_config(false, "");
        let store = FakeStore::empty();
        let client =
            FakeClient::new(submitter(7, "carol")).with_comment_author(100, 99);
        let event = TriggerEvent::IssueComment {
            comment_id: 100,
            body: "I accept the terms".to_string(),
        };
        let gate = AcceptanceGate::new(&config, &store, &client, event);

        assert!(!gate.is_accepted(12).await.unwrap());
        assert!(store.contributor_ids().is_empty());
    }

    #[tokio::test]
    async fn test_tos_mode_pending_posts_request_comment_once() {
        let config = gate_config(false, "");
        let store = FakeStore::empty();
        let client = FakeClient::new(submitter(7, "carol"));
        let gate = AcceptanceGate::new(&config, &store, &client, TriggerEvent::WorkflowRun);

        assert!(!gate.is_accepted(12).await.unwrap());
        let created = client.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert!(created[0].starts_with("Acceptance is missing"));
        assert!(created[0].contains("I accept the terms"));
    }

    #[tokio::test]
    async fn test_tos_mode_does_not_duplicate_request_comment() {
        let config = gate_config(false, "");
        let store = FakeStore::empty();
        let client = FakeClient::new(submitter(7, "carol"))
            .with_existing_body("Acceptance is missing<br/><br/>I accept the terms");
        let gate = AcceptanceGate::new(&config, &store, &client, TriggerEvent::WorkflowRun);

        assert!(!gate.is_accepted(12).await.unwrap());
        assert!(client.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tos_mode_whitelisted_name_short_circuits_registry() {
        let config = gate_config(false, "carol");
        let store = FakeStore::empty();
        let client = FakeClient::new(submitter(7, "carol"));
        let gate = AcceptanceGate::new(&config, &store, &client, TriggerEvent::WorkflowRun);

        let state = gate.check(12).await.unwrap();
        assert_eq!(state, GateState::Whitelisted);
    }

    #[tokio::test]
    async fn test_tos_mode_missing_registry_initializes_empty_file() {
        let config = gate_config(false, "");
        let store = FakeStore::missing();
        let client = FakeClient::new(submitter(7, "carol"));
        let gate = AcceptanceGate::new(&config, &store, &client, TriggerEvent::WorkflowRun);

        assert!(!gate.is_accepted(12).await.unwrap());
        // Not-found triggered an initializing save
        assert!(store.save_count() >= 1);
    }

    #[tokio::test]
    async fn test_tos_mode_stale_revision_is_retried_with_reload() {
        let config = gate_config(false, "");
        let store = FakeStore::empty();
        store.inject_conflicts(1);
        let client =
            FakeClient::new(submitter(7, "carol")).with_comment_author(100, 7);
        let event = TriggerEvent::IssueComment {
            comment_id: 100,
            body: "I accept the terms".to_string(),
        };
        let gate = AcceptanceGate::new(&config, &store, &client, event);

        assert!(gate.is_accepted(12).await.unwrap());
        assert_eq!(store.contributor_ids(), vec![7]);
        // First save conflicted, second one landed
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn test_tos_mode_recheck_comment_reevaluates_without_registering() {
        let config = gate_config(false, "");
        let store = FakeStore::empty();
        let client =
            FakeClient::new(submitter(7, "carol")).with_comment_author(100, 7);
        let event = TriggerEvent::IssueComment {
            comment_id: 100,
            body: "recheck".to_string(),
        };
        let gate = AcceptanceGate::new(&config, &store, &client, event);

        assert!(!gate.is_accepted(12).await.unwrap());
        assert!(store.contributor_ids().is_empty());
        assert!(client.updated.lock().unwrap().is_empty());
    }

    struct FailingStore;

    #[async_trait]
    impl RegistryStore for FailingStore {
        async fn load(&self) -> Result<ContributorsRegistry, StoreError> {
            Err(StoreError::Other("HTTP 403 Forbidden".to_string()))
        }

        async fn save(
            &self,
            _registry: &ContributorsRegistry,
            _message: &str,
        ) -> Result<(), StoreError> {
            Err(StoreError::Other("HTTP 403 Forbidden".to_string()))
        }
    }

    #[tokio::test]
    async fn test_tos_mode_fails_closed_on_persistence_error() {
        let config = gate_config(false, "");
        let store = FailingStore;
        let client = FakeClient::new(submitter(7, "carol"));
        let gate = AcceptanceGate::new(&config, &store, &client, TriggerEvent::WorkflowRun);

        let result = gate.is_accepted(12).await;
        assert!(matches!(
            result,
            Err(RepublishError::RegistryPersistence { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_submitter_is_an_error() {
        let config = gate_config(false, "");
        let store = FakeStore::empty();
        let mut client = FakeClient::new(submitter(7, "carol"));
        client.submitter = None;
        let gate = AcceptanceGate::new(&config, &store, &client, TriggerEvent::WorkflowRun);

        let result = gate.is_accepted(12).await;
        assert!(matches!(
            result,
            Err(RepublishError::SubmitterNotFound { pr_number: 12 })
        ));
    }
}
