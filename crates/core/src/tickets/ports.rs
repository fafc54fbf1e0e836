//! Port interfaces for ticket sync
//!
//! Infrastructure implements these; [`super::TicketRepository`] and the
//! scheduler depend only on the traits.

use std::sync::Arc;

use async_trait::async_trait;
use ticketsync_domain::{
    ProviderKind, Result, TicketIssue, TicketProject, TicketSourceConfig, TicketSyncError,
    TicketUser,
};
use tokio::sync::watch;

/// Client for one tracker backend.
///
/// Every method takes the source config explicitly; clients hold no
/// per-source state and one instance serves every source of its provider.
/// Failures are always returned as [`TicketSyncError`].
#[async_trait]
pub trait TicketProviderClient: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Authenticate and return the account the credentials belong to.
    async fn test_connection(&self, config: &TicketSourceConfig) -> Result<TicketUser>;

    /// Search issues. Blank `query` means the provider's "recently updated"
    /// default.
    async fn search_issues(
        &self,
        config: &TicketSourceConfig,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<TicketIssue>>;

    async fn get_issue_by_key(&self, config: &TicketSourceConfig, key: &str)
        -> Result<TicketIssue>;

    async fn get_projects(&self, config: &TicketSourceConfig) -> Result<Vec<TicketProject>>;

    async fn get_current_user(&self, config: &TicketSourceConfig) -> Result<TicketUser>;

    async fn validate_credentials(&self, config: &TicketSourceConfig) -> bool {
        self.test_connection(config).await.is_ok()
    }

    /// User-facing text for `error`, with provider-specific remediation.
    fn error_message(&self, error: &TicketSyncError, config: &TicketSourceConfig) -> String;
}

/// Resolves the client for a provider kind.
pub trait TicketProviderFactory: Send + Sync {
    fn client_for(&self, provider: ProviderKind) -> Result<Arc<dyn TicketProviderClient>>;
}

/// Durable source configuration.
///
/// Credentials are encrypted at rest; rows that fail to decrypt are left
/// out of read results.
#[async_trait]
pub trait SourceConfigStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<TicketSourceConfig>>;

    async fn get_enabled(&self) -> Result<Vec<TicketSourceConfig>>;

    async fn get_by_id(&self, id: &str) -> Result<Option<TicketSourceConfig>>;

    async fn get_by_provider(&self, provider: ProviderKind) -> Result<Vec<TicketSourceConfig>>;

    /// Insert or replace; validates the config first.
    async fn save(&self, config: &TicketSourceConfig) -> Result<()>;

    /// Insert or replace several configs in one transaction.
    async fn save_all(&self, configs: &[TicketSourceConfig]) -> Result<()>;

    /// Returns `true` when a row was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Fails with `NotFound` for an unknown id.
    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<()>;

    /// Fails with `NotFound` for an unknown id.
    async fn update_sync_interval(&self, id: &str, minutes: u32) -> Result<()>;

    /// Revision counter bumped after every committed mutation.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// Durable local mirror of remote issues, keyed by `(source_id, id)`.
///
/// Listing queries return issues ordered by key prefix descending, then
/// numeric key suffix descending.
#[async_trait]
pub trait IssueCache: Send + Sync {
    async fn get_all(&self) -> Result<Vec<TicketIssue>>;

    async fn get_by_source(&self, source_id: &str) -> Result<Vec<TicketIssue>>;

    /// Exact key match; several sources may share a key.
    async fn get_by_key(&self, key: &str) -> Result<Vec<TicketIssue>>;

    async fn get_by_source_and_key(&self, source_id: &str, key: &str)
        -> Result<Option<TicketIssue>>;

    async fn get_by_project(&self, project_key: &str) -> Result<Vec<TicketIssue>>;

    async fn get_by_assignee(&self, assignee: &str) -> Result<Vec<TicketIssue>>;

    /// Case-insensitive substring search over key and summary. Blank text
    /// matches everything.
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<TicketIssue>>;

    async fn upsert(&self, issue: &TicketIssue) -> Result<()>;

    /// Upsert a batch in one transaction; returns the number written.
    async fn upsert_all(&self, issues: &[TicketIssue]) -> Result<usize>;

    async fn delete_by_source(&self, source_id: &str) -> Result<usize>;

    async fn delete_by_key(&self, key: &str) -> Result<usize>;

    async fn delete_all(&self) -> Result<usize>;

    async fn count(&self) -> Result<usize>;

    async fn count_by_source(&self, source_id: &str) -> Result<usize>;

    /// Revision counter bumped after every committed write.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// Symmetric encryption for credential blobs at rest.
pub trait CredentialCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// `None` for any malformed, truncated or foreign ciphertext.
    fn decrypt(&self, ciphertext: &str) -> Option<String>;
}
