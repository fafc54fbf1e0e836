//! Shared fixtures for `ticketsync-infra` integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use ticketsync_common::SecureString;
use ticketsync_core::tickets::{
    CredentialCipher, IssueCache, SourceConfigStore, TicketProviderClient, TicketProviderFactory,
    TicketRepository,
};
use ticketsync_domain::{
    IssueStatus, ProviderKind, Result, SourceCredentials, TicketIssue, TicketProject,
    TicketSourceConfig, TicketSyncError, TicketUser,
};
use ticketsync_infra::database::{DbManager, SqlCipherIssueCache, SqlCipherSourceConfigStore};
use ticketsync_infra::security::AesCredentialCipher;

pub const TEST_DB_KEY: &str = "1111111111111111111111111111111111111111111111111111111111111111";
pub const TEST_CREDENTIAL_KEY: &str =
    "2222222222222222222222222222222222222222222222222222222222222222";

/// Migrated SQLCipher database in a temporary directory.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let db_path = temp_dir.path().join("ticketsync-test.db");

        let manager = Arc::new(
            DbManager::new(&db_path, 4, SecureString::new(TEST_DB_KEY))
                .expect("database manager should initialise"),
        );
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager, temp_dir }
    }

    pub fn config_store(&self) -> SqlCipherSourceConfigStore {
        self.config_store_with_key(TEST_CREDENTIAL_KEY)
    }

    pub fn config_store_with_key(&self, hex_key: &str) -> SqlCipherSourceConfigStore {
        SqlCipherSourceConfigStore::new(Arc::clone(&self.manager), cipher(hex_key))
    }

    pub fn issue_cache(&self) -> SqlCipherIssueCache {
        SqlCipherIssueCache::new(Arc::clone(&self.manager))
    }

    /// Repository over this database's stores and the given providers.
    pub fn repository(&self, providers: Arc<dyn TicketProviderFactory>) -> Arc<TicketRepository> {
        let configs: Arc<dyn SourceConfigStore> = Arc::new(self.config_store());
        let cache: Arc<dyn IssueCache> = Arc::new(self.issue_cache());
        Arc::new(TicketRepository::new(providers, configs, cache))
    }
}

pub fn cipher(hex_key: &str) -> Arc<dyn CredentialCipher> {
    Arc::new(
        AesCredentialCipher::from_hex_key(&SecureString::new(hex_key))
            .expect("cipher should accept a 64-char hex key"),
    )
}

pub fn jira_source(name: &str, base_url: &str) -> TicketSourceConfig {
    TicketSourceConfig::new(
        name,
        base_url,
        SourceCredentials::JiraBasic { email: "dev@example.com".into(), api_token: "api-token".into() },
    )
}

pub fn jira_bearer_source(name: &str, base_url: &str) -> TicketSourceConfig {
    TicketSourceConfig::new(
        name,
        base_url,
        SourceCredentials::JiraBearer { personal_access_token: "pat-token".into() },
    )
}

pub fn github_source(name: &str, base_url: &str, repositories: &[&str]) -> TicketSourceConfig {
    TicketSourceConfig::new(
        name,
        base_url,
        SourceCredentials::GitHub {
            token: "ghp_test".into(),
            owner: "acme".into(),
            repositories: repositories.iter().map(|r| (*r).to_string()).collect(),
        },
    )
}

pub fn gitlab_source(name: &str, base_url: &str, project_ids: &[&str]) -> TicketSourceConfig {
    TicketSourceConfig::new(
        name,
        base_url,
        SourceCredentials::GitLab {
            token: "glpat-test".into(),
            project_ids: project_ids.iter().map(|p| (*p).to_string()).collect(),
        },
    )
}

pub fn issue(source_id: &str, key: &str, summary: &str) -> TicketIssue {
    let project_key = key.split('-').next().unwrap_or(key).to_string();
    TicketIssue {
        id: format!("id-{key}"),
        source_id: source_id.to_string(),
        key: key.to_string(),
        summary: summary.to_string(),
        status: IssueStatus::Open,
        project_name: project_key.clone(),
        project_key,
        issue_type: "Task".into(),
        assignee: Some("Dana".into()),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        provider: ProviderKind::Jira,
        web_url: None,
    }
}

/// Jira provider stub that counts searches per source and returns one issue,
/// optionally after a delay.
#[derive(Default)]
pub struct CountingProvider {
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingProvider {
    /// Every search takes `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn calls_for(&self, source_id: &str) -> usize {
        self.calls.lock().unwrap().get(source_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketProviderClient for CountingProvider {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Jira
    }

    async fn test_connection(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        self.get_current_user(config).await
    }

    async fn search_issues(
        &self,
        config: &TicketSourceConfig,
        _query: &str,
        _max_results: u32,
    ) -> Result<Vec<TicketIssue>> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(config.id.clone()).or_default();
            *count += 1;
            *count
        };
        self.total.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(vec![issue(&config.id, &format!("SYNC-{call}"), "scheduled")])
    }

    async fn get_issue_by_key(&self, _config: &TicketSourceConfig, key: &str) -> Result<TicketIssue> {
        Err(TicketSyncError::NotFound(key.to_string()))
    }

    async fn get_projects(&self, _config: &TicketSourceConfig) -> Result<Vec<TicketProject>> {
        Ok(Vec::new())
    }

    async fn get_current_user(&self, _config: &TicketSourceConfig) -> Result<TicketUser> {
        Ok(TicketUser { id: "u1".into(), display_name: "Dev".into(), email: None })
    }

    fn error_message(&self, error: &TicketSyncError, _config: &TicketSourceConfig) -> String {
        error.to_string()
    }
}

pub struct SingleProvider(pub Arc<dyn TicketProviderClient>);

impl TicketProviderFactory for SingleProvider {
    fn client_for(&self, provider: ProviderKind) -> Result<Arc<dyn TicketProviderClient>> {
        if provider == self.0.provider() {
            Ok(Arc::clone(&self.0))
        } else {
            Err(TicketSyncError::Configuration(format!("no client for {provider}")))
        }
    }
}
