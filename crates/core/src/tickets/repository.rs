//! Ticket repository - provider calls, cache reads/writes and fallback policy
//!
//! Foreground operations (`refresh_source`, `test_connection`, ...) return
//! provider failures to the caller. Background paths (the network half of
//! [`TicketRepository::search_issues`]) log failures and keep serving
//! cached data.

use std::sync::Arc;

use futures::future::join_all;
use ticketsync_domain::constants::{DEFAULT_REFRESH_MAX_RESULTS, DEFAULT_SEARCH_MAX_RESULTS};
use ticketsync_domain::{
    RefreshSummary, Result, SyncOutcome, TicketIssue, TicketProject, TicketSourceConfig,
    TicketSyncError, TicketUser,
};
use tracing::{debug, info, instrument, warn};

use super::ports::{IssueCache, SourceConfigStore, TicketProviderClient, TicketProviderFactory};
use super::single_flight::SourceLocks;
use super::subscription::{IssueQuery, IssueSubscription};

/// Orchestrates provider clients, the config store and the issue cache.
pub struct TicketRepository {
    providers: Arc<dyn TicketProviderFactory>,
    configs: Arc<dyn SourceConfigStore>,
    cache: Arc<dyn IssueCache>,
    locks: Arc<SourceLocks>,
    refresh_max_results: u32,
}

impl TicketRepository {
    pub fn new(
        providers: Arc<dyn TicketProviderFactory>,
        configs: Arc<dyn SourceConfigStore>,
        cache: Arc<dyn IssueCache>,
    ) -> Self {
        Self {
            providers,
            configs,
            cache,
            locks: Arc::new(SourceLocks::new()),
            refresh_max_results: DEFAULT_REFRESH_MAX_RESULTS,
        }
    }

    /// Cap on issues fetched per source refresh.
    #[must_use]
    pub fn with_refresh_max_results(mut self, max_results: u32) -> Self {
        self.refresh_max_results = max_results.max(1);
        self
    }

    pub fn config_store(&self) -> &Arc<dyn SourceConfigStore> {
        &self.configs
    }

    pub fn issue_cache(&self) -> &Arc<dyn IssueCache> {
        &self.cache
    }

    /// `true` while a refresh of `source_id` is in flight.
    pub fn is_refreshing(&self, source_id: &str) -> bool {
        self.locks.is_busy(source_id)
    }

    // ------------------------------------------------------------------
    // Live queries
    // ------------------------------------------------------------------

    /// Live cache search, plus a best-effort provider search that writes
    /// its results into the cache.
    ///
    /// The subscription first yields current cache matches and re-yields
    /// whenever the cache changes. Provider failures are logged only.
    pub fn search_issues(&self, query: &str) -> IssueSubscription {
        let subscription = IssueSubscription::spawn(
            Arc::clone(&self.cache),
            IssueQuery::Search {
                text: query.trim().to_string(),
                limit: DEFAULT_SEARCH_MAX_RESULTS as usize,
            },
        );

        let providers = Arc::clone(&self.providers);
        let configs = Arc::clone(&self.configs);
        let cache = Arc::clone(&self.cache);
        let query = query.trim().to_string();
        tokio::spawn(async move {
            background_search(providers, configs, cache, &query).await;
        });

        subscription
    }

    pub fn watch_all(&self) -> IssueSubscription {
        IssueSubscription::spawn(Arc::clone(&self.cache), IssueQuery::All)
    }

    pub fn watch_project(&self, project_key: &str) -> IssueSubscription {
        IssueSubscription::spawn(
            Arc::clone(&self.cache),
            IssueQuery::Project(project_key.to_string()),
        )
    }

    pub fn watch_assignee(&self, assignee: &str) -> IssueSubscription {
        IssueSubscription::spawn(
            Arc::clone(&self.cache),
            IssueQuery::Assignee(assignee.to_string()),
        )
    }

    // ------------------------------------------------------------------
    // Cache-only reads
    // ------------------------------------------------------------------

    pub async fn get_all_cached_issues(&self) -> Result<Vec<TicketIssue>> {
        self.cache.get_all().await
    }

    /// First cached issue with exactly this key, across all sources.
    pub async fn get_issue_by_key(&self, key: &str) -> Result<Option<TicketIssue>> {
        Ok(self.cache.get_by_key(key).await?.into_iter().next())
    }

    pub async fn get_issue_by_source_and_key(
        &self,
        source_id: &str,
        key: &str,
    ) -> Result<Option<TicketIssue>> {
        self.cache.get_by_source_and_key(source_id, key).await
    }

    pub async fn get_issues_by_project(&self, project_key: &str) -> Result<Vec<TicketIssue>> {
        self.cache.get_by_project(project_key).await
    }

    pub async fn get_issues_by_assignee(&self, assignee: &str) -> Result<Vec<TicketIssue>> {
        self.cache.get_by_assignee(assignee).await
    }

    pub async fn search_cached(&self, query: &str, limit: usize) -> Result<Vec<TicketIssue>> {
        self.cache.search(query, limit).await
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Fetch the source's recent issues and upsert them into the cache.
    ///
    /// Serialized per source: concurrent calls for the same source run one
    /// after another. Returns the number of issues written.
    #[instrument(skip(self, config), fields(source_id = %config.id, provider = %config.provider))]
    pub async fn refresh_source(&self, config: &TicketSourceConfig) -> Result<usize> {
        config.validate()?;
        let client = self.providers.client_for(config.provider)?;

        let _guard = self.locks.acquire(&config.id).await;
        debug!("Refreshing source");

        let mut issues = client.search_issues(config, "", self.refresh_max_results).await?;
        for issue in &mut issues {
            issue.source_id.clone_from(&config.id);
        }
        let written = self.cache.upsert_all(&issues).await?;

        info!(issues = written, "Source refreshed");
        Ok(written)
    }

    /// Refresh every enabled source concurrently.
    ///
    /// Fails only if the enabled set cannot be read; per-source failures are
    /// reported in the summary.
    #[instrument(skip(self))]
    pub async fn refresh_all_sources(&self) -> Result<RefreshSummary> {
        let configs = self.configs.get_enabled().await?;
        let results =
            join_all(configs.iter().map(|config| async move {
                (config, self.refresh_source(config).await)
            }))
            .await;

        let mut summary = RefreshSummary::default();
        for (config, result) in results {
            if let Err(err) = &result {
                warn!(source_id = %config.id, error = %err, "Source refresh failed");
            }
            summary.push(&config.id, &config.name, SyncOutcome::from(&result));
        }

        info!(
            sources = summary.results.len(),
            failures = summary.failure_count(),
            issues = summary.total_issues(),
            "Refreshed all sources"
        );
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Search with offline fallback
    // ------------------------------------------------------------------

    /// Provider search across every enabled source; if any provider call
    /// fails (or nothing is configured), answer from the local cache
    /// instead.
    ///
    /// Provider results are written through to the cache and returned
    /// unfiltered, capped at `limit` across all sources.
    #[instrument(skip(self))]
    pub async fn search_with_fallback(&self, query: &str, limit: usize) -> Result<Vec<TicketIssue>> {
        let limit = limit.max(1);
        let configs = match self.configs.get_enabled().await {
            Ok(configs) if !configs.is_empty() => configs,
            Ok(_) => return self.cache.search(query, limit).await,
            Err(err) => {
                warn!(error = %err, "Could not load sources, searching cache");
                return self.cache.search(query, limit).await;
            }
        };

        match self.search_providers(&configs, query, limit).await {
            Ok(mut issues) => {
                if let Err(err) = self.cache.upsert_all(&issues).await {
                    warn!(error = %err, "Failed to cache search results");
                }
                issues.truncate(limit);
                Ok(issues)
            }
            Err(err) => {
                info!(error = %err, "Provider search failed, using cached issues");
                self.cache.search(query, limit).await
            }
        }
    }

    async fn search_providers(
        &self,
        configs: &[TicketSourceConfig],
        query: &str,
        limit: usize,
    ) -> Result<Vec<TicketIssue>> {
        let max_results = u32::try_from(limit).unwrap_or(u32::MAX);
        let searches = configs.iter().map(|config| async move {
            let client = self.providers.client_for(config.provider)?;
            let mut issues = client.search_issues(config, query, max_results).await?;
            for issue in &mut issues {
                issue.source_id.clone_from(&config.id);
            }
            Ok::<_, TicketSyncError>(issues)
        });

        let mut combined = Vec::new();
        for result in join_all(searches).await {
            combined.extend(result?);
        }
        Ok(combined)
    }

    // ------------------------------------------------------------------
    // Foreground provider calls
    // ------------------------------------------------------------------

    fn client(&self, config: &TicketSourceConfig) -> Result<Arc<dyn TicketProviderClient>> {
        config.validate()?;
        self.providers.client_for(config.provider)
    }

    #[instrument(skip(self, config), fields(source_id = %config.id))]
    pub async fn test_connection(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        self.client(config)?.test_connection(config).await
    }

    pub async fn validate_credentials(&self, config: &TicketSourceConfig) -> bool {
        match self.client(config) {
            Ok(client) => client.validate_credentials(config).await,
            Err(_) => false,
        }
    }

    pub async fn get_projects(&self, config: &TicketSourceConfig) -> Result<Vec<TicketProject>> {
        self.client(config)?.get_projects(config).await
    }

    pub async fn get_current_user(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        self.client(config)?.get_current_user(config).await
    }

    /// Fetch one issue from the provider and cache it.
    pub async fn fetch_remote_issue(
        &self,
        config: &TicketSourceConfig,
        key: &str,
    ) -> Result<TicketIssue> {
        let mut issue = self.client(config)?.get_issue_by_key(config, key).await?;
        issue.source_id.clone_from(&config.id);
        self.cache.upsert(&issue).await?;
        Ok(issue)
    }

    /// User-facing text for an error from one of this source's calls.
    pub fn error_message(&self, error: &TicketSyncError, config: &TicketSourceConfig) -> String {
        match self.providers.client_for(config.provider) {
            Ok(client) => client.error_message(error, config),
            Err(_) => error.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Probes
    // ------------------------------------------------------------------

    pub async fn has_enabled_sources(&self) -> Result<bool> {
        Ok(!self.configs.get_enabled().await?.is_empty())
    }

    pub async fn get_cached_issue_count(&self) -> Result<usize> {
        self.cache.count().await
    }

    pub async fn get_cached_issue_count_by_source(&self, source_id: &str) -> Result<usize> {
        self.cache.count_by_source(source_id).await
    }

    /// Remove a source's cached issues and its refresh lock.
    pub async fn purge_source(&self, source_id: &str) -> Result<usize> {
        let removed = self.cache.delete_by_source(source_id).await?;
        self.locks.forget(source_id);
        Ok(removed)
    }
}

async fn background_search(
    providers: Arc<dyn TicketProviderFactory>,
    configs: Arc<dyn SourceConfigStore>,
    cache: Arc<dyn IssueCache>,
    query: &str,
) {
    let configs = match configs.get_enabled().await {
        Ok(configs) => configs,
        Err(err) => {
            warn!(error = %err, "Background search skipped: sources unavailable");
            return;
        }
    };

    for config in configs {
        let client = match providers.client_for(config.provider) {
            Ok(client) => client,
            Err(err) => {
                warn!(source_id = %config.id, error = %err, "No client for source");
                continue;
            }
        };
        match client.search_issues(&config, query, DEFAULT_SEARCH_MAX_RESULTS).await {
            Ok(mut issues) => {
                for issue in &mut issues {
                    issue.source_id.clone_from(&config.id);
                }
                if let Err(err) = cache.upsert_all(&issues).await {
                    warn!(source_id = %config.id, error = %err, "Failed to cache search results");
                }
            }
            Err(err) => {
                debug!(source_id = %config.id, error = %err, "Background search failed");
            }
        }
    }
}
