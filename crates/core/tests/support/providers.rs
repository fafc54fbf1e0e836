//! Scripted provider client and factory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ticketsync_core::{TicketProviderClient, TicketProviderFactory};
use ticketsync_domain::{
    ProviderKind, Result, TicketIssue, TicketProject, TicketSourceConfig, TicketSyncError,
    TicketUser,
};

/// Provider whose search results are scripted per source id.
///
/// Sources without a script return an empty list; sources marked as failing
/// return a network error.
pub struct ScriptedProvider {
    kind: ProviderKind,
    results: Mutex<HashMap<String, Vec<TicketIssue>>>,
    failing: Mutex<HashMap<String, TicketSyncError>>,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            results: Mutex::default(),
            failing: Mutex::default(),
            delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        })
    }

    pub fn respond(&self, source_id: &str, issues: Vec<TicketIssue>) {
        self.failing.lock().unwrap().remove(source_id);
        self.results.lock().unwrap().insert(source_id.to_string(), issues);
    }

    pub fn fail(&self, source_id: &str, error: TicketSyncError) {
        self.failing.lock().unwrap().insert(source_id.to_string(), error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent searches observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check(&self, config: &TicketSourceConfig) -> Result<()> {
        match self.failing.lock().unwrap().get(&config.id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TicketProviderClient for ScriptedProvider {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    async fn test_connection(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        self.get_current_user(config).await
    }

    async fn search_issues(
        &self,
        config: &TicketSourceConfig,
        _query: &str,
        max_results: u32,
    ) -> Result<Vec<TicketIssue>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.check(config)?;
        let mut issues =
            self.results.lock().unwrap().get(&config.id).cloned().unwrap_or_default();
        issues.truncate(max_results as usize);
        Ok(issues)
    }

    async fn get_issue_by_key(
        &self,
        config: &TicketSourceConfig,
        key: &str,
    ) -> Result<TicketIssue> {
        self.check(config)?;
        self.results
            .lock()
            .unwrap()
            .get(&config.id)
            .and_then(|issues| issues.iter().find(|i| i.key == key).cloned())
            .ok_or_else(|| TicketSyncError::NotFound(format!("issue {key}")))
    }

    async fn get_projects(&self, config: &TicketSourceConfig) -> Result<Vec<TicketProject>> {
        self.check(config)?;
        Ok(vec![TicketProject { key: "PROJ".into(), name: "Project".into(), web_url: None }])
    }

    async fn get_current_user(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        self.check(config)?;
        Ok(TicketUser { id: "u1".into(), display_name: "Dev".into(), email: None })
    }

    fn error_message(&self, error: &TicketSyncError, config: &TicketSourceConfig) -> String {
        format!("{}: {error}", config.name)
    }
}

#[derive(Default)]
pub struct StaticFactory {
    clients: HashMap<ProviderKind, Arc<dyn TicketProviderClient>>,
}

impl StaticFactory {
    pub fn with(mut self, client: Arc<dyn TicketProviderClient>) -> Self {
        self.clients.insert(client.provider(), client);
        self
    }
}

impl TicketProviderFactory for StaticFactory {
    fn client_for(&self, provider: ProviderKind) -> Result<Arc<dyn TicketProviderClient>> {
        self.clients.get(&provider).cloned().ok_or_else(|| {
            TicketSyncError::Configuration(format!("no client for {}", provider.display_name()))
        })
    }
}
