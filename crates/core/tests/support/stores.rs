//! In-memory config store and issue cache.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ticketsync_core::{IssueCache, SourceConfigStore};
use ticketsync_domain::{ProviderKind, Result, TicketIssue, TicketSourceConfig, TicketSyncError};
use tokio::sync::watch;

#[derive(Clone)]
pub struct InMemoryConfigStore {
    configs: Arc<Mutex<BTreeMap<String, TicketSourceConfig>>>,
    revision: Arc<watch::Sender<u64>>,
    fail_reads: Arc<Mutex<bool>>,
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self {
            configs: Arc::default(),
            revision: Arc::new(watch::channel(0).0),
            fail_reads: Arc::default(),
        }
    }
}

impl InMemoryConfigStore {
    pub fn with_configs(configs: impl IntoIterator<Item = TicketSourceConfig>) -> Self {
        let store = Self::default();
        {
            let mut map = store.configs.lock().unwrap();
            for config in configs {
                map.insert(config.id.clone(), config);
            }
        }
        store
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn check_reads(&self) -> Result<()> {
        if *self.fail_reads.lock().unwrap() {
            return Err(TicketSyncError::Cache("config store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceConfigStore for InMemoryConfigStore {
    async fn get_all(&self) -> Result<Vec<TicketSourceConfig>> {
        self.check_reads()?;
        Ok(self.configs.lock().unwrap().values().cloned().collect())
    }

    async fn get_enabled(&self) -> Result<Vec<TicketSourceConfig>> {
        self.check_reads()?;
        Ok(self.configs.lock().unwrap().values().filter(|c| c.enabled).cloned().collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TicketSourceConfig>> {
        self.check_reads()?;
        Ok(self.configs.lock().unwrap().get(id).cloned())
    }

    async fn get_by_provider(&self, provider: ProviderKind) -> Result<Vec<TicketSourceConfig>> {
        self.check_reads()?;
        Ok(self
            .configs
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.provider == provider)
            .cloned()
            .collect())
    }

    async fn save(&self, config: &TicketSourceConfig) -> Result<()> {
        config.validate()?;
        self.configs.lock().unwrap().insert(config.id.clone(), config.clone());
        self.bump();
        Ok(())
    }

    async fn save_all(&self, configs: &[TicketSourceConfig]) -> Result<()> {
        for config in configs {
            config.validate()?;
        }
        {
            let mut map = self.configs.lock().unwrap();
            for config in configs {
                map.insert(config.id.clone(), config.clone());
            }
        }
        self.bump();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.configs.lock().unwrap().remove(id).is_some();
        if removed {
            self.bump();
        }
        Ok(removed)
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        {
            let mut map = self.configs.lock().unwrap();
            let config = map
                .get_mut(id)
                .ok_or_else(|| TicketSyncError::NotFound(format!("source {id}")))?;
            config.enabled = enabled;
        }
        self.bump();
        Ok(())
    }

    async fn update_sync_interval(&self, id: &str, minutes: u32) -> Result<()> {
        {
            let mut map = self.configs.lock().unwrap();
            let config = map
                .get_mut(id)
                .ok_or_else(|| TicketSyncError::NotFound(format!("source {id}")))?;
            config.sync_interval_minutes = minutes;
        }
        self.bump();
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

/// Issue cache keyed by `(source_id, id)`, sorted like the SQL store.
#[derive(Clone)]
pub struct InMemoryIssueCache {
    issues: Arc<Mutex<BTreeMap<(String, String), TicketIssue>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for InMemoryIssueCache {
    fn default() -> Self {
        Self { issues: Arc::default(), revision: Arc::new(watch::channel(0).0) }
    }
}

impl InMemoryIssueCache {
    fn select(&self, filter: impl Fn(&TicketIssue) -> bool) -> Vec<TicketIssue> {
        let mut out: Vec<TicketIssue> =
            self.issues.lock().unwrap().values().filter(|i| filter(i)).cloned().collect();
        out.sort_by(|a, b| b.key_sort_parts().cmp(&a.key_sort_parts()));
        out
    }

    fn remove_where(&self, filter: impl Fn(&TicketIssue) -> bool) -> usize {
        let removed = {
            let mut map = self.issues.lock().unwrap();
            let before = map.len();
            map.retain(|_, issue| !filter(issue));
            before - map.len()
        };
        if removed > 0 {
            self.revision.send_modify(|rev| *rev += 1);
        }
        removed
    }
}

#[async_trait]
impl IssueCache for InMemoryIssueCache {
    async fn get_all(&self) -> Result<Vec<TicketIssue>> {
        Ok(self.select(|_| true))
    }

    async fn get_by_source(&self, source_id: &str) -> Result<Vec<TicketIssue>> {
        Ok(self.select(|i| i.source_id == source_id))
    }

    async fn get_by_key(&self, key: &str) -> Result<Vec<TicketIssue>> {
        Ok(self.select(|i| i.key == key))
    }

    async fn get_by_source_and_key(
        &self,
        source_id: &str,
        key: &str,
    ) -> Result<Option<TicketIssue>> {
        Ok(self.select(|i| i.source_id == source_id && i.key == key).into_iter().next())
    }

    async fn get_by_project(&self, project_key: &str) -> Result<Vec<TicketIssue>> {
        Ok(self.select(|i| i.project_key == project_key))
    }

    async fn get_by_assignee(&self, assignee: &str) -> Result<Vec<TicketIssue>> {
        Ok(self.select(|i| i.assignee.as_deref() == Some(assignee)))
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<TicketIssue>> {
        let mut out = self.select(|i| i.matches_text(text));
        out.truncate(limit);
        Ok(out)
    }

    async fn upsert(&self, issue: &TicketIssue) -> Result<()> {
        self.upsert_all(std::slice::from_ref(issue)).await.map(|_| ())
    }

    async fn upsert_all(&self, issues: &[TicketIssue]) -> Result<usize> {
        {
            let mut map = self.issues.lock().unwrap();
            for issue in issues {
                map.insert((issue.source_id.clone(), issue.id.clone()), issue.clone());
            }
        }
        self.revision.send_modify(|rev| *rev += 1);
        Ok(issues.len())
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<usize> {
        Ok(self.remove_where(|i| i.source_id == source_id))
    }

    async fn delete_by_key(&self, key: &str) -> Result<usize> {
        Ok(self.remove_where(|i| i.key == key))
    }

    async fn delete_all(&self) -> Result<usize> {
        Ok(self.remove_where(|_| true))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.issues.lock().unwrap().len())
    }

    async fn count_by_source(&self, source_id: &str) -> Result<usize> {
        Ok(self.select(|i| i.source_id == source_id).len())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
