//! Runtime wiring - builds every ticket sync component from `AppConfig`.

use std::sync::Arc;

use ticketsync_core::tickets::{
    CredentialCipher, IssueCache, SourceConfigStore, TicketProviderFactory, TicketRepository,
};
use ticketsync_domain::{AppConfig, Result};
use tracing::{error, info};

use crate::database::{DbManager, SqlCipherIssueCache, SqlCipherSourceConfigStore};
use crate::integrations::tickets::ProviderRegistry;
use crate::key_manager::KeyManager;
use crate::observability::metrics::SyncMetrics;
use crate::scheduling::{TicketSyncScheduler, TicketSyncSchedulerConfig};
use crate::security::AesCredentialCipher;

/// Fully wired ticket sync runtime.
pub struct TicketSyncRuntime {
    pub config: AppConfig,
    pub db: Arc<DbManager>,
    pub repository: Arc<TicketRepository>,
    pub scheduler: TicketSyncScheduler,
    pub metrics: Arc<SyncMetrics>,
}

impl TicketSyncRuntime {
    /// Resolve keys, open and migrate the database, and wire the stores,
    /// provider registry, repository and scheduler.
    ///
    /// The scheduler is started when `scheduler.enabled` is set.
    pub async fn initialize(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let db_key = KeyManager::resolve(&config.database.key).map_err(|e| {
            error!(error = %e, "failed to resolve database key");
            e
        })?;
        let credential_key = KeyManager::resolve(&config.security.credential_key)?;

        let db = Arc::new(DbManager::from_config(&config.database, db_key)?);
        db.run_migrations()?;
        let health = db.health_check()?;
        info!(
            connections = health.connections,
            idle = health.idle_connections,
            max = health.max_connections,
            "Database ready"
        );

        let cipher: Arc<dyn CredentialCipher> =
            Arc::new(AesCredentialCipher::from_hex_key(&credential_key)?);
        let configs: Arc<dyn SourceConfigStore> =
            Arc::new(SqlCipherSourceConfigStore::new(Arc::clone(&db), cipher));
        let cache: Arc<dyn IssueCache> = Arc::new(SqlCipherIssueCache::new(Arc::clone(&db)));
        let providers: Arc<dyn TicketProviderFactory> =
            Arc::new(ProviderRegistry::from_config(&config.http)?);

        let repository = Arc::new(TicketRepository::new(providers, configs, cache));
        let metrics = Arc::new(SyncMetrics::new());
        let mut scheduler = TicketSyncScheduler::new(
            Arc::clone(&repository),
            Arc::clone(&metrics),
            TicketSyncSchedulerConfig::from(&config.scheduler),
        );

        if config.scheduler.enabled {
            scheduler.start().await?;
        }

        info!(
            database = %db.path().display(),
            scheduler = config.scheduler.enabled,
            "Ticket sync runtime initialized"
        );

        Ok(Self { config: config.clone(), db, repository, scheduler, metrics })
    }

    /// Stop background jobs. Safe to call when the scheduler is not running.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.scheduler.is_running() {
            self.scheduler.stop().await?;
        }

        let storage = self.db.storage_metrics();
        info!(
            connections_acquired = storage.connections_acquired,
            connection_timeouts = storage.connections_timeout,
            connection_errors = storage.connections_error,
            avg_acquire_ms = storage.avg_acquire_ms,
            "Ticket sync runtime shut down"
        );
        Ok(())
    }
}
