//! Database connection manager backed by the shared SQLCipher pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::params;
use ticketsync_common::storage::{
    PoolHealth, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig, StorageMetricsSnapshot,
};
use ticketsync_common::SecureString;
use ticketsync_domain::{DatabaseConfig, Result, TicketSyncError};
use tokio::task;
use tracing::info;

use crate::errors::conversions::to_domain;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that wraps an [`SqlCipherPool`].
pub struct DbManager {
    pool: Arc<SqlCipherPool>,
    path: PathBuf,
}

impl DbManager {
    /// Open (or create) the database with the given pool size and key.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32, key: SecureString) -> Result<Self> {
        let config =
            SqlCipherPoolConfig { max_size: pool_size.max(1), ..SqlCipherPoolConfig::default() };
        Self::with_pool_config(db_path, key, config)
    }

    /// Open the database described by the `[database]` config section.
    pub fn from_config(config: &DatabaseConfig, key: SecureString) -> Result<Self> {
        let pool_config = SqlCipherPoolConfig {
            max_size: config.pool_size.max(1),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            ..SqlCipherPoolConfig::default()
        };
        Self::with_pool_config(&config.path, key, pool_config)
    }

    fn with_pool_config<P: AsRef<Path>>(
        db_path: P,
        key: SecureString,
        config: SqlCipherPoolConfig,
    ) -> Result<Self> {
        if key.is_empty() {
            return Err(TicketSyncError::Security("database encryption key not provided".into()));
        }

        let path = db_path.as_ref().to_path_buf();
        let max_size = config.max_size;
        let pool = SqlCipherPool::new(&path, key, config).map(Arc::new).map_err(to_domain)?;

        info!(db_path = %path.display(), max_connections = max_size, "sqlcipher pool initialised");

        Ok(Self { pool, path })
    }

    /// Acquire a SQLCipher connection from the pool.
    pub fn get_connection(&self) -> Result<SqlCipherConnection> {
        self.pool.get_sqlcipher_connection().map_err(to_domain)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(to_domain)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(to_domain)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database answers queries, then report pool occupancy.
    pub fn health_check(&self) -> Result<PoolHealth> {
        {
            let conn = self.get_connection()?;
            conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
                .map_err(to_domain)?;
        }
        Ok(self.pool.health_check())
    }

    /// Connection pool counters since the database was opened.
    pub fn storage_metrics(&self) -> StorageMetricsSnapshot {
        self.pool.metrics().snapshot()
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    pub async fn run<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqlCipherConnection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(self);
        task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            f(&mut conn)
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Map JoinError from spawn_blocking to the domain error.
fn map_join_error(err: task::JoinError) -> TicketSyncError {
    if err.is_cancelled() {
        TicketSyncError::Internal("blocking task cancelled".into())
    } else {
        TicketSyncError::Internal(format!("blocking task failed: {err}"))
    }
}
