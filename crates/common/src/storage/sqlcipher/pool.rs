//! SQLCipher connection pool
//!
//! r2d2 pool whose init hook keys every new connection and applies the
//! standard pragmas. Construction opens one connection and forces a page
//! read, so a wrong key is reported immediately.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
use super::config::{apply_connection_pragmas, SqlCipherPoolConfig};
use super::connection::SqlCipherConnection;
use crate::security::SecureString;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;

/// Result of [`SqlCipherPool::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolHealth {
    pub healthy: bool,
    pub connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlCipherPoolConfig,
    metrics: Arc<StorageMetrics>,
}

impl SqlCipherPool {
    /// Open (or create) the database at `path` with `key`.
    #[instrument(skip(key, config), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(path: &Path, key: SecureString, config: SqlCipherPoolConfig) -> StorageResult<Self> {
        let cipher_config = SqlCipherConfig::new(key);
        let init_config = config.clone();

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            configure_sqlcipher(conn, &cipher_config)
                .and_then(|()| apply_connection_pragmas(conn, &init_config))
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!(error = %e, "Failed to create connection pool");
                StorageError::from_open_failure(e.to_string())
            })?;

        {
            let conn = pool.get().map_err(|e| StorageError::from_open_failure(e.to_string()))?;
            verify_encryption(&conn)?;
        }

        info!(max_size = config.max_size, "SQLCipher pool ready");
        Ok(Self { pool, config, metrics: Arc::new(StorageMetrics::default()) })
    }

    #[instrument(skip(self))]
    pub fn get_sqlcipher_connection(&self) -> StorageResult<SqlCipherConnection> {
        let start = Instant::now();
        match self.pool.get() {
            Ok(conn) => {
                let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.metrics.record_acquired(elapsed);
                debug!(elapsed_ms = elapsed, "Connection acquired");
                Ok(SqlCipherConnection::new(conn))
            }
            Err(e) if e.to_string().to_lowercase().contains("timed out") => {
                self.metrics.record_timeout();
                warn!(timeout = ?self.config.connection_timeout, "Connection pool timeout");
                Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
            }
            Err(e) => {
                self.metrics.record_error();
                warn!(error = %e, "Connection error");
                Err(StorageError::Connection(format!("Failed to get connection: {e}")))
            }
        }
    }

    pub fn health_check(&self) -> PoolHealth {
        let state = self.pool.state();
        let (healthy, message) = match self.pool.get() {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        PoolHealth {
            healthy,
            connections: state.connections,
            idle_connections: state.idle_connections,
            max_connections: self.config.max_size,
            message,
        }
    }

    pub fn metrics(&self) -> &Arc<StorageMetrics> {
        &self.metrics
    }
}
