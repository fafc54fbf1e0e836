//! SQLCipher pool configuration and per-connection pragmas

use std::time::Duration;

use rusqlite::Connection;

use crate::storage::error::{StorageError, StorageResult};

/// Pool and pragma settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCipherPoolConfig {
    pub max_size: u32,
    /// How long `get()` waits for a free connection.
    pub connection_timeout: Duration,
    /// SQLite busy handler timeout.
    pub busy_timeout: Duration,
    pub enable_wal: bool,
}

impl Default for SqlCipherPoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
        }
    }
}

/// Apply journal, sync and busy-timeout pragmas to a freshly keyed
/// connection.
pub fn apply_connection_pragmas(
    conn: &Connection,
    config: &SqlCipherPoolConfig,
) -> StorageResult<()> {
    let mut batch = String::from("PRAGMA synchronous=NORMAL;\nPRAGMA foreign_keys=ON;\n");
    if config.enable_wal {
        batch.push_str("PRAGMA journal_mode=WAL;\nPRAGMA wal_autocheckpoint=1000;\n");
    }

    conn.execute_batch(&batch)
        .map_err(|e| StorageError::Query(format!("Failed to apply pragmas: {e}")))?;
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| StorageError::Query(format!("Failed to set busy timeout: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults() {
        let config = SqlCipherPoolConfig::default();
        assert_eq!(config.max_size, 10);
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert!(config.enable_wal);
    }

    #[test]
    fn pragmas_applied() {
        let dir = TempDir::new().unwrap();
        let conn = Connection::open(dir.path().join("p.db")).unwrap();
        apply_connection_pragmas(&conn, &SqlCipherPoolConfig::default()).unwrap();

        let journal: String = conn.pragma_query_value(None, "journal_mode", |r| r.get(0)).unwrap();
        assert_eq!(journal.to_lowercase(), "wal");
        let fk: i32 = conn.pragma_query_value(None, "foreign_keys", |r| r.get(0)).unwrap();
        assert_eq!(fk, 1);
    }
}
