//! SQLCipher keying
//!
//! `PRAGMA key` must be the first statement on a connection; the remaining
//! cipher pragmas pin SQLCipher 4 defaults so databases stay readable across
//! library upgrades.

use rusqlite::Connection;
use tracing::{debug, error};

use crate::security::SecureString;
use crate::storage::error::{StorageError, StorageResult};

/// Keying parameters
#[derive(Clone)]
pub struct SqlCipherConfig {
    pub key: SecureString,
    pub cipher_compatibility: i32,
    pub kdf_iter: i32,
}

impl std::fmt::Debug for SqlCipherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCipherConfig")
            .field("key", &self.key)
            .field("cipher_compatibility", &self.cipher_compatibility)
            .field("kdf_iter", &self.kdf_iter)
            .finish()
    }
}

impl SqlCipherConfig {
    pub fn new(key: SecureString) -> Self {
        Self { key, cipher_compatibility: 4, kdf_iter: 256_000 }
    }
}

/// Key the connection and apply cipher pragmas.
pub fn configure_sqlcipher(conn: &Connection, config: &SqlCipherConfig) -> StorageResult<()> {
    conn.pragma_update(None, "key", config.key.expose()).map_err(|e| {
        error!(error = %e, "SQLCipher key setup failed");
        StorageError::Encryption(format!("Failed to set encryption key: {e}"))
    })?;

    conn.pragma_update(None, "cipher_compatibility", config.cipher_compatibility)
        .map_err(|e| StorageError::Encryption(format!("Failed to set cipher_compatibility: {e}")))?;
    conn.pragma_update(None, "kdf_iter", config.kdf_iter)
        .map_err(|e| StorageError::Encryption(format!("Failed to set kdf_iter: {e}")))?;
    conn.pragma_update(None, "cipher_memory_security", "ON").map_err(|e| {
        StorageError::Encryption(format!("Failed to set cipher_memory_security: {e}"))
    })?;

    debug!("SQLCipher configured");
    Ok(())
}

/// Force a page read so a wrong key fails here rather than on first query.
pub fn verify_encryption(conn: &Connection) -> StorageResult<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
        .map(|_| ())
        .map_err(|e| StorageError::from_open_failure(e.to_string()))
}
