//! Storage error types

use thiserror::Error;

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(String),

    #[error("Database encryption error: {0}")]
    Encryption(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Wrong encryption key or database not encrypted")]
    WrongKeyOrNotEncrypted,

    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    R2d2(#[from] r2d2::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Classify a connection-open failure message.
    ///
    /// SQLCipher reports a wrong key as a generic "not a database" error the
    /// first time a page is read.
    pub fn from_open_failure(message: impl AsRef<str>) -> Self {
        let message = message.as_ref();
        let lower = message.to_lowercase();
        let wrong_key = ["file is not a database", "file is encrypted", "notadb", "malformed"]
            .iter()
            .any(|needle| lower.contains(needle));
        if wrong_key {
            Self::WrongKeyOrNotEncrypted
        } else {
            Self::Connection(message.to_string())
        }
    }
}
