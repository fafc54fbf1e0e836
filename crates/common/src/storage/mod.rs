//! Encrypted storage primitives
//!
//! Generic SQLCipher pooling; schemas and repositories live in the infra
//! crate.

pub mod error;
pub mod metrics;
pub mod sqlcipher;

pub use error::{StorageError, StorageResult};
pub use metrics::{StorageMetrics, StorageMetricsSnapshot};
pub use sqlcipher::{PoolHealth, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig};
