//! SQLCipher backend: r2d2 pool of encrypted SQLite connections.

pub mod cipher;
pub mod config;
pub mod connection;
pub mod pool;

pub use cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
pub use config::{apply_connection_pragmas, SqlCipherPoolConfig};
pub use connection::SqlCipherConnection;
pub use pool::{PoolHealth, SqlCipherPool};
