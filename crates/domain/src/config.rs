//! Application configuration structures
//!
//! Loaded from a TOML or JSON file by the infra config loader. Every section
//! has defaults so a file only needs to name what it overrides. Tracker
//! connection parameters are *not* here; they live in the source config
//! store.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TicketSyncError};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub scheduler: SchedulerConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Sanity-check values that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            return Err(TicketSyncError::Configuration("database.pool_size must be > 0".into()));
        }
        if self.http.request_timeout_secs == 0 || self.http.connect_timeout_secs == 0 {
            return Err(TicketSyncError::Configuration("http timeouts must be > 0".into()));
        }
        if self.http.max_attempts == 0 {
            return Err(TicketSyncError::Configuration("http.max_attempts must be >= 1".into()));
        }
        self.database.key.validate("database.key")?;
        self.security.credential_key.validate("security.credential_key")
    }
}

/// Where a 256-bit key comes from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KeySource {
    /// Hex-encoded key embedded in the config (tests, headless installs).
    Direct { hex_key: String },
    /// Generated on first use and stored in the OS keychain.
    Keychain { service: String, account: String },
}

impl KeySource {
    fn validate(&self, field: &str) -> Result<()> {
        match self {
            Self::Direct { hex_key } => {
                let valid = hex_key.len() == 64 && hex_key.chars().all(|c| c.is_ascii_hexdigit());
                if valid {
                    Ok(())
                } else {
                    Err(TicketSyncError::Configuration(format!(
                        "{field}: direct keys must be 64 hex characters"
                    )))
                }
            }
            Self::Keychain { service, account } => {
                if service.trim().is_empty() || account.trim().is_empty() {
                    Err(TicketSyncError::Configuration(format!(
                        "{field}: keychain service and account must be set"
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn keychain(account: &str) -> Self {
        Self::Keychain { service: "ticketsync".to_string(), account: account.to_string() }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { .. } => f.debug_struct("Direct").field("hex_key", &"[REDACTED]").finish(),
            Self::Keychain { service, account } => f
                .debug_struct("Keychain")
                .field("service", service)
                .field("account", account)
                .finish(),
        }
    }
}

/// Local SQLCipher database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
    pub key: KeySource,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ticketsync.db"),
            pool_size: 8,
            busy_timeout_ms: 5_000,
            key: KeySource::keychain("database-key"),
        }
    }
}

/// Outbound HTTP settings shared by the provider clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Total attempts for idempotent requests (1 = no retry).
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_attempts: 3,
            base_backoff_ms: 250,
            user_agent: format!("ticketsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Background sync scheduler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Start the scheduler during bootstrap.
    pub enabled: bool,
    /// How long `stop()` waits for each job task to finish.
    pub join_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true, join_timeout_secs: 5 }
    }
}

/// Credential-at-rest encryption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub credential_key: KeySource,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { credential_key: KeySource::keychain("credential-key") }
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, e.g. `"info,ticketsync_infra=debug"`.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}
