//! SQLCipher-backed source configuration store.
//!
//! Credentials are serialized to JSON and sealed by the
//! [`CredentialCipher`] before they reach the database. Rows whose
//! credentials cannot be decrypted or decoded (key rotated, foreign
//! ciphertext) are skipped on read with a warning.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Row, Transaction};
use ticketsync_core::{CredentialCipher, SourceConfigStore};
use ticketsync_domain::constants::{MAX_SYNC_INTERVAL_MINUTES, MIN_SYNC_INTERVAL_MINUTES};
use ticketsync_domain::{
    ProviderKind, Result, SourceCredentials, TicketSourceConfig, TicketSyncError,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::manager::DbManager;
use crate::errors::conversions::to_domain;
use crate::errors::InfraError;

const SELECT_COLUMNS: &str = "SELECT id, name, provider, enabled, base_url, credentials, \
     sync_interval_minutes, default_project, display_format, created_at, updated_at \
     FROM ticket_sources";

/// SQLCipher-backed [`SourceConfigStore`].
pub struct SqlCipherSourceConfigStore {
    db: Arc<DbManager>,
    cipher: Arc<dyn CredentialCipher>,
    revision: watch::Sender<u64>,
}

impl SqlCipherSourceConfigStore {
    pub fn new(db: Arc<DbManager>, cipher: Arc<dyn CredentialCipher>) -> Self {
        let (revision, _) = watch::channel(0);
        Self { db, cipher, revision }
    }

    async fn select(
        &self,
        filter: &'static str,
        arg: Option<String>,
    ) -> Result<Vec<TicketSourceConfig>> {
        let cipher = Arc::clone(&self.cipher);
        self.db
            .run(move |conn| {
                let sql = format!("{SELECT_COLUMNS} {filter} ORDER BY created_at, id");
                let rows = match &arg {
                    Some(value) => conn.query_all(&sql, params![value], SourceRow::from_row),
                    None => conn.query_all(&sql, params![], SourceRow::from_row),
                }
                .map_err(to_domain)?;
                Ok(rows.into_iter().filter_map(|row| row.into_config(cipher.as_ref())).collect())
            })
            .await
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

#[async_trait]
impl SourceConfigStore for SqlCipherSourceConfigStore {
    async fn get_all(&self) -> Result<Vec<TicketSourceConfig>> {
        self.select("", None).await
    }

    async fn get_enabled(&self) -> Result<Vec<TicketSourceConfig>> {
        self.select("WHERE enabled = 1", None).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TicketSourceConfig>> {
        Ok(self.select("WHERE id = ?1", Some(id.to_string())).await?.into_iter().next())
    }

    async fn get_by_provider(&self, provider: ProviderKind) -> Result<Vec<TicketSourceConfig>> {
        self.select("WHERE provider = ?1", Some(provider.as_str().to_string())).await
    }

    async fn save(&self, config: &TicketSourceConfig) -> Result<()> {
        self.save_all(std::slice::from_ref(config)).await
    }

    async fn save_all(&self, configs: &[TicketSourceConfig]) -> Result<()> {
        if configs.is_empty() {
            return Ok(());
        }

        let mut rows = Vec::with_capacity(configs.len());
        for config in configs {
            config.validate()?;
            rows.push(SourceRow::from_config(config, self.cipher.as_ref())?);
        }

        let count = rows.len();
        self.db
            .run(move |conn| {
                conn.with_transaction(|tx| -> std::result::Result<(), InfraError> {
                    for row in &rows {
                        upsert_row(tx, row)?;
                    }
                    Ok(())
                })
                .map_err(TicketSyncError::from)
            })
            .await?;

        debug!(count, "Saved ticket sources");
        self.bump();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        let removed = self
            .db
            .run(move |conn| {
                conn.execute("DELETE FROM ticket_sources WHERE id = ?1", params![id])
                    .map_err(to_domain)
            })
            .await?;

        if removed > 0 {
            self.bump();
        }
        Ok(removed > 0)
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let owned = id.to_string();
        let now = Utc::now().timestamp_millis();
        let updated = self
            .db
            .run(move |conn| {
                conn.execute(
                    "UPDATE ticket_sources SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
                    params![enabled, now, owned],
                )
                .map_err(to_domain)
            })
            .await?;

        if updated == 0 {
            return Err(TicketSyncError::NotFound(format!("ticket source {id}")));
        }
        self.bump();
        Ok(())
    }

    async fn update_sync_interval(&self, id: &str, minutes: u32) -> Result<()> {
        if !(MIN_SYNC_INTERVAL_MINUTES..=MAX_SYNC_INTERVAL_MINUTES).contains(&minutes) {
            return Err(TicketSyncError::InvalidInput(format!(
                "sync interval must be between {MIN_SYNC_INTERVAL_MINUTES} and \
                 {MAX_SYNC_INTERVAL_MINUTES} minutes, got {minutes}"
            )));
        }

        let owned = id.to_string();
        let now = Utc::now().timestamp_millis();
        let updated = self
            .db
            .run(move |conn| {
                conn.execute(
                    "UPDATE ticket_sources SET sync_interval_minutes = ?1, updated_at = ?2 WHERE id = ?3",
                    params![minutes, now, owned],
                )
                .map_err(to_domain)
            })
            .await?;

        if updated == 0 {
            return Err(TicketSyncError::NotFound(format!("ticket source {id}")));
        }
        self.bump();
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

// ============================================================================
// Row mapping
// ============================================================================

struct SourceRow {
    id: String,
    name: String,
    provider: String,
    enabled: bool,
    base_url: String,
    credentials: String,
    sync_interval_minutes: u32,
    default_project: Option<String>,
    display_format: String,
    created_at: i64,
    updated_at: i64,
}

impl SourceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            provider: row.get(2)?,
            enabled: row.get(3)?,
            base_url: row.get(4)?,
            credentials: row.get(5)?,
            sync_interval_minutes: row.get(6)?,
            default_project: row.get(7)?,
            display_format: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn from_config(config: &TicketSourceConfig, cipher: &dyn CredentialCipher) -> Result<Self> {
        let plaintext = serde_json::to_string(&config.credentials)
            .map_err(|e| TicketSyncError::Internal(format!("failed to encode credentials: {e}")))?;

        Ok(Self {
            id: config.id.clone(),
            name: config.name.clone(),
            provider: config.provider.as_str().to_string(),
            enabled: config.enabled,
            base_url: config.base_url.clone(),
            credentials: cipher.encrypt(&plaintext)?,
            sync_interval_minutes: config.sync_interval_minutes,
            default_project: config.default_project.clone(),
            display_format: config.display_format.clone(),
            created_at: config.created_at.timestamp_millis(),
            updated_at: config.updated_at.timestamp_millis(),
        })
    }

    /// `None` when the row cannot be turned back into a usable config.
    fn into_config(self, cipher: &dyn CredentialCipher) -> Option<TicketSourceConfig> {
        let provider = match self.provider.parse::<ProviderKind>() {
            Ok(provider) => provider,
            Err(err) => {
                warn!(source_id = %self.id, error = %err, "Skipping source with unknown provider");
                return None;
            }
        };

        let Some(plaintext) = cipher.decrypt(&self.credentials) else {
            warn!(source_id = %self.id, "Skipping source whose credentials cannot be decrypted");
            return None;
        };

        let credentials = match serde_json::from_str::<SourceCredentials>(&plaintext) {
            Ok(credentials) if credentials.provider() == provider => credentials,
            Ok(credentials) => {
                warn!(
                    source_id = %self.id,
                    variant = credentials.variant_name(),
                    %provider,
                    "Skipping source whose credentials do not match its provider"
                );
                return None;
            }
            Err(err) => {
                warn!(source_id = %self.id, error = %err, "Skipping source with undecodable credentials");
                return None;
            }
        };

        Some(TicketSourceConfig {
            id: self.id,
            name: self.name,
            provider,
            enabled: self.enabled,
            base_url: self.base_url,
            credentials,
            sync_interval_minutes: self.sync_interval_minutes,
            default_project: self.default_project,
            display_format: self.display_format,
            created_at: millis_to_datetime(self.created_at),
            updated_at: millis_to_datetime(self.updated_at),
        })
    }
}

fn upsert_row(tx: &Transaction<'_>, row: &SourceRow) -> std::result::Result<(), InfraError> {
    tx.execute(
        "INSERT INTO ticket_sources (id, name, provider, enabled, base_url, credentials,
             sync_interval_minutes, default_project, display_format, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            provider = excluded.provider,
            enabled = excluded.enabled,
            base_url = excluded.base_url,
            credentials = excluded.credentials,
            sync_interval_minutes = excluded.sync_interval_minutes,
            default_project = excluded.default_project,
            display_format = excluded.display_format,
            updated_at = excluded.updated_at",
        params![
            row.id,
            row.name,
            row.provider,
            row.enabled,
            row.base_url,
            row.credentials,
            row.sync_interval_minutes,
            row.default_project,
            row.display_format,
            row.created_at,
            row.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or(DateTime::UNIX_EPOCH)
}
