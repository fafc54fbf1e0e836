//! SQLCipher-backed issue cache.
//!
//! Rows are keyed by `(source_id, id)` so two sources can hold issues with
//! the same provider id. Listings are ordered by key prefix, then numeric
//! key suffix, both descending, using the `key_prefix`/`key_number` columns
//! computed at write time.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Row, ToSql, Transaction};
use ticketsync_core::IssueCache;
use ticketsync_domain::{ProviderKind, Result, TicketIssue, TicketSyncError};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::manager::DbManager;
use super::source_config_store::millis_to_datetime;
use crate::errors::conversions::to_domain;
use crate::errors::InfraError;

const SELECT_COLUMNS: &str = "SELECT source_id, id, key, summary, status, project_key, \
     project_name, issue_type, assignee, updated_at, provider, web_url FROM ticket_issues";
const ORDER_BY: &str = "ORDER BY key_prefix DESC, key_number DESC";

/// SQLCipher-backed [`IssueCache`].
pub struct SqlCipherIssueCache {
    db: Arc<DbManager>,
    revision: watch::Sender<u64>,
}

impl SqlCipherIssueCache {
    pub fn new(db: Arc<DbManager>) -> Self {
        let (revision, _) = watch::channel(0);
        Self { db, revision }
    }

    async fn select(&self, filter: &'static str, args: Vec<String>) -> Result<Vec<TicketIssue>> {
        self.db
            .run(move |conn| {
                let sql = format!("{SELECT_COLUMNS} {filter} {ORDER_BY}");
                let params: Vec<&dyn ToSql> = args.iter().map(|a| a as &dyn ToSql).collect();
                let rows = conn.query_all(&sql, &params, IssueRow::from_row).map_err(to_domain)?;
                Ok(rows.into_iter().filter_map(IssueRow::into_issue).collect())
            })
            .await
    }

    async fn delete_where(&self, filter: &'static str, args: Vec<String>) -> Result<usize> {
        let removed = self
            .db
            .run(move |conn| {
                let sql = format!("DELETE FROM ticket_issues {filter}");
                let params: Vec<&dyn ToSql> = args.iter().map(|a| a as &dyn ToSql).collect();
                conn.execute(&sql, &params).map_err(to_domain)
            })
            .await?;

        if removed > 0 {
            self.bump();
        }
        Ok(removed)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

#[async_trait]
impl IssueCache for SqlCipherIssueCache {
    async fn get_all(&self) -> Result<Vec<TicketIssue>> {
        self.select("", vec![]).await
    }

    async fn get_by_source(&self, source_id: &str) -> Result<Vec<TicketIssue>> {
        self.select("WHERE source_id = ?1", vec![source_id.to_string()]).await
    }

    async fn get_by_key(&self, key: &str) -> Result<Vec<TicketIssue>> {
        self.select("WHERE key = ?1", vec![key.to_string()]).await
    }

    async fn get_by_source_and_key(
        &self,
        source_id: &str,
        key: &str,
    ) -> Result<Option<TicketIssue>> {
        let rows = self
            .select(
                "WHERE source_id = ?1 AND key = ?2",
                vec![source_id.to_string(), key.to_string()],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_by_project(&self, project_key: &str) -> Result<Vec<TicketIssue>> {
        self.select("WHERE project_key = ?1", vec![project_key.to_string()]).await
    }

    async fn get_by_assignee(&self, assignee: &str) -> Result<Vec<TicketIssue>> {
        self.select("WHERE assignee = ?1", vec![assignee.to_string()]).await
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<TicketIssue>> {
        // SQLite's lower() folds ASCII only, so matching happens on this side
        // with Unicode case folding, in listing order.
        let needle = text.trim().to_string();
        let issues = self.select("", vec![]).await?;
        Ok(issues.into_iter().filter(|issue| issue.matches_text(&needle)).take(limit).collect())
    }

    async fn upsert(&self, issue: &TicketIssue) -> Result<()> {
        self.upsert_all(std::slice::from_ref(issue)).await.map(|_| ())
    }

    async fn upsert_all(&self, issues: &[TicketIssue]) -> Result<usize> {
        if issues.is_empty() {
            return Ok(0);
        }

        for issue in issues {
            if issue.source_id.trim().is_empty() || issue.id.trim().is_empty() {
                return Err(TicketSyncError::InvalidInput(format!(
                    "issue {} is missing its source id or provider id",
                    issue.key
                )));
            }
        }

        let issues = issues.to_vec();
        let written = self
            .db
            .run(move |conn| {
                conn.with_transaction(|tx| -> std::result::Result<usize, InfraError> {
                    for issue in &issues {
                        upsert_issue(tx, issue)?;
                    }
                    Ok(issues.len())
                })
                .map_err(TicketSyncError::from)
            })
            .await?;

        debug!(written, "Upserted issues");
        self.bump();
        Ok(written)
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<usize> {
        self.delete_where("WHERE source_id = ?1", vec![source_id.to_string()]).await
    }

    async fn delete_by_key(&self, key: &str) -> Result<usize> {
        self.delete_where("WHERE key = ?1", vec![key.to_string()]).await
    }

    async fn delete_all(&self) -> Result<usize> {
        self.delete_where("", vec![]).await
    }

    async fn count(&self) -> Result<usize> {
        self.db
            .run(|conn| {
                conn.query_row("SELECT COUNT(*) FROM ticket_issues", &[], |r| r.get::<_, i64>(0))
                    .map(|n| n.max(0) as usize)
                    .map_err(to_domain)
            })
            .await
    }

    async fn count_by_source(&self, source_id: &str) -> Result<usize> {
        let source_id = source_id.to_string();
        self.db
            .run(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM ticket_issues WHERE source_id = ?1",
                    params![source_id],
                    |r| r.get::<_, i64>(0),
                )
                .map(|n| n.max(0) as usize)
                .map_err(to_domain)
            })
            .await
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

// ============================================================================
// Row mapping
// ============================================================================

struct IssueRow {
    source_id: String,
    id: String,
    key: String,
    summary: String,
    status: String,
    project_key: String,
    project_name: String,
    issue_type: String,
    assignee: Option<String>,
    updated_at: i64,
    provider: String,
    web_url: Option<String>,
}

impl IssueRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            source_id: row.get(0)?,
            id: row.get(1)?,
            key: row.get(2)?,
            summary: row.get(3)?,
            status: row.get(4)?,
            project_key: row.get(5)?,
            project_name: row.get(6)?,
            issue_type: row.get(7)?,
            assignee: row.get(8)?,
            updated_at: row.get(9)?,
            provider: row.get(10)?,
            web_url: row.get(11)?,
        })
    }

    fn into_issue(self) -> Option<TicketIssue> {
        let provider = match self.provider.parse::<ProviderKind>() {
            Ok(provider) => provider,
            Err(err) => {
                warn!(source_id = %self.source_id, key = %self.key, error = %err, "Skipping cached issue");
                return None;
            }
        };

        Some(TicketIssue {
            id: self.id,
            source_id: self.source_id,
            key: self.key,
            summary: self.summary,
            status: self.status.parse().unwrap_or_default(),
            project_key: self.project_key,
            project_name: self.project_name,
            issue_type: self.issue_type,
            assignee: self.assignee,
            updated_at: millis_to_datetime(self.updated_at),
            provider,
            web_url: self.web_url,
        })
    }
}

fn upsert_issue(tx: &Transaction<'_>, issue: &TicketIssue) -> std::result::Result<(), InfraError> {
    let (key_prefix, key_number) = issue.key_sort_parts();
    tx.execute(
        "INSERT INTO ticket_issues (source_id, id, key, key_prefix, key_number, summary, status,
             project_key, project_name, issue_type, assignee, updated_at, provider, web_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(source_id, id) DO UPDATE SET
            key = excluded.key,
            key_prefix = excluded.key_prefix,
            key_number = excluded.key_number,
            summary = excluded.summary,
            status = excluded.status,
            project_key = excluded.project_key,
            project_name = excluded.project_name,
            issue_type = excluded.issue_type,
            assignee = excluded.assignee,
            updated_at = excluded.updated_at,
            provider = excluded.provider,
            web_url = excluded.web_url",
        params![
            issue.source_id,
            issue.id,
            issue.key,
            key_prefix,
            key_number,
            issue.summary,
            issue.status.as_str(),
            issue.project_key,
            issue.project_name,
            issue.issue_type,
            issue.assignee,
            issue.updated_at.timestamp_millis(),
            issue.provider.as_str(),
            issue.web_url,
        ],
    )?;
    Ok(())
}
