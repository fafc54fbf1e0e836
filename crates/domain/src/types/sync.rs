//! Sync outcomes and scheduler status snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use crate::errors::TicketSyncError;
use crate::impl_domain_status_conversions;

/// Result of one refresh of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Succeeded { issue_count: usize },
    Failed { error: TicketSyncError },
}

impl SyncOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

impl From<&Result<usize, TicketSyncError>> for SyncOutcome {
    fn from(result: &Result<usize, TicketSyncError>) -> Self {
        match result {
            Ok(issue_count) => Self::Succeeded { issue_count: *issue_count },
            Err(error) => Self::Failed { error: error.clone() },
        }
    }
}

/// Per-source entry in a [`RefreshSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRefreshResult {
    pub source_id: String,
    pub source_name: String,
    pub outcome: SyncOutcome,
}

/// Aggregate of a refresh across every enabled source.
///
/// One source failing never prevents the others from being refreshed, so
/// this carries both successes and failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub results: Vec<SourceRefreshResult>,
}

impl RefreshSummary {
    pub fn push(&mut self, source_id: &str, source_name: &str, outcome: SyncOutcome) {
        self.results.push(SourceRefreshResult {
            source_id: source_id.to_string(),
            source_name: source_name.to_string(),
            outcome,
        });
    }

    /// Total issues written by the successful refreshes.
    pub fn total_issues(&self) -> usize {
        self.results
            .iter()
            .map(|r| match r.outcome {
                SyncOutcome::Succeeded { issue_count } => issue_count,
                SyncOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceRefreshResult> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Phase of a per-source background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Pending,
    Running,
    Stopped,
}

impl_domain_status_conversions!(JobPhase {
    Pending => "pending",
    Running => "running",
    Stopped => "stopped",
});

/// Read-only view of a source's scheduled job, for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJobStatus {
    pub source_id: String,
    pub interval_minutes: u32,
    pub phase: JobPhase,
    /// Set while `Pending`.
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<SyncOutcome>,
    pub last_sync_at: Option<DateTime<Utc>>,
}
