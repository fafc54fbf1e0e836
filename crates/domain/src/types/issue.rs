//! Unified issue model shared by all three trackers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use super::source::ProviderKind;
use crate::impl_domain_status_conversions;
use crate::utils::{render_display_format, split_key};

/// Normalized issue status.
///
/// Every provider's state vocabulary is folded into this closed set by the
/// response mappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Closed,
    Merged,
    Locked,
    #[default]
    Unknown,
}

impl_domain_status_conversions!(IssueStatus {
    Open => "Open",
    InProgress => "In Progress",
    Closed => "Closed",
    Merged => "Merged",
    Locked => "Locked",
    Unknown => "Unknown",
});

impl IssueStatus {
    /// Whether work on the issue is finished.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Closed | Self::Merged)
    }
}

/// Issue mirrored from a tracker into the local cache.
///
/// Identity is the pair `(source_id, id)`: `id` is provider-native and only
/// unique within one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct TicketIssue {
    pub id: String,
    pub source_id: String,
    /// `PROJ-123` for Jira, `#123` for GitHub/GitLab
    pub key: String,
    pub summary: String,
    pub status: IssueStatus,
    pub project_key: String,
    pub project_name: String,
    pub issue_type: String,
    pub assignee: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub provider: ProviderKind,
    pub web_url: Option<String>,
}

impl TicketIssue {
    /// Prefix and numeric suffix of the key, used for cache ordering.
    pub fn key_sort_parts(&self) -> (String, i64) {
        split_key(&self.key)
    }

    /// Case-insensitive substring match over key and summary.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.key.to_lowercase().contains(&needle)
            || self.summary.to_lowercase().contains(&needle)
    }

    /// Render using a source's display-format template.
    pub fn display_with(&self, template: &str) -> String {
        render_display_format(template, self)
    }
}

/// Project (Jira project, GitHub repository, GitLab project) visible to a
/// source's credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct TicketProject {
    pub key: String,
    pub name: String,
    pub web_url: Option<String>,
}

/// Account the credentials authenticate as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct TicketUser {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}
