//! Jira REST payloads.

use serde::Deserialize;
use ticketsync_domain::constants::DEFAULT_ISSUE_TYPE;
use ticketsync_domain::{IssueStatus, ProviderKind, TicketIssue, TicketProject, TicketUser};

use super::parse_timestamp;

#[derive(Debug, Deserialize)]
pub(crate) struct JiraSearchResponse {
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JiraIssue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: JiraFields,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct JiraFields {
    summary: Option<String>,
    status: Option<JiraStatus>,
    project: Option<JiraProject>,
    issuetype: Option<Named>,
    assignee: Option<JiraAccount>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JiraStatus {
    name: Option<String>,
    #[serde(rename = "statusCategory")]
    status_category: Option<JiraStatusCategory>,
}

#[derive(Debug, Deserialize)]
struct JiraStatusCategory {
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JiraProject {
    key: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JiraAccount {
    #[serde(rename = "accountId")]
    account_id: Option<String>,
    /// Server / Data Center identify users by `name`
    name: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    #[serde(rename = "emailAddress")]
    email_address: Option<String>,
}

pub(crate) fn map_issue(raw: JiraIssue, source_id: &str, base_url: &str) -> TicketIssue {
    let JiraFields { summary, status, project, issuetype, assignee, updated } = raw.fields;
    let (project_key, project_name) = match project {
        Some(p) => {
            let name = p.name.unwrap_or_else(|| p.key.clone());
            (p.key, name)
        }
        None => {
            let key = raw.key.split('-').next().unwrap_or_default().to_string();
            (key.clone(), key)
        }
    };

    TicketIssue {
        web_url: Some(format!("{}/browse/{}", base_url.trim_end_matches('/'), raw.key)),
        id: raw.id,
        source_id: source_id.to_string(),
        key: raw.key,
        summary: summary.unwrap_or_default(),
        status: status.map(map_status).unwrap_or_default(),
        project_key,
        project_name,
        issue_type: issuetype
            .and_then(|t| t.name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUE_TYPE.to_string()),
        assignee: assignee.and_then(|a| a.display_name.or(a.name)),
        updated_at: parse_timestamp(updated.as_deref()),
        provider: ProviderKind::Jira,
    }
}

/// Status category decides; the status name is only consulted when the
/// category is missing or unrecognized.
fn map_status(status: JiraStatus) -> IssueStatus {
    match status.status_category.and_then(|c| c.key).as_deref() {
        Some("new") => IssueStatus::Open,
        Some("indeterminate") => IssueStatus::InProgress,
        Some("done") => IssueStatus::Closed,
        _ => match status.name.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("to do" | "backlog" | "open" | "reopened") => IssueStatus::Open,
            Some("done" | "resolved" | "closed") => IssueStatus::Closed,
            Some(other) => other.parse().unwrap_or_default(),
            None => IssueStatus::Unknown,
        },
    }
}

pub(crate) fn map_project(raw: JiraProject, base_url: &str) -> TicketProject {
    TicketProject {
        web_url: Some(format!("{}/browse/{}", base_url.trim_end_matches('/'), raw.key)),
        name: raw.name.unwrap_or_else(|| raw.key.clone()),
        key: raw.key,
    }
}

pub(crate) fn map_user(raw: JiraAccount) -> TicketUser {
    let id = raw.account_id.or_else(|| raw.name.clone()).unwrap_or_default();
    TicketUser {
        display_name: raw.display_name.or(raw.name).unwrap_or_else(|| id.clone()),
        id,
        email: raw.email_address,
    }
}
