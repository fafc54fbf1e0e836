//! GitLab REST v4 payloads.

use serde::Deserialize;
use ticketsync_domain::constants::DEFAULT_ISSUE_TYPE;
use ticketsync_domain::{IssueStatus, ProviderKind, TicketIssue, TicketProject, TicketUser};

use super::{last_segment, parse_timestamp, title_case};

#[derive(Debug, Deserialize)]
pub(crate) struct GitLabIssue {
    id: u64,
    iid: u64,
    project_id: Option<u64>,
    #[serde(default)]
    title: String,
    state: Option<String>,
    issue_type: Option<String>,
    assignee: Option<GitLabAccount>,
    updated_at: Option<String>,
    web_url: Option<String>,
    references: Option<GitLabReferences>,
}

#[derive(Debug, Deserialize)]
struct GitLabReferences {
    /// `group/project#12`
    full: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitLabAccount {
    id: Option<u64>,
    username: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitLabProject {
    id: u64,
    name: String,
    name_with_namespace: Option<String>,
    web_url: Option<String>,
}

pub(crate) fn map_issue(raw: GitLabIssue, source_id: &str, base_url: &str) -> TicketIssue {
    let path = raw
        .references
        .and_then(|r| r.full)
        .and_then(|full| full.split_once('#').map(|(path, _)| path.to_string()))
        .or_else(|| raw.project_id.map(|id| id.to_string()))
        .unwrap_or_default();

    let status = match raw.state.as_deref() {
        Some("opened") => IssueStatus::Open,
        Some("closed") => IssueStatus::Closed,
        Some("locked") => IssueStatus::Locked,
        Some("merged") => IssueStatus::Merged,
        _ => IssueStatus::Unknown,
    };

    let web_url = raw.web_url.filter(|u| !u.is_empty()).unwrap_or_else(|| {
        format!("{}/{path}/-/issues/{}", base_url.trim_end_matches('/'), raw.iid)
    });

    TicketIssue {
        id: raw.id.to_string(),
        source_id: source_id.to_string(),
        key: format!("#{}", raw.iid),
        summary: raw.title,
        status,
        project_name: last_segment(&path).to_string(),
        project_key: path,
        issue_type: raw
            .issue_type
            .as_deref()
            .map(title_case)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUE_TYPE.to_string()),
        assignee: raw.assignee.map(|a| a.name.unwrap_or(a.username)),
        updated_at: parse_timestamp(raw.updated_at.as_deref()),
        provider: ProviderKind::GitLab,
        web_url: Some(web_url),
    }
}

pub(crate) fn map_project(raw: GitLabProject) -> TicketProject {
    TicketProject {
        key: raw.id.to_string(),
        name: raw.name_with_namespace.unwrap_or(raw.name),
        web_url: raw.web_url,
    }
}

pub(crate) fn map_user(raw: GitLabAccount) -> TicketUser {
    TicketUser {
        id: raw.id.map_or_else(|| raw.username.clone(), |id| id.to_string()),
        display_name: raw.name.unwrap_or_else(|| raw.username.clone()),
        email: raw.email,
    }
}
