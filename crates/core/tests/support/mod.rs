//! Shared test helpers for `ticketsync-core` integration tests.
//!
//! In-memory implementations of the core ports plus fixture builders, so
//! repository tests can focus on behaviour instead of storage.

#![allow(dead_code)]

pub mod providers;
pub mod stores;

use chrono::{TimeZone, Utc};
use ticketsync_domain::{
    IssueStatus, ProviderKind, SourceCredentials, TicketIssue, TicketSourceConfig,
};

pub fn jira_source(name: &str) -> TicketSourceConfig {
    TicketSourceConfig::new(
        name,
        "https://example.atlassian.net",
        SourceCredentials::JiraBasic {
            email: "dev@example.com".into(),
            api_token: "token".into(),
        },
    )
}

pub fn github_source(name: &str) -> TicketSourceConfig {
    TicketSourceConfig::new(
        name,
        "https://api.github.com",
        SourceCredentials::GitHub {
            token: "ghp_test".into(),
            owner: "acme".into(),
            repositories: vec!["widgets".into()],
        },
    )
}

pub fn issue(source_id: &str, key: &str, summary: &str) -> TicketIssue {
    let project_key = key.split('-').next().unwrap_or(key).to_string();
    TicketIssue {
        id: format!("id-{key}"),
        source_id: source_id.to_string(),
        key: key.to_string(),
        summary: summary.to_string(),
        status: IssueStatus::Open,
        project_name: project_key.clone(),
        project_key,
        issue_type: "Task".into(),
        assignee: None,
        updated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        provider: ProviderKind::Jira,
        web_url: None,
    }
}
