//! GitHub REST payloads.

use serde::Deserialize;
use ticketsync_domain::constants::{DEFAULT_ISSUE_TYPE, GITHUB_WEB_BASE};
use ticketsync_domain::{IssueStatus, ProviderKind, TicketIssue, TicketProject, TicketUser};

use super::{last_segment, parse_timestamp};

/// Labels that name an issue type, highest priority first.
const TYPE_LABELS: [(&str, &str); 5] = [
    ("bug", "Bug"),
    ("feature", "Feature"),
    ("enhancement", "Enhancement"),
    ("documentation", "Documentation"),
    ("question", "Question"),
];

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubSearchResponse {
    #[serde(default)]
    pub items: Vec<GitHubIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubIssue {
    id: u64,
    number: u64,
    #[serde(default)]
    title: String,
    state: Option<String>,
    #[serde(default)]
    locked: bool,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
    assignee: Option<GitHubAccount>,
    updated_at: Option<String>,
    html_url: Option<String>,
    repository_url: Option<String>,
    /// Present only on pull requests
    pull_request: Option<serde_json::Value>,
}

impl GitHubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubAccount {
    id: Option<u64>,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubRepository {
    pub full_name: String,
    name: String,
    html_url: Option<String>,
}

/// Map an issue. `repo_hint` (`owner/repo`) is used when the payload lacks
/// `repository_url`, as in per-repository listings from some proxies.
pub(crate) fn map_issue(raw: GitHubIssue, source_id: &str, repo_hint: Option<&str>) -> TicketIssue {
    let repo = raw
        .repository_url
        .as_deref()
        .and_then(|url| url.split_once("/repos/").map(|(_, path)| path.trim_matches('/')))
        .or(repo_hint)
        .unwrap_or_default()
        .to_string();

    let status = match raw.state.as_deref() {
        Some("open") if raw.locked => IssueStatus::Locked,
        Some("open") => IssueStatus::Open,
        Some("closed") => IssueStatus::Closed,
        _ => IssueStatus::Unknown,
    };

    let web_url = raw
        .html_url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| format!("{GITHUB_WEB_BASE}/{repo}/issues/{}", raw.number));

    TicketIssue {
        id: raw.id.to_string(),
        source_id: source_id.to_string(),
        key: format!("#{}", raw.number),
        summary: raw.title,
        status,
        project_name: last_segment(&repo).to_string(),
        project_key: repo,
        issue_type: issue_type_from_labels(raw.labels.iter().map(|l| l.name.as_str())),
        assignee: raw.assignee.map(|a| a.login),
        updated_at: parse_timestamp(raw.updated_at.as_deref()),
        provider: ProviderKind::GitHub,
        web_url: Some(web_url),
    }
}

/// Pick the issue type from label substrings, so `critical bug`,
/// `type: feature` and `kind/documentation` all count. [`TYPE_LABELS`]
/// order decides between several matches.
pub(crate) fn issue_type_from_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    let lowered: Vec<String> = labels.map(str::to_lowercase).collect();

    TYPE_LABELS
        .iter()
        .find(|(needle, _)| lowered.iter().any(|label| label.contains(needle)))
        .map_or(DEFAULT_ISSUE_TYPE, |&(_, issue_type)| issue_type)
        .to_string()
}

pub(crate) fn map_project(raw: GitHubRepository) -> TicketProject {
    TicketProject {
        web_url: raw.html_url,
        key: raw.full_name,
        name: raw.name,
    }
}

pub(crate) fn map_user(raw: GitHubAccount) -> TicketUser {
    TicketUser {
        id: raw.id.map_or_else(|| raw.login.clone(), |id| id.to_string()),
        display_name: raw.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| raw.login.clone()),
        email: raw.email,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: serde_json::Value) -> GitHubIssue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn bug_label_outranks_enhancement() {
        assert_eq!(issue_type_from_labels(["enhancement", "bug"].into_iter()), "Bug");
        assert_eq!(issue_type_from_labels(["type: feature"].into_iter()), "Feature");
        assert_eq!(issue_type_from_labels(["kind/documentation"].into_iter()), "Documentation");
        assert_eq!(issue_type_from_labels(["wontfix"].into_iter()), DEFAULT_ISSUE_TYPE);
    }

    #[test]
    fn label_substrings_keep_priority_order() {
        assert_eq!(issue_type_from_labels(["feature request", "critical bug"].into_iter()), "Bug");
        assert_eq!(issue_type_from_labels(["Feature Request"].into_iter()), "Feature");
        assert_eq!(issue_type_from_labels(["docs: documentation-needed"].into_iter()), "Documentation");
    }

    #[test]
    fn maps_search_item() {
        let issue = map_issue(
            raw(json!({
                "id": 99, "number": 12, "title": "Crash on save", "state": "open",
                "labels": [{ "name": "bug" }],
                "assignee": { "login": "octocat" },
                "updated_at": "2024-02-01T12:00:00Z",
                "html_url": "https://github.com/acme/api/issues/12",
                "repository_url": "https://api.github.com/repos/acme/api"
            })),
            "gh",
            None,
        );
        assert_eq!(issue.key, "#12");
        assert_eq!(issue.id, "99");
        assert_eq!(issue.project_key, "acme/api");
        assert_eq!(issue.project_name, "api");
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.issue_type, "Bug");
        assert_eq!(issue.assignee.as_deref(), Some("octocat"));
    }

    #[test]
    fn locked_open_issue_is_locked_and_url_is_built() {
        let issue = map_issue(
            raw(json!({ "id": 1, "number": 5, "title": "x", "state": "open", "locked": true })),
            "gh",
            Some("acme/web"),
        );
        assert_eq!(issue.status, IssueStatus::Locked);
        assert_eq!(issue.web_url.as_deref(), Some("https://github.com/acme/web/issues/5"));
    }

    #[test]
    fn pull_requests_detected() {
        let pr = raw(json!({ "id": 2, "number": 6, "pull_request": { "url": "x" } }));
        assert!(pr.is_pull_request());
    }

    #[test]
    fn user_display_name_falls_back_to_login() {
        let account: GitHubAccount =
            serde_json::from_value(json!({ "id": 7, "login": "octocat", "name": null })).unwrap();
        let user = map_user(account);
        assert_eq!(user.id, "7");
        assert_eq!(user.display_name, "octocat");
    }
}
