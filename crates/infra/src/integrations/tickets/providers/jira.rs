//! Jira Cloud and Server / Data Center client.
//!
//! Basic auth (email + API token) targets REST v3; a bearer personal access
//! token targets REST v2, which is what Server / Data Center expose.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use ticketsync_core::tickets::TicketProviderClient;
use ticketsync_domain::constants::{JIRA_CLOUD_HOST_SUFFIX, JIRA_RECENT_JQL};
use ticketsync_domain::utils::is_jira_key;
use ticketsync_domain::{
    ProviderKind, Result, SourceCredentials, TicketIssue, TicketProject, TicketSourceConfig,
    TicketSyncError, TicketUser,
};
use tracing::instrument;

use super::{clamp_max_results, fetch_json};
use crate::http::HttpClient;
use crate::integrations::tickets::errors::{user_message, ProviderError};
use crate::integrations::tickets::mappers::jira::{
    self as mapper, JiraAccount, JiraIssue, JiraProject, JiraSearchResponse,
};

const ISSUE_FIELDS: &str = "summary,status,project,issuetype,assignee,updated";
const CLOUD_PAT_HINT: &str =
    "Personal access tokens are not supported on Jira Cloud; use email + API token instead.";
const BASIC_AUTH_HINT: &str = "Jira rejected the login. Check the email and API token.";
const BEARER_HINT: &str = "Jira rejected the personal access token. Check that it is valid.";

enum JiraAuth<'a> {
    Basic { email: &'a str, api_token: &'a str },
    Bearer { token: &'a str },
}

impl JiraAuth<'_> {
    fn api_version(&self) -> u8 {
        match self {
            Self::Basic { .. } => 3,
            Self::Bearer { .. } => 2,
        }
    }
}

fn auth(config: &TicketSourceConfig) -> Result<JiraAuth<'_>> {
    config.credentials.validate_for(ProviderKind::Jira)?;
    match &config.credentials {
        SourceCredentials::JiraBasic { email, api_token } => {
            Ok(JiraAuth::Basic { email, api_token })
        }
        SourceCredentials::JiraBearer { personal_access_token } => {
            Ok(JiraAuth::Bearer { token: personal_access_token })
        }
        other => Err(TicketSyncError::Configuration(format!(
            "{} credentials cannot be used with Jira",
            other.variant_name()
        ))),
    }
}

fn is_cloud_host(config: &TicketSourceConfig) -> bool {
    url::Url::parse(config.api_base())
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
        .is_some_and(|host| host.ends_with(JIRA_CLOUD_HOST_SUFFIX))
}

/// Attach the remediation hint for Jira authentication failures.
fn remediate(config: &TicketSourceConfig, error: ProviderError) -> ProviderError {
    let connect_token = error.mentions("connect session token");
    let unauthorized = error.status() == StatusCode::UNAUTHORIZED;
    if !unauthorized && !connect_token {
        return error;
    }

    match &config.credentials {
        SourceCredentials::JiraBearer { .. } if connect_token || is_cloud_host(config) => {
            error.with_hint(CLOUD_PAT_HINT)
        }
        SourceCredentials::JiraBearer { .. } => error.with_hint(BEARER_HINT),
        _ => error.with_hint(BASIC_AUTH_HINT),
    }
}

/// Build the JQL for a search.
///
/// Blank text lists recently updated issues, an issue key matches that key,
/// other free text becomes a full-text search and anything that already
/// looks like JQL is used as-is. A default project scopes the result unless
/// the query names a project itself.
pub(crate) fn build_jql(query: &str, default_project: Option<&str>) -> String {
    let query = query.trim();
    let jql = if query.is_empty() {
        JIRA_RECENT_JQL.to_string()
    } else if is_jira_key(query) {
        format!("key = {}", query.to_ascii_uppercase())
    } else if looks_like_jql(query) {
        query.to_string()
    } else {
        format!("text ~ \"{}\" ORDER BY updated DESC", escape_jql(query))
    };

    match default_project {
        Some(project) if !has_project_clause(&jql) => scope_to_project(&jql, project),
        _ => jql,
    }
}

/// A query is passed through as JQL only when it contains a
/// `field <operator> value` clause or starts with `ORDER BY`.
fn looks_like_jql(query: &str) -> bool {
    let lower = query.to_ascii_lowercase();
    lower.starts_with("order by") || has_symbol_clause(&lower) || has_keyword_clause(&lower)
}

/// `status = Open`, `summary ~ crash`, `created >= -7d`, `status!=Done`.
fn has_symbol_clause(query: &str) -> bool {
    query.char_indices().filter(|&(_, c)| matches!(c, '=' | '~' | '<' | '>')).any(|(idx, _)| {
        let before = query[..idx].trim_end_matches(['!', '<', '>']).trim_end();
        let field = before.rsplit(|c: char| c.is_whitespace() || c == '(').next().unwrap_or("");
        let value = query[idx + 1..].trim_start_matches(['=', '~']).trim();
        is_field_name(field) && !value.is_empty()
    })
}

/// `assignee is EMPTY`, `status in (Open, Done)`, `priority not in (Low)`.
fn has_keyword_clause(query: &str) -> bool {
    let normalized = query.replace(" not in ", " in ").replace(" is not ", " is ");
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.windows(3).any(|clause| {
        is_field_name(clause[0])
            && match (clause[1], clause[2]) {
                ("in", value) => value.starts_with('('),
                ("is", value) => matches!(value, "empty" | "null"),
                _ => false,
            }
    })
}

fn is_field_name(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

fn has_project_clause(jql: &str) -> bool {
    let lower = jql.to_ascii_lowercase();
    ["project =", "project=", "project in", "project !=", "project ~"]
        .iter()
        .any(|clause| lower.contains(clause))
}

fn escape_jql(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn scope_to_project(jql: &str, project: &str) -> String {
    let scope = format!("project = \"{}\"", escape_jql(project));
    let (filter, order) = match jql.to_ascii_lowercase().find("order by") {
        Some(idx) => (jql[..idx].trim(), Some(jql[idx..].trim())),
        None => (jql.trim(), None),
    };

    let scoped =
        if filter.is_empty() { scope } else { format!("{scope} AND ({filter})") };
    match order {
        Some(order) => format!("{scoped} {order}"),
        None => scoped,
    }
}

/// Jira client; one instance serves every Jira source.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: HttpClient,
}

impl JiraClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn request(&self, config: &TicketSourceConfig, path: &str) -> Result<RequestBuilder> {
        let auth = auth(config)?;
        let url = format!("{}/rest/api/{}/{path}", config.api_base(), auth.api_version());
        let builder = self.http.request(Method::GET, url).header("Accept", "application/json");

        Ok(match auth {
            JiraAuth::Basic { email, api_token } => builder.basic_auth(email, Some(api_token)),
            JiraAuth::Bearer { token } => builder.bearer_auth(token),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        config: &TicketSourceConfig,
        request: RequestBuilder,
    ) -> Result<T> {
        fetch_json(&self.http, ProviderKind::Jira, request, |err| remediate(config, err)).await
    }
}

#[async_trait]
impl TicketProviderClient for JiraClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Jira
    }

    async fn test_connection(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        self.get_current_user(config).await
    }

    #[instrument(skip(self, config), fields(source_id = %config.id))]
    async fn search_issues(
        &self,
        config: &TicketSourceConfig,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<TicketIssue>> {
        let jql = build_jql(query, config.default_project());
        let request = self.request(config, "search")?.query(&[
            ("jql", jql),
            ("maxResults", clamp_max_results(max_results).to_string()),
            ("fields", ISSUE_FIELDS.to_string()),
        ]);

        let response: JiraSearchResponse = self.get(config, request).await?;
        Ok(response
            .issues
            .into_iter()
            .map(|raw| mapper::map_issue(raw, &config.id, config.api_base()))
            .collect())
    }

    #[instrument(skip(self, config), fields(source_id = %config.id))]
    async fn get_issue_by_key(&self, config: &TicketSourceConfig, key: &str) -> Result<TicketIssue> {
        let key = key.trim();
        if !is_jira_key(key) {
            return Err(TicketSyncError::InvalidInput(format!("'{key}' is not a Jira issue key")));
        }

        let path = format!("issue/{}", urlencoding::encode(key));
        let request = self.request(config, &path)?.query(&[("fields", ISSUE_FIELDS)]);
        let raw: JiraIssue = self.get(config, request).await?;
        Ok(mapper::map_issue(raw, &config.id, config.api_base()))
    }

    async fn get_projects(&self, config: &TicketSourceConfig) -> Result<Vec<TicketProject>> {
        let request = self.request(config, "project")?;
        let projects: Vec<JiraProject> = self.get(config, request).await?;
        Ok(projects.into_iter().map(|p| mapper::map_project(p, config.api_base())).collect())
    }

    async fn get_current_user(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        let request = self.request(config, "myself")?;
        let account: JiraAccount = self.get(config, request).await?;
        Ok(mapper::map_user(account))
    }

    fn error_message(&self, error: &TicketSyncError, config: &TicketSourceConfig) -> String {
        let bearer_on_cloud = matches!(config.credentials, SourceCredentials::JiraBearer { .. })
            && is_cloud_host(config);
        match error {
            TicketSyncError::Authentication(detail)
                if bearer_on_cloud && !detail.contains(CLOUD_PAT_HINT) =>
            {
                format!("{CLOUD_PAT_HINT} ({detail})")
            }
            other => user_message(ProviderKind::Jira, other),
        }
    }
}
