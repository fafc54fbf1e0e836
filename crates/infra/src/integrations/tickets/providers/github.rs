//! GitHub REST client.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use ticketsync_core::tickets::TicketProviderClient;
use ticketsync_domain::utils::parse_hash_key;
use ticketsync_domain::{
    ProviderKind, Result, SourceCredentials, TicketIssue, TicketProject, TicketSourceConfig,
    TicketSyncError, TicketUser,
};
use tracing::{debug, instrument};

use super::{clamp_max_results, fetch_json, newest_first};
use crate::http::HttpClient;
use crate::integrations::tickets::errors::user_message;
use crate::integrations::tickets::mappers::github::{
    self as mapper, GitHubAccount, GitHubIssue, GitHubRepository, GitHubSearchResponse,
};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

struct GitHubAuth<'a> {
    token: &'a str,
    owner: &'a str,
    repositories: &'a [String],
}

impl GitHubAuth<'_> {
    /// `owner/repo` for every configured repository.
    fn full_names(&self) -> Vec<String> {
        self.repositories.iter().map(|repo| self.qualify(repo)).collect()
    }

    fn qualify(&self, repo: &str) -> String {
        let repo = repo.trim();
        if repo.contains('/') {
            repo.to_string()
        } else {
            format!("{}/{repo}", self.owner.trim())
        }
    }

    /// Search qualifiers limiting results to this source's repositories.
    fn search_scope(&self) -> Option<String> {
        if !self.repositories.is_empty() {
            let qualifiers: Vec<String> =
                self.full_names().iter().map(|name| format!("repo:{name}")).collect();
            Some(qualifiers.join(" "))
        } else if !self.owner.trim().is_empty() {
            Some(format!("user:{}", self.owner.trim()))
        } else {
            None
        }
    }
}

fn auth(config: &TicketSourceConfig) -> Result<GitHubAuth<'_>> {
    config.credentials.validate_for(ProviderKind::GitHub)?;
    match &config.credentials {
        SourceCredentials::GitHub { token, owner, repositories } => {
            Ok(GitHubAuth { token, owner, repositories })
        }
        other => Err(TicketSyncError::Configuration(format!(
            "{} credentials cannot be used with GitHub",
            other.variant_name()
        ))),
    }
}

/// Build the `q` parameter for `/search/issues`.
pub(crate) fn build_search_query(text: &str, scope: Option<&str>) -> String {
    let text = text.trim();
    let scope = match scope {
        Some(scope) => scope.to_string(),
        // Search needs at least one qualifier beyond is:issue
        None if text.is_empty() => "involves:@me".to_string(),
        None => String::new(),
    };

    [text, "is:issue", scope.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// GitHub client; one instance serves every GitHub source.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: HttpClient,
}

impl GitHubClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn request(&self, config: &TicketSourceConfig, token: &str, path: &str) -> RequestBuilder {
        self.http
            .request(Method::GET, format!("{}/{path}", config.api_base()))
            .bearer_auth(token)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        fetch_json(&self.http, ProviderKind::GitHub, request, std::convert::identity).await
    }

    async fn list_repository(
        &self,
        config: &TicketSourceConfig,
        auth: &GitHubAuth<'_>,
        full_name: &str,
        per_page: u32,
    ) -> Result<Vec<TicketIssue>> {
        let request = self
            .request(config, auth.token, &format!("repos/{full_name}/issues"))
            .query(&[
                ("state", "all".to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
                ("per_page", per_page.to_string()),
            ]);

        let raw: Vec<GitHubIssue> = self.get(request).await?;
        Ok(raw
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .map(|issue| mapper::map_issue(issue, &config.id, Some(full_name)))
            .collect())
    }

    async fn fetch_issue(
        &self,
        config: &TicketSourceConfig,
        auth: &GitHubAuth<'_>,
        full_name: &str,
        number: u64,
    ) -> Result<TicketIssue> {
        let request =
            self.request(config, auth.token, &format!("repos/{full_name}/issues/{number}"));
        let raw: GitHubIssue = self.get(request).await?;
        if raw.is_pull_request() {
            return Err(TicketSyncError::NotFound(format!(
                "{full_name}#{number} is a pull request, not an issue"
            )));
        }
        Ok(mapper::map_issue(raw, &config.id, Some(full_name)))
    }
}

#[async_trait]
impl TicketProviderClient for GitHubClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::GitHub
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
        let auth = auth(config)?;
        let per_page = clamp_max_results(max_results);

        if query.trim().is_empty() && !auth.repositories.is_empty() {
            let mut issues = Vec::new();
            for full_name in auth.full_names() {
                issues.extend(self.list_repository(config, &auth, &full_name, per_page).await?);
            }
            return Ok(newest_first(issues, per_page));
        }

        let q = build_search_query(query, auth.search_scope().as_deref());
        debug!(q = %q, "Searching GitHub issues");
        let request = self.request(config, auth.token, "search/issues").query(&[
            ("q", q),
            ("sort", "updated".to_string()),
            ("order", "desc".to_string()),
            ("per_page", per_page.to_string()),
        ]);

        let response: GitHubSearchResponse = self.get(request).await?;
        Ok(response
            .items
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .map(|issue| mapper::map_issue(issue, &config.id, None))
            .collect())
    }

    /// Accepts `#12`, `repo#12` or `owner/repo#12`. A bare number is tried
    /// against each configured repository in order.
    #[instrument(skip(self, config), fields(source_id = %config.id))]
    async fn get_issue_by_key(&self, config: &TicketSourceConfig, key: &str) -> Result<TicketIssue> {
        let auth = auth(config)?;
        let parsed = parse_hash_key(key).ok_or_else(|| {
            TicketSyncError::InvalidInput(format!("'{key}' is not a GitHub issue reference"))
        })?;

        if let Some(scope) = parsed.scope.as_deref() {
            return self.fetch_issue(config, &auth, &auth.qualify(scope), parsed.number).await;
        }

        let candidates = auth.full_names();
        if candidates.is_empty() {
            return Err(TicketSyncError::InvalidInput(format!(
                "'{key}' needs a repository, e.g. owner/repo#{}",
                parsed.number
            )));
        }

        for full_name in &candidates {
            match self.fetch_issue(config, &auth, full_name, parsed.number).await {
                Ok(issue) => return Ok(issue),
                Err(TicketSyncError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(TicketSyncError::NotFound(format!(
            "Issue #{} not found in {}",
            parsed.number,
            candidates.join(", ")
        )))
    }

    async fn get_projects(&self, config: &TicketSourceConfig) -> Result<Vec<TicketProject>> {
        let auth = auth(config)?;
        let request = self.request(config, auth.token, "user/repos").query(&[
            ("per_page", "100"),
            ("sort", "updated"),
        ]);
        let repos: Vec<GitHubRepository> = self.get(request).await?;

        let owner = auth.owner.trim();
        Ok(repos
            .into_iter()
            .filter(|repo| {
                owner.is_empty()
                    || repo
                        .full_name
                        .split_once('/')
                        .is_some_and(|(repo_owner, _)| repo_owner.eq_ignore_ascii_case(owner))
            })
            .map(mapper::map_project)
            .collect())
    }

    async fn get_current_user(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        let auth = auth(config)?;
        let account: GitHubAccount = self.get(self.request(config, auth.token, "user")).await?;
        Ok(mapper::map_user(account))
    }

    fn error_message(&self, error: &TicketSyncError, _config: &TicketSourceConfig) -> String {
        user_message(ProviderKind::GitHub, error)
    }
}
