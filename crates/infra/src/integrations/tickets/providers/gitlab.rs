//! GitLab REST v4 client (gitlab.com and self-managed).

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use ticketsync_core::tickets::TicketProviderClient;
use ticketsync_domain::utils::parse_hash_key;
use ticketsync_domain::{
    ProviderKind, Result, SourceCredentials, TicketIssue, TicketProject, TicketSourceConfig,
    TicketSyncError, TicketUser,
};
use tracing::instrument;

use super::{clamp_max_results, fetch_json, newest_first};
use crate::http::HttpClient;
use crate::integrations::tickets::errors::user_message;
use crate::integrations::tickets::mappers::gitlab::{
    self as mapper, GitLabAccount, GitLabIssue, GitLabProject,
};

fn credentials(config: &TicketSourceConfig) -> Result<(&str, &[String])> {
    config.credentials.validate_for(ProviderKind::GitLab)?;
    match &config.credentials {
        SourceCredentials::GitLab { token, project_ids } => Ok((token.as_str(), project_ids.as_slice())),
        other => Err(TicketSyncError::Configuration(format!(
            "{} credentials cannot be used with GitLab",
            other.variant_name()
        ))),
    }
}

/// Query parameters shared by the issue listing endpoints.
fn listing_params(query: &str, per_page: u32) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("order_by", "updated_at".to_string()),
        ("sort", "desc".to_string()),
        ("per_page", per_page.to_string()),
    ];
    let query = query.trim();
    if !query.is_empty() {
        params.push(("search", query.to_string()));
    }
    params
}

/// GitLab client; one instance serves every GitLab source.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: HttpClient,
}

impl GitLabClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn request(&self, config: &TicketSourceConfig, token: &str, path: &str) -> RequestBuilder {
        self.http
            .request(Method::GET, format!("{}/api/v4/{path}", config.api_base()))
            .header("PRIVATE-TOKEN", token)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        fetch_json(&self.http, ProviderKind::GitLab, request, std::convert::identity).await
    }

    async fn fetch_issue(
        &self,
        config: &TicketSourceConfig,
        token: &str,
        project: &str,
        iid: u64,
    ) -> Result<TicketIssue> {
        let path = format!("projects/{}/issues/{iid}", urlencoding::encode(project));
        let raw: GitLabIssue = self.get(self.request(config, token, &path)).await?;
        Ok(mapper::map_issue(raw, &config.id, config.api_base()))
    }
}

#[async_trait]
impl TicketProviderClient for GitLabClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::GitLab
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
        let (token, project_ids) = credentials(config)?;
        let per_page = clamp_max_results(max_results);
        let params = listing_params(query, per_page);

        if project_ids.is_empty() {
            let mut global = params;
            global.push(("scope", "all".to_string()));
            let raw: Vec<GitLabIssue> =
                self.get(self.request(config, token, "issues").query(&global)).await?;
            return Ok(raw
                .into_iter()
                .map(|issue| mapper::map_issue(issue, &config.id, config.api_base()))
                .collect());
        }

        let mut issues = Vec::new();
        for project in project_ids {
            let path = format!("projects/{}/issues", urlencoding::encode(project.trim()));
            let raw: Vec<GitLabIssue> =
                self.get(self.request(config, token, &path).query(&params)).await?;
            issues.extend(
                raw.into_iter().map(|issue| mapper::map_issue(issue, &config.id, config.api_base())),
            );
        }
        Ok(newest_first(issues, per_page))
    }

    /// Accepts `group/project#12`, or `#12` tried against each configured
    /// project in order.
    #[instrument(skip(self, config), fields(source_id = %config.id))]
    async fn get_issue_by_key(&self, config: &TicketSourceConfig, key: &str) -> Result<TicketIssue> {
        let (token, project_ids) = credentials(config)?;
        let parsed = parse_hash_key(key).ok_or_else(|| {
            TicketSyncError::InvalidInput(format!("'{key}' is not a GitLab issue reference"))
        })?;

        if let Some(project) = parsed.scope.as_deref() {
            return self.fetch_issue(config, token, project, parsed.number).await;
        }

        if project_ids.is_empty() {
            return Err(TicketSyncError::InvalidInput(format!(
                "'{key}' needs a project path, e.g. group/project#{}",
                parsed.number
            )));
        }

        for project in project_ids {
            match self.fetch_issue(config, token, project.trim(), parsed.number).await {
                Ok(issue) => return Ok(issue),
                Err(TicketSyncError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(TicketSyncError::NotFound(format!(
            "Issue #{} not found in the configured projects",
            parsed.number
        )))
    }

    async fn get_projects(&self, config: &TicketSourceConfig) -> Result<Vec<TicketProject>> {
        let (token, _) = credentials(config)?;
        let request = self.request(config, token, "projects").query(&[
            ("membership", "true"),
            ("per_page", "100"),
            ("order_by", "last_activity_at"),
        ]);
        let projects: Vec<GitLabProject> = self.get(request).await?;
        Ok(projects.into_iter().map(mapper::map_project).collect())
    }

    async fn get_current_user(&self, config: &TicketSourceConfig) -> Result<TicketUser> {
        let (token, _) = credentials(config)?;
        let account: GitLabAccount = self.get(self.request(config, token, "user")).await?;
        Ok(mapper::map_user(account))
    }

    fn error_message(&self, error: &TicketSyncError, _config: &TicketSourceConfig) -> String {
        user_message(ProviderKind::GitLab, error)
    }
}
