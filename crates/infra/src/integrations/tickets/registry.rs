//! Provider client registry.

use std::sync::Arc;

use ticketsync_core::tickets::{TicketProviderClient, TicketProviderFactory};
use ticketsync_domain::{HttpConfig, ProviderKind, Result};

use super::providers::{GitHubClient, GitLabClient, JiraClient};
use crate::http::HttpClient;

/// Holds one client per provider, all sharing a single HTTP connection pool.
pub struct ProviderRegistry {
    jira: Arc<dyn TicketProviderClient>,
    github: Arc<dyn TicketProviderClient>,
    gitlab: Arc<dyn TicketProviderClient>,
}

impl ProviderRegistry {
    pub fn new(http: HttpClient) -> Self {
        Self {
            jira: Arc::new(JiraClient::new(http.clone())),
            github: Arc::new(GitHubClient::new(http.clone())),
            gitlab: Arc::new(GitLabClient::new(http)),
        }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Ok(Self::new(HttpClient::from_config(config)?))
    }
}

impl TicketProviderFactory for ProviderRegistry {
    fn client_for(&self, provider: ProviderKind) -> Result<Arc<dyn TicketProviderClient>> {
        let client = match provider {
            ProviderKind::Jira => &self.jira,
            ProviderKind::GitHub => &self.github,
            ProviderKind::GitLab => &self.gitlab,
        };
        Ok(Arc::clone(client))
    }
}
