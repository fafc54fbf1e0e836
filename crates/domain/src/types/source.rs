//! Ticket source configuration
//!
//! A *source* is one configured connection to a single tracker backend.
//! The credential shape is a tagged union with one variant per provider
//! (two for Jira, which supports both basic and bearer auth), and the
//! variant must agree with the provider tag before a config can be saved.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_DISPLAY_FORMAT, DEFAULT_SYNC_INTERVAL_MINUTES, MAX_SYNC_INTERVAL_MINUTES,
    MIN_SYNC_INTERVAL_MINUTES,
};
use crate::errors::{Result, TicketSyncError};
use crate::impl_domain_status_conversions;

/// Tracker backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// JQL-based tracker
    Jira,
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "gitlab")]
    GitLab,
}

impl_domain_status_conversions!(ProviderKind {
    Jira => "jira",
    GitHub => "github",
    GitLab => "gitlab",
});

impl ProviderKind {
    /// Human-facing product name used in error messages.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Jira => "Jira",
            Self::GitHub => "GitHub",
            Self::GitLab => "GitLab",
        }
    }
}

/// Credentials for a source, one shape per provider.
///
/// `Debug` is implemented by hand so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceCredentials {
    /// Jira Cloud: account email plus API token (HTTP basic auth)
    JiraBasic { email: String, api_token: String },
    /// Jira Server / Data Center personal access token (bearer auth)
    JiraBearer { personal_access_token: String },
    /// GitHub token scoped to an owner and, optionally, explicit repositories
    #[serde(rename = "github")]
    GitHub { token: String, owner: String, repositories: Vec<String> },
    /// GitLab token with optional explicit project ids
    #[serde(rename = "gitlab")]
    GitLab { token: String, project_ids: Vec<String> },
}

impl SourceCredentials {
    /// Provider this credential shape belongs to.
    pub const fn provider(&self) -> ProviderKind {
        match self {
            Self::JiraBasic { .. } | Self::JiraBearer { .. } => ProviderKind::Jira,
            Self::GitHub { .. } => ProviderKind::GitHub,
            Self::GitLab { .. } => ProviderKind::GitLab,
        }
    }

    /// Variant name as persisted in the `type` tag.
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::JiraBasic { .. } => "jira_basic",
            Self::JiraBearer { .. } => "jira_bearer",
            Self::GitHub { .. } => "github",
            Self::GitLab { .. } => "gitlab",
        }
    }

    /// Check that the variant matches `provider` and that required fields
    /// are present.
    pub fn validate_for(&self, provider: ProviderKind) -> Result<()> {
        if self.provider() != provider {
            return Err(TicketSyncError::Configuration(format!(
                "{} credentials cannot be used with a {} source",
                self.variant_name(),
                provider.display_name()
            )));
        }

        let missing = |field: &str| {
            TicketSyncError::Configuration(format!(
                "{} credentials are missing {field}",
                provider.display_name()
            ))
        };

        match self {
            Self::JiraBasic { email, api_token } => {
                if email.trim().is_empty() {
                    return Err(missing("an email address"));
                }
                if !email.contains('@') {
                    return Err(TicketSyncError::Configuration(format!(
                        "'{email}' is not a valid Jira account email"
                    )));
                }
                if api_token.trim().is_empty() {
                    return Err(missing("an API token"));
                }
            }
            Self::JiraBearer { personal_access_token } => {
                if personal_access_token.trim().is_empty() {
                    return Err(missing("a personal access token"));
                }
            }
            Self::GitHub { token, repositories, owner } => {
                if token.trim().is_empty() {
                    return Err(missing("a token"));
                }
                if repositories.iter().any(|r| r.trim().is_empty()) {
                    return Err(missing("a repository name (blank entry)"));
                }
                // Bare repository names are qualified with the owner
                let needs_owner = repositories.iter().any(|r| !r.contains('/'));
                if needs_owner && owner.trim().is_empty() {
                    return Err(missing("an owner for the unqualified repositories"));
                }
            }
            Self::GitLab { token, project_ids } => {
                if token.trim().is_empty() {
                    return Err(missing("a token"));
                }
                if project_ids.iter().any(|p| p.trim().is_empty()) {
                    return Err(missing("a project id (blank entry)"));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JiraBasic { email, .. } => f
                .debug_struct("JiraBasic")
                .field("email", email)
                .field("api_token", &"[REDACTED]")
                .finish(),
            Self::JiraBearer { .. } => f
                .debug_struct("JiraBearer")
                .field("personal_access_token", &"[REDACTED]")
                .finish(),
            Self::GitHub { owner, repositories, .. } => f
                .debug_struct("GitHub")
                .field("token", &"[REDACTED]")
                .field("owner", owner)
                .field("repositories", repositories)
                .finish(),
            Self::GitLab { project_ids, .. } => f
                .debug_struct("GitLab")
                .field("token", &"[REDACTED]")
                .field("project_ids", project_ids)
                .finish(),
        }
    }
}

/// One configured connection to a tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct TicketSourceConfig {
    pub id: String,
    pub name: String,
    pub provider: ProviderKind,
    pub enabled: bool,
    pub base_url: String,
    pub credentials: SourceCredentials,
    pub sync_interval_minutes: u32,
    /// Jira project key (or GitHub repo / GitLab project path) used to
    /// scope searches when the user does not name one.
    pub default_project: Option<String>,
    /// Template for rendering an issue in pickers, e.g. `"{key}: {summary}"`.
    pub display_format: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketSourceConfig {
    /// New enabled source with a fresh id and default interval/format.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        credentials: SourceCredentials,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            provider: credentials.provider(),
            enabled: true,
            base_url: base_url.into(),
            credentials,
            sync_interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
            default_project: None,
            display_format: DEFAULT_DISPLAY_FORMAT.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_sync_interval(mut self, minutes: u32) -> Self {
        self.sync_interval_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_default_project(mut self, project: impl Into<String>) -> Self {
        self.default_project = Some(project.into());
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Base URL without trailing slashes.
    pub fn api_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Default project, ignoring blank values.
    pub fn default_project(&self) -> Option<&str> {
        self.default_project.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    /// Validate everything that can be checked without the network.
    ///
    /// Runs on every save; provider clients call
    /// [`SourceCredentials::validate_for`] again before each request.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(TicketSyncError::Configuration("source id must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(TicketSyncError::Configuration("source name must not be empty".into()));
        }
        let base = self.base_url.trim();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(TicketSyncError::Configuration(format!(
                "base URL '{base}' must start with http:// or https://"
            )));
        }
        if !(MIN_SYNC_INTERVAL_MINUTES..=MAX_SYNC_INTERVAL_MINUTES)
            .contains(&self.sync_interval_minutes)
        {
            return Err(TicketSyncError::Configuration(format!(
                "sync interval must be between {MIN_SYNC_INTERVAL_MINUTES} and \
                 {MAX_SYNC_INTERVAL_MINUTES} minutes, got {}",
                self.sync_interval_minutes
            )));
        }
        self.credentials.validate_for(self.provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jira_basic() -> SourceCredentials {
        SourceCredentials::JiraBasic {
            email: "dev@example.com".into(),
            api_token: "secret-token".into(),
        }
    }

    #[test]
    fn new_derives_provider_from_credentials() {
        let cfg = TicketSourceConfig::new("Work", "https://acme.atlassian.net/", jira_basic());
        assert_eq!(cfg.provider, ProviderKind::Jira);
        assert_eq!(cfg.api_base(), "https://acme.atlassian.net");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn mismatched_credentials_rejected_at_validation() {
        let mut cfg = TicketSourceConfig::new("Work", "https://acme.atlassian.net", jira_basic());
        cfg.provider = ProviderKind::GitLab;

        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, TicketSyncError::Configuration(_)));
        assert!(err.to_string().contains("jira_basic"));
    }

    #[test]
    fn interval_bounds_enforced() {
        let cfg = TicketSourceConfig::new("Work", "https://acme.atlassian.net", jira_basic())
            .with_sync_interval(0);
        assert!(cfg.validate().is_err());

        let cfg = cfg.with_sync_interval(MAX_SYNC_INTERVAL_MINUTES + 1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bare_github_repositories_require_owner() {
        let creds = SourceCredentials::GitHub {
            token: "ghp_x".into(),
            owner: String::new(),
            repositories: vec!["api".into()],
        };
        assert!(creds.validate_for(ProviderKind::GitHub).is_err());
    }

    #[test]
    fn qualified_github_repositories_need_no_owner() {
        let creds = SourceCredentials::GitHub {
            token: "ghp_x".into(),
            owner: String::new(),
            repositories: vec!["acme/api".into(), "acme/web".into()],
        };
        assert!(creds.validate_for(ProviderKind::GitHub).is_ok());

        let mixed = SourceCredentials::GitHub {
            token: "ghp_x".into(),
            owner: " ".into(),
            repositories: vec!["acme/api".into(), "web".into()],
        };
        assert!(mixed.validate_for(ProviderKind::GitHub).is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", jira_basic());
        assert!(rendered.contains("dev@example.com"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn credentials_serialize_with_variant_tag() {
        let creds = SourceCredentials::GitLab { token: "glpat".into(), project_ids: vec!["42".into()] };
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json["type"], "gitlab");

        let back: SourceCredentials = serde_json::from_value(json).unwrap();
        assert_eq!(back, creds);
    }

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!("GitHub".parse::<ProviderKind>().unwrap(), ProviderKind::GitHub);
        assert_eq!(ProviderKind::GitLab.to_string(), "gitlab");
    }
}
