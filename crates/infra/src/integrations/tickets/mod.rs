//! Ticket tracker integrations: Jira, GitHub and GitLab.

pub mod errors;
pub mod mappers;
pub mod providers;
pub mod registry;

pub use errors::{ProviderError, ProviderErrorCategory};
pub use providers::{GitHubClient, GitLabClient, JiraClient};
pub use registry::ProviderRegistry;
