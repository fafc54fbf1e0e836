//! HTTP clients for the three tracker backends.
//!
//! Clients are stateless apart from the shared [`HttpClient`]; every call
//! receives the source config it runs against.

pub mod github;
pub mod gitlab;
pub mod jira;

pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use jira::JiraClient;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use ticketsync_domain::constants::MAX_RESULTS_CEILING;
use ticketsync_domain::{ProviderKind, Result, TicketIssue, TicketSyncError};
use tracing::warn;

use super::errors::ProviderError;
use crate::errors::conversions::to_domain;
use crate::http::HttpClient;

/// Send `request` and decode a 2xx JSON body.
///
/// Non-2xx responses are classified into a [`ProviderError`], passed through
/// `remediate` so the caller can attach a provider-specific hint, and
/// returned as the matching domain error.
pub(crate) async fn fetch_json<T, F>(
    http: &HttpClient,
    provider: ProviderKind,
    request: RequestBuilder,
    remediate: F,
) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce(ProviderError) -> ProviderError,
{
    let response = http.send(request).await?;
    let status = response.status();
    let body = response.text().await.map_err(to_domain)?;

    if !status.is_success() {
        let error = remediate(ProviderError::from_response(provider, status, &body));
        warn!(
            provider = %provider,
            status = status.as_u16(),
            category = %error.category(),
            "Tracker request failed"
        );
        return Err(error.into_domain_error());
    }

    serde_json::from_str(&body).map_err(|e| {
        TicketSyncError::Decode(format!(
            "{} response could not be parsed: {e}",
            provider.display_name()
        ))
    })
}

/// Page size sent to a tracker.
pub(crate) fn clamp_max_results(max_results: u32) -> u32 {
    max_results.clamp(1, MAX_RESULTS_CEILING)
}

/// Merge per-repository listings: newest first, capped at `limit`.
pub(crate) fn newest_first(mut issues: Vec<TicketIssue>, limit: u32) -> Vec<TicketIssue> {
    issues.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    issues.truncate(limit as usize);
    issues
}
