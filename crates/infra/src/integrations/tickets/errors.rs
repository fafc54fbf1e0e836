//! Tracker error classification
//!
//! Every non-2xx tracker response is classified into a
//! [`ProviderErrorCategory`] from its status code and body text, then
//! converted into the domain error with a provider-specific message.

use std::fmt;

use reqwest::StatusCode;
use ticketsync_domain::{ProviderKind, TicketSyncError};

const MAX_BODY_EXCERPT: usize = 200;

/// Error category for a failed tracker request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCategory {
    /// Credentials rejected (401)
    Authentication,

    /// Authenticated but not allowed (403 without rate-limit markers)
    PermissionDenied,

    /// Resource does not exist or is hidden from this account (404)
    NotFound,

    /// Rate limit exceeded (429, or 403 with a rate-limit body)
    RateLimited,

    /// Tracker or gateway timed out (408, 504)
    Timeout,

    /// Server-side failure (5xx)
    ServerUnavailable,

    /// Request rejected as malformed (other 4xx)
    Validation,

    Unknown,
}

impl ProviderErrorCategory {
    /// Classify from status and body. Body markers win over the bare status
    /// because GitHub reports rate limiting as 403.
    pub fn classify(status: StatusCode, body: &str) -> Self {
        let lower = body.to_ascii_lowercase();
        if lower.contains("rate limit") || lower.contains("too many requests") {
            return Self::RateLimited;
        }

        match status.as_u16() {
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            408 | 504 => Self::Timeout,
            500..=599 => Self::ServerUnavailable,
            400..=499 => Self::Validation,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ProviderErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "Authentication Failed"),
            Self::PermissionDenied => write!(f, "Permission Denied"),
            Self::NotFound => write!(f, "Not Found"),
            Self::RateLimited => write!(f, "Rate Limited"),
            Self::Timeout => write!(f, "Timeout"),
            Self::ServerUnavailable => write!(f, "Server Unavailable"),
            Self::Validation => write!(f, "Validation Error"),
            Self::Unknown => write!(f, "Unknown Error"),
        }
    }
}

/// Failed tracker request with optional remediation hint.
#[derive(Debug, Clone)]
pub struct ProviderError {
    provider: ProviderKind,
    category: ProviderErrorCategory,
    status: StatusCode,
    detail: String,
    hint: Option<String>,
}

impl ProviderError {
    pub fn from_response(provider: ProviderKind, status: StatusCode, body: &str) -> Self {
        Self {
            provider,
            category: ProviderErrorCategory::classify(status, body),
            status,
            detail: excerpt(body),
            hint: None,
        }
    }

    /// Attach a remediation hint shown instead of the generic one.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn category(&self) -> ProviderErrorCategory {
        self.category
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Case-insensitive check of the response body excerpt.
    pub fn mentions(&self, needle: &str) -> bool {
        self.detail.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
    }

    fn default_hint(&self) -> String {
        let name = self.provider.display_name();
        match self.category {
            ProviderErrorCategory::Authentication => {
                format!("{name} rejected the credentials. Check the token and try again.")
            }
            ProviderErrorCategory::PermissionDenied => {
                format!("The {name} account lacks permission for this resource.")
            }
            ProviderErrorCategory::NotFound => format!("{name} could not find the resource."),
            ProviderErrorCategory::RateLimited => {
                format!("{name} rate limit reached. Wait a few minutes before retrying.")
            }
            ProviderErrorCategory::Timeout => format!("{name} took too long to respond."),
            ProviderErrorCategory::ServerUnavailable => {
                format!("{name} is temporarily unavailable.")
            }
            ProviderErrorCategory::Validation => format!("{name} rejected the request."),
            ProviderErrorCategory::Unknown => format!("Unexpected response from {name}."),
        }
    }

    fn message(&self) -> String {
        let hint = self.hint.clone().unwrap_or_else(|| self.default_hint());
        if self.detail.is_empty() {
            format!("{hint} (HTTP {})", self.status.as_u16())
        } else {
            format!("{hint} (HTTP {}: {})", self.status.as_u16(), self.detail)
        }
    }

    /// Convert to domain error type
    pub fn into_domain_error(self) -> TicketSyncError {
        let message = self.message();
        match self.category {
            ProviderErrorCategory::Authentication | ProviderErrorCategory::PermissionDenied => {
                TicketSyncError::Authentication(message)
            }
            ProviderErrorCategory::NotFound => TicketSyncError::NotFound(message),
            ProviderErrorCategory::RateLimited => TicketSyncError::RateLimit(message),
            ProviderErrorCategory::Timeout
            | ProviderErrorCategory::ServerUnavailable
            | ProviderErrorCategory::Unknown => TicketSyncError::Network(message),
            ProviderErrorCategory::Validation => TicketSyncError::InvalidInput(message),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message())
    }
}

impl From<ProviderError> for TicketSyncError {
    fn from(value: ProviderError) -> Self {
        value.into_domain_error()
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// User-facing text for a domain error raised by a `provider` call.
///
/// Strips the category prefix the domain error's `Display` adds and appends
/// a short remediation for categories the message does not already explain.
pub fn user_message(provider: ProviderKind, error: &TicketSyncError) -> String {
    let name = provider.display_name();
    match error {
        TicketSyncError::Network(detail) => {
            format!("Could not reach {name}: {detail}. Cached issues are still available.")
        }
        TicketSyncError::Decode(detail) => format!("Unexpected response from {name}: {detail}"),
        other => other.detail().to_string(),
    }
}
