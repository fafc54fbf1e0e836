//! Error types used throughout the ticket sync subsystem

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for TicketSync
///
/// Provider clients, stores and the scheduler all report failures through
/// this enum so callers can branch on the category without inspecting
/// provider-specific detail. The message carried by each variant is already
/// user-presentable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TicketSyncError {
    /// Invalid or inconsistent source configuration (e.g. credential shape
    /// does not match the provider).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 401/403 from a tracker, with remediation text.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// 404 from a tracker, or an unknown local id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// 429 from a tracker.
    #[error("Rate limited: {0}")]
    RateLimit(String),

    /// Timeout, DNS or connect failure, or an unexpected server status.
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Local cache or configuration storage failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Key material or cipher failure.
    #[error("Security error: {0}")]
    Security(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TicketSyncError {
    /// Whether a later retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit(_))
    }

    /// Short machine-readable category name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Authentication(_) => "authentication",
            Self::NotFound(_) => "not_found",
            Self::RateLimit(_) => "rate_limit",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::Cache(_) => "cache",
            Self::Security(_) => "security",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }

    /// The message without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::Configuration(m)
            | Self::Authentication(m)
            | Self::NotFound(m)
            | Self::RateLimit(m)
            | Self::Network(m)
            | Self::Decode(m)
            | Self::Cache(m)
            | Self::Security(m)
            | Self::InvalidInput(m)
            | Self::Internal(m) => m,
        }
    }
}

/// Result type alias for TicketSync operations
pub type Result<T> = std::result::Result<T, TicketSyncError>;
