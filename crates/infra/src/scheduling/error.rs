//! Scheduler error types

use thiserror::Error;
use ticketsync_domain::TicketSyncError;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Operation timed out
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let domain_err = match err {
            SchedulerError::NotRunning => TicketSyncError::InvalidInput(err.to_string()),
            SchedulerError::Timeout { .. } | SchedulerError::TaskJoinFailed(_) => {
                TicketSyncError::Internal(err.to_string())
            }
        };
        InfraError(domain_err)
    }
}

impl From<SchedulerError> for TicketSyncError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_internal() {
        let err: TicketSyncError = SchedulerError::Timeout { seconds: 5 }.into();
        assert!(matches!(err, TicketSyncError::Internal(msg) if msg.contains("5s")));
    }

    #[test]
    fn not_running_maps_to_invalid_input() {
        let err: TicketSyncError = SchedulerError::NotRunning.into();
        assert!(matches!(err, TicketSyncError::InvalidInput(_)));
    }
}
