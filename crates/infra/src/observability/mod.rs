//! Observability infrastructure: tracing setup and sync metrics
//!
//! ## Error Handling
//!
//! Metric recording returns `MetricsResult<()>` but currently always
//! succeeds. Callers log and continue on failure; a dropped metric never
//! fails a sync.
//!
//! ```rust
//! use ticketsync_infra::observability::metrics::SyncMetrics;
//!
//! let metrics = SyncMetrics::new();
//! if let Err(e) = metrics.record_refresh_started() {
//!     tracing::warn!("Failed to record metric: {}", e);
//! }
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::{SyncMetrics, SyncMetricsSnapshot};

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "average")
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;
