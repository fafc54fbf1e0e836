//! Metrics collectors.

pub mod sync;

pub use sync::{SyncMetrics, SyncMetricsSnapshot};
