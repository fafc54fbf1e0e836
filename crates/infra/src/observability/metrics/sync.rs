//! Refresh counters for the sync subsystem
//!
//! ## Design
//! - **SeqCst ordering** for atomics used in derived metrics (average refresh
//!   time)
//! - **No locking needed** - simple atomic counters
//! - **MetricsResult returns** for future extensibility (currently always Ok)

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::observability::{MetricsError, MetricsResult};

/// Counters for scheduled and manual refreshes.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    pub refreshes_started: AtomicUsize,
    pub refreshes_succeeded: AtomicUsize,
    pub refreshes_failed: AtomicUsize,
    pub issues_written: AtomicUsize,
    /// Total refresh time in microseconds
    pub total_refresh_micros: AtomicU64,
    pub last_refresh_micros: AtomicU64,
}

/// Point-in-time copy of [`SyncMetrics`], for logging or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncMetricsSnapshot {
    pub refreshes_started: usize,
    pub refreshes_succeeded: usize,
    pub refreshes_failed: usize,
    pub issues_written: usize,
    pub last_refresh_ms: u64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_refresh_started(&self) -> MetricsResult<()> {
        self.refreshes_started.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Record a finished refresh and how many issues it wrote.
    pub fn record_refresh_succeeded(&self, issues: usize, elapsed: Duration) -> MetricsResult<()> {
        self.refreshes_succeeded.fetch_add(1, Ordering::SeqCst);
        self.issues_written.fetch_add(issues, Ordering::Relaxed);
        self.record_duration(elapsed);
        Ok(())
    }

    pub fn record_refresh_failed(&self, elapsed: Duration) -> MetricsResult<()> {
        self.refreshes_failed.fetch_add(1, Ordering::SeqCst);
        self.record_duration(elapsed);
        Ok(())
    }

    fn record_duration(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_refresh_micros.fetch_add(micros, Ordering::SeqCst);
        // Relaxed OK: last value is not used in derived metrics
        self.last_refresh_micros.store(micros, Ordering::Relaxed);
    }

    /// Average refresh duration in milliseconds across completed refreshes.
    pub fn avg_refresh_ms(&self) -> MetricsResult<f64> {
        let total = self.total_refresh_micros.load(Ordering::SeqCst);
        let count = self.refreshes_succeeded.load(Ordering::SeqCst)
            + self.refreshes_failed.load(Ordering::SeqCst);
        if count == 0 {
            return Err(MetricsError::EmptyData { metric: "average refresh time" });
        }
        Ok((total as f64 / count as f64) / 1_000.0)
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            refreshes_started: self.refreshes_started.load(Ordering::Relaxed),
            refreshes_succeeded: self.refreshes_succeeded.load(Ordering::SeqCst),
            refreshes_failed: self.refreshes_failed.load(Ordering::SeqCst),
            issues_written: self.issues_written.load(Ordering::Relaxed),
            last_refresh_ms: self.last_refresh_micros.load(Ordering::Relaxed) / 1_000,
        }
    }
}
