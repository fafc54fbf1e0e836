//! Connection pool counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free pool counters.
#[derive(Debug, Default)]
pub struct StorageMetrics {
    connections_acquired: AtomicU64,
    connections_timeout: AtomicU64,
    connections_error: AtomicU64,
    total_acquire_ms: AtomicU64,
}

/// Point-in-time copy of [`StorageMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageMetricsSnapshot {
    pub connections_acquired: u64,
    pub connections_timeout: u64,
    pub connections_error: u64,
    pub avg_acquire_ms: u64,
}

impl StorageMetrics {
    pub fn record_acquired(&self, duration_ms: u64) {
        self.connections_acquired.fetch_add(1, Ordering::Relaxed);
        self.total_acquire_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.connections_timeout.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.connections_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StorageMetricsSnapshot {
        let acquired = self.connections_acquired.load(Ordering::Relaxed);
        let total = self.total_acquire_ms.load(Ordering::Relaxed);
        StorageMetricsSnapshot {
            connections_acquired: acquired,
            connections_timeout: self.connections_timeout.load(Ordering::Relaxed),
            connections_error: self.connections_error.load(Ordering::Relaxed),
            avg_acquire_ms: if acquired == 0 { 0 } else { total / acquired },
        }
    }
}
