//! Per-source refresh serialization.
//!
//! Scheduled and manual refreshes of the same source take the same async
//! mutex, so a manual sync issued mid-refresh waits for the in-flight one and
//! then runs. Different sources never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct SourceLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive refresh rights on `source_id`.
    pub async fn acquire(&self, source_id: &str) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.entry(source_id.to_string()).or_default().value());
        lock.lock_owned().await
    }

    /// `true` while a refresh of `source_id` holds the lock.
    pub fn is_busy(&self, source_id: &str) -> bool {
        self.locks.get(source_id).is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Drop the lock entry for a removed source. A holder keeps its guard.
    pub fn forget(&self, source_id: &str) {
        self.locks.remove(source_id);
    }
}
