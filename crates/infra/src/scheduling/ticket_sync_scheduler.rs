//! Per-source background refresh scheduler.
//!
//! One job per enabled source: an immediate refresh, then one refresh every
//! `sync_interval_minutes` until the job is cancelled. A config observer
//! reconciles the job table whenever the config store changes, starting
//! jobs for newly enabled sources, cancelling jobs for removed or disabled
//! ones and restarting jobs whose interval changed.
//!
//! All tasks hang off one root [`CancellationToken`]; cancellation is
//! checked while sleeping and between iterations, so an in-flight refresh
//! always runs to completion (or to its HTTP timeout).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ticketsync_core::tickets::TicketRepository;
//! use ticketsync_infra::observability::metrics::SyncMetrics;
//! use ticketsync_infra::scheduling::{
//!     SchedulerResult, TicketSyncScheduler, TicketSyncSchedulerConfig,
//! };
//!
//! # async fn example(repository: Arc<TicketRepository>) -> SchedulerResult<()> {
//! let mut scheduler = TicketSyncScheduler::new(
//!     repository,
//!     Arc::new(SyncMetrics::new()),
//!     TicketSyncSchedulerConfig::default(),
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use ticketsync_core::tickets::TicketRepository;
use ticketsync_domain::{
    JobPhase, RefreshSummary, Result, SchedulerConfig, SyncJobStatus, SyncOutcome,
    TicketSourceConfig, TicketSyncError,
};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

use crate::observability::metrics::SyncMetrics;
use crate::observability::MetricsResult;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for [`TicketSyncScheduler`].
#[derive(Debug, Clone)]
pub struct TicketSyncSchedulerConfig {
    /// Timeout for awaiting job tasks on stop.
    pub join_timeout: Duration,
}

impl Default for TicketSyncSchedulerConfig {
    fn default() -> Self {
        Self { join_timeout: Duration::from_secs(5) }
    }
}

impl From<&SchedulerConfig> for TicketSyncSchedulerConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self { join_timeout: Duration::from_secs(config.join_timeout_secs) }
    }
}

struct ScheduledJob {
    interval_minutes: u32,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    status: Arc<Mutex<SyncJobStatus>>,
}

/// State shared by the observer, the jobs and the manual sync entry points.
#[derive(Clone)]
struct SchedulerContext {
    repository: Arc<TicketRepository>,
    metrics: Arc<SyncMetrics>,
    jobs: Arc<AsyncMutex<HashMap<String, ScheduledJob>>>,
}

/// Keeps every enabled source refreshed on its own interval.
pub struct TicketSyncScheduler {
    context: SchedulerContext,
    config: TicketSyncSchedulerConfig,
    cancellation: CancellationToken,
    observer: Option<JoinHandle<()>>,
}

impl TicketSyncScheduler {
    pub fn new(
        repository: Arc<TicketRepository>,
        metrics: Arc<SyncMetrics>,
        config: TicketSyncSchedulerConfig,
    ) -> Self {
        Self {
            context: SchedulerContext {
                repository,
                metrics,
                jobs: Arc::new(AsyncMutex::new(HashMap::new())),
            },
            config,
            cancellation: CancellationToken::new(),
            observer: None,
        }
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.context.metrics
    }

    /// Start observing the config store and scheduling jobs.
    ///
    /// Restarts the scheduler if it is already running.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.observer.is_some() {
            debug!("Scheduler already running; restarting");
            if let Err(err) = self.stop().await {
                warn!(error = %err, "Previous run did not stop cleanly; restarting anyway");
            }
        }

        // Fresh token so the scheduler can be restarted after stop
        self.cancellation = CancellationToken::new();

        let context = self.context.clone();
        let cancel = self.cancellation.clone();
        let revisions = context.repository.config_store().subscribe();
        let handle = tokio::spawn(
            async move { context.observe_configs(revisions, cancel).await }
                .instrument(info_span!("ticket_sync_observer")),
        );

        self.observer = Some(handle);
        info!("Ticket sync scheduler started");
        Ok(())
    }

    /// Cancel every job and wait for the tasks to finish.
    ///
    /// Tasks still running when the join timeout elapses are aborted, so the
    /// scheduler is always fully stopped on return.
    ///
    /// # Errors
    ///
    /// `NotRunning` if the scheduler was never started, `Timeout` if some
    /// tasks had to be aborted.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(observer) = self.observer.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();

        let jobs: Vec<ScheduledJob> =
            self.context.jobs.lock().await.drain().map(|(_, job)| job).collect();
        let job_count = jobs.len();
        let mut handles: Vec<JoinHandle<()>> =
            std::iter::once(observer).chain(jobs.into_iter().map(|job| job.handle)).collect();

        let join_timeout = self.config.join_timeout;
        let Ok(results) = tokio::time::timeout(join_timeout, join_all(handles.iter_mut())).await
        else {
            let pending = handles.iter().filter(|handle| !handle.is_finished()).count();
            warn!(pending, "Sync tasks did not finish in time; aborting them");
            for handle in &handles {
                handle.abort();
            }
            return Err(SchedulerError::Timeout { seconds: join_timeout.as_secs() });
        };

        for result in results {
            result.map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!(jobs = job_count, "Ticket sync scheduler stopped");
        Ok(())
    }

    /// `true` while the config observer is alive.
    pub fn is_running(&self) -> bool {
        self.observer.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Snapshot of every scheduled job, ordered by source id.
    pub async fn job_states(&self) -> Vec<SyncJobStatus> {
        let jobs = self.context.jobs.lock().await;
        let mut states: Vec<SyncJobStatus> =
            jobs.values().map(|job| job.status.lock().clone()).collect();
        states.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        states
    }

    /// Refresh every enabled source now.
    ///
    /// Sources with a refresh already in flight are refreshed again once it
    /// completes.
    #[instrument(skip(self))]
    pub async fn sync_all_now(&self) -> Result<RefreshSummary> {
        let configs = self.context.repository.config_store().get_enabled().await?;
        let results = join_all(configs.iter().map(|config| async move {
            (config, self.context.refresh(config).await)
        }))
        .await;

        let mut summary = RefreshSummary::default();
        for (config, result) in results {
            let outcome = SyncOutcome::from(&result);
            self.context.note_manual_outcome(&config.id, outcome.clone()).await;
            summary.push(&config.id, &config.name, outcome);
        }
        Ok(summary)
    }

    /// Refresh one source now, waiting for any in-flight refresh of it.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id; otherwise the refresh error.
    #[instrument(skip(self))]
    pub async fn sync_source_now(&self, source_id: &str) -> Result<usize> {
        let config = self
            .context
            .repository
            .config_store()
            .get_by_id(source_id)
            .await?
            .ok_or_else(|| TicketSyncError::NotFound(format!("source '{source_id}' not found")))?;

        let result = self.context.refresh(&config).await;
        self.context.note_manual_outcome(source_id, SyncOutcome::from(&result)).await;
        result
    }
}

impl SchedulerContext {
    async fn observe_configs(self, mut revisions: watch::Receiver<u64>, cancel: CancellationToken) {
        loop {
            let revision = *revisions.borrow_and_update();
            debug!(revision, "Reconciling sync jobs");
            self.reconcile(&cancel).await;

            tokio::select! {
                () = cancel.cancelled() => break,
                changed = revisions.changed() => {
                    if changed.is_err() {
                        warn!("Config store closed; sync observer exiting");
                        break;
                    }
                }
            }
        }
        debug!("Sync observer stopped");
    }

    async fn reconcile(&self, root: &CancellationToken) {
        let enabled = match self.repository.config_store().get_enabled().await {
            Ok(configs) => configs,
            Err(err) => {
                warn!(error = %err, "Could not load sources; keeping current jobs");
                return;
            }
        };
        if root.is_cancelled() {
            return;
        }

        let wanted: HashMap<String, TicketSourceConfig> =
            enabled.into_iter().map(|config| (config.id.clone(), config)).collect();

        let mut jobs = self.jobs.lock().await;
        jobs.retain(|source_id, job| {
            let keep = wanted
                .get(source_id)
                .is_some_and(|config| config.sync_interval_minutes == job.interval_minutes);
            if !keep {
                job.cancel.cancel();
                info!(source_id = %source_id, "Sync job cancelled");
            }
            keep
        });

        for (source_id, config) in wanted {
            if !jobs.contains_key(&source_id) {
                let job = self.spawn_job(&config, root.child_token());
                jobs.insert(source_id, job);
            }
        }
    }

    fn spawn_job(&self, config: &TicketSourceConfig, cancel: CancellationToken) -> ScheduledJob {
        let interval_minutes = config.sync_interval_minutes;
        let status = Arc::new(Mutex::new(SyncJobStatus {
            source_id: config.id.clone(),
            interval_minutes,
            phase: JobPhase::Pending,
            next_run_at: Some(Utc::now()),
            last_outcome: None,
            last_sync_at: None,
        }));

        let handle = tokio::spawn(
            self.clone()
                .run_job(config.id.clone(), interval_minutes, Arc::clone(&status), cancel.clone())
                .instrument(info_span!("ticket_sync_job", source_id = %config.id)),
        );

        info!(source_id = %config.id, interval_minutes, "Sync job started");
        ScheduledJob { interval_minutes, cancel, handle, status }
    }

    async fn run_job(
        self,
        source_id: String,
        interval_minutes: u32,
        status: Arc<Mutex<SyncJobStatus>>,
        cancel: CancellationToken,
    ) {
        let interval = Duration::from_secs(u64::from(interval_minutes) * 60);

        while !cancel.is_cancelled() {
            // Reload each tick so credential edits apply without a restart
            match self.repository.config_store().get_by_id(&source_id).await {
                Ok(Some(config)) if config.enabled => {
                    {
                        let mut status = status.lock();
                        status.phase = JobPhase::Running;
                        status.next_run_at = None;
                    }
                    let outcome = SyncOutcome::from(&self.refresh(&config).await);
                    let mut status = status.lock();
                    status.last_outcome = Some(outcome);
                    status.last_sync_at = Some(Utc::now());
                }
                Ok(_) => debug!("Source disabled or removed; skipping refresh"),
                Err(err) => warn!(error = %err, "Could not load source; skipping refresh"),
            }

            {
                let mut status = status.lock();
                status.phase = JobPhase::Pending;
                status.next_run_at =
                    Some(Utc::now() + chrono::Duration::minutes(i64::from(interval_minutes)));
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        let mut status = status.lock();
        status.phase = JobPhase::Stopped;
        status.next_run_at = None;
    }

    /// Refresh through the repository, recording metrics. Failures are
    /// logged here and returned.
    async fn refresh(&self, config: &TicketSourceConfig) -> Result<usize> {
        log_metric(self.metrics.record_refresh_started(), "sync.refresh.started");
        let started = Instant::now();

        let result = self.repository.refresh_source(config).await;
        match &result {
            Ok(issues) => {
                log_metric(
                    self.metrics.record_refresh_succeeded(*issues, started.elapsed()),
                    "sync.refresh.succeeded",
                );
            }
            Err(err) => {
                warn!(source_id = %config.id, error = %err, "Source refresh failed");
                log_metric(
                    self.metrics.record_refresh_failed(started.elapsed()),
                    "sync.refresh.failed",
                );
            }
        }
        result
    }

    async fn note_manual_outcome(&self, source_id: &str, outcome: SyncOutcome) {
        if let Some(job) = self.jobs.lock().await.get(source_id) {
            let mut status = job.status.lock();
            status.last_outcome = Some(outcome);
            status.last_sync_at = Some(Utc::now());
        }
    }
}

fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        warn!(metric = metric, error = ?err, "Failed to record sync metric");
    }
}

impl Drop for TicketSyncScheduler {
    fn drop(&mut self) {
        if self.observer.is_some() && !self.cancellation.is_cancelled() {
            warn!("TicketSyncScheduler dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}
