//! Cache-backed live queries.
//!
//! An [`IssueSubscription`] re-runs its [`IssueQuery`] against the cache
//! whenever the cache revision changes and delivers the new result set over
//! a channel. Dropping the subscription (or calling
//! [`IssueSubscription::cancel`]) stops the background task.

use std::sync::Arc;

use ticketsync_domain::{Result, TicketIssue};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ports::IssueCache;

const SUBSCRIPTION_BUFFER: usize = 8;

/// Read query a subscription keeps current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueQuery {
    All,
    Source(String),
    Project(String),
    Assignee(String),
    Search { text: String, limit: usize },
}

impl IssueQuery {
    pub async fn run(&self, cache: &dyn IssueCache) -> Result<Vec<TicketIssue>> {
        match self {
            Self::All => cache.get_all().await,
            Self::Source(id) => cache.get_by_source(id).await,
            Self::Project(key) => cache.get_by_project(key).await,
            Self::Assignee(name) => cache.get_by_assignee(name).await,
            Self::Search { text, limit } => cache.search(text, *limit).await,
        }
    }
}

/// Live, cache-backed result set.
///
/// The first value is the current cache contents; later values arrive only
/// when a cache write changes the result. Query failures are logged and the
/// previous result stays in effect.
#[derive(Debug)]
pub struct IssueSubscription {
    receiver: mpsc::Receiver<Vec<TicketIssue>>,
    cancel: CancellationToken,
}

impl IssueSubscription {
    pub fn spawn(cache: Arc<dyn IssueCache>, query: IssueQuery) -> Self {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut revisions = cache.subscribe();

        tokio::spawn(async move {
            let mut last: Option<Vec<TicketIssue>> = None;
            loop {
                // Mark the current revision seen before querying so a write
                // that lands mid-query still triggers another pass.
                let _seen = *revisions.borrow_and_update();

                match query.run(cache.as_ref()).await {
                    Ok(issues) if last.as_ref() != Some(&issues) => {
                        last = Some(issues.clone());
                        tokio::select! {
                            () = token.cancelled() => break,
                            sent = sender.send(issues) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, ?query, "Live issue query failed"),
                }

                tokio::select! {
                    () = token.cancelled() => break,
                    changed = revisions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(?query, "Issue subscription closed");
        });

        Self { receiver, cancel }
    }

    /// Next result set; `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Vec<TicketIssue>> {
        self.receiver.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for IssueSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
