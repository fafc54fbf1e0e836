//! Shared HTTP client for tracker APIs.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use ticketsync_domain::{HttpConfig, TicketSyncError};
use tracing::{debug, warn};

use crate::errors::conversions::to_domain;

/// Upper bound on a server-requested `Retry-After` wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// When and how long to wait between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Exponential backoff for the `retry`th retry (1-based), doubling up to
    /// 2^8 times the base.
    pub fn backoff(&self, retry: usize) -> Duration {
        let exponent = u32::try_from(retry.saturating_sub(1).min(8)).unwrap_or(8);
        self.base_backoff.saturating_mul(1 << exponent)
    }

    /// Whether a response status is worth another attempt.
    pub fn retries_status(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    fn retries_error(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_backoff: Duration::from_millis(250) }
    }
}

/// Reqwest client plus bounded retries.
///
/// 5xx and 429 responses and connect or timeout failures are retried; a
/// `Retry-After` header in seconds replaces the computed backoff. Anything
/// else goes straight back to the caller, which classifies it.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, TicketSyncError> {
        Self::builder().build()
    }

    /// Client configured from the `[http]` config section.
    pub fn from_config(config: &HttpConfig) -> Result<Self, TicketSyncError> {
        Self::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .max_attempts(usize::try_from(config.max_attempts).unwrap_or(1))
            .base_backoff(Duration::from_millis(config.base_backoff_ms))
            .user_agent(config.user_agent.clone())
            .build()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute `builder`, retrying per the client's [`RetryPolicy`].
    ///
    /// The final response is returned whatever its status; only transport
    /// failures become errors.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, TicketSyncError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    TicketSyncError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(to_domain)?;
            let method = request.method().clone();
            let url = request.url().clone();
            let last_attempt = attempt >= attempts;

            debug!(attempt, %method, url = %url.path(), "Sending tracker request");

            let delay = match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    if last_attempt || !RetryPolicy::retries_status(status) {
                        debug!(attempt, %status, "Tracker responded");
                        return Ok(response);
                    }
                    retry_after(&response).unwrap_or_else(|| self.policy.backoff(attempt))
                }
                Err(err) => {
                    if last_attempt || !RetryPolicy::retries_error(&err) {
                        return Err(to_domain(err));
                    }
                    debug!(attempt, error = %err, "Tracker request failed");
                    self.policy.backoff(attempt)
                }
            };

            warn!(
                attempt,
                of = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                url = %url.path(),
                "Retrying tracker request"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

/// `Retry-After` in delta-seconds form, capped at [`MAX_RETRY_AFTER`].
fn retry_after(response: &Response) -> Option<Duration> {
    let seconds = response.headers().get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER))
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    connect_timeout: Duration,
    policy: RetryPolicy,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            policy: RetryPolicy::default(),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Total attempts (initial try + retries). Zero is treated as one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.policy.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.policy.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, TicketSyncError> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        Ok(HttpClient { client: builder.build().map_err(to_domain)?, policy: self.policy })
    }
}
