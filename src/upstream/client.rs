//! Retrying HTTP client for upstream documentation sources.
//!
//! Wraps `reqwest` with the rate limiter, the per-upstream circuit
//! breakers and the retry policy. Classifies responses into the error
//! taxonomy and feeds the breaker only with qualifying failures.

use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::upstream::breaker::{BreakerConfig, CircuitBreaker, CircuitState};
use crate::upstream::rate_limit::HostLimiter;
use crate::upstream::retry::RetryPolicy;
use crate::upstream::Upstream;
use crate::USER_AGENT;

/// Total per-attempt timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Connect phase timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by all upstream fetches.
#[derive(Debug)]
pub struct FetchClient {
    http: reqwest::Client,
    policy: RetryPolicy,
    limiter: HostLimiter,
    breakers: HashMap<Upstream, CircuitBreaker>,
}

impl FetchClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("failed to create HTTP client: {e}")))?;

        let breaker_config = BreakerConfig::from_config(config);
        let breakers = Upstream::ALL
            .into_iter()
            .map(|u| (u, CircuitBreaker::new(u.wire_name(), breaker_config.clone())))
            .collect();

        Ok(Self {
            http,
            policy: RetryPolicy::from_config(config),
            limiter: HostLimiter::new(config.requests_per_second),
            breakers,
        })
    }

    /// Fetch `url` from `upstream`, returning the response body.
    ///
    /// Applies, in order: circuit admission, per-host rate limiting, the
    /// request itself, and retry with backoff on connect errors, timeouts,
    /// 429 and 5xx. The canonical id rides along as a request header for
    /// observability.
    pub async fn get(&self, upstream: Upstream, url: &str, canonical_id: &str) -> Result<String> {
        let breaker = self.breaker(upstream);
        breaker.check()?;

        let mut attempt: u32 = 0;
        loop {
            self.limiter.acquire(upstream.host()).await;

            let request_id = Uuid::new_v4().to_string();
            debug!(url, canonical_id, request_id, attempt, "fetching upstream");
            let outcome = self
                .http
                .get(url)
                .header("X-Canonical-Id", canonical_id)
                .header("X-Request-Id", &request_id)
                .send()
                .await;

            let failure = match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.map_err(|e| {
                            breaker.record_failure();
                            Error::Network(format!("failed reading body from {url}: {e}"))
                        })?;
                        breaker.record_success();
                        return Ok(body);
                    }
                    Failure::from_status(status)
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    Failure::Transport(format!("{e}"))
                }
                Err(e) => {
                    // Builder or decode errors; not a network fault
                    return Err(Error::Internal(format!("request to {url} failed: {e}")));
                }
            };

            if failure.retriable() && attempt < self.policy.max_retries {
                let delay = self.policy.backoff_delay(attempt);
                warn!(
                    url,
                    canonical_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure,
                    "retrying upstream request"
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
                continue;
            }

            let error = failure.into_error(url, canonical_id);
            if error.counts_as_upstream_failure() {
                breaker.record_failure();
            }
            return Err(error);
        }
    }

    /// Current circuit state of an upstream, for status reporting.
    pub fn breaker_state(&self, upstream: Upstream) -> CircuitState {
        self.breaker(upstream).state()
    }

    fn breaker(&self, upstream: Upstream) -> &CircuitBreaker {
        // The map is populated for every variant in `new`.
        self.breakers
            .get(&upstream)
            .expect("breaker registered for every upstream")
    }
}

/// A failed attempt, classified for retry and breaker decisions.
enum Failure {
    /// Connection or timeout trouble
    Transport(String),
    /// HTTP 404
    NotFound,
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    Server(StatusCode),
    /// Any other unexpected status
    Unexpected(StatusCode),
}

impl Failure {
    fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::NOT_FOUND {
            Self::NotFound
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited
        } else if status.is_server_error() {
            Self::Server(status)
        } else {
            Self::Unexpected(status)
        }
    }

    /// Retry on connection errors, timeouts, 5xx and 429; never on other
    /// statuses.
    fn retriable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimited | Self::Server(_)
        )
    }

    fn into_error(self, url: &str, canonical_id: &str) -> Error {
        match self {
            Self::Transport(msg) => {
                Error::Network(format!("request to {url} failed after retries: {msg}"))
            }
            Self::NotFound => Error::NotFound(format!(
                "no documentation at {url} for '{canonical_id}'"
            )),
            Self::RateLimited => Error::RateLimited(format!("{url} kept returning 429")),
            Self::Server(status) => {
                Error::UpstreamServerError(format!("{url} returned HTTP {status}"))
            }
            Self::Unexpected(status) => {
                Error::NotFound(format!("{url} returned unexpected HTTP {status}"))
            }
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::NotFound => write!(f, "404"),
            Self::RateLimited => write!(f, "429"),
            Self::Server(status) | Self::Unexpected(status) => write!(f, "{status}"),
        }
    }
}
