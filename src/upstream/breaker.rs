//! Per-upstream circuit breaker.
//!
//! Closed until `failure_threshold` consecutive qualifying failures, then
//! open for `recovery_timeout`, then half-open for exactly one probe. A
//! successful probe closes the circuit; a failed one reopens it. Which
//! errors qualify is the caller's decision ([`crate::Error::counts_as_upstream_failure`]).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Breaker tuning.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl BreakerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            recovery_timeout: Duration::from_secs(config.recovery_timeout),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// A circuit breaker guarding one upstream.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Admission check before issuing a request.
    ///
    /// Open circuits reject without touching the network. Once the
    /// recovery timeout elapses the circuit moves to half-open and admits
    /// exactly one probe; concurrent callers keep getting rejected until
    /// the probe settles.
    pub fn check(&self) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    info!(upstream = self.name, "circuit half-open, admitting probe");
                    Ok(())
                } else {
                    Err(self.rejection())
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(self.rejection())
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Record a successful request.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(upstream = self.name, "circuit closed");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    /// Record a qualifying failure.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
                warn!(upstream = self.name, "probe failed, circuit reopened");
            }
            _ => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold
                    && inner.state == CircuitState::Closed
                {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        upstream = self.name,
                        failures = inner.consecutive_failures,
                        "circuit opened"
                    );
                }
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn rejection(&self) -> Error {
        Error::UpstreamServerError(format!(
            "circuit open for {}; upstream temporarily disabled",
            self.name
        ))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a panic mid-update; the state machine
        // stays usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, recovery_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            BreakerConfig {
                failure_threshold: threshold,
                recovery_timeout: Duration::from_millis(recovery_ms),
            },
        )
    }

    #[test]
    fn test_starts_closed() {
        let b = breaker(5, 60_000);
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.check().is_ok());
    }

    #[test]
    fn test_opens_after_exact_threshold() {
        let b = breaker(5, 60_000);
        for _ in 0..4 {
            b.record_failure();
            assert_eq!(b.state(), CircuitState::Closed);
        }
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(b.check().is_err());
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let b = breaker(5, 60_000);
        for _ in 0..4 {
            b.record_failure();
        }
        b.record_success();
        for _ in 0..4 {
            b.record_failure();
        }
        // Streak restarted; still closed
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_admits_single_probe() {
        let b = breaker(1, 0);
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);

        // Recovery timeout of zero: next check is the probe
        assert!(b.check().is_ok());
        assert_eq!(b.state(), CircuitState::HalfOpen);
        // A second caller is rejected while the probe is in flight
        assert!(b.check().is_err());

        b.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.check().is_ok());
    }

    #[test]
    fn test_failed_probe_reopens() {
        let b = breaker(1, 0);
        b.record_failure();
        assert!(b.check().is_ok());

        b.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
    }

    #[test]
    fn test_rejection_kind() {
        let b = breaker(1, 60_000);
        b.record_failure();
        let err = b.check().unwrap_err();
        assert_eq!(err.error_type(), "upstream_server_error");
    }
}
