//! Per-host rate limiting.
//!
//! Each upstream host gets its own token bucket: burst of one, refilled at
//! the configured requests-per-second (default 2, i.e. at least 500 ms
//! between requests to the same host). `acquire` suspends until a token is
//! available; callers never fail because of the limiter.

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;

/// Keyed token-bucket limiter over upstream hosts.
pub struct HostLimiter {
    limiter: RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
}

impl HostLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let refill = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(refill).allow_burst(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// Wait until a request to `host` is admissible.
    pub async fn acquire(&self, host: &str) {
        self.limiter.until_key_ready(&host.to_string()).await;
    }
}

impl std::fmt::Debug for HostLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostLimiter").finish_non_exhaustive()
    }
}
