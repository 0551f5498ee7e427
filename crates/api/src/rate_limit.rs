//! Outbound rate limiter guarding the remote quota.
//!
//! Injected state with an explicit `acquire()` instead of a module-level
//! timestamp, so callers and tests never depend on wall-clock ordering
//! hidden inside the client.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

pub struct OutboundRateLimiter {
    inner: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl OutboundRateLimiter {
    /// One outbound call per `interval`, no burst.
    pub fn with_min_interval(interval: Duration) -> Self {
        let quota =
            Quota::with_period(interval).unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        Self { inner: RateLimiter::direct(quota) }
    }

    /// Waits until the next call is allowed.
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }

    /// Non-blocking probe, used by tests to observe the window.
    pub fn try_acquire(&self) -> bool {
        self.inner.check().is_ok()
    }
}
