//! Randomized inter-request delay applied before every outbound network call.
//!
//! A single [`RateLimiter`] is shared (via `Arc`) by every source adapter and
//! by the download pipeline. Each call to [`RateLimiter::wait`] suspends the
//! caller for a duration drawn uniformly from the configured
//! `[min_delay, max_delay]` window. Because the scrape loop is strictly
//! sequential (one network operation in flight at a time), this per-call delay
//! is the entire backpressure mechanism; there is no queue and no per-domain
//! bookkeeping.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

/// Shared delay window between outbound network requests.
///
/// # Usage Pattern
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use clipscraper_core::limiter::RateLimiter;
///
/// # async fn example() {
/// let limiter = Arc::new(RateLimiter::new(
///     Duration::from_secs(1),
///     Duration::from_secs(3),
/// ));
/// limiter.wait().await;
/// // ... issue request
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    max_delay: Duration,
    /// Whether delays are disabled entirely (both bounds zero).
    disabled: bool,
}

impl RateLimiter {
    /// Creates a rate limiter with the given delay window.
    ///
    /// If `max_delay < min_delay` the window collapses to `min_delay`;
    /// configuration validation rejects that case before it reaches here.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        let max_delay = max_delay.max(min_delay);
        let disabled = max_delay.is_zero();
        Self {
            min_delay,
            max_delay,
            disabled,
        }
    }

    /// Creates a limiter from fractional-second bounds as they appear in the
    /// run configuration.
    #[must_use]
    pub fn from_secs(min_secs: f64, max_secs: f64) -> Self {
        Self::new(
            Duration::from_secs_f64(min_secs.max(0.0)),
            Duration::from_secs_f64(max_secs.max(0.0)),
        )
    }

    /// Creates a disabled rate limiter that applies no delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            disabled: true,
        }
    }

    /// Returns whether delays are disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the lower bound of the delay window.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Returns the upper bound of the delay window.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Draws one delay uniformly from the configured window.
    ///
    /// Exposed so the sampling distribution can be tested without sleeping.
    #[must_use]
    pub fn sample_delay(&self) -> Duration {
        if self.disabled {
            return Duration::ZERO;
        }
        if self.min_delay == self.max_delay {
            return self.min_delay;
        }
        let secs = rand::thread_rng()
            .gen_range(self.min_delay.as_secs_f64()..=self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Suspends the caller for one randomly drawn delay.
    ///
    /// Must be invoked exactly once immediately before every outbound network
    /// operation performed by any adapter or by the download pipeline.
    #[instrument(skip(self))]
    pub async fn wait(&self) {
        if self.disabled {
            return;
        }
        let delay = self.sample_delay();
        debug!(delay_ms = delay.as_millis(), "applying request delay");
        tokio::time::sleep(delay).await;
    }
}
