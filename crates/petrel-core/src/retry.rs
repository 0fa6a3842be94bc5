//! Retry discipline around a [`Fetcher`].
//!
//! Wraps any fetcher with the two fixed-delay retry points of the
//! pipeline: an unbounded wait-and-reissue loop on HTTP 429, and a
//! single delayed retry on transport-level failure. Delays go through
//! `tokio::time::sleep`, so tests run under a paused clock instead of
//! sleeping in real time.

use std::time::Duration;

use crate::error::HarvestError;
use crate::traits::Fetcher;

/// Configuration for the retrying fetcher.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Pause before reissuing a rate-limited request.
    pub rate_limit_delay: Duration,

    /// Pause before the single transport-failure retry.
    pub transport_delay: Duration,

    /// Ceiling on rate-limit reissues. `None` retries indefinitely —
    /// rate limiting is treated as always transient.
    pub max_rate_limit_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn new(rate_limit_delay: Duration, transport_delay: Duration) -> Self {
        Self {
            rate_limit_delay,
            transport_delay,
            max_rate_limit_attempts: None,
        }
    }

    /// Cap the number of rate-limit reissues.
    pub fn with_max_rate_limit_attempts(mut self, max: u32) -> Self {
        self.max_rate_limit_attempts = Some(max);
        self
    }
}

impl Default for RetryPolicy {
    /// 2s rate-limit backoff, 5s transport backoff, no attempt cap.
    fn default() -> Self {
        Self {
            rate_limit_delay: Duration::from_secs(2),
            transport_delay: Duration::from_secs(5),
            max_rate_limit_attempts: None,
        }
    }
}

/// A [`Fetcher`] wrapper that enforces the retry policy.
///
/// Rate-limited responses are reissued after `rate_limit_delay` until a
/// non-rate-limited outcome arrives. A transport-class failure is
/// retried exactly once after `transport_delay`; a second one surfaces
/// to the caller so the orchestrator can skip just the offending
/// petition. Anything else passes through untouched.
#[derive(Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let mut rate_limit_attempts = 0u32;
        let mut transport_retried = false;

        loop {
            match self.inner.fetch(url).await {
                Err(HarvestError::RateLimited) => {
                    rate_limit_attempts += 1;
                    if let Some(max) = self.policy.max_rate_limit_attempts
                        && rate_limit_attempts > max
                    {
                        return Err(HarvestError::RateLimited);
                    }
                    tracing::debug!(
                        url = %url,
                        attempt = rate_limit_attempts,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(self.policy.rate_limit_delay).await;
                }
                Err(e) if e.is_transport() => {
                    if transport_retried {
                        return Err(e);
                    }
                    transport_retried = true;
                    tracing::warn!(url = %url, error = %e, "Transport failure, retrying once");
                    tokio::time::sleep(self.policy.transport_delay).await;
                }
                other => return other,
            }
        }
    }
}
