//! Adaptive rate governor
//!
//! Every request passes two gates before it is sent:
//! - a semaphore bounding the number of requests in flight
//! - a spacing gate enforcing `current_delay` between consecutive grants
//!
//! `current_delay` follows observed latency (Little's law): the governor
//! aims for `target_concurrency` requests in flight at the server, moving
//! at most 25% per observation and never leaving `[min_delay, max_delay]`.

use crate::config::{CrawlerConfig, ThrottleConfig};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::trace;

/// Largest relative change applied by one observation
const MAX_STEP: f64 = 0.25;

/// Smallest absolute step, so a zero delay can still grow
const MIN_STEP: Duration = Duration::from_millis(10);

/// Snapshot of the governor's adjustable state
#[derive(Debug, Clone, PartialEq)]
pub struct RateState {
    pub current_delay: Duration,
    pub in_flight_count: usize,
    pub target_concurrency: f64,
}

#[derive(Debug)]
struct Inner {
    rate: RateState,
    min_delay: Duration,
    max_delay: Duration,
}

#[derive(Debug)]
pub struct RateGovernor {
    semaphore: Arc<Semaphore>,
    last_grant: tokio::sync::Mutex<Option<Instant>>,
    inner: Arc<Mutex<Inner>>,
}

/// Permission to send one request; dropping it releases the slot
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
    inner: Arc<Mutex<Inner>>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        inner.rate.in_flight_count = inner.rate.in_flight_count.saturating_sub(1);
    }
}

impl RateGovernor {
    pub fn new(concurrency: usize, throttle: &ThrottleConfig) -> Self {
        let min_delay = throttle.min();
        let max_delay = throttle.max().max(min_delay);
        let target_concurrency =
            if throttle.target_concurrency.is_finite() && throttle.target_concurrency > 0.0 {
                throttle.target_concurrency
            } else {
                1.0
            };

        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            last_grant: tokio::sync::Mutex::new(None),
            inner: Arc::new(Mutex::new(Inner {
                rate: RateState {
                    current_delay: throttle.base().clamp(min_delay, max_delay),
                    in_flight_count: 0,
                    target_concurrency,
                },
                min_delay,
                max_delay,
            })),
        }
    }

    pub fn from_config(crawler: &CrawlerConfig, throttle: &ThrottleConfig) -> Self {
        Self::new(crawler.concurrency as usize, throttle)
    }

    /// Waits for a concurrency permit and for the spacing gate
    ///
    /// The governor "releases" a request when it grants a slot, so the
    /// spacing is `current_delay` between consecutive grants, not between
    /// a response arriving and the next request.
    ///
    /// Returns `None` only if the governor has been shut down.
    pub async fn acquire_slot(&self) -> Option<Slot> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        {
            let mut last = self.last_grant.lock().await;
            if let Some(previous) = *last {
                let ready_at = previous
                    .checked_add(self.current_delay())
                    .unwrap_or_else(Instant::now);
                if ready_at > Instant::now() {
                    tokio::time::sleep_until(ready_at).await;
                }
            }
            *last = Some(Instant::now());
        }

        lock(&self.inner).rate.in_flight_count += 1;

        Some(Slot {
            _permit: permit,
            inner: self.inner.clone(),
        })
    }

    /// Feeds the latency of a successful response back into the delay
    pub fn record(&self, latency: Duration) {
        self.adjust(latency, false);
    }

    /// Like `record`, but an error response can only slow the crawl down
    pub fn record_error(&self, latency: Duration) {
        self.adjust(latency, true);
    }

    fn adjust(&self, latency: Duration, only_increase: bool) {
        let mut inner = lock(&self.inner);
        let current = inner.rate.current_delay.as_secs_f64();
        let desired = latency.as_secs_f64() / inner.rate.target_concurrency;

        let step = (current * MAX_STEP).max(MIN_STEP.as_secs_f64());
        let mut next = desired.clamp((current - step).max(0.0), current + step);
        if only_increase {
            next = next.max(current);
        }
        let next = next.clamp(
            inner.min_delay.as_secs_f64(),
            inner.max_delay.as_secs_f64(),
        );

        let next = Duration::from_secs_f64(next);
        trace!(
            latency_ms = latency.as_millis() as u64,
            from_ms = inner.rate.current_delay.as_millis() as u64,
            to_ms = next.as_millis() as u64,
            in_flight = inner.rate.in_flight_count,
            "delay adjusted"
        );
        inner.rate.current_delay = next;
    }

    /// Raises the delay floor (robots.txt `Crawl-delay`), capped at `max_delay`
    pub fn raise_floor(&self, delay: Duration) {
        let mut inner = lock(&self.inner);
        let floor = delay.min(inner.max_delay);
        if floor > inner.min_delay {
            inner.min_delay = floor;
            if inner.rate.current_delay < floor {
                inner.rate.current_delay = floor;
            }
        }
    }

    /// Delay before retry number `attempt` (1-based): `current_delay * 2^attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let inner = lock(&self.inner);
        let factor = 1u32 << attempt.min(16);
        inner
            .rate
            .current_delay
            .saturating_mul(factor)
            .min(inner.max_delay)
    }

    pub fn current_delay(&self) -> Duration {
        lock(&self.inner).rate.current_delay
    }

    pub fn min_delay(&self) -> Duration {
        lock(&self.inner).min_delay
    }

    pub fn snapshot(&self) -> RateState {
        lock(&self.inner).rate.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
