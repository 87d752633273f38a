//! Request pacing and daily quota accounting for geocoding providers.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive requests.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: tokio::sync::Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing one request per `min_interval`.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: tokio::sync::Mutex::new(None),
        }
    }

    /// Waits until a request may be sent, then records it.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready = previous + self.min_interval;
            if Instant::now() < ready {
                log::debug!("Geocoding rate limit: waiting until next slot");
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Counts requests per UTC day against a fixed limit.
#[derive(Debug)]
pub struct QuotaTracker {
    limit: u32,
    usage: Mutex<(Option<NaiveDate>, u32)>,
}

impl QuotaTracker {
    /// Creates a tracker allowing `limit` requests per day.
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self {
            limit,
            usage: Mutex::new((None, 0)),
        }
    }

    /// The configured daily limit.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Records one request on `today` if the quota allows it.
    ///
    /// Returns `false` (and records nothing) once `limit` requests have been
    /// made on that day. The count resets when the date changes.
    pub fn try_consume(&self, today: NaiveDate) -> bool {
        let mut usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        if usage.0 != Some(today) {
            *usage = (Some(today), 0);
        }
        if usage.1 >= self.limit {
            return false;
        }
        usage.1 += 1;
        true
    }

    /// Requests recorded on `today`.
    #[must_use]
    pub fn used(&self, today: NaiveDate) -> u32 {
        let usage = self.usage.lock().unwrap_or_else(PoisonError::into_inner);
        if usage.0 == Some(today) { usage.1 } else { 0 }
    }
}
