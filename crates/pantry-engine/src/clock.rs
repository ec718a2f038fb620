//! Time source for the engine and its scheduler.
//!
//! Every component reads "now" through a [`Clock`] so tests can drive days of
//! processing without waiting for them. [`ManualClock`] only moves when told to.

use std::sync::{Mutex, PoisonError};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use tokio::sync::Notify;

/// Longest single sleep of [`SystemClock`], so wall-clock jumps are noticed.
const MAX_SLEEP: StdDuration = StdDuration::from_secs(60);

/// A source of the current time.
#[async_trait]
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Resolve once `now() >= deadline`.
    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        loop {
            let now = Utc::now();
            if now >= deadline {
                return;
            }
            let remaining = (deadline - now).to_std().unwrap_or(StdDuration::ZERO);
            tokio::time::sleep(remaining.min(MAX_SLEEP)).await;
        }
    }
}

/// A clock that only moves when [`ManualClock::advance`] or [`ManualClock::set`] is called.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    changed: Notify,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            changed: Notify::new(),
        }
    }

    /// Move the clock forward and wake sleepers whose deadline has passed.
    pub fn advance(&self, by: Duration) {
        {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now += by;
        }
        self.changed.notify_waiters();
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now = to;
        }
        self.changed.notify_waiters();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        loop {
            // Register interest before checking, so an advance in between is not missed.
            let notified = self.changed.notified();
            if self.now() >= deadline {
                return;
            }
            notified.await;
        }
    }
}

/// The latest instant at or before `now` whose time of day is `at`.
#[must_use]
pub fn latest_occurrence(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(at));
    if today <= now {
        today
    } else {
        today - Duration::days(1)
    }
}

/// The earliest instant strictly after `now` whose time of day is `at`.
#[must_use]
pub fn next_occurrence(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    latest_occurrence(now, at) + Duration::days(1)
}
