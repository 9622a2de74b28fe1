//! Time sources.
//!
//! Interval arithmetic uses the monotonic reading so wall-clock adjustments
//! never change a session's duration; persisted timestamps use the wall clock.

use std::cell::Cell;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};

/// Supplies monotonic readings and wall-clock timestamps.
pub trait Clock {
    /// Monotonic reading used for elapsed-time math.
    fn now(&self) -> Instant;

    /// Current calendar time used for persisted timestamps.
    fn wall_clock(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        (**self).wall_clock()
    }
}

/// The operating system clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Both readings advance together.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    offset: Cell<Duration>,
}

impl ManualClock {
    pub fn new(wall_origin: DateTime<Utc>) -> Self {
        Self {
            origin: Instant::now(),
            wall_origin,
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let offset = TimeDelta::from_std(self.offset.get()).unwrap_or(TimeDelta::MAX);
        self.wall_origin + offset
    }
}

/// Formats a duration as `HH:MM:SS`. Hours are not capped at 24.
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
