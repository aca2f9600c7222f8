//! Wall-clock abstraction for the update coordinators
//!
//! Feed freshness is decided from local calendar dates and times-of-day in
//! the configured timezone, so the clock is injected rather than read from
//! ambient statics. Tests drive the coordinator with a `FixedClock`.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use chrono_tz::Tz;

/// Source of the current local time
pub trait Clock: Send + Sync {
    /// Current time, carrying the configured timezone's UTC offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Clock backed by the system time
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    /// Create a system clock for the given timezone
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.tz).fixed_offset()
    }
}

/// Settable clock for tests
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    /// Create a fixed clock at the given instant
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    /// Move the clock to a new instant
    pub fn set(&self, now: DateTime<FixedOffset>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Advance the clock by a duration
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now.lock().map(|g| *g).unwrap_or_else(|e| *e.into_inner())
    }
}
