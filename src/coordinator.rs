//! Update coordinators for the Enever feeds
//!
//! One coordinator owns the cached state of one feed-pair (gas, or
//! electricity at the configured resolution) and decides on every tick
//! whether the "today" and "tomorrow" sub-feeds need refreshing. Requests
//! are gated twice: a per-feed throttle on the time since the last request,
//! and a cap on attempts per sub-feed per local day. The remote token quota
//! is monthly and tight, so the gating - not the poll interval - is what
//! bounds API usage.
//!
//! Tick state is copy-on-write: a tick derives a new `CoordinatorData` from
//! the previous one and only a fully-computed state is ever persisted, so a
//! crash or teardown mid-fetch can never leave a half-finished tick on disk.

pub mod feeds;

use crate::clock::Clock;
use crate::enever::FeedBatch;
use crate::error::HeliosError;
use crate::logging::{LogContext, get_logger_with_context};
use crate::store::CacheStore;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;

pub use feeds::{ElectricityFeed, Feed, GasFeed};

/// Maximum fetch attempts per sub-feed per local calendar day
pub const MAX_DAILY_ATTEMPTS: u32 = 2;

// Tick again quickly until the cached state has been loaded, then settle
// down; the request gating does the real rate limiting.
const STARTUP_UPDATE_INTERVAL: Duration = Duration::from_secs(5);
const STEADY_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// Notified once per outbound API request
pub trait RequestObserver: Send + Sync {
    /// Called just before a request is made
    fn count_api_request(&self);
}

/// The data as cached by an update coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorData {
    /// Today's price curve, if any
    pub today: Option<FeedBatch>,

    /// When the today feed was last requested (attempted, not succeeded)
    pub today_lastrequest: Option<DateTime<FixedOffset>>,

    /// Attempts for the today feed since the last daily reset
    #[serde(default)]
    pub today_attempts: u32,

    /// Tomorrow's price curve, if any
    pub tomorrow: Option<FeedBatch>,

    /// When the tomorrow feed was last requested
    pub tomorrow_lastrequest: Option<DateTime<FixedOffset>>,

    /// Attempts for the tomorrow feed since the last daily reset
    #[serde(default)]
    pub tomorrow_attempts: u32,
}

impl CoordinatorData {
    /// Start of the first quoted interval of the today batch
    pub fn today_start(&self) -> Option<DateTime<FixedOffset>> {
        self.today.as_ref().and_then(|b| b.first()).map(|q| q.datum)
    }

    /// Local calendar date the today batch is for
    pub fn today_date(&self) -> Option<NaiveDate> {
        self.today_start().map(|dt| dt.date_naive())
    }

    /// Start of the first quoted interval of the tomorrow batch
    pub fn tomorrow_start(&self) -> Option<DateTime<FixedOffset>> {
        self.tomorrow.as_ref().and_then(|b| b.first()).map(|q| q.datum)
    }

    /// Local calendar date the tomorrow batch is for
    pub fn tomorrow_date(&self) -> Option<NaiveDate> {
        self.tomorrow_start().map(|dt| dt.date_naive())
    }
}

/// Update coordinator for one feed-pair
pub struct UpdateCoordinator {
    feed: Box<dyn Feed>,
    store: CacheStore,
    clock: Arc<dyn Clock>,
    logger: crate::logging::StructuredLogger,
    observers: Vec<Weak<dyn RequestObserver>>,
    data: Option<CoordinatorData>,
    update_interval: Duration,
}

impl UpdateCoordinator {
    /// Create a coordinator; cached state is loaded lazily on the first tick
    pub fn new(feed: Box<dyn Feed>, store: CacheStore, clock: Arc<dyn Clock>) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("coordinator").with_field("feed", feed.storage_key()),
        );

        Self {
            feed,
            store,
            clock,
            logger,
            observers: Vec::new(),
            data: None,
            update_interval: STARTUP_UPDATE_INTERVAL,
        }
    }

    /// Last computed state, if the first tick has run
    pub fn data(&self) -> Option<&CoordinatorData> {
        self.data.as_ref()
    }

    /// Delay until the next tick
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Cache key of the owned feed-pair
    pub fn storage_key(&self) -> String {
        self.feed.storage_key()
    }

    /// Register an observer; holds a weak reference only
    pub fn attach(&mut self, observer: &Arc<dyn RequestObserver>) {
        if !self
            .observers
            .iter()
            .any(|w| std::ptr::addr_eq(w.as_ptr(), Arc::as_ptr(observer)))
        {
            self.observers.push(Arc::downgrade(observer));
        }
    }

    /// Unregister an observer; no-op if not attached
    pub fn detach(&mut self, observer: &Arc<dyn RequestObserver>) {
        self.observers
            .retain(|w| !std::ptr::addr_eq(w.as_ptr(), Arc::as_ptr(observer)));
    }

    fn notify_request(&mut self) {
        self.observers.retain(|w| w.strong_count() > 0);
        for weak in &self.observers {
            if let Some(observer) = weak.upgrade() {
                observer.count_api_request();
            }
        }
    }

    /// Run one update cycle and return the coordinator's current state.
    ///
    /// No error escapes a tick: fetch failures are logged and the previously
    /// cached batches stay untouched, stale data being preferable to none.
    pub async fn tick(&mut self) -> CoordinatorData {
        let new_data = match self.data.take() {
            // First tick after startup: restore the cache, no API calls yet.
            // The short startup interval makes the first real fetch follow
            // within seconds.
            None => self.load_initial(),
            Some(current) => self.run_update(current).await,
        };

        self.data = Some(new_data.clone());
        new_data
    }

    fn load_initial(&self) -> CoordinatorData {
        match self.store.load() {
            Ok(Some(data)) => {
                self.logger.info("Restored cached feed state");
                data
            }
            Ok(None) => CoordinatorData::default(),
            Err(e) => {
                self.logger
                    .warn(&format!("Discarding unreadable feed cache: {}", e));
                CoordinatorData::default()
            }
        }
    }

    async fn run_update(&mut self, current: CoordinatorData) -> CoordinatorData {
        let now = self.clock.now();
        let mut new_data = current.clone();

        // The attempt cap is per local day
        reset_attempts_for_new_day(&mut new_data, now);

        if self.allow_request_today(now, &new_data)
            && self.feed.should_update_today(now, &new_data)
        {
            new_data.today_attempts += 1;
            new_data.today_lastrequest = Some(now);
            self.notify_request();
            match self.feed.fetch_today().await {
                Ok(Some(batch)) => {
                    self.logger.info("Updated today's prices");
                    new_data.today = Some(batch);
                    new_data.today_attempts = 0;
                }
                Ok(None) => {}
                Err(e) => self.log_fetch_failure("today", &e),
            }
        }

        // Evaluated independently: a failed today fetch must not keep an
        // eligible tomorrow fetch from running in the same tick.
        if self.allow_request_tomorrow(now, &new_data)
            && self.feed.should_update_tomorrow(now, &new_data)
        {
            new_data.tomorrow_attempts += 1;
            new_data.tomorrow_lastrequest = Some(now);
            self.notify_request();
            match self.feed.fetch_tomorrow().await {
                Ok(Some(batch)) => {
                    self.logger.info("Updated tomorrow's prices");
                    new_data.tomorrow = Some(batch);
                    new_data.tomorrow_attempts = 0;
                }
                Ok(None) => {}
                Err(e) => self.log_fetch_failure("tomorrow", &e),
            }
        }

        if new_data != current {
            if let Err(e) = self.store.save(&new_data) {
                self.logger
                    .warn(&format!("Failed to persist feed cache: {}", e));
            }
        }

        self.update_interval = STEADY_UPDATE_INTERVAL;
        new_data
    }

    fn allow_request_today(&self, now: DateTime<FixedOffset>, data: &CoordinatorData) -> bool {
        allow_request(
            now,
            data.today_lastrequest,
            data.today_attempts,
            self.feed.request_interval(),
        )
    }

    fn allow_request_tomorrow(&self, now: DateTime<FixedOffset>, data: &CoordinatorData) -> bool {
        allow_request(
            now,
            data.tomorrow_lastrequest,
            data.tomorrow_attempts,
            self.feed.request_interval(),
        )
    }

    fn log_fetch_failure(&self, leg: &str, err: &HeliosError) {
        if err.is_transient() {
            self.logger.warn(&format!(
                "Fetching {} prices failed, keeping cached data: {}",
                leg, err
            ));
        } else {
            self.logger.error(&format!(
                "Fetching {} prices failed: {} - check the configured token",
                leg, err
            ));
        }
    }
}

// Throttle plus daily cap; both must pass before a request is made
fn allow_request(
    now: DateTime<FixedOffset>,
    lastrequest: Option<DateTime<FixedOffset>>,
    attempts: u32,
    min_interval: chrono::Duration,
) -> bool {
    if attempts >= MAX_DAILY_ATTEMPTS {
        return false;
    }

    match lastrequest {
        None => true,
        Some(last) => now.signed_duration_since(last) >= min_interval,
    }
}

fn reset_attempts_for_new_day(data: &mut CoordinatorData, now: DateTime<FixedOffset>) {
    if let Some(last) = data.today_lastrequest {
        if last.date_naive() != now.date_naive() {
            data.today_attempts = 0;
        }
    }
    if let Some(last) = data.tomorrow_lastrequest {
        if last.date_naive() != now.date_naive() {
            data.tomorrow_attempts = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    #[test]
    fn allow_request_without_history() {
        assert!(allow_request(
            ts("2024-01-01T10:00:00+01:00"),
            None,
            0,
            chrono::Duration::minutes(15)
        ));
    }

    #[test]
    fn allow_request_throttles() {
        let now = ts("2024-01-01T10:00:00+01:00");
        let last = ts("2024-01-01T09:50:00+01:00");
        assert!(!allow_request(now, Some(last), 0, chrono::Duration::minutes(15)));
        assert!(allow_request(now, Some(last), 0, chrono::Duration::minutes(10)));
    }

    #[test]
    fn allow_request_enforces_daily_cap() {
        let now = ts("2024-01-01T10:00:00+01:00");
        assert!(!allow_request(now, None, MAX_DAILY_ATTEMPTS, chrono::Duration::minutes(15)));
    }

    #[test]
    fn attempts_reset_on_local_day_change() {
        let mut data = CoordinatorData {
            today_lastrequest: Some(ts("2024-01-01T23:50:00+01:00")),
            today_attempts: 2,
            tomorrow_lastrequest: Some(ts("2024-01-01T15:05:00+01:00")),
            tomorrow_attempts: 1,
            ..CoordinatorData::default()
        };

        // Still the same local day: counters stay
        reset_attempts_for_new_day(&mut data, ts("2024-01-01T23:59:00+01:00"));
        assert_eq!(data.today_attempts, 2);
        assert_eq!(data.tomorrow_attempts, 1);

        // Past local midnight: both counters reset
        reset_attempts_for_new_day(&mut data, ts("2024-01-02T00:01:00+01:00"));
        assert_eq!(data.today_attempts, 0);
        assert_eq!(data.tomorrow_attempts, 0);
    }
}
