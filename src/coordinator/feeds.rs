//! Feed-specific update behavior
//!
//! The tick algorithm lives in the coordinator; everything that differs
//! between the gas and electricity feed-pairs is behind the `Feed` trait:
//! which endpoints to fetch, when cached data counts as stale, how long to
//! wait between requests, and which cache key the pair persists under.

use crate::config::PriceResolution;
use crate::coordinator::CoordinatorData;
use crate::enever::{EneverApi, FeedBatch};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Timelike};
use chrono_tz::Tz;
use std::sync::Arc;

// Tomorrow's electricity prices are usually published from 15:00 local,
// at the latest 16:00.
const TOMORROW_AVAILABLE_FROM_HOUR: u32 = 15;

/// Behavior of one feed-pair
#[async_trait]
pub trait Feed: Send + Sync {
    /// Cache key the feed-pair persists under
    fn storage_key(&self) -> String;

    /// Minimum time between requests for one sub-feed
    fn request_interval(&self) -> chrono::Duration;

    /// Fetch today's prices; `None` if the feed has no today endpoint
    async fn fetch_today(&self) -> Result<Option<FeedBatch>>;

    /// Fetch tomorrow's prices; `None` if the feed has no forward endpoint
    async fn fetch_tomorrow(&self) -> Result<Option<FeedBatch>>;

    /// Whether the cached today batch needs refreshing
    fn should_update_today(&self, now: DateTime<FixedOffset>, data: &CoordinatorData) -> bool;

    /// Whether the cached tomorrow batch needs refreshing
    fn should_update_tomorrow(&self, now: DateTime<FixedOffset>, data: &CoordinatorData) -> bool;
}

/// Gas prices: one batch per day, no forward feed
pub struct GasFeed {
    api: Arc<dyn EneverApi>,
}

impl GasFeed {
    /// Create the gas feed-pair
    pub fn new(api: Arc<dyn EneverApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Feed for GasFeed {
    fn storage_key(&self) -> String {
        "gas".to_string()
    }

    fn request_interval(&self) -> chrono::Duration {
        // Gas has no forward feed to bridge a stale batch, so retry sooner
        chrono::Duration::minutes(15)
    }

    async fn fetch_today(&self) -> Result<Option<FeedBatch>> {
        self.api.gas_today().await.map(Some)
    }

    async fn fetch_tomorrow(&self) -> Result<Option<FeedBatch>> {
        Ok(None)
    }

    fn should_update_today(&self, now: DateTime<FixedOffset>, data: &CoordinatorData) -> bool {
        let Some(start) = data.today_start() else {
            return true;
        };

        // Update as soon as the prices expire; new ones should be available
        // right away or within the hour
        now >= start + chrono::Duration::days(1)
    }

    fn should_update_tomorrow(&self, _now: DateTime<FixedOffset>, _data: &CoordinatorData) -> bool {
        false
    }
}

/// Electricity prices: a today batch and a forward batch published mid-afternoon
pub struct ElectricityFeed {
    api: Arc<dyn EneverApi>,
    resolution: PriceResolution,
    tz: Tz,
}

impl ElectricityFeed {
    /// Create the electricity feed-pair at the configured resolution
    pub fn new(api: Arc<dyn EneverApi>, resolution: PriceResolution, tz: Tz) -> Self {
        Self {
            api,
            resolution,
            tz,
        }
    }

    // First instant tomorrow's batch for `date` is considered refreshable:
    // 15:00 local on the day the batch is for, i.e. the publication window
    // of the batch that replaces it.
    fn refresh_after(&self, date: chrono::NaiveDate) -> Option<DateTime<FixedOffset>> {
        self.tz
            .with_ymd_and_hms(
                date.year(),
                date.month(),
                date.day(),
                TOMORROW_AVAILABLE_FROM_HOUR,
                0,
                0,
            )
            .earliest()
            .map(|dt| dt.fixed_offset())
    }
}

#[async_trait]
impl Feed for ElectricityFeed {
    fn storage_key(&self) -> String {
        // Scoped per resolution so switching never reuses incompatible data
        format!("electricity.{}", self.resolution.as_str())
    }

    fn request_interval(&self) -> chrono::Duration {
        // Yesterday's tomorrow batch bridges midnight, so electricity can
        // afford a slower retry cadence than gas
        chrono::Duration::minutes(60)
    }

    async fn fetch_today(&self) -> Result<Option<FeedBatch>> {
        self.api.electricity_today().await.map(Some)
    }

    async fn fetch_tomorrow(&self) -> Result<Option<FeedBatch>> {
        self.api.electricity_tomorrow().await.map(Some)
    }

    fn should_update_today(&self, now: DateTime<FixedOffset>, data: &CoordinatorData) -> bool {
        let Some(date) = data.today_date() else {
            return true;
        };

        // Refresh immediately at local midnight; new prices should be
        // available right away
        now.date_naive() != date
    }

    fn should_update_tomorrow(&self, now: DateTime<FixedOffset>, data: &CoordinatorData) -> bool {
        match data.tomorrow_date() {
            // Nothing cached: wait for the publication window
            None => now.time().hour() >= TOMORROW_AVAILABLE_FROM_HOUR,
            // Cached: refreshable once the next publication window opens on
            // the day the cached batch is for
            Some(date) => self.refresh_after(date).is_none_or(|t| now >= t),
        }
    }
}
