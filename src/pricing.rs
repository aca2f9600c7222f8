//! Derived price views over cached feed data
//!
//! The coordinators only cache raw feed batches; everything shown to a
//! consumer is derived here on demand from that cache plus the current
//! time: the price for the running interval, rolling day averages, the gas
//! validity window, and the monthly API request counter.

use crate::clock::Clock;
use crate::config::PriceResolution;
use crate::coordinator::{CoordinatorData, RequestObserver};
use crate::enever::FeedBatch;
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One point of a price curve as exposed to consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    /// Start of the quoted interval
    pub time: DateTime<FixedOffset>,

    /// The provider's price, if quoted for this interval
    pub price: Option<Decimal>,
}

/// Displayable electricity prices for one provider
#[derive(Debug, Clone, Serialize)]
pub struct ElectricityView {
    /// Provider code
    pub provider: String,

    /// Provider display name
    pub name: String,

    /// Price for the interval containing `now`, if known
    pub price: Option<Decimal>,

    /// Average over today's non-null quotes
    pub today_average: Option<Decimal>,

    /// Average over tomorrow's non-null quotes
    pub tomorrow_average: Option<Decimal>,

    /// Today's full curve, for graphs
    pub prices_today: Option<Vec<PricePoint>>,

    /// Tomorrow's full curve, once published
    pub prices_tomorrow: Option<Vec<PricePoint>>,

    /// When the today feed was last requested
    pub today_lastrequest: Option<DateTime<FixedOffset>>,

    /// When the tomorrow feed was last requested
    pub tomorrow_lastrequest: Option<DateTime<FixedOffset>>,
}

/// Displayable gas price for one provider
#[derive(Debug, Clone, Serialize)]
pub struct GasView {
    /// Provider code
    pub provider: String,

    /// Provider display name
    pub name: String,

    /// Price while within the validity window, `None` once lapsed
    pub price: Option<Decimal>,

    /// When the gas feed was last requested
    pub lastrequest: Option<DateTime<FixedOffset>>,
}

/// Build the electricity view for one provider.
///
/// The cached "today" batch is only trusted if it is actually dated today;
/// otherwise yesterday's "tomorrow" batch covers the gap, so the value stays
/// correct across midnight without a fetch at 00:00 sharp.
pub fn electricity_view(
    data: &CoordinatorData,
    provider: &str,
    now: DateTime<FixedOffset>,
    resolution: PriceResolution,
) -> ElectricityView {
    let date_today = now.date_naive();
    let date_tomorrow = date_today + Days::new(1);

    let today = batch_for_date(data.today.as_ref(), data.today_date(), date_today)
        .or_else(|| batch_for_date(data.tomorrow.as_ref(), data.tomorrow_date(), date_today));
    let tomorrow = batch_for_date(data.tomorrow.as_ref(), data.tomorrow_date(), date_tomorrow);

    let price = today
        .and_then(|batch| current_quote(batch, now, resolution))
        .and_then(|quote| quote.price(provider));

    ElectricityView {
        provider: provider.to_string(),
        name: crate::providers::display_name(provider).to_string(),
        price,
        today_average: average_price(today, provider),
        tomorrow_average: average_price(tomorrow, provider),
        prices_today: today.map(|batch| provider_curve(batch, provider)),
        prices_tomorrow: tomorrow.map(|batch| provider_curve(batch, provider)),
        today_lastrequest: data.today_lastrequest,
        tomorrow_lastrequest: data.tomorrow_lastrequest,
    }
}

/// Build the gas view for one provider.
///
/// `last_known` is the previously displayed price; it papers over the feed
/// occasionally reporting an impossible negative gas price.
pub fn gas_view(
    data: &CoordinatorData,
    provider: &str,
    now: DateTime<FixedOffset>,
    last_known: Option<Decimal>,
) -> GasView {
    let price = data.today_start().and_then(|start| {
        // Gas prices are not known upfront and immediately effective, so the
        // previous batch stays valid a while past its day while the
        // coordinator retries; a slightly outdated price beats a missing one
        let valid_from = start - chrono::Duration::hours(2);
        let valid_to = valid_from + chrono::Duration::hours(26);
        if now < valid_from || now > valid_to {
            return None;
        }

        let mut price = data
            .today
            .as_ref()
            .and_then(|batch| batch.first())
            .and_then(|quote| quote.price(provider));

        if let Some(value) = price {
            if value < Decimal::ZERO {
                crate::logging::get_logger("pricing").warn(&format!(
                    "Negative gas price {} for {:?}, falling back to previous value",
                    value, provider
                ));
                price = last_known;
            }
        }

        price
    });

    GasView {
        provider: provider.to_string(),
        name: crate::providers::display_name(provider).to_string(),
        price,
        lastrequest: data.today_lastrequest,
    }
}

// A batch is only usable as the curve for `date` if it is dated `date`
fn batch_for_date<'a>(
    batch: Option<&'a FeedBatch>,
    batch_date: Option<NaiveDate>,
    date: NaiveDate,
) -> Option<&'a FeedBatch> {
    match (batch, batch_date) {
        (Some(batch), Some(batch_date)) if batch_date == date && !batch.is_empty() => Some(batch),
        _ => None,
    }
}

fn current_quote(
    batch: &FeedBatch,
    now: DateTime<FixedOffset>,
    resolution: PriceResolution,
) -> Option<&crate::enever::PriceQuote> {
    batch
        .iter()
        .find(|quote| quote.datum <= now && now < quote.datum + resolution.interval())
}

fn provider_curve(batch: &FeedBatch, provider: &str) -> Vec<PricePoint> {
    batch
        .iter()
        .map(|quote| PricePoint {
            time: quote.datum,
            price: quote.price(provider),
        })
        .collect()
}

/// Average over the provider's non-null quotes; absent prices are skipped,
/// not counted as zero
pub fn average_price(batch: Option<&FeedBatch>, provider: &str) -> Option<Decimal> {
    let prices: Vec<Decimal> = batch?
        .iter()
        .filter_map(|quote| quote.price(provider))
        .collect();

    if prices.is_empty() {
        return None;
    }

    let sum: Decimal = prices.iter().copied().sum();
    Some(sum / Decimal::from(prices.len() as u64))
}

/// Persisted state of the request counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    /// Requests made in the tagged month
    pub count: u64,

    /// First day of the month the count belongs to
    pub month: NaiveDate,
}

/// Monthly API request counter.
///
/// Attached to both coordinators as a request observer; the count rolls
/// over to zero when the month changes and survives restarts through a
/// small state file.
pub struct ApiRequestCounter {
    state: Mutex<CounterState>,
    clock: Arc<dyn Clock>,
    file_path: Option<PathBuf>,
    logger: crate::logging::StructuredLogger,
}

impl ApiRequestCounter {
    /// Create an in-memory counter
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let month = start_of_month(clock.now());
        Self {
            state: Mutex::new(CounterState { count: 0, month }),
            clock,
            file_path: None,
            logger: crate::logging::get_logger("counter"),
        }
    }

    /// Create a counter persisted under the state directory, restoring any
    /// previously saved count
    pub fn with_state_file<P: AsRef<Path>>(clock: Arc<dyn Clock>, state_dir: P) -> Self {
        let file_path = state_dir.as_ref().join("helios.api_requests.json");
        let mut counter = Self::new(clock);

        if file_path.exists() {
            match std::fs::read_to_string(&file_path)
                .map_err(crate::error::HeliosError::from)
                .and_then(|contents| {
                    serde_json::from_str::<CounterState>(&contents)
                        .map_err(crate::error::HeliosError::from)
                }) {
                Ok(state) => {
                    if let Ok(mut guard) = counter.state.lock() {
                        *guard = state;
                    }
                    counter.logger.info("Restored API request counter");
                }
                Err(e) => counter
                    .logger
                    .warn(&format!("Discarding unreadable counter state: {}", e)),
            }
        }

        counter.file_path = Some(file_path);
        counter
    }

    /// Current count and month tag, rolling the month over first if needed
    pub fn snapshot(&self) -> CounterState {
        let now = self.clock.now();
        let Ok(mut guard) = self.state.lock() else {
            return CounterState {
                count: 0,
                month: start_of_month(now),
            };
        };

        if Self::roll_month(&mut guard, now) {
            self.persist(&guard);
        }
        *guard
    }

    // Returns true if a new month started and the count was reset
    fn roll_month(state: &mut CounterState, now: DateTime<FixedOffset>) -> bool {
        let month = start_of_month(now);
        if state.month != month {
            state.count = 0;
            state.month = month;
            return true;
        }
        false
    }

    fn persist(&self, state: &CounterState) {
        let Some(path) = &self.file_path else {
            return;
        };

        let result = serde_json::to_string_pretty(state)
            .map_err(crate::error::HeliosError::from)
            .and_then(|contents| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, contents).map_err(crate::error::HeliosError::from)
            });

        if let Err(e) = result {
            self.logger
                .warn(&format!("Failed to persist request counter: {}", e));
        }
    }
}

impl RequestObserver for ApiRequestCounter {
    fn count_api_request(&self) {
        let now = self.clock.now();
        let Ok(mut guard) = self.state.lock() else {
            return;
        };

        Self::roll_month(&mut guard, now);
        guard.count += 1;
        self.persist(&guard);
    }
}

fn start_of_month(now: DateTime<FixedOffset>) -> NaiveDate {
    now.date_naive().with_day(1).unwrap_or_else(|| now.date_naive())
}
