//! Parsed feed data
//!
//! A feed response is a list of quoted intervals for one calendar day. Each
//! item carries a timestamp (the start of the interval) and one price per
//! provider under a `prijs<CODE>` field. Prices are kept as decimals so the
//! six-digit tariffs survive cache round-trips without float drift.

use crate::error::{HeliosError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One quoted interval from a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Start of the quoted interval, in the configured timezone
    pub datum: DateTime<FixedOffset>,

    /// Price per provider code; providers without a quote are absent
    pub prices: BTreeMap<String, Decimal>,
}

/// One day's worth of quotes, ascending by `datum`
pub type FeedBatch = Vec<PriceQuote>;

impl PriceQuote {
    /// Parse a data item from a feed response
    pub fn from_wire(item: &serde_json::Value, tz: Tz) -> Result<Self> {
        let datum_raw = item
            .get("datum")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HeliosError::malformed("Data item without datum field"))?;
        let datum = parse_feed_datetime(datum_raw, tz)?;

        let mut prices = BTreeMap::new();
        for (code, _) in crate::providers::PROVIDERS {
            let Some(value) = item.get(format!("prijs{code}")) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            prices.insert((*code).to_string(), parse_price(value)?);
        }

        Ok(Self { datum, prices })
    }

    /// Price for one provider, if quoted
    pub fn price(&self, provider: &str) -> Option<Decimal> {
        self.prices.get(provider).copied()
    }
}

/// Parse a feed timestamp.
///
/// The feeds mix full RFC 3339 timestamps and naive `YYYY-MM-DD HH:MM:SS`
/// strings; naive ones are interpreted in the configured timezone.
pub fn parse_feed_datetime(raw: &str, tz: Tz) -> Result<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&tz).fixed_offset());
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| HeliosError::malformed(format!("Unparseable datum {raw:?}: {e}")))?;
    naive
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| HeliosError::malformed(format!("Nonexistent local timestamp: {raw:?}")))
}

fn parse_price(value: &serde_json::Value) -> Result<Decimal> {
    let text = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(HeliosError::malformed(format!(
                "Unexpected price value: {other}"
            )));
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| HeliosError::malformed(format!("Unparseable price {text:?}: {e}")))
}
