//! HTTP client for the Enever price feeds
//!
//! One GET per feed, token as a query-string parameter. Failures are
//! classified before they leave this module: rejected tokens surface as
//! `Auth`, transport timeouts and connect failures as `Network`, everything
//! the remote answers with an error payload or non-200 status as `Api`, and
//! unparseable bodies as `Malformed`.

use crate::config::ApiConfig;
use crate::enever::types::{FeedBatch, PriceQuote};
use crate::error::{HeliosError, Result};
use crate::logging::get_logger;
use async_trait::async_trait;
use chrono_tz::Tz;

/// Electricity prices for today
pub const ENDPOINT_ELECTRICITY_TODAY: &str = "stroomprijs_vandaag.php";
/// Electricity prices for tomorrow
pub const ENDPOINT_ELECTRICITY_TOMORROW: &str = "stroomprijs_morgen.php";
/// Gas prices for today
pub const ENDPOINT_GAS_TODAY: &str = "gasprijs_vandaag.php";

// Error code the API uses for a rejected token
const CODE_TOKEN_DENIED: &str = "2";

/// The three Enever feeds plus token validation
#[async_trait]
pub trait EneverApi: Send + Sync {
    /// Fetch the electricity prices for today
    async fn electricity_today(&self) -> Result<FeedBatch>;

    /// Fetch the electricity prices for tomorrow
    async fn electricity_tomorrow(&self) -> Result<FeedBatch>;

    /// Fetch the gas prices for today
    async fn gas_today(&self) -> Result<FeedBatch>;

    /// Test if the token is valid. Counts towards the request quota.
    async fn validate_token(&self) -> Result<()>;
}

/// reqwest-backed Enever API client
pub struct EneverClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    tz: Tz,
    logger: crate::logging::StructuredLogger,
}

impl EneverClient {
    /// Create a client from the API configuration
    pub fn new(config: &ApiConfig, tz: Tz) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
            tz,
            logger: get_logger("enever"),
        })
    }

    async fn fetch_parsed(&self, endpoint: &str) -> Result<FeedBatch> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.logger.debug(&format!("Fetching {}", endpoint));

        let response = self
            .http
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(HeliosError::api(format!(
                "HTTP status {} from {}",
                status.as_u16(),
                endpoint
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| HeliosError::malformed(e.to_string()))?;

        parse_payload(&payload, self.tz)
    }
}

/// Parse a 200 response body into a feed batch
pub fn parse_payload(payload: &serde_json::Value, tz: Tz) -> Result<FeedBatch> {
    let Some(data) = payload.get("data") else {
        return Err(HeliosError::malformed("No data element in response"));
    };

    let Some(items) = data.as_array() else {
        // An error payload carries the detail where the data array would be
        if payload.get("code").and_then(|c| c.as_str()) == Some(CODE_TOKEN_DENIED) {
            return Err(HeliosError::auth("Token rejected by the API"));
        }
        return Err(HeliosError::api(format!(
            "Invalid data element in response: {data}"
        )));
    };

    items
        .iter()
        .map(|item| PriceQuote::from_wire(item, tz))
        .collect()
}

#[async_trait]
impl EneverApi for EneverClient {
    async fn electricity_today(&self) -> Result<FeedBatch> {
        self.fetch_parsed(ENDPOINT_ELECTRICITY_TODAY).await
    }

    async fn electricity_tomorrow(&self) -> Result<FeedBatch> {
        self.fetch_parsed(ENDPOINT_ELECTRICITY_TOMORROW).await
    }

    async fn gas_today(&self) -> Result<FeedBatch> {
        self.fetch_parsed(ENDPOINT_GAS_TODAY).await
    }

    async fn validate_token(&self) -> Result<()> {
        // The gas feed is the cheapest way to exercise the token
        self.fetch_parsed(ENDPOINT_GAS_TODAY).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Amsterdam;
    use serde_json::json;

    #[test]
    fn parse_payload_accepts_data_array() {
        let payload = json!({
            "status": "true",
            "code": "5",
            "data": [
                { "datum": "2024-01-01 00:00:00", "prijsZP": "0.25" },
                { "datum": "2024-01-01 01:00:00", "prijsZP": "0.26" },
            ]
        });

        let batch = parse_payload(&payload, Amsterdam).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch[0].datum < batch[1].datum);
    }

    #[test]
    fn parse_payload_classifies_denied_token() {
        let payload = json!({
            "status": "false",
            "code": "2",
            "data": "Ongeldige token",
        });

        let err = parse_payload(&payload, Amsterdam).unwrap_err();
        assert!(matches!(err, HeliosError::Auth { .. }));
    }

    #[test]
    fn parse_payload_classifies_other_error_payloads() {
        let payload = json!({
            "status": "false",
            "code": "9",
            "data": "Limiet bereikt",
        });

        let err = parse_payload(&payload, Amsterdam).unwrap_err();
        assert!(matches!(err, HeliosError::Api { .. }));
    }

    #[test]
    fn parse_payload_rejects_missing_data() {
        let payload = json!({ "status": "false" });
        let err = parse_payload(&payload, Amsterdam).unwrap_err();
        assert!(matches!(err, HeliosError::Malformed { .. }));
    }
}
