#![cfg(feature = "web")]

use async_trait::async_trait;
use axum::http::Request;
use chrono::DateTime;
use helios::clock::FixedClock;
use helios::config::{Config, PriceResolution};
use helios::coordinator::{ElectricityFeed, GasFeed, UpdateCoordinator};
use helios::enever::{EneverApi, FeedBatch, PriceQuote};
use helios::error::{HeliosError, Result};
use helios::pricing::ApiRequestCounter;
use helios::store::CacheStore;
use helios::web::{AppState, router};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

const TZ: chrono_tz::Tz = chrono_tz::Europe::Amsterdam;

struct NullApi;

#[async_trait]
impl EneverApi for NullApi {
    async fn electricity_today(&self) -> Result<FeedBatch> {
        Err(HeliosError::network("not wired in tests"))
    }

    async fn electricity_tomorrow(&self) -> Result<FeedBatch> {
        Err(HeliosError::network("not wired in tests"))
    }

    async fn gas_today(&self) -> Result<FeedBatch> {
        Err(HeliosError::network("not wired in tests"))
    }

    async fn validate_token(&self) -> Result<()> {
        Ok(())
    }
}

async fn test_state(state_dir: &std::path::Path) -> AppState {
    let clock = Arc::new(FixedClock::new(
        DateTime::parse_from_rfc3339("2024-01-01T12:30:00+01:00").unwrap(),
    ));
    let api: Arc<NullApi> = Arc::new(NullApi);

    // Seed the gas cache so the views have something to show
    let mut prices = BTreeMap::new();
    prices.insert("EZ".to_string(), Decimal::from_str("1.20").unwrap());
    let seeded = helios::coordinator::CoordinatorData {
        today: Some(vec![PriceQuote {
            datum: DateTime::parse_from_rfc3339("2024-01-01T06:00:00+01:00").unwrap(),
            prices,
        }]),
        ..helios::coordinator::CoordinatorData::default()
    };
    CacheStore::new(state_dir, "gas").save(&seeded).unwrap();

    let mut gas = UpdateCoordinator::new(
        Box::new(GasFeed::new(api.clone())),
        CacheStore::new(state_dir, "gas"),
        clock.clone(),
    );
    // Load tick so the coordinator exposes the seeded cache
    gas.tick().await;

    let electricity = UpdateCoordinator::new(
        Box::new(ElectricityFeed::new(api, PriceResolution::Hourly, TZ)),
        CacheStore::new(state_dir, "electricity.60"),
        clock.clone(),
    );

    let mut config = Config::default();
    config.api.token = "secret".to_string();
    config.state_dir = state_dir.to_string_lossy().to_string();

    AppState {
        electricity: Arc::new(Mutex::new(electricity)),
        gas: Arc::new(Mutex::new(gas)),
        counter: Some(Arc::new(ApiRequestCounter::new(clock.clone()))),
        config: Arc::new(config),
        clock,
    }
}

async fn get_json(state: AppState, uri: &str) -> serde_json::Value {
    let response = router(state)
        .oneshot(Request::builder().uri(uri).body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_ok() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let response = router(state)
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn status_reports_both_feeds_and_the_counter() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let body = get_json(state, "/api/status").await;
    assert_eq!(body["feeds"]["gas"]["storage_key"], "gas");
    assert_eq!(body["feeds"]["electricity"]["storage_key"], "electricity.60");
    assert_eq!(body["feeds"]["gas"]["today_date"], "2024-01-01");
    assert_eq!(body["api_requests"]["count"], 0);
}

#[tokio::test]
async fn gas_prices_expose_the_seeded_value() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let body = get_json(state, "/api/prices/gas").await;
    let views = body.as_array().unwrap();
    assert_eq!(views.len(), helios::providers::gas_keys().len());

    let ez = views
        .iter()
        .find(|view| view["provider"] == "EZ")
        .unwrap();
    assert_eq!(ez["name"], "EnergyZero");
    assert_eq!(ez["price"], "1.20");

    // Providers without a quote serialize as null, not zero
    let anwb = views
        .iter()
        .find(|view| view["provider"] == "ANWB")
        .unwrap();
    assert!(anwb["price"].is_null());
}

#[tokio::test]
async fn electricity_prices_cover_all_enabled_providers() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;

    let body = get_json(state, "/api/prices/electricity").await;
    let views = body.as_array().unwrap();
    assert_eq!(views.len(), helios::providers::electricity_keys().len());

    // No electricity data cached yet: every view is empty but present
    assert!(views.iter().all(|view| view["price"].is_null()));
}
