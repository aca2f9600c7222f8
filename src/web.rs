//! Axum-based read-only HTTP API
//!
//! Exposes liveness, the coordinators' scheduling state, and the derived
//! per-provider price views. Everything here reads the coordinators'
//! current in-memory state; nothing mutates it.

use crate::clock::Clock;
use crate::config::Config;
use crate::coordinator::UpdateCoordinator;
use crate::error::{HeliosError, Result};
use crate::pricing;
use crate::service::PriceService;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared state for the API handlers
#[derive(Clone)]
pub struct AppState {
    /// Electricity coordinator handle
    pub electricity: Arc<Mutex<UpdateCoordinator>>,

    /// Gas coordinator handle
    pub gas: Arc<Mutex<UpdateCoordinator>>,

    /// Request counter, if enabled
    pub counter: Option<Arc<crate::pricing::ApiRequestCounter>>,

    /// Resolved configuration
    pub config: Arc<Config>,

    /// Service clock
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Borrow the handles out of a running service
    pub fn from_service(service: &PriceService) -> Self {
        Self {
            electricity: service.electricity(),
            gas: service.gas(),
            counter: service.counter(),
            config: service.config(),
            clock: service.clock(),
        }
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.clock.now();

    let gas = {
        let guard = state.gas.lock().await;
        coordinator_status(&guard)
    };
    let electricity = {
        let guard = state.electricity.lock().await;
        coordinator_status(&guard)
    };

    let mut body = json!({
        "version": env!("APP_VERSION"),
        "timestamp": now.to_rfc3339(),
        "feeds": {
            "gas": gas,
            "electricity": electricity,
        },
    });

    if let Some(counter) = &state.counter {
        body["api_requests"] =
            serde_json::to_value(counter.snapshot()).unwrap_or(serde_json::Value::Null);
    }

    Json(body)
}

fn coordinator_status(coordinator: &UpdateCoordinator) -> serde_json::Value {
    let mut status = json!({
        "storage_key": coordinator.storage_key(),
        "update_interval_secs": coordinator.update_interval().as_secs(),
    });

    if let Some(data) = coordinator.data() {
        status["today_date"] = json!(data.today_date().map(|d| d.to_string()));
        status["today_lastrequest"] = json!(data.today_lastrequest.map(|t| t.to_rfc3339()));
        status["today_attempts"] = json!(data.today_attempts);
        status["tomorrow_date"] = json!(data.tomorrow_date().map(|d| d.to_string()));
        status["tomorrow_lastrequest"] = json!(data.tomorrow_lastrequest.map(|t| t.to_rfc3339()));
        status["tomorrow_attempts"] = json!(data.tomorrow_attempts);
    }

    status
}

async fn electricity_prices(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.clock.now();
    let data = {
        let guard = state.electricity.lock().await;
        guard.data().cloned().unwrap_or_default()
    };

    let views: Vec<pricing::ElectricityView> = state
        .config
        .enabled_electricity_providers()
        .iter()
        .map(|provider| pricing::electricity_view(&data, provider, now, state.config.resolution))
        .collect();

    Json(views)
}

async fn gas_prices(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.clock.now();
    let data = {
        let guard = state.gas.lock().await;
        guard.data().cloned().unwrap_or_default()
    };

    let views: Vec<pricing::GasView> = state
        .config
        .enabled_gas_providers()
        .iter()
        .map(|provider| pricing::gas_view(&data, provider, now, None))
        .collect();

    Json(views)
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/prices/electricity", get(electricity_prices))
        .route("/api/prices/gas", get(gas_prices))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until the process stops
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| HeliosError::web(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .await
        .map_err(|e| HeliosError::web(e.to_string()))?;

    Ok(())
}
