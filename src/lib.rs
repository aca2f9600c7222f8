//! # Helios - Enever energy price feed poller
//!
//! A long-lived service that polls the enever.nl energy price feeds,
//! caches the daily electricity and gas price curves on disk, and exposes
//! the freshest known price per provider over a small HTTP API.
//!
//! The Enever API has a tight monthly token quota, so the interesting part
//! is not the fetching but the scheduling: each feed-pair is owned by an
//! update coordinator that decides per tick whether the "today" and
//! "tomorrow" curves need refreshing, throttled per feed and capped per
//! day, and that survives restarts by persisting its state between ticks.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration and validation
//! - `logging`: structured logging and tracing
//! - `clock`: injectable wall clock in the configured timezone
//! - `providers`: the fixed energy provider registry
//! - `enever`: API client, feed parsing and failure classification
//! - `coordinator`: the update scheduling core, one instance per feed-pair
//! - `store`: persisted per-feed cache files
//! - `pricing`: derived per-provider price views and the request counter
//! - `service`: runtime wiring and the per-coordinator driving tasks
//! - `web`: read-only HTTP API

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod enever;
pub mod error;
pub mod logging;
pub mod pricing;
pub mod providers;
pub mod service;
pub mod store;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{HeliosError, Result};
pub use service::PriceService;
