//! Enever price feed API integration
//!
//! Three feeds are exposed by the remote API: electricity prices for today
//! and tomorrow, and gas prices for today. The client lives behind the
//! `EneverApi` trait so the coordinators can be driven with a scripted
//! implementation in tests.

pub mod client;
pub mod types;

pub use client::{EneverApi, EneverClient};
pub use types::{FeedBatch, PriceQuote};
