//! Service runtime
//!
//! Wires configuration into the client, the two update coordinators and the
//! request counter, validates the API token at startup, then drives each
//! coordinator on its own variable interval until shutdown. Ticks of one
//! coordinator never overlap: each coordinator runs in a single task that
//! sleeps, ticks to completion, and re-reads the interval the tick chose.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::coordinator::{ElectricityFeed, Feed, GasFeed, RequestObserver, UpdateCoordinator};
use crate::enever::{EneverApi, EneverClient};
use crate::error::{HeliosError, Result};
use crate::logging::get_logger;
use crate::pricing::ApiRequestCounter;
use crate::store::CacheStore;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Owns the coordinators and their driving tasks
pub struct PriceService {
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
    api: Arc<dyn EneverApi>,
    electricity: Arc<Mutex<UpdateCoordinator>>,
    gas: Arc<Mutex<UpdateCoordinator>>,
    counter: Option<Arc<ApiRequestCounter>>,
    shutdown_tx: watch::Sender<bool>,
    logger: crate::logging::StructuredLogger,
}

impl PriceService {
    /// Build the service from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let tz = config.timezone()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(tz));
        let api: Arc<dyn EneverApi> = Arc::new(EneverClient::new(&config.api, tz)?);

        let gas_feed = GasFeed::new(api.clone());
        let gas_store = CacheStore::new(&config.state_dir, &gas_feed.storage_key());
        let mut gas = UpdateCoordinator::new(Box::new(gas_feed), gas_store, clock.clone());

        let electricity_feed = ElectricityFeed::new(api.clone(), config.resolution, tz);
        let electricity_store = CacheStore::new(&config.state_dir, &electricity_feed.storage_key());
        let mut electricity =
            UpdateCoordinator::new(Box::new(electricity_feed), electricity_store, clock.clone());

        let counter = if config.providers.api_counter_enabled {
            let counter = Arc::new(ApiRequestCounter::with_state_file(
                clock.clone(),
                &config.state_dir,
            ));
            let observer: Arc<dyn RequestObserver> = counter.clone();
            gas.attach(&observer);
            electricity.attach(&observer);
            Some(counter)
        } else {
            None
        };

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            clock,
            api,
            electricity: Arc::new(Mutex::new(electricity)),
            gas: Arc::new(Mutex::new(gas)),
            counter,
            shutdown_tx,
            logger: get_logger("service"),
        })
    }

    /// The resolved configuration
    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// The service clock
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// The electricity coordinator handle
    pub fn electricity(&self) -> Arc<Mutex<UpdateCoordinator>> {
        self.electricity.clone()
    }

    /// The gas coordinator handle
    pub fn gas(&self) -> Arc<Mutex<UpdateCoordinator>> {
        self.gas.clone()
    }

    /// The request counter, if enabled
    pub fn counter(&self) -> Option<Arc<ApiRequestCounter>> {
        self.counter.clone()
    }

    /// Signal the coordinator tasks to stop after their current tick
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Validate the token once so an operator gets immediate feedback on a
    /// bad credential before any coordinator runs.
    ///
    /// Costs one request token, which is why it is counted and can be
    /// disabled in the configuration.
    async fn validate_token_on_startup(&self) -> Result<()> {
        if let Some(counter) = &self.counter {
            counter.count_api_request();
        }

        match self.api.validate_token().await {
            Ok(()) => {
                self.logger.info("API token validated");
                Ok(())
            }
            Err(e @ HeliosError::Auth { .. }) => {
                self.logger
                    .error(&format!("API token rejected at startup: {}", e));
                Err(e)
            }
            Err(e) => {
                // Transient; the tick path retries through normal gating
                self.logger
                    .warn(&format!("Token validation inconclusive, continuing: {}", e));
                Ok(())
            }
        }
    }

    /// Run both coordinators until shutdown
    pub async fn run(&self) -> Result<()> {
        self.logger.info("Starting price feed coordinators");

        if self.config.api.validate_on_startup {
            self.validate_token_on_startup().await?;
        }

        let gas_task = tokio::spawn(run_coordinator(
            self.gas.clone(),
            self.shutdown_tx.subscribe(),
        ));
        let electricity_task = tokio::spawn(run_coordinator(
            self.electricity.clone(),
            self.shutdown_tx.subscribe(),
        ));

        let _ = tokio::join!(gas_task, electricity_task);
        self.logger.info("Coordinators stopped");
        Ok(())
    }
}

// One driving loop per coordinator; ticks run to completion before the next
// sleep starts, so a coordinator never observes overlapping ticks.
async fn run_coordinator(
    coordinator: Arc<Mutex<UpdateCoordinator>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let delay = {
            let guard = coordinator.lock().await;
            guard.update_interval()
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                let mut guard = coordinator.lock().await;
                guard.tick().await;
            }
            _ = shutdown.changed() => break,
        }
    }
}
