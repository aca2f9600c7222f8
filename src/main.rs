use anyhow::Result;
use helios::config::Config;
use helios::service::PriceService;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    helios::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Helios price feed poller starting up");

    let service = Arc::new(
        PriceService::new(config).map_err(|e| anyhow::anyhow!("Failed to create service: {}", e))?,
    );

    // Serve the read-only API next to the coordinators
    #[cfg(feature = "web")]
    let web_task = {
        let state = helios::web::AppState::from_service(&service);
        let config = service.config();
        tokio::spawn(async move {
            if let Err(e) = helios::web::serve(state, &config.web.host, config.web.port).await {
                error!("Web server error: {}", e);
            }
        })
    };

    // Let the coordinators finish their current tick on Ctrl-C
    let signal_service = service.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_service.shutdown();
        }
    });

    let result = service.run().await;

    #[cfg(feature = "web")]
    web_task.abort();

    match result {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Service failed with error: {}", e);
            Err(anyhow::anyhow!("Service error: {}", e))
        }
    }
}
