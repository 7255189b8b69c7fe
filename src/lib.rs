pub mod error;
pub mod modules;
pub mod proxy; // Gateway module

use std::sync::Arc;
use tracing::{info, warn};

use proxy::{AxumServer, GatewayConfig};

/// Load configuration, start the gateway and serve until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    // Optional .env next to the binary
    let _ = dotenvy::dotenv();

    let config = GatewayConfig::from_env();
    modules::logger::init_logger(config.log_dir.as_deref());

    for name in config.missing_credentials() {
        warn!("{} not set; the proxy that needs it will answer 500", name);
    }
    info!(
        "Production origin {}, {} allowed origins, suffixes {:?}",
        config.origins.production_origin,
        config.origins.allowed.len(),
        config.origins.suffixes
    );

    let (server, handle) = AxumServer::start(Arc::new(config))
        .await
        .map_err(anyhow::Error::msg)?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    server.stop();
    handle.await?;

    Ok(())
}
