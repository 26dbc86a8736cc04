//! `waypost serve` — start the HTTP gateway.

use tracing::info;
use waypost_config::AppConfig;

pub async fn run(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;

    if let Some(port) = port {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        tracing::warn!(
            "No API key configured — set WAYPOST_API_KEY or add one to waypost.toml. \
             Provider calls will fail until one is set."
        );
    }

    info!(
        host = %config.gateway.host,
        port = config.gateway.port,
        provider = %config.default_provider,
        "Starting Waypost gateway"
    );

    waypost_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("gateway failed: {e}"))
}
