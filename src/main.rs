use mcp_hub::clients::SubsystemClients;
use mcp_hub::{dashboard, init_with_config_file, logging, Hub, Result};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // a blank path resolves from MCP_HUB_CONFIG_FILE_PATH, then the defaults
    let config_path = std::env::args().nth(1).unwrap_or_default();
    let config = init_with_config_file(&config_path)?;
    let addr: SocketAddr = config.config.dashboard.addr.parse()?;

    let hub = Arc::new(Hub::new(config)?);
    let clients = SubsystemClients::from_config(&hub)?;
    clients.register_tools(&hub)?;
    logging::info!(
        "[Main] {} external systems wired: {:?}",
        clients.systems().len(),
        clients.systems()
    );
    hub.start()?;

    let served = dashboard::serve(Arc::clone(&hub), addr, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            logging::error!("[Main] Failed to listen for the shutdown signal: {:?}", err);
        }
        logging::info!("[Main] Shutting down");
    })
    .await;
    hub.shutdown().await;
    served
}
