use std::sync::Arc;

use obsidian::{Server, ServerConfig};
use obsidian_mc::default_registry;
use tracing::info;

/// Obsidian: network core of a Minecraft-compatible game server
///
/// Speaks the handshake, status and offline login exchanges for the 1.16
/// protocol family and keeps logged-in sessions alive until shutdown.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let registry = Arc::new(default_registry()?);
    info!(versions = ?registry.versions(), "Packet registry ready");

    let server = Server::new(config, registry);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    server.stop().await?;
    Ok(())
}
