//! Aviary live update server binary.
//!
//! Entry point for the WebSocket server.

use aviary_api::{AppState, LiveHub, Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aviary_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let state = AppState::new(LiveHub::new(config.outbound_buffer));

    tracing::info!(
        "Starting Aviary live server on {}:{} (outbound buffer {})",
        config.host,
        config.port,
        config.outbound_buffer
    );

    let server = Server::new(config, state);
    server.run().await?;

    Ok(())
}
