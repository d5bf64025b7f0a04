use airq_core::Config;
use airq_server::{listen_addr, serve, spawn_purge_task, AppState, PURGE_INTERVAL};
use anyhow::Result;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    airq_core::init()?;

    let (config, _) = Config::load_validated()?;
    let addr = listen_addr(&config.server.host, config.server.port)?;

    let state = AppState::from_config(&config)?;
    let purge = spawn_purge_task(
        Arc::clone(&state.cache),
        Arc::clone(&state.throttle),
        PURGE_INTERVAL,
    );

    tracing::info!("airq starting");

    serve(state, addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("Shutdown requested");
    })
    .await?;

    purge.abort();
    Ok(())
}
