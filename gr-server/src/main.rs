//! GridReplay Server
//!
//! Loads a recorded session and serves the replay command API and render stream

use anyhow::Result;
use clap::Parser;
use gr_server::replay::ReplayCommand;
use gr_server::{api, config::ServerConfig, state::AppState};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    info!("Starting GridReplay Server");

    let state = AppState::new(config.clone());

    match config.startup_source() {
        Some(source) => match state.load_replay(source).await {
            Ok(_) if config.autoplay => {
                state.command(ReplayCommand::Play).await?;
            }
            Ok(_) => {}
            Err(e) => {
                error!("{}", e);
                *state.load_error.write().await = Some(e.to_string());
            }
        },
        None => warn!("No session loaded; upload one or POST /api/replay/demo"),
    }

    let app = api::create_router(state.clone());

    info!("Server listening on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
