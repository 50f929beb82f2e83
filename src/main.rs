#![recursion_limit = "256"]

mod config;
mod db;
mod frame;
mod routes;
mod services;
mod state;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::ServerConfig::from_env()?;

    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    let repo = Arc::new(services::store::PgMessageRepo::new(pool));
    let state = state::AppState::new(repo, config.feed_history, config.ws_channel_capacity);

    let loaded = services::feed::hydrate(&state).await?;
    info!(loaded, history = config.feed_history, "feed history loaded");

    let app = match routes::leptos_app(state.clone()) {
        Ok(app) => app,
        Err(e) => {
            warn!(error = %e, "leptos app unavailable; serving API routes only");
            routes::api_routes(state)
        }
    };

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!(port = config.port, "mandelbrot-web listening");
    axum::serve(listener, app).await?;
    Ok(())
}
