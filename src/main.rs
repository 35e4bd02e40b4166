mod api;
mod config;
mod error;
mod models;
mod services;

use crate::api::AppState;
use crate::config::Config;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,spotify_search_proxy=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!(
        "Spotify client id present: {}, client secret present: {}",
        config.spotify_client_id.is_some(),
        config.spotify_client_secret.is_some()
    );

    if config.spotify_credentials().is_none() {
        tracing::warn!(
            "Spotify credentials missing; searches will fail until SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET are set"
        );
    }
    if config.token_cache {
        tracing::info!("Spotify access token caching enabled");
    }

    // Initialize services
    let app_state = Arc::new(AppState::from_config(&config)?);
    let app = api::app(app_state);

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
