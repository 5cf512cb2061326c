// Door State API server
// Decision: One shared HMAC key loaded at startup; rotating it requires a restart
// Decision: In-memory storage when DATABASE_URL is unset (dev mode)

use anyhow::{Context, Result};
use doorstate_api::{build_app, storage, DoorService, ServerConfig};
use doorstate_core::{History, SigningKey, SubmissionProtocol};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doorstate_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("doorstate-api starting...");

    let config = ServerConfig::from_env().context("Invalid configuration")?;

    let key = SigningKey::from_file(&config.key_file).context("Failed to load signing key")?;
    tracing::info!(path = %config.key_file.display(), "Signing key loaded");

    tracing::info!(
        max_events = config.history_window.max_events,
        max_age_days = config.history_window.max_age.num_days(),
        max_clock_skew_secs = ?config.submission_policy.max_clock_skew.map(|d| d.num_seconds()),
        utc_offset = %config.utc_offset,
        "Submission and history policy configured"
    );

    let store = storage::open_history_store(&config).await?;

    let service = Arc::new(DoorService::new(
        SubmissionProtocol::new(Arc::new(key), config.submission_policy),
        History::new(store, config.history_window),
        config.utc_offset,
    ));

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }
    if config.cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS origins configured");
    }

    let app = build_app(service, &config.api_prefix, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
