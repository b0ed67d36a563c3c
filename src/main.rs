use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use holder_activity::{
    AppState, build_router,
    config::AppConfig,
    services::{holder_activity::HolderActivityService, ledger_client::SimLedgerClient},
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,holder_activity=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().expect("Invalid configuration");

    tracing::info!(
        "Using ledger data service at {} ({} workers, timeout {:?})",
        config.ledger_api_base_url,
        config.scan.workers,
        config.ledger_timeout
    );

    let ledger = SimLedgerClient::new(
        config.ledger_api_base_url.clone(),
        config.ledger_api_key.clone(),
        config.ledger_timeout,
        config.token_info_cache_ttl,
    )
    .expect("Failed to build ledger client");

    let state = AppState {
        holder_activity: HolderActivityService::new(Arc::new(ledger), config.scan),
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
