// src/lib.rs

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::holder_activity::HolderActivityService;

#[derive(Clone)]
pub struct AppState {
    pub holder_activity: HolderActivityService,
}

pub mod config;
pub mod error;

pub mod models {
    pub mod activity;
    pub mod chain;
    pub mod report;
    pub mod window;
}

pub mod services {
    pub mod activity_scanner;
    pub mod aggregation_engine;
    pub mod amount_format;
    pub mod holder_activity;
    pub mod ledger_client;
    pub mod report_merger;
    pub mod snapshot_loader;
    pub mod window;
}

pub mod handlers {
    pub mod holder_activity;
}

/// HTTP routes with permissive CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::holder_activity::health))
        .route(
            "/api/holders/{chain}/{token}/activity",
            get(handlers::holder_activity::get_holder_activity),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
