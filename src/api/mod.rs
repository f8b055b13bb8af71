pub mod models;
pub mod routes;

use crate::db::Database;
use crate::engine::ScanEngine;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    /// None when no store was configured or the connection failed at
    /// startup; every data-dependent endpoint then answers 500. The flag is
    /// decided once, not retried per request.
    pub db: Option<Database>,
    pub engine: Arc<dyn ScanEngine>,
}

pub fn build_router(state: AppState) -> Router {
    // The dashboard frontend is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", axum::routing::get(routes::health::health_check))
        .route("/scan", axum::routing::post(routes::scans::start_scan))
        .route(
            "/scan-results/{scan_id}",
            axum::routing::get(routes::scans::get_scan_results),
        )
        .route(
            "/historical-scans",
            axum::routing::get(routes::scans::get_historical_scans),
        )
        .layer(cors)
        .with_state(state)
}
