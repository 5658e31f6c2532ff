pub mod auth;
pub mod rest;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use lotline_import::{BatchCoordinator, ContinuationDispatcher};

pub struct AppState {
    pub coordinator: Arc<BatchCoordinator>,
    /// Configured on time-boxed deployments; when absent, continuation runs
    /// as an in-process driver loop.
    pub dispatcher: Option<Arc<dyn ContinuationDispatcher>>,
    pub shared_secret: Option<String>,
    pub batch_size: i64,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Import API
        .route("/api/import-data", post(rest::start_import))
        .route("/api/trigger-import", post(rest::trigger_import))
        .route("/api/import-progress", get(rest::import_progress))
        .route("/api/import", post(rest::run_full_import))
        .with_state(state)
}
