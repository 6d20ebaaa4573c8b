// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    analysis_handler, cached_caption_handler, captions_handler, clear_cache_handler,
    health_handler, metrics_handler,
};
use super::middleware::{body_limit_layers, request_id_layers};
use crate::caption::CaptionOrchestrator;
use crate::config::AppConfig;
use crate::error::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Arc<CaptionOrchestrator>,
}

pub fn create_router(config: AppConfig, orchestrator: Arc<CaptionOrchestrator>) -> Result<Router> {
    let state = AppState {
        config,
        orchestrator,
    };

    let (set_request_id, propagate_request_id) = request_id_layers();
    let (default_body_limit, request_body_limit) = body_limit_layers();

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/captions", post(captions_handler))
        .route("/v1/captions/:image_id", get(cached_caption_handler))
        .route("/v1/analysis", post(analysis_handler))
        .route("/v1/cache", delete(clear_cache_handler))
        .layer(default_body_limit)
        .layer(request_body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
