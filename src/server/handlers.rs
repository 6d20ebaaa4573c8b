// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::cache::CacheStats;
use crate::error::CaptionError;
use crate::models::{CacheEntry, CaptionOutcome, GenerationOptions};
use crate::vision::ImagePayload;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, error, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

/// Body of `POST /v1/captions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    /// Base64 image, with or without a `data:` prefix.
    pub image: String,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub options: GenerationOptions,
}

/// Body of `POST /v1/analysis`.
#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    /// Base64 image, with or without a `data:` prefix.
    pub image: String,
    /// Replaces the default "describe in detail" instruction.
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub cleared: bool,
    pub stats: CacheStats,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    // Without a key every generation fails remotely
    let key_check = if state.config.require_api_key().is_ok() {
        HealthCheck {
            status: "ok".to_string(),
            message: "API key configured".to_string(),
        }
    } else {
        overall_status = HealthStatus::Unhealthy;
        HealthCheck {
            status: "error".to_string(),
            message: "No OpenAI API key configured".to_string(),
        }
    };
    checks.insert("api_key".to_string(), key_check);

    let limiter = state.orchestrator.rate_limit_status();
    let max_requests = state.config.rate_limit.max_requests_per_window;
    let limiter_check = if limiter.requests_in_window >= max_requests {
        if matches!(overall_status, HealthStatus::Healthy) {
            overall_status = HealthStatus::Degraded;
        }
        HealthCheck {
            status: "warning".to_string(),
            message: format!(
                "Request quota used up ({}/{})",
                limiter.requests_in_window, max_requests
            ),
        }
    } else {
        HealthCheck {
            status: "ok".to_string(),
            message: format!(
                "{}/{} requests in current window",
                limiter.requests_in_window, max_requests
            ),
        }
    };
    checks.insert("rate_limit".to_string(), limiter_check);

    checks.insert(
        "orchestrator".to_string(),
        HealthCheck {
            status: "ok".to_string(),
            message: format!("State: {}", state.orchestrator.state().as_str()),
        },
    );

    checks.insert(
        "configuration".to_string(),
        HealthCheck {
            status: "ok".to_string(),
            message: format!("API base: {}", state.config.openai.api_base_url),
        },
    );

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [("Content-Type", "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

/// Handler for `POST /v1/captions`
pub async fn captions_handler(
    State(state): State<AppState>,
    body: String, // Raw JSON so deserialization errors become our own error body
) -> Result<Json<CaptionOutcome>, CaptionError> {
    let req: CaptionRequest = serde_json::from_str(&body).map_err(|e| {
        error!("Failed to deserialize caption request: {}", e);
        crate::metrics::record_request("POST", "/v1/captions", 400);
        CaptionError::InvalidRequest(format!("JSON deserialization error: {}", e))
    })?;

    info!(
        "Received caption request: image_id={:?}, mode={:?}, tone={:?}",
        req.image_id, req.options.mode, req.options.tone
    );

    let image = ImagePayload::from_base64(req.image);
    debug!("Image payload: ~{} bytes", image.decoded_len());

    let result = state
        .orchestrator
        .generate(&image, &req.options, req.image_id.as_deref())
        .await;

    match result {
        Ok(outcome) => {
            crate::metrics::record_request("POST", "/v1/captions", 200);
            Ok(Json(outcome))
        }
        Err(e) => {
            let status = e.status_code();
            crate::metrics::record_request("POST", "/v1/captions", status.as_u16());
            Err(e)
        }
    }
}

/// Handler for `POST /v1/analysis` (free-form description, never cached)
pub async fn analysis_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<AnalysisResponse>, CaptionError> {
    let req: AnalysisRequest = serde_json::from_str(&body).map_err(|e| {
        error!("Failed to deserialize analysis request: {}", e);
        crate::metrics::record_request("POST", "/v1/analysis", 400);
        CaptionError::InvalidRequest(format!("JSON deserialization error: {}", e))
    })?;

    let image = ImagePayload::from_base64(req.image);
    debug!(
        "Analysis request: ~{} bytes, custom prompt: {}",
        image.decoded_len(),
        req.prompt.is_some()
    );

    match state.orchestrator.describe(&image, req.prompt.as_deref()).await {
        Ok(description) => {
            crate::metrics::record_request("POST", "/v1/analysis", 200);
            Ok(Json(AnalysisResponse { description }))
        }
        Err(e) => {
            crate::metrics::record_request("POST", "/v1/analysis", e.status_code().as_u16());
            Err(e)
        }
    }
}

/// Handler for `GET /v1/captions/:image_id` (durable lookup)
pub async fn cached_caption_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Response {
    match state.orchestrator.cached_analysis(&image_id) {
        Some(entry) => {
            crate::metrics::record_request("GET", "/v1/captions", 200);
            Json::<CacheEntry>(entry).into_response()
        }
        None => {
            crate::metrics::record_request("GET", "/v1/captions", 404);
            (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "type": "error",
                    "error": {
                        "type": "not_found",
                        "message": format!("No stored analysis for image: {}", image_id),
                    }
                })),
            )
                .into_response()
        }
    }
}

/// Handler for `DELETE /v1/cache` (volatile tier only)
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    state.orchestrator.clear_cache();
    info!("Volatile cache cleared");
    crate::metrics::record_request("DELETE", "/v1/cache", 200);

    Json(ClearCacheResponse {
        cleared: true,
        stats: state.orchestrator.cache_stats(),
    })
}
