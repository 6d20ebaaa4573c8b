// Error types for captionmaption
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Which local throttling rule rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitRule {
    /// Less than the minimum spacing has passed since the last request.
    MinimumSpacing,
    /// The per-window request quota is used up.
    WindowQuota,
}

impl RateLimitRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitRule::MinimumSpacing => "minimum_spacing",
            RateLimitRule::WindowQuota => "window_quota",
        }
    }
}

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("{}", rate_limit_message(.rule))]
    RateLimitExceeded {
        rule: RateLimitRule,
        retry_after: Duration,
    },

    #[error("Remote service throttled the request: {0}")]
    RemoteThrottled(String),

    #[error("Max retries reached for rate limit after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("No elements detected in the image")]
    NoTagsDetected,

    #[error("Invalid response format from caption service: {0}")]
    MalformedResponse(String),

    #[error("A request is already in progress")]
    AlreadyInProgress,

    #[error("Caption service error: {0}")]
    NetworkOrServiceError(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn rate_limit_message(rule: &RateLimitRule) -> &'static str {
    match rule {
        RateLimitRule::MinimumSpacing => {
            "Please wait a moment before generating another caption"
        }
        RateLimitRule::WindowQuota => {
            "Rate limit reached. Please wait a minute before trying again"
        }
    }
}

impl CaptionError {
    /// Stable machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptionError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            CaptionError::RemoteThrottled(_) => "remote_throttled",
            CaptionError::RetriesExhausted { .. } => "retries_exhausted",
            CaptionError::NoTagsDetected => "no_tags_detected",
            CaptionError::MalformedResponse(_) => "malformed_response",
            CaptionError::AlreadyInProgress => "already_in_progress",
            CaptionError::NetworkOrServiceError(_) => "service_error",
            CaptionError::InvalidImage(_) | CaptionError::InvalidRequest(_) => {
                "invalid_request_error"
            }
            CaptionError::Config(_) | CaptionError::ConfigParsing(_) => "configuration_error",
            _ => "internal_error",
        }
    }

    /// HTTP status the error maps to when surfaced by the server.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CaptionError::RateLimitExceeded { .. }
            | CaptionError::RemoteThrottled(_)
            | CaptionError::RetriesExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            CaptionError::AlreadyInProgress => StatusCode::CONFLICT,
            CaptionError::NoTagsDetected => StatusCode::UNPROCESSABLE_ENTITY,
            CaptionError::InvalidImage(_) | CaptionError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            CaptionError::MalformedResponse(_) | CaptionError::NetworkOrServiceError(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Convert CaptionError to HTTP responses for Axum
impl IntoResponse for CaptionError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut body = json!({
            "type": "error",
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        });

        if let CaptionError::RateLimitExceeded { retry_after, .. } = &self {
            body["error"]["retry_after_ms"] = json!(retry_after.as_millis() as u64);
        }

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CaptionError>;
