// HTTP middleware
// Author: kelexine (https://github.com/kelexine)

use axum::extract::DefaultBodyLimit;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

// 20 MiB decoded image is ~27 MiB of base64 plus the JSON envelope
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// `x-request-id` generation and propagation
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
        PropagateRequestIdLayer::x_request_id(),
    )
}

/// Replaces axum's 2 MiB extractor default with a limit sized for inline images
pub fn body_limit_layers() -> (DefaultBodyLimit, RequestBodyLimitLayer) {
    (
        DefaultBodyLimit::disable(),
        RequestBodyLimitLayer::new(MAX_BODY_BYTES),
    )
}
