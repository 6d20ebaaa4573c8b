//! Axum-based HTTP server for captionmaption.
//!
//! Exposes one session's `CaptionOrchestrator` to a browser UI: caption
//! generation, durable lookups by image id, volatile cache clearing, health
//! and Prometheus metrics.
//!
//! # Components
//!
//! - `handlers`: Implementation of individual API endpoints.
//! - `middleware`: Request ID tracking layers.
//! - `routes`: The router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::CaptionRequest;
pub use routes::{create_router, AppState};
