// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // REQUEST METRICS
    // ============================================================================

    /// Total number of HTTP API requests
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("requests_total", "Total number of API requests"),
        &["method", "endpoint", "status_code"],
        REGISTRY
    ).unwrap();

    /// Caption generations by outcome
    pub static ref GENERATIONS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("caption_generations_total", "Caption generation calls by outcome"),
        &["outcome"], // outcome: cached, success, or an error kind
        REGISTRY
    ).unwrap();

    // ============================================================================
    // OPENAI API METRICS
    // ============================================================================

    /// Total OpenAI API calls
    pub static ref REMOTE_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("openai_api_calls_total", "Total OpenAI API calls"),
        &["capability", "status_code"],
        REGISTRY
    ).unwrap();

    /// OpenAI API call duration
    pub static ref REMOTE_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("openai_api_duration_seconds", "OpenAI API call duration")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["capability"],
        REGISTRY
    ).unwrap();

    /// Backoff retries after provider throttling
    pub static ref RETRIES_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("openai_retries_total", "Retries after HTTP 429 from the provider"),
        &["operation"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // THROTTLE METRICS
    // ============================================================================

    /// Requests rejected by the local rate limiter
    pub static ref RATE_LIMIT_REJECTIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("rate_limit_rejections_total", "Requests rejected by the local rate limiter"),
        &["rule"], // rule: minimum_spacing, window_quota
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["tier", "operation"], // tier: volatile, durable; operation: hit, miss, write, error
        REGISTRY
    ).unwrap();
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}
