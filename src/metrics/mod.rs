// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    REQUESTS_TOTAL,
    GENERATIONS_TOTAL,
    REMOTE_CALLS,
    REMOTE_DURATION,
    RETRIES_TOTAL,
    RATE_LIMIT_REJECTIONS,
    CACHE_OPERATIONS,
};

/// Helper to record HTTP request metrics
pub fn record_request(method: &str, endpoint: &str, status_code: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status_code.to_string()])
        .inc();
}

/// Helper to record the outcome of a `generate` call
pub fn record_generation(outcome: &str) {
    GENERATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Helper to record OpenAI API call metrics
pub fn record_remote_call(capability: &str, status_code: u16, duration_secs: f64) {
    REMOTE_CALLS
        .with_label_values(&[capability, &status_code.to_string()])
        .inc();

    REMOTE_DURATION
        .with_label_values(&[capability])
        .observe(duration_secs);
}

pub fn record_retry(operation: &str) {
    RETRIES_TOTAL.with_label_values(&[operation]).inc();
}

pub fn record_rate_limit_rejection(rule: &str) {
    RATE_LIMIT_REJECTIONS.with_label_values(&[rule]).inc();
}

/// Helper to record cache operations on either tier
pub fn record_cache_operation(tier: &str, operation: &str) {
    CACHE_OPERATIONS.with_label_values(&[tier, operation]).inc();
}
