//! Utility functions and helpers for captionmaption.
//!
//! This module provides cross-cutting concerns like structured logging,
//! secret sanitization, the client-side request throttle and retry logic
//! with backoff.
//!
//! # Submodules
//!
//! - `logging`: Tracing and logging initialization with security filters.
//! - `rate_limit`: Minimum spacing and per-window quota for outgoing requests.
//! - `retry`: Deterministic exponential backoff for provider throttling.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod rate_limit;
pub mod retry;

pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
