//! Structured logging and secret-redaction utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! API keys from leaking into logs when provider error bodies are echoed.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    SANITIZE_ENABLED.store(config.sanitize_tokens, Ordering::Relaxed);

    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

static SANITIZE_ENABLED: AtomicBool = AtomicBool::new(true);

// OpenAI secret keys: "sk-..." and project keys "sk-proj-..."
static SECRET_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sk-[A-Za-z0-9_\-]{8,}").expect("valid secret key pattern"));

static BEARER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bearer\s+[A-Za-z0-9_\-\.]+").expect("valid bearer pattern"));

/// Sanitizes sensitive information from log messages.
///
/// OpenAI echoes a masked key in some `invalid_api_key` responses and an
/// `Authorization` header can end up in transport errors; both are replaced
/// with a `\[REDACTED\]` placeholder. A no-op when `logging.sanitize_tokens`
/// is off.
pub fn sanitize(input: &str) -> String {
    if !SANITIZE_ENABLED.load(Ordering::Relaxed) {
        return input.to_string();
    }
    let redacted = SECRET_KEY.replace_all(input, "[REDACTED_API_KEY]");
    BEARER
        .replace_all(&redacted, "Bearer [REDACTED_TOKEN]")
        .into_owned()
}

/// Truncates a provider payload for log output without splitting a character.
pub fn preview(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
