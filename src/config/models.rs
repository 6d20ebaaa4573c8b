//! Configuration data structures for captionmaption.
//!
//! This module defines the schema for the application settings: the HTTP
//! surface, the OpenAI connection, the local request throttle, the retry
//! policy, the response cache and logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream OpenAI API settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Client-side request throttle.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Backoff policy for provider throttling.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Settings for the upstream OpenAI connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL for the OpenAI REST API.
    /// Default: `https://api.openai.com/v1`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// API key. Falls back to `OPENAI_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,

    /// Vision model used for the image analysis call.
    /// Default: `gpt-4o-mini`
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,

    /// Chat model used for caption generation.
    /// Default: `gpt-3.5-turbo`
    #[serde(default = "default_caption_model")]
    pub caption_model: String,

    /// Vision model used for free-form detailed descriptions.
    /// Default: `gpt-4o-mini`
    #[serde(default = "default_analysis_model")]
    pub description_model: String,

    /// Image detail level sent with the analysis request (`low`, `high`, `auto`).
    /// Default: `low`
    #[serde(default = "default_image_detail")]
    pub image_detail: String,

    /// Default: `300`
    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: u32,

    /// Default: `500`
    #[serde(default = "default_description_max_tokens")]
    pub description_max_tokens: u32,

    /// Default: `1000`
    #[serde(default = "default_caption_max_tokens")]
    pub caption_max_tokens: u32,

    /// Sampling temperature for caption generation.
    /// Default: `0.9`
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Connection and request timeout in seconds.
    /// Default: `60`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Client-side throttle applied before any paid API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Minimum gap between two requests, in milliseconds.
    /// Default: `1000`
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,

    /// Length of the rolling window, in seconds.
    /// Default: `60`
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Requests allowed per window.
    /// Default: `3`
    #[serde(default = "default_max_requests_per_window")]
    pub max_requests_per_window: u32,
}

/// Retry behaviour when the provider answers with HTTP 429.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    /// Default: `5`
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first throttled attempt, doubled on each subsequent one.
    /// Default: `1000`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay.
    /// Default: `32000`
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Settings for the two-tier response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether the durable tier is written to disk. When `false` the durable
    /// tier lives in memory for the lifetime of the process.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Directory holding durable cache entries.
    /// Default: `~/.captionmaption/cache`
    #[serde(default = "default_cache_directory")]
    pub directory: String,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to mask API keys in logged provider responses.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub sanitize_tokens: bool,
}

impl RateLimitConfig {
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: String::new(),
            analysis_model: default_analysis_model(),
            caption_model: default_caption_model(),
            description_model: default_analysis_model(),
            image_detail: default_image_detail(),
            analysis_max_tokens: default_analysis_max_tokens(),
            description_max_tokens: default_description_max_tokens(),
            caption_max_tokens: default_caption_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: default_min_spacing_ms(),
            window_seconds: default_window_seconds(),
            max_requests_per_window: default_max_requests_per_window(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            persist: true,
            directory: default_cache_directory(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            sanitize_tokens: true,
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_analysis_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_caption_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_image_detail() -> String {
    "low".to_string()
}

fn default_analysis_max_tokens() -> u32 {
    300
}

fn default_description_max_tokens() -> u32 {
    500
}

fn default_caption_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.9
}

fn default_timeout() -> u64 {
    60
}

fn default_min_spacing_ms() -> u64 {
    1000
}

fn default_window_seconds() -> u64 {
    60
}

fn default_max_requests_per_window() -> u32 {
    3
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    32_000
}

fn default_true() -> bool {
    true
}

fn default_cache_directory() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".captionmaption")
        .join("cache")
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
