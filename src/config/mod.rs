// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{CaptionError, Result};
use config::{Config, Environment, File};
use std::path::PathBuf;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest)
    /// 2. Config file
    /// 3. Defaults (lowest)
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // Load from config file if it exists
            .add_source(
                File::with_name(&Self::default_config_path())
                    .required(false)
            )
            // Override with environment variables, e.g. CAPTIONMAPTION__OPENAI__API_KEY
            .add_source(
                Environment::with_prefix("CAPTIONMAPTION")
                    .prefix_separator("__")
                    .separator("__")
            )
            .build()
            .map_err(|e| CaptionError::Config(e.to_string()))?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| CaptionError::Config(e.to_string()))?;

        if app_config.openai.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                app_config.openai.api_key = key;
            }
        }

        Ok(app_config)
    }

    /// Fails unless an API key is available for remote calls.
    pub fn require_api_key(&self) -> Result<&str> {
        if self.openai.api_key.trim().is_empty() {
            return Err(CaptionError::Config(
                "no OpenAI API key; set openai.api_key or OPENAI_API_KEY".to_string(),
            ));
        }
        Ok(&self.openai.api_key)
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".captionmaption")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
