// Startup configuration. The only secret is the Gemini API key; when it is
// missing the process still starts, but chat responses are disabled and the UI
// shows a warning banner instead.

use thiserror::Error;

use crate::constants::{GEMINI_API_BASE, GEMINI_MODEL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

impl Config {
    pub fn new(api_key: String, model: String, api_base: String) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key,
            model,
            api_base,
        })
    }

    /// Read configuration from the environment (a `.env` file is loaded by
    /// `main` before this runs).
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        Self::new(api_key, GEMINI_MODEL.clone(), GEMINI_API_BASE.clone())
    }
}
