use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{ChatRequest, DEFAULT_TIMEOUT};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MAX_TOKENS: u32 = 1000;
pub const DEFAULT_WELCOME: &str =
    "Hello! I'm your AI assistant. How can I help you today?";

pub const ENDPOINT_ENV: &str = "CHATLINE_ENDPOINT";
pub const MODEL_ENV: &str = "CHATLINE_MODEL";

/// User settings persisted as JSON. Every field is optional; missing values
/// fall back to the defaults above.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub welcome_message: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.model = Some(model.to_string());
        config.save()
    }

    /// Apply `CHATLINE_ENDPOINT` / `CHATLINE_MODEL` on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.is_empty() {
                self.endpoint = Some(endpoint);
            }
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.is_empty() {
                self.model = Some(model);
            }
        }
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Request timeout. A zero value would fail every request, so it is
    /// treated as unset.
    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn welcome_message(&self) -> &str {
        self.welcome_message.as_deref().unwrap_or(DEFAULT_WELCOME)
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }

    /// Directory holding the config file and the log file.
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatline"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

/// The model and temperature selectors of a session.
///
/// `None` means the selector is unavailable; defaults are resolved when a
/// request is built, so nothing optional ever reaches the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSettings {
    pub model: Option<String>,
    pub temperature: Option<f64>,
}

impl ChatSettings {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Selected temperature clamped to the accepted range. Non-finite values
    /// fall back to the default so the request body always carries a number.
    pub fn temperature(&self) -> f64 {
        match self.temperature {
            Some(t) if t.is_finite() => t.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE),
            _ => DEFAULT_TEMPERATURE,
        }
    }

    pub fn request_for(&self, message: String) -> ChatRequest {
        ChatRequest {
            message,
            model: self.model().to_string(),
            temperature: self.temperature(),
            max_tokens: MAX_TOKENS,
        }
    }
}
