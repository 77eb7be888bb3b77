//! Service configuration.
//!
//! Every section has a `Default`; [`AppConfig::from_env`] overlays the
//! `FLOWTUSK_*` environment variables on top of the defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::analysis::ScrapingConfig;

/// Environment variable for the HTTP port.
const PORT_ENV: &str = "FLOWTUSK_PORT";
/// Environment variable for the OpenAI-compatible API base URL.
const LLM_BASE_URL_ENV: &str = "FLOWTUSK_LLM_BASE_URL";
/// Environment variable for the completion model name.
const MODEL_ENV: &str = "FLOWTUSK_MODEL";
/// Environment variable holding the provider API key.
const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable for the memory database path.
const DB_PATH_ENV: &str = "FLOWTUSK_DB_PATH";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default OpenAI-compatible endpoint.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or missing.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// A URL could not be parsed.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Top-level service configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Completion provider settings.
    pub llm: LlmConfig,
    /// Memory storage settings.
    pub storage: StorageConfig,
    /// Website analysis settings.
    pub scraping: ScrapingConfig,
}

impl AppConfig {
    /// Build the configuration from defaults plus environment overrides.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = std::env::var(PORT_ENV).ok().and_then(|p| p.parse().ok()) {
            config.server.port = port;
        }
        if let Ok(base_url) = std::env::var(LLM_BASE_URL_ENV) {
            config.llm.base_url = base_url;
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            config.llm.model = model;
        }
        config.llm.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            config.storage.sqlite_path = PathBuf::from(path);
        }

        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any value is out of range or unparsable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".to_string()));
        }

        Url::parse(&self.llm.base_url)?;

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.storage.table.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.table must not be empty".to_string()));
        }

        if self.scraping.max_content_length == 0 {
            return Err(ConfigError::Invalid(
                "scraping.max_content_length must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Completion provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// API key; never serialized.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            request_timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Memory storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the `SQLite` database file.
    pub sqlite_path: PathBuf,
    /// Table holding conversation memories.
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("flowtusk_memory.sqlite3"),
            table: "conversation_memories".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = AppConfig::default();
        config.llm.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Url(_))));
    }

    #[test]
    fn test_rejects_empty_model() {
        let mut config = AppConfig::default();
        config.llm.model = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
