//! Configuration for website analysis.

use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Settings for the page fetcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// User agents to rotate.
    pub user_agents: Vec<String>,
    /// Analysis cache settings.
    pub cache: CacheConfig,
    /// Maximum page size to download (bytes).
    pub max_content_length: usize,
    /// Maximum number of characters of page text kept for prompting.
    pub max_text_chars: usize,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(10),
            user_agents: default_user_agents(),
            cache: CacheConfig::default(),
            max_content_length: 5 * 1024 * 1024, // 5 MB
            max_text_chars: 12_000,
        }
    }
}

impl ScrapingConfig {
    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Get a random user agent from the rotation list.
    #[must_use]
    pub fn random_user_agent(&self) -> String {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string())
    }
}

/// Analysis cache settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Time to live of an analysis (seconds).
    pub ttl_seconds: u64,
    /// Maximum number of cached analyses.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600, // 1 hour
            max_entries: 256,
        }
    }
}

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_user_agents() -> Vec<String> {
    vec![
        FALLBACK_USER_AGENT.to_string(),
        // Chrome on macOS
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        // Firefox on Windows
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
        // Safari on macOS
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".to_string(),
        // Firefox on Linux
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
    ]
}

/// Durations as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScrapingConfig::default();
        assert!(config.cache.enabled);
        assert_eq!(config.max_text_chars, 12_000);
        assert!(config.max_content_length > 0);
    }

    #[test]
    fn test_random_user_agent() {
        let config = ScrapingConfig::default();
        assert!(config.random_user_agent().contains("Mozilla"));

        let empty = ScrapingConfig {
            user_agents: Vec::new(),
            ..ScrapingConfig::default()
        };
        assert_eq!(empty.random_user_agent(), FALLBACK_USER_AGENT);
    }

    #[test]
    fn test_timeouts_serialize_as_seconds() {
        let config = ScrapingConfig::default().with_timeout(Duration::from_secs(45));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["request_timeout"], 45);

        let back: ScrapingConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.request_timeout, Duration::from_secs(45));
    }
}
