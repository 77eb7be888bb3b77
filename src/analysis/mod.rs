//! Website analysis: fetch a page, extract its metadata and main text.
//!
//! - HTML fetching with rotating user agents
//! - Title, description, hero image, favicon and language extraction
//! - Main text extraction bounded for prompting
//! - Caching with TTL

pub mod cache;
pub mod config;
pub mod content;
pub mod error;
#[cfg(test)]
pub(crate) mod fixture;
pub mod types;

pub use cache::AnalysisCache;
pub use config::{CacheConfig, ScrapingConfig};
pub use error::{AnalysisError, AnalysisResult};
pub use types::{SiteMetadata, WebsiteAnalysis};

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info};

/// Boxed future returned by analyzers.
pub type AnalysisFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Anything able to turn a URL into a [`WebsiteAnalysis`].
pub trait Analyzer: Send + Sync {
    /// Analyze the page at `url`.
    fn analyze<'a>(&'a self, url: &'a str) -> AnalysisFuture<'a, AnalysisResult<WebsiteAnalysis>>;
}

/// Network-backed analyzer with a TTL cache.
pub struct WebsiteAnalyzer {
    config: ScrapingConfig,
    cache: AnalysisCache,
    client: reqwest::Client,
}

impl WebsiteAnalyzer {
    /// Create an analyzer with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ScrapingConfig) -> AnalysisResult<Self> {
        let client = Self::build_client(&config)?;
        let cache = AnalysisCache::new(config.cache.clone());

        Ok(Self {
            config,
            cache,
            client,
        })
    }

    fn build_client(config: &ScrapingConfig) -> AnalysisResult<reqwest::Client> {
        use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&config.random_user_agent()) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))
    }

    async fn analyze_uncached(&self, url: &str) -> AnalysisResult<WebsiteAnalysis> {
        let parsed = content::parse_site_url(url)?;
        let key = parsed.to_string();

        if let Some(cached) = self.cache.get(&key) {
            debug!("Cache hit for URL: {key}");
            return Ok(cached);
        }

        let started = std::time::Instant::now();
        let analysis = content::fetch_page(&self.client, &parsed, &self.config).await?;
        info!(
            "Analyzed {} in {}ms ({} words)",
            analysis.final_url,
            started.elapsed().as_millis(),
            analysis.word_count()
        );

        self.cache.insert(&key, &analysis);
        Ok(analysis)
    }

    /// Clear the analysis cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Analyzer for WebsiteAnalyzer {
    fn analyze<'a>(&'a self, url: &'a str) -> AnalysisFuture<'a, AnalysisResult<WebsiteAnalysis>> {
        Box::pin(self.analyze_uncached(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_creation() {
        assert!(WebsiteAnalyzer::new(ScrapingConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_rejects_non_http_urls_before_fetching() {
        let analyzer = WebsiteAnalyzer::new(ScrapingConfig::default()).unwrap();
        let result = analyzer.analyze("mailto:sales@acme.io").await;
        assert!(matches!(result, Err(AnalysisError::UnsupportedScheme(_))));
    }
}
