//! Error types for website analysis.

use thiserror::Error;

/// Errors that can occur while fetching or analyzing a website.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Only `http` and `https` pages can be analyzed.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The site answered with a non-success status.
    #[error("Website responded with HTTP {0}")]
    HttpStatus(u16),

    /// Content type not supported.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Page body exceeds the configured limit.
    #[error("Content too large: {0} bytes")]
    TooLarge(u64),
}

/// Result alias for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AnalysisError::HttpStatus(404).to_string(),
            "Website responded with HTTP 404"
        );
        let err: AnalysisError = url::Url::parse("not a url").unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid URL"));
    }
}
