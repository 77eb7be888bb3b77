//! Types produced by website analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata extracted from a page head.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    /// Page title (OpenGraph title, `<title>`, first `<h1>`, or the host name).
    pub title: String,
    /// Meta or OpenGraph description.
    pub description: Option<String>,
    /// Absolute URL of the share image.
    pub hero_image: Option<String>,
    /// Absolute URL of the favicon.
    pub favicon: Option<String>,
    /// Primary language code.
    pub language: Option<String>,
}

/// Result of analyzing one website.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteAnalysis {
    /// Requested URL.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    /// Cleaned main text, bounded in length.
    pub content: String,
    /// Head metadata.
    pub metadata: SiteMetadata,
    /// When the page was fetched.
    pub analyzed_at: DateTime<Utc>,
}

impl WebsiteAnalysis {
    /// Number of words in the extracted text.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}
