//! Offline analyzer for tests.

use chrono::Utc;

use crate::analysis::{
    AnalysisError, AnalysisFuture, AnalysisResult, Analyzer, SiteMetadata, WebsiteAnalysis,
};

/// Returns the same page text for every URL, or fails with an HTTP status.
pub(crate) struct StaticAnalyzer {
    content: Option<String>,
}

impl StaticAnalyzer {
    pub(crate) fn with_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    pub(crate) const fn failing() -> Self {
        Self { content: None }
    }
}

impl Analyzer for StaticAnalyzer {
    fn analyze<'a>(&'a self, url: &'a str) -> AnalysisFuture<'a, AnalysisResult<WebsiteAnalysis>> {
        Box::pin(async move {
            let content = self.content.clone().ok_or(AnalysisError::HttpStatus(503))?;
            Ok(WebsiteAnalysis {
                url: url.to_string(),
                final_url: url.to_string(),
                content,
                metadata: SiteMetadata {
                    title: "Static page".to_string(),
                    hero_image: Some(format!("{url}/hero.png")),
                    ..SiteMetadata::default()
                },
                analyzed_at: Utc::now(),
            })
        })
    }
}
