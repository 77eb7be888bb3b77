//! Page fetching and HTML extraction.

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::analysis::config::ScrapingConfig;
use crate::analysis::error::{AnalysisError, AnalysisResult};
use crate::analysis::types::{SiteMetadata, WebsiteAnalysis};

/// Containers tried, in order, before falling back to `<body>`.
const MAIN_SELECTORS: [&str; 5] = ["main", "article", "[role='main']", "#content", ".content"];

/// Minimum word count for a container to count as the main text.
const MIN_MAIN_WORDS: usize = 50;

/// Elements whose text never reaches the prompt.
const SKIPPED_ELEMENTS: [&str; 6] = ["script", "style", "noscript", "template", "svg", "iframe"];

/// Parse a user-supplied URL, accepting only `http` and `https`.
///
/// # Errors
/// Returns an error if the URL is unparsable or uses another scheme.
pub fn parse_site_url(raw: &str) -> AnalysisResult<Url> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AnalysisError::UnsupportedScheme(other.to_string())),
    }
}

/// Fetch a page and extract its analysis.
///
/// # Errors
/// Returns an error if the request fails, the response is not HTML or text,
/// or the body exceeds the configured size.
pub async fn fetch_page(
    client: &reqwest::Client,
    url: &Url,
    config: &ScrapingConfig,
) -> AnalysisResult<WebsiteAnalysis> {
    let response = client.get(url.as_str()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AnalysisError::HttpStatus(status.as_u16()));
    }

    let limit = config.max_content_length as u64;
    if let Some(len) = response.content_length() {
        if len > limit {
            return Err(AnalysisError::TooLarge(len));
        }
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html")
        .to_string();
    if !content_type.contains("text/html")
        && !content_type.contains("application/xhtml")
        && !content_type.contains("text/plain")
    {
        return Err(AnalysisError::UnsupportedContentType(content_type));
    }

    let final_url = response.url().clone();
    let body = response.bytes().await?;
    if body.len() as u64 > limit {
        return Err(AnalysisError::TooLarge(body.len() as u64));
    }

    let html = String::from_utf8_lossy(&body);
    Ok(extract_analysis(&html, url.as_str(), &final_url, config.max_text_chars))
}

/// Build an analysis from a fetched HTML document.
#[must_use]
pub fn extract_analysis(
    html: &str,
    requested_url: &str,
    final_url: &Url,
    max_text_chars: usize,
) -> WebsiteAnalysis {
    let document = Html::parse_document(html);

    let metadata = SiteMetadata {
        title: extract_title(&document)
            .or_else(|| final_url.host_str().map(str::to_string))
            .unwrap_or_default(),
        description: extract_meta(&document, "description")
            .or_else(|| extract_meta(&document, "og:description")),
        hero_image: extract_meta(&document, "og:image")
            .or_else(|| extract_meta(&document, "twitter:image"))
            .and_then(|src| resolve_url(&src, final_url)),
        favicon: extract_favicon(&document, final_url),
        language: extract_language(&document),
    };

    WebsiteAnalysis {
        url: requested_url.to_string(),
        final_url: final_url.to_string(),
        content: truncate_chars(&extract_main_text(&document), max_text_chars),
        metadata,
        analyzed_at: Utc::now(),
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    Selector::parse(selector)
        .ok()
        .and_then(|selector| document.select(&selector).next())
}

fn extract_title(document: &Html) -> Option<String> {
    extract_meta(document, "og:title").or_else(|| {
        ["title", "h1"].into_iter().find_map(|tag| {
            select_first(document, tag)
                .map(|element| clean_text(&element.text().collect::<String>()))
                .filter(|title| !title.is_empty())
        })
    })
}

/// Meta content by `name` or, for OpenGraph, `property`.
fn extract_meta(document: &Html, name: &str) -> Option<String> {
    ["name", "property"].into_iter().find_map(|attr| {
        select_first(document, &format!("meta[{attr}='{name}']"))
            .and_then(|element| element.value().attr("content"))
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .map(str::to_string)
    })
}

fn extract_favicon(document: &Html, base_url: &Url) -> Option<String> {
    ["link[rel='icon']", "link[rel='shortcut icon']", "link[rel='apple-touch-icon']"]
        .into_iter()
        .find_map(|selector| {
            select_first(document, selector)
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| resolve_url(href, base_url))
        })
        .or_else(|| base_url.join("/favicon.ico").ok().map(String::from))
}

fn extract_language(document: &Html) -> Option<String> {
    select_first(document, "html")
        .and_then(|element| element.value().attr("lang"))
        .and_then(|lang| lang.split('-').next())
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_lowercase)
        .or_else(|| extract_meta(document, "og:locale"))
}

/// Visible text of an element, skipping scripts, styles and embedded documents.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }
    clean_text(&parts.join(" "))
}

fn extract_main_text(document: &Html) -> String {
    for selector in MAIN_SELECTORS {
        if let Some(element) = select_first(document, selector) {
            let text = visible_text(element);
            if text.split_whitespace().count() > MIN_MAIN_WORDS {
                return text;
            }
        }
    }

    select_first(document, "body")
        .map(visible_text)
        .unwrap_or_default()
}

/// Collapse whitespace runs into single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Resolve a possibly relative URL, skipping script and anchor links.
fn resolve_url(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("data:")
        || href.starts_with('#')
    {
        return None;
    }
    base_url.join(href).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html lang="en-US">
<head>
  <title>Acme | Rockets for teams</title>
  <meta name="description" content="Reusable rockets for growing teams.">
  <meta property="og:image" content="/img/hero.png">
  <link rel="icon" href="/static/favicon.png">
  <style>body { color: red; }</style>
</head>
<body>
  <nav>Home Pricing</nav>
  <script>var tracking = "do not read";</script>
  <p>Acme   builds reusable
     rockets.</p>
</body>
</html>"#;

    fn base() -> Url {
        Url::parse("https://acme.io/landing").unwrap()
    }

    #[test]
    fn test_extract_metadata() {
        let analysis = extract_analysis(PAGE, "https://acme.io", &base(), 12_000);

        assert_eq!(analysis.metadata.title, "Acme | Rockets for teams");
        assert_eq!(
            analysis.metadata.description.as_deref(),
            Some("Reusable rockets for growing teams.")
        );
        assert_eq!(
            analysis.metadata.hero_image.as_deref(),
            Some("https://acme.io/img/hero.png")
        );
        assert_eq!(
            analysis.metadata.favicon.as_deref(),
            Some("https://acme.io/static/favicon.png")
        );
        assert_eq!(analysis.metadata.language.as_deref(), Some("en"));
        assert_eq!(analysis.url, "https://acme.io");
        assert_eq!(analysis.final_url, "https://acme.io/landing");
    }

    #[test]
    fn test_main_text_skips_scripts_and_styles() {
        let analysis = extract_analysis(PAGE, "https://acme.io", &base(), 12_000);

        assert_eq!(analysis.content, "Home Pricing Acme builds reusable rockets.");
        assert!(!analysis.content.contains("tracking"));
        assert!(!analysis.content.contains("color"));
    }

    #[test]
    fn test_title_falls_back_to_host_and_favicon_to_root() {
        let analysis = extract_analysis("<html><body>hi</body></html>", "https://acme.io", &base(), 100);
        assert_eq!(analysis.metadata.title, "acme.io");
        assert_eq!(
            analysis.metadata.favicon.as_deref(),
            Some("https://acme.io/favicon.ico")
        );
        assert!(analysis.metadata.hero_image.is_none());
    }

    #[test]
    fn test_content_is_truncated_on_char_boundary() {
        let html = "<html><body><p>héllo wörld</p></body></html>";
        let analysis = extract_analysis(html, "https://acme.io", &base(), 4);
        assert_eq!(analysis.content, "héll");
    }

    #[test]
    fn test_parse_site_url() {
        assert!(parse_site_url(" https://acme.io ").is_ok());
        assert!(matches!(
            parse_site_url("ftp://acme.io"),
            Err(AnalysisError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            parse_site_url("acme"),
            Err(AnalysisError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_resolve_url_skips_scripts() {
        assert_eq!(resolve_url("javascript:void(0)", &base()), None);
        assert_eq!(
            resolve_url("https://cdn.io/a.png", &base()).as_deref(),
            Some("https://cdn.io/a.png")
        );
    }
}
