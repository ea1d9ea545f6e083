//! Instagram handler: Open-Graph scrape for metadata (no public oEmbed).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{PlatformHandler, METADATA_TIMEOUT};
use crate::types::{Platform, VideoMetadata};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?instagram\.com/(reel|reels|p|tv)/")
        .expect("Invalid Instagram URL regex")
});

/// og: meta tags, property-first and content-first attribute orders.
static OG_TITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property\s*=\s*["']og:title["'][^>]*content\s*=\s*["']([^"']+)["']"#)
        .expect("Invalid og:title regex")
});

static OG_TITLE_REGEX_ALT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*content\s*=\s*["']([^"']+)["'][^>]*property\s*=\s*["']og:title["']"#)
        .expect("Invalid og:title alt regex")
});

static OG_IMAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property\s*=\s*["']og:image["'][^>]*content\s*=\s*["']([^"']+)["']"#)
        .expect("Invalid og:image regex")
});

static OG_IMAGE_REGEX_ALT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*content\s*=\s*["']([^"']+)["'][^>]*property\s*=\s*["']og:image["']"#)
        .expect("Invalid og:image alt regex")
});

pub struct InstagramHandler {
    client: reqwest::Client,
}

impl InstagramHandler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn first_capture(html: &str, primary: &Regex, alt: &Regex) -> Option<String> {
    primary
        .captures(html)
        .or_else(|| alt.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pull title and image out of an Open-Graph annotated page.
pub(crate) fn parse_open_graph(html: &str) -> VideoMetadata {
    VideoMetadata {
        title: first_capture(html, &OG_TITLE_REGEX, &OG_TITLE_REGEX_ALT),
        author: None,
        author_url: None,
        thumbnail_url: first_capture(html, &OG_IMAGE_REGEX, &OG_IMAGE_REGEX_ALT),
    }
}

#[async_trait]
impl PlatformHandler for InstagramHandler {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn matches(&self, url: &str) -> bool {
        URL_PATTERN.is_match(url)
    }

    async fn fetch_metadata(&self, url: &str) -> Option<VideoMetadata> {
        let result = self
            .client
            .get(url)
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = url, error = %e, "instagram page fetch failed");
                return None;
            }
        };

        let html = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(url = url, error = %e, "instagram page read failed");
                return None;
            }
        };

        let metadata = parse_open_graph(&html);
        if metadata.title.is_none() && metadata.thumbnail_url.is_none() {
            return None;
        }
        Some(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_pattern() {
        let handler = InstagramHandler::new(reqwest::Client::new());
        assert!(handler.matches("https://www.instagram.com/reel/Cxyz123/"));
        assert!(handler.matches("https://instagram.com/p/Babc456/"));
        assert!(!handler.matches("https://www.instagram.com/some_user/"));
    }

    #[test]
    fn test_parse_open_graph_both_attribute_orders() {
        let html = r#"<html><head>
            <meta property="og:title" content="Pasta al limone" />
            <meta content="https://cdn.example.com/thumb.jpg" property="og:image" />
        </head></html>"#;
        let metadata = parse_open_graph(html);
        assert_eq!(metadata.title.as_deref(), Some("Pasta al limone"));
        assert_eq!(
            metadata.thumbnail_url.as_deref(),
            Some("https://cdn.example.com/thumb.jpg")
        );
    }

    #[test]
    fn test_parse_open_graph_missing_tags() {
        let metadata = parse_open_graph("<html><head></head></html>");
        assert!(metadata.title.is_none());
        assert!(metadata.thumbnail_url.is_none());
    }
}
