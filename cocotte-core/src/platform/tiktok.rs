//! TikTok handler: oEmbed metadata.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::{PlatformHandler, METADATA_TIMEOUT};
use crate::types::{Platform, VideoMetadata};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.|vm\.|vt\.)?tiktok\.com/").expect("Invalid TikTok URL regex")
});

pub struct TikTokHandler {
    client: reqwest::Client,
}

impl TikTokHandler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    author_name: Option<String>,
    author_url: Option<String>,
    thumbnail_url: Option<String>,
}

#[async_trait]
impl PlatformHandler for TikTokHandler {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn matches(&self, url: &str) -> bool {
        URL_PATTERN.is_match(url)
    }

    async fn fetch_metadata(&self, url: &str) -> Option<VideoMetadata> {
        let result = self
            .client
            .get("https://www.tiktok.com/oembed")
            .query(&[("url", url)])
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = url, error = %e, "tiktok oembed fetch failed");
                return None;
            }
        };

        match response.json::<OEmbedResponse>().await {
            Ok(oembed) => Some(VideoMetadata {
                title: oembed.title,
                author: oembed.author_name,
                author_url: oembed.author_url,
                thumbnail_url: oembed.thumbnail_url,
            }),
            Err(e) => {
                tracing::warn!(url = url, error = %e, "tiktok oembed parse failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_pattern() {
        let handler = TikTokHandler::new(reqwest::Client::new());
        assert!(handler.matches("https://www.tiktok.com/@chef/video/73012345"));
        assert!(handler.matches("https://vm.tiktok.com/ZM8abc/"));
        assert!(!handler.matches("https://www.youtube.com/watch?v=x"));
        assert!(!handler.matches("https://nottiktok.com/video/1"));
    }
}
