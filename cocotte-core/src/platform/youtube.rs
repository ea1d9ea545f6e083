//! YouTube handler: oEmbed metadata, chapter-aware description cleaning.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::{PlatformHandler, METADATA_TIMEOUT};
use crate::clean;
use crate::types::{Platform, VideoMetadata};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://((www\.|m\.)?youtube\.com/(watch|shorts)|youtu\.be/)")
        .expect("Invalid YouTube URL regex")
});

pub struct YouTubeHandler {
    client: reqwest::Client,
}

impl YouTubeHandler {
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
impl PlatformHandler for YouTubeHandler {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn matches(&self, url: &str) -> bool {
        URL_PATTERN.is_match(url)
    }

    async fn fetch_metadata(&self, url: &str) -> Option<VideoMetadata> {
        let result = self
            .client
            .get("https://www.youtube.com/oembed")
            .query(&[("url", url), ("format", "json")])
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = url, error = %e, "youtube oembed fetch failed");
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
                tracing::warn!(url = url, error = %e, "youtube oembed parse failed");
                None
            }
        }
    }

    /// YouTube descriptions carry chapter timestamps and links on top of
    /// hashtags, so the fuller cleaning applies.
    fn clean_description(&self, text: &str) -> String {
        clean::clean_description(text)
    }
}
