//! Platform handlers: URL detection, metadata fetch, audio extraction.

mod downloader;
mod instagram;
mod tiktok;
mod youtube;

pub use downloader::extract_audio_with;
pub use instagram::InstagramHandler;
pub use tiktok::TikTokHandler;
pub use youtube::YouTubeHandler;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clean;
use crate::error::DownloadError;
use crate::types::{Platform, VideoMetadata};

/// Timeout applied to metadata HTTP calls (oEmbed, Open-Graph scrape).
pub(crate) const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// A handler for one video platform.
///
/// `extract_audio` must fail loudly: a non-zero downloader exit or a missing
/// or empty output file is an error, never a silent success.
#[async_trait]
pub trait PlatformHandler: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether this handler recognizes the URL.
    fn matches(&self, url: &str) -> bool;

    /// Fetch title/author/thumbnail for the video. Failures degrade to
    /// `None`; analysis proceeds without metadata.
    async fn fetch_metadata(&self, url: &str) -> Option<VideoMetadata>;

    /// Download the video's audio track into `output_dir` and return the
    /// path of the uniquely named file.
    async fn extract_audio(&self, url: &str, output_dir: &Path)
        -> Result<PathBuf, DownloadError> {
        downloader::extract_audio(url, output_dir).await
    }

    /// Clean a caption or description before it enters the prompt.
    fn clean_description(&self, text: &str) -> String {
        clean::clean_caption(text)
    }

    /// Best-effort removal of a temp file produced by `extract_audio`.
    async fn cleanup(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove temp audio");
            }
        }
    }
}

/// Registry of platform handlers; detection returns the first match.
pub struct PlatformRegistry {
    handlers: Vec<Box<dyn PlatformHandler>>,
}

impl PlatformRegistry {
    /// Registry with the built-in handlers, sharing one HTTP client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            handlers: vec![
                Box::new(TikTokHandler::new(client.clone())),
                Box::new(YouTubeHandler::new(client.clone())),
                Box::new(InstagramHandler::new(client)),
            ],
        }
    }

    /// Empty registry, for tests that register their own handlers.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register(&mut self, handler: Box<dyn PlatformHandler>) {
        self.handlers.push(handler);
    }

    /// First handler whose pattern matches the URL.
    pub fn detect(&self, url: &str) -> Option<&dyn PlatformHandler> {
        self.handlers
            .iter()
            .find(|h| h.matches(url))
            .map(|h| h.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PlatformRegistry {
        PlatformRegistry::new(reqwest::Client::new())
    }

    #[test]
    fn test_detects_tiktok_urls() {
        let registry = registry();
        let handler = registry
            .detect("https://www.tiktok.com/@chef/video/7301234?is_from_webapp=1")
            .expect("tiktok url should match");
        assert_eq!(handler.platform(), Platform::TikTok);
    }

    #[test]
    fn test_detects_youtube_urls() {
        let registry = registry();
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/abc123XYZ_-",
        ] {
            let handler = registry.detect(url).expect("youtube url should match");
            assert_eq!(handler.platform(), Platform::YouTube);
        }
    }

    #[test]
    fn test_detects_instagram_urls() {
        let registry = registry();
        let handler = registry
            .detect("https://www.instagram.com/reel/Cxyz123/")
            .expect("instagram url should match");
        assert_eq!(handler.platform(), Platform::Instagram);
    }

    #[test]
    fn test_unknown_url_is_unmatched() {
        let registry = registry();
        assert!(registry.detect("https://vimeo.com/1234567").is_none());
        assert!(registry.detect("not a url").is_none());
    }
}
