//! Thumbnail persistence: download the remote image (or take generated
//! bytes) and upload it to the object store.
//!
//! Every failure here is demoted to a warning and the recipe proceeds with
//! `image_url = None`; the original remote thumbnail is never retained.

use std::time::Duration;

use chrono::Utc;
use cocotte_core::llm::image::GeneratedImage;
use cocotte_core::types::Platform;

use super::storage::StorageClient;

/// Timeout for downloading a remote thumbnail.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// File extension for an image content type; `None` for anything that is
/// not an image. The `jpeg` subtype maps to the conventional `jpg`.
pub fn extension_for(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    let subtype = essence.strip_prefix("image/")?;
    if subtype.is_empty() {
        return None;
    }
    Some(match subtype {
        "jpeg" => "jpg".to_string(),
        other => other.to_ascii_lowercase(),
    })
}

/// Compose the object key: `<platform>/<platform>-<unix_ms>-<random>.<ext>`.
pub fn object_key(platform: Platform, ext: &str) -> String {
    let platform = platform.as_str();
    let unix_ms = Utc::now().timestamp_millis();
    let random: u32 = rand::random();
    format!("{platform}/{platform}-{unix_ms}-{random:08x}.{ext}")
}

/// Download a remote thumbnail and persist it. Returns the public URL, or
/// `None` on any failure.
pub async fn persist_remote_thumbnail(
    client: &reqwest::Client,
    storage: &StorageClient,
    thumbnail_url: &str,
    platform: Platform,
) -> Option<String> {
    let response = match client
        .get(thumbnail_url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(url = thumbnail_url, error = %e, "thumbnail download failed");
            return None;
        }
    };

    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let Some(ext) = extension_for(&content_type) else {
        tracing::warn!(
            url = thumbnail_url,
            content_type = content_type,
            "thumbnail is not an image, skipping"
        );
        return None;
    };

    let bytes = match response.bytes().await {
        Ok(b) => b.to_vec(),
        Err(e) => {
            tracing::warn!(url = thumbnail_url, error = %e, "thumbnail body read failed");
            return None;
        }
    };

    upload(storage, platform, &ext, &content_type, bytes).await
}

/// Persist a generated dish image (inline bytes or a provider URL).
pub async fn persist_generated_image(
    client: &reqwest::Client,
    storage: &StorageClient,
    image: GeneratedImage,
) -> Option<String> {
    match image {
        GeneratedImage::Bytes(bytes) => {
            upload(storage, Platform::Generated, "png", "image/png", bytes).await
        }
        GeneratedImage::Url(url) => {
            persist_remote_thumbnail(client, storage, &url, Platform::Generated).await
        }
    }
}

async fn upload(
    storage: &StorageClient,
    platform: Platform,
    ext: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Option<String> {
    let key = object_key(platform, ext);
    match storage.upload(&key, bytes, content_type).await {
        Ok(public_url) => Some(public_url),
        Err(e) => {
            tracing::warn!(key = key, error = %e, "thumbnail upload failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_maps_jpeg_to_jpg() {
        assert_eq!(extension_for("image/jpeg").as_deref(), Some("jpg"));
        assert_eq!(extension_for("image/png").as_deref(), Some("png"));
        assert_eq!(extension_for("image/webp").as_deref(), Some("webp"));
        assert_eq!(
            extension_for("image/jpeg; charset=binary").as_deref(),
            Some("jpg")
        );
    }

    #[test]
    fn test_extension_for_rejects_non_images() {
        assert_eq!(extension_for("text/html"), None);
        assert_eq!(extension_for("application/json"), None);
        assert_eq!(extension_for(""), None);
        assert_eq!(extension_for("image/"), None);
    }

    #[test]
    fn test_object_key_shape() {
        let key = object_key(Platform::TikTok, "jpg");
        assert!(matches_key_shape(&key), "unexpected key shape: {key}");
    }

    // `tiktok/tiktok-<digits>-<8 hex>.jpg`
    fn matches_key_shape(key: &str) -> bool {
        let Some(rest) = key.strip_prefix("tiktok/tiktok-") else {
            return false;
        };
        let Some((stamp_and_random, ext)) = rest.rsplit_once('.') else {
            return false;
        };
        let Some((stamp, random)) = stamp_and_random.split_once('-') else {
            return false;
        };
        ext == "jpg"
            && !stamp.is_empty()
            && stamp.bytes().all(|b| b.is_ascii_digit())
            && random.len() == 8
            && random.bytes().all(|b| b.is_ascii_hexdigit())
    }
}
