//! Object-store client (Supabase storage REST API).

use axum::http::header;
use thiserror::Error;

/// Bucket holding recipe thumbnails, one folder per platform plus
/// `generated/`.
pub const THUMBNAIL_BUCKET: &str = "recipe-thumbnails";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload request failed: {0}")]
    RequestFailed(String),

    #[error("storage API returned {status}: {message}")]
    ApiError { status: u16, message: String },
}

/// Thin client over the storage REST endpoints. Objects are immutable once
/// uploaded (`x-upsert: false`).
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(client: reqwest::Client, base_url: &str, service_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket: THUMBNAIL_BUCKET.to_string(),
        }
    }

    /// Upload `bytes` under `key` and return the public URL.
    pub async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, "3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(self.public_url(key))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_shape() {
        let client = StorageClient::new(
            reqwest::Client::new(),
            "https://project.supabase.co/",
            "service-key".to_string(),
        );
        assert_eq!(
            client.public_url("tiktok/tiktok-1715000000000-a1b2c3d4.jpg"),
            "https://project.supabase.co/storage/v1/object/public/recipe-thumbnails/tiktok/tiktok-1715000000000-a1b2c3d4.jpg"
        );
    }
}
