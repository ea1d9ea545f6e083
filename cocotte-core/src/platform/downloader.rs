//! Audio extraction via the `yt-dlp` subprocess.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use uuid::Uuid;

use crate::error::DownloadError;

const DOWNLOADER_BINARY: &str = "yt-dlp";

/// How much stderr to keep in the error message.
const STDERR_SNIPPET_LEN: usize = 500;

/// Download the audio track of `url` into `output_dir` as a uniquely named
/// mp3 file using the default downloader binary.
pub async fn extract_audio(url: &str, output_dir: &Path) -> Result<PathBuf, DownloadError> {
    extract_audio_with(DOWNLOADER_BINARY, url, output_dir).await
}

/// Same as [`extract_audio`] with an explicit binary, for tests.
pub async fn extract_audio_with(
    binary: &str,
    url: &str,
    output_dir: &Path,
) -> Result<PathBuf, DownloadError> {
    tokio::fs::create_dir_all(output_dir).await?;

    let stem = Uuid::new_v4();
    let template = output_dir.join(format!("{stem}.%(ext)s"));
    let expected = output_dir.join(format!("{stem}.mp3"));

    let output = Command::new(binary)
        .arg("--no-playlist")
        .arg("--extract-audio")
        .arg("--audio-format")
        .arg("mp3")
        .arg("--output")
        .arg(&template)
        .arg("--quiet")
        .arg(url)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DownloadError::BinaryNotFound
            } else {
                DownloadError::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let snippet: String = stderr.trim().chars().take(STDERR_SNIPPET_LEN).collect();
        return Err(DownloadError::Failed {
            status: output.status.to_string(),
            stderr: snippet,
        });
    }

    // A zero exit with no file (or an empty one) still counts as failure.
    let meta = tokio::fs::metadata(&expected)
        .await
        .map_err(|_| DownloadError::NoOutput)?;
    if meta.len() == 0 {
        let _ = tokio::fs::remove_file(&expected).await;
        return Err(DownloadError::NoOutput);
    }

    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_audio_with("definitely-not-a-downloader", "https://x", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::BinaryNotFound));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        // `false` exits 1 and writes nothing.
        let err = extract_audio_with("false", "https://x", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_zero_exit_without_output_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        // `true` exits 0 but produces no file.
        let err = extract_audio_with("true", "https://x", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NoOutput));
    }
}
