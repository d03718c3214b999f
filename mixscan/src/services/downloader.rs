//! Media download via yt-dlp
//!
//! SoundCloud and YouTube links are downloaded as mp3 into the downloads
//! directory. Any other URL is rejected before a process is spawned.

use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

const YT_DLP_BINARY: &str = "yt-dlp";
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Unsupported URL (expected SoundCloud or YouTube): {0}")]
    UnsupportedUrl(String),

    #[error("yt-dlp not found in PATH")]
    BinaryNotFound,

    #[error("Download failed: {0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hosting platform recognised from a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource {
    SoundCloud,
    YouTube,
}

impl MediaSource {
    pub fn detect(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.contains("soundcloud.com") {
            Some(MediaSource::SoundCloud)
        } else if lower.contains("youtube.com") || lower.contains("youtu.be") {
            Some(MediaSource::YouTube)
        } else {
            None
        }
    }
}

/// True when the argument looks like a URL rather than a local path
pub fn is_url(arg: &str) -> bool {
    let lower = arg.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// yt-dlp wrapper
pub struct Downloader {
    binary_path: String,
    output_dir: PathBuf,
}

impl Downloader {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: YT_DLP_BINARY.to_string(),
            output_dir: output_dir.into(),
        }
    }

    /// Download the audio track behind `url` as mp3
    pub async fn download(&self, url: &str) -> Result<(), DownloadError> {
        let source =
            MediaSource::detect(url).ok_or_else(|| DownloadError::UnsupportedUrl(url.to_string()))?;

        tracing::info!(url = %url, source = ?source, "Starting download");
        std::fs::create_dir_all(&self.output_dir)?;

        let output = tokio::task::spawn_blocking({
            let binary = self.binary_path.clone();
            let args = self.arguments(url);
            move || Command::new(&binary).args(&args).output()
        })
        .await
        .map_err(|e| DownloadError::Failed(format!("Task join error: {}", e)))?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DownloadError::BinaryNotFound,
            _ => DownloadError::Io(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Failed(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        tracing::info!(url = %url, dir = %self.output_dir.display(), "Download complete");
        Ok(())
    }

    fn arguments(&self, url: &str) -> Vec<String> {
        let template = self.output_dir.join(OUTPUT_TEMPLATE);
        vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            "192K".to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            url.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_sources() {
        assert_eq!(
            MediaSource::detect("https://soundcloud.com/artist/set"),
            Some(MediaSource::SoundCloud)
        );
        assert_eq!(
            MediaSource::detect("https://www.YouTube.com/watch?v=abc"),
            Some(MediaSource::YouTube)
        );
        assert_eq!(MediaSource::detect("https://youtu.be/abc"), Some(MediaSource::YouTube));
        assert_eq!(MediaSource::detect("https://example.com/set.mp3"), None);
    }

    #[tokio::test]
    async fn test_unsupported_url_rejected_without_spawning() {
        let temp = tempfile::TempDir::new().unwrap();
        let downloader = Downloader::new(temp.path().join("downloads"));
        let result = downloader.download("https://example.com/set.mp3").await;
        assert!(matches!(result, Err(DownloadError::UnsupportedUrl(_))));
        assert!(!temp.path().join("downloads").exists());
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://youtu.be/abc"));
        assert!(is_url("HTTP://soundcloud.com/x"));
        assert!(!is_url("downloads/set.mp3"));
    }

    #[test]
    fn test_arguments_write_into_output_dir() {
        let downloader = Downloader::new("downloads");
        let args = downloader.arguments("https://youtu.be/abc");
        assert!(args.contains(&"mp3".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
        assert!(args.iter().any(|a| a.ends_with("%(title)s.%(ext)s") && a.starts_with("downloads")));
    }
}
