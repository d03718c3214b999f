//! HTTP recognition backend
//!
//! Uploads one audio file per request to an AudD-compatible endpoint and
//! maps the JSON reply onto `"<artist> - <title>"`. Requests are throttled
//! with a direct governor rate limiter; per-attempt timeouts and retries are
//! applied by [`RetryingRecognizer`](super::RetryingRecognizer).

use super::recognizer::{BackendError, RecognitionBackend};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use mixscan_common::config::RecognizerSection;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("mixscan/", env!("CARGO_PKG_VERSION"));

/// Error codes the service uses for missing or rejected tokens
const TOKEN_ERROR_CODES: [i64; 2] = [900, 901];

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    result: Option<ApiMatch>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiMatch {
    #[serde(default)]
    artist: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error_code: i64,
    #[serde(default)]
    error_message: String,
}

/// Recognition API client
pub struct HttpRecognitionClient {
    client: Client,
    api_url: String,
    api_token: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpRecognitionClient {
    pub fn new(
        api_url: impl Into<String>,
        api_token: impl Into<String>,
        requests_per_second: u32,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_token: api_token.into(),
            rate_limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    pub fn from_config(section: &RecognizerSection, api_token: String) -> Result<Self, BackendError> {
        Self::new(section.api_url.clone(), api_token, section.requests_per_second)
    }
}

#[async_trait]
impl RecognitionBackend for HttpRecognitionClient {
    async fn identify(&self, audio: &Path) -> Result<Option<String>, BackendError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "segment.wav".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let form = Form::new()
            .text("api_token", self.api_token.clone())
            .part("file", part);

        self.rate_limiter.until_ready().await;

        tracing::debug!(path = %audio.display(), "Uploading segment for recognition");

        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(i64::from(status.as_u16()), body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        parse_response(&body)
    }
}

/// Map a response body onto a track string
fn parse_response(body: &str) -> Result<Option<String>, BackendError> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;

    if response.status != "success" {
        return Err(match response.error {
            Some(err) if TOKEN_ERROR_CODES.contains(&err.error_code) => BackendError::InvalidApiToken,
            Some(err) => BackendError::Api(err.error_code, err.error_message),
            None => BackendError::Parse(format!("unexpected status '{}'", response.status)),
        });
    }

    Ok(response.result.and_then(|m| {
        let artist = m.artist.trim();
        let title = m.title.trim();
        match (artist.is_empty(), title.is_empty()) {
            (_, true) => None,
            (true, false) => Some(title.to_string()),
            (false, false) => Some(format!("{} - {}", artist, title)),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_match() {
        let body = r#"{"status":"success","result":{"artist":"DJ Nova","title":"Skyline","album":"X"}}"#;
        assert_eq!(parse_response(body).unwrap(), Some("DJ Nova - Skyline".to_string()));
    }

    #[test]
    fn test_parse_no_match() {
        let body = r#"{"status":"success","result":null}"#;
        assert_eq!(parse_response(body).unwrap(), None);
    }

    #[test]
    fn test_parse_token_error() {
        let body = r#"{"status":"error","error":{"error_code":901,"error_message":"no api_token"}}"#;
        assert!(matches!(parse_response(body), Err(BackendError::InvalidApiToken)));
    }

    #[test]
    fn test_parse_other_api_error() {
        let body = r#"{"status":"error","error":{"error_code":300,"error_message":"bad audio"}}"#;
        match parse_response(body) {
            Err(BackendError::Api(code, message)) => {
                assert_eq!(code, 300);
                assert_eq!(message, "bad audio");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("<html>"), Err(BackendError::Parse(_))));
    }

    #[test]
    fn test_client_creation() {
        let client = HttpRecognitionClient::new("https://api.audd.io/", "token", 0);
        assert!(client.is_ok());
    }
}
