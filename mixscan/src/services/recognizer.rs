//! Recognizer contract and retry policy
//!
//! The reconciliation passes only ever see [`Recognizer`]: one call per
//! audio file, bounded in time, never failing. Retries, per-attempt
//! timeouts and backoff live in [`RetryingRecognizer`], which wraps a raw
//! [`RecognitionBackend`] performing a single identification attempt.

use crate::result_log::{Segment, SegmentStatus};
use async_trait::async_trait;
use mixscan_common::config::RecognizerSection;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Terminal outcome of recognizing one audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// `"<artist> - <title>"`
    Found(String),
    NotFound,
    Timeout,
    Error,
}

impl Recognition {
    pub fn status(&self) -> SegmentStatus {
        match self {
            Recognition::Found(_) => SegmentStatus::Found,
            Recognition::NotFound => SegmentStatus::NotFound,
            Recognition::Timeout => SegmentStatus::Timeout,
            Recognition::Error => SegmentStatus::Error,
        }
    }

    pub fn track(&self) -> Option<&str> {
        match self {
            Recognition::Found(track) => Some(track),
            Recognition::NotFound | Recognition::Timeout | Recognition::Error => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Recognition::Found(_))
    }

    pub fn into_segment(self) -> Segment {
        match self {
            Recognition::Found(track) => Segment::found(track),
            other => Segment::unmatched(other.status()),
        }
    }
}

/// Recognition service as consumed by the passes
///
/// Implementations must return within bounded time and report every
/// failure mode as a [`Recognition`] value.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, audio: &Path) -> Recognition;
}

/// Errors from a single backend attempt
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(i64, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid API token")]
    InvalidApiToken,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One raw identification attempt
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// `Ok(Some(track))` on match, `Ok(None)` when nothing matched
    async fn identify(&self, audio: &Path) -> Result<Option<String>, BackendError>;
}

/// Attempt/timeout/backoff settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wall-clock limit per attempt
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Delay after a no-match or a backend error
    pub retry_delay: Duration,
    /// Delay after a timed-out attempt (longer)
    pub timeout_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RecognizerSection::default())
    }
}

impl RetryPolicy {
    pub fn from_config(section: &RecognizerSection) -> Self {
        Self {
            timeout: Duration::from_secs(section.timeout_seconds),
            max_attempts: section.max_attempts.max(1),
            retry_delay: Duration::from_millis(section.retry_delay_ms),
            timeout_retry_delay: Duration::from_millis(section.timeout_retry_delay_ms),
        }
    }
}

/// [`Recognizer`] that retries a backend according to a [`RetryPolicy`]
pub struct RetryingRecognizer<B> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: RecognitionBackend> RetryingRecognizer<B> {
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<B: RecognitionBackend> Recognizer for RetryingRecognizer<B> {
    async fn recognize(&self, audio: &Path) -> Recognition {
        let attempts = self.policy.max_attempts.max(1);
        debug!(
            path = %audio.display(),
            max_attempts = attempts,
            timeout_s = self.policy.timeout.as_secs(),
            "Attempting recognition"
        );

        let mut outcome = Recognition::Error;
        for attempt in 1..=attempts {
            let started = Instant::now();
            let result = tokio::time::timeout(self.policy.timeout, self.backend.identify(audio)).await;
            let elapsed = started.elapsed();

            let delay = match result {
                Ok(Ok(Some(track))) => {
                    debug!(attempt, elapsed_ms = elapsed.as_millis() as u64, track = %track, "Recognition successful");
                    return Recognition::Found(track);
                }
                Ok(Ok(None)) => {
                    debug!(attempt, "No track data found");
                    outcome = Recognition::NotFound;
                    self.policy.retry_delay
                }
                Ok(Err(e)) => {
                    warn!(attempt, elapsed_ms = elapsed.as_millis() as u64, "Recognition attempt failed: {}", e);
                    outcome = Recognition::Error;
                    self.policy.retry_delay
                }
                Err(_) => {
                    warn!(attempt, elapsed_ms = elapsed.as_millis() as u64, "Recognition attempt timed out");
                    outcome = Recognition::Timeout;
                    self.policy.timeout_retry_delay
                }
            };

            if attempt < attempts && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        debug!(path = %audio.display(), status = %outcome.status(), "Recognition failed after all attempts");
        outcome
    }
}
