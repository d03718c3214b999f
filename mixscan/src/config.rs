//! Runtime configuration for the reconciliation passes
//!
//! [`ScanConfig`] is the flattened view of `mixscan.toml` the passes read.
//! The recognition API token is resolved separately with ENV → TOML
//! priority.

use mixscan_common::config::TomlConfig;
use mixscan_common::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the recognition API token
pub const API_TOKEN_ENV_VAR: &str = "MIXSCAN_API_TOKEN";

/// Pass parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Rescan rounds after the first
    pub max_retries: u32,
    /// Pause before each rescan round after the first
    pub rescan_cooldown: Duration,
    /// Shortest NOT_FOUND run considered for gap merging
    pub min_consecutive: usize,
    /// Smallest merge window, in segments
    pub min_window: usize,
    /// Tracks seen at most this many times are validated
    pub validation_threshold: usize,
    /// Seconds added on each extended side during validation
    pub extension_seconds: u32,
    /// Similarity cut-off for wrong-version detection
    pub similarity_threshold: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

impl ScanConfig {
    pub fn from_toml(config: &TomlConfig) -> Self {
        Self {
            max_retries: config.rescan.max_retries,
            rescan_cooldown: Duration::from_secs(config.rescan.cooldown_seconds),
            min_consecutive: config.gap_merge.min_consecutive,
            min_window: config.gap_merge.min_window,
            validation_threshold: config.validation.threshold,
            extension_seconds: config.validation.extension_seconds,
            similarity_threshold: config.validation.similarity_threshold,
        }
    }

    /// Apply `--threshold` from the command line
    pub fn with_validation_threshold(mut self, threshold: Option<usize>) -> Self {
        if let Some(threshold) = threshold {
            self.validation_threshold = threshold;
        }
        self
    }
}

/// Resolve the recognition API token
///
/// **Priority:** ENV → TOML
pub fn resolve_api_token(toml_config: &TomlConfig) -> Result<String> {
    let env_token = std::env::var(API_TOKEN_ENV_VAR)
        .ok()
        .filter(|t| is_valid_token(t));
    let toml_token = toml_config
        .recognizer
        .api_token
        .as_ref()
        .filter(|t| is_valid_token(t));

    if env_token.is_some() && toml_token.is_some() {
        warn!("API token found in environment and TOML config. Using environment (highest priority).");
    }

    if let Some(token) = env_token {
        info!("API token loaded from environment variable");
        return Ok(token);
    }

    if let Some(token) = toml_token {
        info!("API token loaded from TOML config");
        return Ok(token.clone());
    }

    Err(Error::Config(format!(
        "Recognition API token not configured. Set one of:\n\
         1. Environment: {}=your-token\n\
         2. TOML config: [recognizer] api_token = \"your-token\"",
        API_TOKEN_ENV_VAR
    )))
}

/// Non-empty, non-whitespace
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}
