//! Configuration loading and config file resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `MIXSCAN_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/mixscan/mixscan.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! A missing or unreadable TOML file never terminates the program: the
//! resolver logs a warning and falls back to compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MIXSCAN_CONFIG";

/// File name looked up inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "mixscan.toml";

/// On-disk configuration (`mixscan.toml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Directory holding downloaded / user-provided recordings
    pub downloads_dir: PathBuf,
    /// Directory receiving one result log per recording
    pub results_dir: PathBuf,
    /// Scratch directory for exported audio slices
    pub segments_dir: PathBuf,
    /// Directory for `app.log`
    pub logs_dir: PathBuf,
    /// Fixed segment length in seconds
    pub segment_length_seconds: u32,
    /// Worker count for audio slice export
    pub export_workers: usize,
    pub recognizer: RecognizerSection,
    pub rescan: RescanSection,
    pub gap_merge: GapMergeSection,
    pub validation: ValidationSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSection {
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_retry_delay_ms: u64,
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescanSection {
    pub max_retries: u32,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapMergeSection {
    pub min_consecutive: usize,
    pub min_window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    pub threshold: usize,
    pub extension_seconds: u32,
    pub similarity_threshold: f64,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            results_dir: PathBuf::from("recognised-lists"),
            segments_dir: PathBuf::from("audio-segments"),
            logs_dir: PathBuf::from("logs"),
            segment_length_seconds: 10,
            export_workers: 4,
            recognizer: RecognizerSection::default(),
            rescan: RescanSection::default(),
            gap_merge: GapMergeSection::default(),
            validation: ValidationSection::default(),
        }
    }
}

impl Default for RecognizerSection {
    fn default() -> Self {
        Self {
            api_url: "https://api.audd.io/".to_string(),
            api_token: None,
            timeout_seconds: 40,
            max_attempts: 3,
            retry_delay_ms: 2000,
            timeout_retry_delay_ms: 3000,
            requests_per_second: 1,
        }
    }
}

impl Default for RescanSection {
    fn default() -> Self {
        Self {
            max_retries: 2,
            cooldown_seconds: 60,
        }
    }
}

impl Default for GapMergeSection {
    fn default() -> Self {
        Self {
            min_consecutive: 3,
            min_window: 3,
        }
    }
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            threshold: 3,
            extension_seconds: 20,
            similarity_threshold: 0.85,
        }
    }
}

impl TomlConfig {
    /// Reject values the passes cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.segment_length_seconds == 0 {
            return Err(Error::Config("segment_length_seconds must be > 0".to_string()));
        }
        if self.recognizer.max_attempts == 0 {
            return Err(Error::Config("recognizer.max_attempts must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.validation.similarity_threshold) {
            return Err(Error::Config(format!(
                "validation.similarity_threshold must be within 0.0-1.0, got {}",
                self.validation.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Load and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Write config to disk atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolves which config file to use and loads it with graceful degradation
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Path of the config file that would be used, if any
    pub fn config_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        dirs::config_dir()
            .map(|d| d.join("mixscan").join(CONFIG_FILE_NAME))
            .filter(|p| p.exists())
    }

    /// Resolve configuration, falling back to compiled defaults
    pub fn resolve(&self) -> TomlConfig {
        let Some(path) = self.config_path() else {
            debug!("No config file found, using compiled defaults");
            return TomlConfig::default();
        };

        match load_toml_config(&path) {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Failed to load config {}: {}. Using compiled defaults.",
                    path.display(),
                    e
                );
                TomlConfig::default()
            }
        }
    }
}
