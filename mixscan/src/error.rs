//! Error types for mixscan
//!
//! Only missing external state and store I/O failures surface as errors.
//! Per-segment, per-window and per-pair failures inside a corrective pass
//! are recorded as segment statuses or report counts instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::services::{DownloadError, SegmentError};

/// Top-level error type
#[derive(Debug, Error)]
pub enum MixscanError {
    /// Result log required by rescan/validate/merge-gaps does not exist
    #[error("Result file not found: {0}")]
    ResultFileMissing(PathBuf),

    /// Source recording does not exist
    #[error("Audio file not found: {0}")]
    AudioFileMissing(PathBuf),

    /// Whole-file segmentation failed; the pass cannot start
    #[error("Segmentation failed: {0}")]
    Segmenter(#[from] SegmentError),

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// mixscan-common error
    #[error("Common error: {0}")]
    Common(#[from] mixscan_common::Error),
}

/// Result alias used across the crate
pub type MixscanResult<T> = Result<T, MixscanError>;
