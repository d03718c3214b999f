//! Segmenter contract
//!
//! A segmenter turns the source recording into audio files the recognizer
//! can consume: the full ordered list of fixed-length slices, or one slice
//! spanning an arbitrary time range.

use async_trait::async_trait;
use mixscan_common::Timestamp;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Source not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Decode failed for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Export failed for {path}: {message}")]
    Export { path: PathBuf, message: String },

    /// Requested span has no audio (empty or past the end)
    #[error("Empty span {start}..{end}")]
    EmptySpan { start: Timestamp, end: Timestamp },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which side(s) of a segment an extended slice reaches into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionMode {
    Before,
    After,
    Both,
}

impl ExtensionMode {
    pub const ALL: [ExtensionMode; 3] = [ExtensionMode::Before, ExtensionMode::After, ExtensionMode::Both];

    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionMode::Before => "before",
            ExtensionMode::After => "after",
            ExtensionMode::Both => "both",
        }
    }

    /// `(start, end)` of the extended slice around the segment at `anchor`
    ///
    /// Starts clamp to zero; ends are not clamped here, the segmenter clips
    /// them to the audio length.
    pub fn span(
        self,
        anchor: Timestamp,
        segment_length: u32,
        extension: u32,
    ) -> (Timestamp, Timestamp) {
        let segment_end = anchor.plus(segment_length);
        match self {
            ExtensionMode::Before => (anchor.minus(extension), segment_end),
            ExtensionMode::After => (anchor, segment_end.plus(extension)),
            ExtensionMode::Both => (anchor.minus(extension), segment_end.plus(extension)),
        }
    }
}

impl fmt::Display for ExtensionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces audio files for recognition
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Fixed segment length in seconds
    fn segment_length(&self) -> u32;

    /// All slices of the source in order; element `i` covers
    /// `[i * L, (i + 1) * L)` and is segment number `i + 1`
    async fn segment_whole_file(&self, source: &Path) -> Result<Vec<PathBuf>, SegmentError>;

    /// One slice covering `[start, end)`, clipped to the audio length
    async fn extended_segment(
        &self,
        source: &Path,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<PathBuf, SegmentError>;

    /// Extended slice around the segment starting at `anchor`
    async fn extended_around(
        &self,
        source: &Path,
        anchor: Timestamp,
        mode: ExtensionMode,
        extension: u32,
    ) -> Result<PathBuf, SegmentError> {
        let (start, end) = mode.span(anchor, self.segment_length(), extension);
        self.extended_segment(source, start, end).await
    }
}
