//! Test helper utilities
//!
//! Shared fixtures for the mixscan integration tests

#![allow(dead_code)]

pub mod audio_generator;
pub mod log_capture;
pub mod mocks;

pub use audio_generator::{generate_test_wav, touch_audio, AudioConfig};
pub use log_capture::{init_test_logging, LogCapture};
pub use mocks::{merged_name, FakeSegmenter, MemoryLogStore, ScriptedRecognizer};

use mixscan::config::ScanConfig;
use mixscan::result_log::{ResultLog, Segment, SegmentStatus};
use mixscan_common::Timestamp;
use std::time::Duration;

pub fn ts(seconds: u32) -> Timestamp {
    Timestamp::from_seconds(seconds)
}

/// Log with one entry per `(seconds, status, track)`
pub fn log_of(entries: &[(u32, SegmentStatus, &str)]) -> ResultLog {
    ResultLog::from_segments(
        ResultLog::header_for("set.mp3"),
        entries
            .iter()
            .map(|(seconds, status, track)| (ts(*seconds), Segment::new(*status, *track))),
    )
}

/// Default pass configuration with no cooldown between rescan rounds
pub fn test_config() -> ScanConfig {
    ScanConfig {
        rescan_cooldown: Duration::ZERO,
        ..ScanConfig::default()
    }
}
