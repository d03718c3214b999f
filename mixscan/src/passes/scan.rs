//! Initial full pass: recognize every segment of a recording

use super::{log_progress, PassOutcome};
use crate::error::MixscanResult;
use crate::result_log::ResultLog;
use crate::services::{Recognizer, Segmenter};
use mixscan_common::Timestamp;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Counts from an initial scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub segments: usize,
    pub found: usize,
    pub unique_tracks: usize,
}

/// Segment `source` and recognize each slice in order
///
/// The returned log holds one entry per slice; a whole-file segmentation
/// failure is the only error.
pub async fn initial_scan(
    source: &Path,
    header: String,
    recognizer: &dyn Recognizer,
    segmenter: &dyn Segmenter,
) -> MixscanResult<PassOutcome<ScanReport>> {
    let segment_length = segmenter.segment_length();
    let slices = segmenter.segment_whole_file(source).await?;
    let total = slices.len();

    info!(source = %source.display(), segments = total, "Starting recognition");

    let mut log = ResultLog::new(header);
    let mut report = ScanReport {
        segments: total,
        ..Default::default()
    };
    let mut seen: HashSet<String> = HashSet::new();

    for (index, slice) in slices.iter().enumerate() {
        let timestamp = Timestamp::from_segment_number(index as u32 + 1, segment_length);
        let result = recognizer.recognize(slice).await;
        log_progress(index + 1, total, timestamp, &result);

        if let Some(track) = result.track() {
            report.found += 1;
            if seen.insert(track.to_string()) {
                info!(timestamp = %timestamp, "New track: {}", track);
            }
        }
        log.set(timestamp, result.into_segment());
    }

    report.unique_tracks = seen.len();
    info!(
        segments = report.segments,
        found = report.found,
        unique_tracks = report.unique_tracks,
        "Recognition complete"
    );

    Ok(PassOutcome::new(log, total > 0, report))
}
