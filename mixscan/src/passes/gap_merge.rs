//! Merge long unmatched stretches into larger recognition windows
//!
//! A run is a maximal stretch of NOT_FOUND segments at consecutive
//! timestamps. Inside each run, windows of growing size are tried, smallest
//! size first and earliest start first, until one is recognized.

use super::PassOutcome;
use crate::result_log::{ResultLog, Segment, SegmentStatus};
use crate::services::{Recognition, Recognizer, Segmenter};
use mixscan_common::Timestamp;
use std::path::Path;
use tracing::{debug, info, warn};

/// Maximal run of consecutive NOT_FOUND segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapRun {
    /// First segment of the run
    pub start: Timestamp,
    /// Last segment of the run (inclusive)
    pub end: Timestamp,
    /// Number of segments
    pub len: usize,
}

impl GapRun {
    /// Timestamp of the `offset`-th segment in the run
    fn segment_at(&self, offset: usize, segment_length: u32) -> Timestamp {
        self.start.plus(offset as u32 * segment_length)
    }
}

/// Find runs of at least `min_consecutive` NOT_FOUND segments
///
/// A missing entry in the log breaks a run, as does any other status.
/// Runs are returned in timestamp order and never overlap.
pub fn find_runs(log: &ResultLog, segment_length: u32, min_consecutive: usize) -> Vec<GapRun> {
    let mut runs = Vec::new();
    let mut current: Option<GapRun> = None;

    for (timestamp, segment) in log.iter() {
        let not_found = segment.status == SegmentStatus::NotFound;
        current = match (current, not_found) {
            (Some(mut run), true) if run.end.plus(segment_length) == *timestamp => {
                run.end = *timestamp;
                run.len += 1;
                Some(run)
            }
            (previous, true) => {
                push_run(&mut runs, previous, min_consecutive);
                Some(GapRun {
                    start: *timestamp,
                    end: *timestamp,
                    len: 1,
                })
            }
            (previous, false) => {
                push_run(&mut runs, previous, min_consecutive);
                None
            }
        };
    }
    push_run(&mut runs, current, min_consecutive);

    runs
}

fn push_run(runs: &mut Vec<GapRun>, run: Option<GapRun>, min_consecutive: usize) {
    if let Some(run) = run {
        if run.len >= min_consecutive {
            runs.push(run);
        }
    }
}

/// Counts from a gap-merge pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapMergeReport {
    pub runs: usize,
    /// Runs with a recognized window
    pub merged_runs: usize,
    /// Segments rewritten to FOUND_MERGED
    pub segments_merged: usize,
    /// Windows submitted for recognition
    pub windows_tried: usize,
}

pub struct GapMerger<'a> {
    recognizer: &'a dyn Recognizer,
    segmenter: &'a dyn Segmenter,
    min_consecutive: usize,
    min_window: usize,
}

impl<'a> GapMerger<'a> {
    pub fn new(
        recognizer: &'a dyn Recognizer,
        segmenter: &'a dyn Segmenter,
        min_consecutive: usize,
        min_window: usize,
    ) -> Self {
        Self {
            recognizer,
            segmenter,
            min_consecutive,
            min_window: min_window.max(1),
        }
    }

    pub async fn run(&self, source: &Path, mut log: ResultLog) -> PassOutcome<GapMergeReport> {
        let segment_length = self.segmenter.segment_length();
        let runs = find_runs(&log, segment_length, self.min_consecutive);
        let mut report = GapMergeReport {
            runs: runs.len(),
            ..Default::default()
        };

        info!(runs = runs.len(), "Searching unmatched runs for merged matches");

        for run in &runs {
            info!(start = %run.start, end = %run.end, segments = run.len, "Processing unmatched run");

            let Some((offset, size, track)) = self.search_run(source, run, &mut report).await else {
                info!(start = %run.start, end = %run.end, "No merged match for run");
                continue;
            };

            for k in offset..offset + size {
                log.set(
                    run.segment_at(k, segment_length),
                    Segment::new(SegmentStatus::FoundMerged, track.clone()),
                );
            }
            report.merged_runs += 1;
            report.segments_merged += size;
            info!(
                start = %run.segment_at(offset, segment_length),
                end = %run.segment_at(offset + size - 1, segment_length),
                window = size,
                "Merged match: {}",
                track
            );
        }

        info!(
            runs = report.runs,
            merged_runs = report.merged_runs,
            segments = report.segments_merged,
            "Gap merge complete"
        );

        let changed = report.segments_merged > 0;
        PassOutcome::new(log, changed, report)
    }

    /// First recognized window as `(offset, size, track)`
    async fn search_run(
        &self,
        source: &Path,
        run: &GapRun,
        report: &mut GapMergeReport,
    ) -> Option<(usize, usize, String)> {
        let segment_length = self.segmenter.segment_length();

        for size in self.min_window..=run.len {
            for offset in 0..=(run.len - size) {
                let window_start = run.segment_at(offset, segment_length);
                let window_end = run.segment_at(offset + size - 1, segment_length);
                let span_end = window_end.plus(segment_length);

                let merged = match self
                    .segmenter
                    .extended_segment(source, window_start, span_end)
                    .await
                {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(start = %window_start, end = %span_end, "Merged segment failed: {}", e);
                        continue;
                    }
                };

                report.windows_tried += 1;
                match self.recognizer.recognize(&merged).await {
                    Recognition::Found(track) => return Some((offset, size, track)),
                    other => {
                        debug!(start = %window_start, window = size, status = %other.status(), "Window not recognized");
                    }
                }
            }
        }

        None
    }
}
