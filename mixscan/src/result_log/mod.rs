//! Result log: the persisted per-segment recognition history
//!
//! A result log is a header line plus an ordered map from segment timestamp
//! to `{status, track}`. The tracklist is never stored independently; it is
//! derived from the segment map every time it is needed or written.
//!
//! # Persisted layout
//! ```text
//! ===== Scan results for set.mp3 ======
//!
//! ===== Tracklist =====
//!   1 - 00:00:00 - Artist - Title
//!
//! ===== Scan Log =====
//! 00:00:00 - FOUND - Artist - Title
//! 00:00:10 - NOT_FOUND
//! ```

mod format;
pub mod legacy;
mod status;
mod store;

pub use format::{analyze_text_for_rescan, parse, render, LineClassifier, LogLine, Section};
pub use status::{SegmentStatus, UnknownStatus};
pub use store::{analyze_for_rescan, read, write, FileLogStore, LogStore};

use mixscan_common::Timestamp;
use std::collections::btree_map;
use std::collections::{BTreeMap, HashSet};

/// Track text used when a matched segment has no recorded track
pub const UNKNOWN_TRACK: &str = "Unknown Track";

/// Artist shown in the tracklist for tracks without an artist separator
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// One segment's recorded outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub status: SegmentStatus,
    /// `"<artist> - <title>"`, empty unless the status carries a track
    pub track: String,
}

impl Segment {
    pub fn new(status: SegmentStatus, track: impl Into<String>) -> Self {
        Self {
            status,
            track: track.into(),
        }
    }

    pub fn found(track: impl Into<String>) -> Self {
        Self::new(SegmentStatus::Found, track)
    }

    /// Segment with a status that carries no track
    pub fn unmatched(status: SegmentStatus) -> Self {
        Self::new(status, String::new())
    }

    pub fn is_matched(&self) -> bool {
        self.status.is_matched()
    }

    /// Track text as persisted: empty for unmatched statuses, never empty
    /// for statuses that carry a track
    pub fn effective_track(&self) -> &str {
        if !self.status.carries_track() {
            ""
        } else if self.track.is_empty() {
            UNKNOWN_TRACK
        } else {
            &self.track
        }
    }
}

/// Deduplicated tracklist row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracklistEntry {
    /// 1-based position in the tracklist
    pub number: usize,
    /// First segment the track was matched at
    pub timestamp: Timestamp,
    pub track: String,
}

impl TracklistEntry {
    pub fn artist(&self) -> &str {
        split_track(&self.track).0
    }

    pub fn title(&self) -> &str {
        split_track(&self.track).1
    }
}

/// Segments flagged for another recognition attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanPlan {
    /// 1-based segment numbers with TIMEOUT or ERROR status, ascending
    pub segment_numbers: Vec<u32>,
    /// Highest segment number present in the scan log
    pub max_segment_number: u32,
}

impl RescanPlan {
    pub fn is_empty(&self) -> bool {
        self.segment_numbers.is_empty()
    }
}

/// Split `"artist - title"` at the first separator
pub fn split_track(track: &str) -> (&str, &str) {
    match track.split_once(" - ") {
        Some((artist, title)) => (artist, title),
        None => (UNKNOWN_ARTIST, track),
    }
}

/// In-memory result log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultLog {
    /// Header line, stored without surrounding whitespace
    pub header: String,
    segments: BTreeMap<Timestamp, Segment>,
}

impl ResultLog {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into().trim().to_string(),
            segments: BTreeMap::new(),
        }
    }

    /// Header line written for a freshly scanned recording
    pub fn header_for(file_name: &str) -> String {
        format!("===== Scan results for {} ======", file_name)
    }

    pub fn from_segments(
        header: impl Into<String>,
        segments: impl IntoIterator<Item = (Timestamp, Segment)>,
    ) -> Self {
        Self {
            header: header.into().trim().to_string(),
            segments: segments.into_iter().collect(),
        }
    }

    pub fn segments(&self) -> &BTreeMap<Timestamp, Segment> {
        &self.segments
    }

    pub fn get(&self, timestamp: Timestamp) -> Option<&Segment> {
        self.segments.get(&timestamp)
    }

    /// Insert or overwrite a segment, returning the previous value
    pub fn set(&mut self, timestamp: Timestamp, segment: Segment) -> Option<Segment> {
        self.segments.insert(timestamp, segment)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Timestamp, Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Matched segments deduplicated by exact track string, first occurrence order
    pub fn tracklist(&self) -> Vec<TracklistEntry> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut entries = Vec::new();
        for (timestamp, segment) in &self.segments {
            if !segment.is_matched() {
                continue;
            }
            let track = segment.effective_track();
            if seen.insert(track) {
                entries.push(TracklistEntry {
                    number: entries.len() + 1,
                    timestamp: *timestamp,
                    track: track.to_string(),
                });
            }
        }
        entries
    }

    /// TIMEOUT/ERROR segment numbers for the given segment length
    pub fn rescan_plan(&self, segment_length: u32) -> RescanPlan {
        let mut plan = RescanPlan::default();
        for (timestamp, segment) in &self.segments {
            let number = timestamp.segment_number(segment_length);
            plan.max_segment_number = plan.max_segment_number.max(number);
            if segment.status.needs_rescan() {
                plan.segment_numbers.push(number);
            }
        }
        plan
    }

    /// Count of segments per status, for summaries
    pub fn status_count(&self, status: SegmentStatus) -> usize {
        self.segments.values().filter(|s| s.status == status).count()
    }
}
