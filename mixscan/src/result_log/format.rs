//! Canonical text format of the result log
//!
//! Reading is driven by [`LineClassifier`], a small state machine that maps
//! section markers to a [`Section`] and content lines to typed records.
//! Anything it cannot type is [`LogLine::Skip`]; the reader never fails on
//! malformed content.

use super::{split_track, ResultLog, RescanPlan, Segment, SegmentStatus, UNKNOWN_TRACK};
use mixscan_common::Timestamp;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub(crate) const SECTION_PREFIX: &str = "=====";
pub(crate) const TRACKLIST_MARKER: &str = "===== Tracklist =====";
pub(crate) const SCAN_LOG_MARKER: &str = "===== Scan Log =====";

/// Region of the file the classifier is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Before any section marker (header lives here)
    Preamble,
    Tracklist,
    ScanLog,
    /// After an unrecognised `=====` marker
    Other,
}

/// Typed view of one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Header(String),
    SectionStart(Section),
    TracklistEntry {
        timestamp: Timestamp,
        track: String,
    },
    ScanEntry {
        timestamp: Timestamp,
        status: SegmentStatus,
        track: Option<String>,
    },
    Skip,
}

/// Line-by-line classifier for the canonical format
#[derive(Debug)]
pub struct LineClassifier {
    section: Section,
    header_seen: bool,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LineClassifier {
    pub fn new() -> Self {
        Self {
            section: Section::Preamble,
            header_seen: false,
        }
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn classify(&mut self, raw: &str) -> LogLine {
        let line = raw.trim();

        if let Some(section) = self.section_marker(line) {
            return section;
        }
        if line.is_empty() {
            return LogLine::Skip;
        }

        match self.section {
            Section::Preamble if !self.header_seen => {
                self.header_seen = true;
                LogLine::Header(line.to_string())
            }
            Section::Preamble | Section::Other => LogLine::Skip,
            Section::Tracklist => parse_tracklist_line(line).unwrap_or(LogLine::Skip),
            Section::ScanLog => parse_scan_line(line).unwrap_or(LogLine::Skip),
        }
    }

    fn section_marker(&mut self, line: &str) -> Option<LogLine> {
        let next = if line == TRACKLIST_MARKER {
            Section::Tracklist
        } else if line == SCAN_LOG_MARKER {
            Section::ScanLog
        } else if line.starts_with(SECTION_PREFIX) {
            // The first banner line before any section is the header
            if self.section == Section::Preamble && !self.header_seen {
                return None;
            }
            Section::Other
        } else {
            return None;
        };
        self.section = next;
        Some(LogLine::SectionStart(next))
    }
}

/// `"  1 - 00:01:10 - Artist - Title"`
fn parse_tracklist_line(line: &str) -> Option<LogLine> {
    let (number, rest) = line.split_once(" - ")?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (timestamp, track) = rest.split_once(" - ")?;
    let timestamp: Timestamp = timestamp.parse().ok()?;
    let track = track.trim();
    if track.is_empty() {
        return None;
    }
    Some(LogLine::TracklistEntry {
        timestamp,
        track: track.to_string(),
    })
}

/// `"00:00:10 - STATUS"` or `"00:00:10 - STATUS - Artist - Title"`
fn parse_scan_line(line: &str) -> Option<LogLine> {
    let (timestamp, rest) = line.split_once(" - ")?;
    let timestamp: Timestamp = timestamp.parse().ok()?;
    let (status, track) = match rest.split_once(" - ") {
        Some((status, track)) => (status, Some(track.trim())),
        None => (rest, None),
    };
    let status: SegmentStatus = status.trim().parse().ok()?;
    Some(LogLine::ScanEntry {
        timestamp,
        status,
        track: track.filter(|t| !t.is_empty()).map(str::to_string),
    })
}

/// Accumulates classified lines into a segment map
///
/// Scan log entries are authoritative; a tracklist entry only supplies a
/// missing track, or creates a FOUND segment when the scan log has no line
/// for its timestamp.
#[derive(Debug, Default)]
pub(crate) struct SegmentMapBuilder {
    header: String,
    scan: BTreeMap<Timestamp, Segment>,
    tracklist: BTreeMap<Timestamp, String>,
}

impl SegmentMapBuilder {
    pub(crate) fn accept(&mut self, line: LogLine) {
        match line {
            LogLine::Header(header) => self.header = header,
            LogLine::TracklistEntry { timestamp, track } => {
                self.tracklist.entry(timestamp).or_insert(track);
            }
            LogLine::ScanEntry {
                timestamp,
                status,
                track,
            } => {
                let track = if status.carries_track() {
                    track.unwrap_or_default()
                } else {
                    String::new()
                };
                self.scan.insert(timestamp, Segment::new(status, track));
            }
            LogLine::SectionStart(_) | LogLine::Skip => {}
        }
    }

    pub(crate) fn finish(mut self) -> ResultLog {
        for (timestamp, track) in self.tracklist {
            match self.scan.entry(timestamp) {
                Entry::Occupied(mut entry) => {
                    let segment = entry.get_mut();
                    if segment.status.carries_track() && segment.track.is_empty() {
                        segment.track = track;
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(Segment::found(track));
                }
            }
        }

        for segment in self.scan.values_mut() {
            if segment.status.carries_track() && segment.track.is_empty() {
                segment.track = UNKNOWN_TRACK.to_string();
            }
        }

        ResultLog::from_segments(self.header, self.scan)
    }
}

/// Parse canonical result log text; malformed lines are skipped
pub fn parse(text: &str) -> ResultLog {
    let mut classifier = LineClassifier::new();
    let mut builder = SegmentMapBuilder::default();
    for line in text.lines() {
        builder.accept(classifier.classify(line));
    }
    builder.finish()
}

/// Render the full canonical text, regenerating the tracklist from the
/// segment map
pub fn render(log: &ResultLog) -> String {
    let mut out = String::new();
    out.push_str(log.header.trim());
    out.push_str("\n\n");

    out.push_str(TRACKLIST_MARKER);
    out.push('\n');
    for entry in log.tracklist() {
        let (artist, title) = split_track(&entry.track);
        out.push_str(&format!(
            "{:>3} - {} - {} - {}\n",
            entry.number, entry.timestamp, artist, title
        ));
    }

    out.push('\n');
    out.push_str(SCAN_LOG_MARKER);
    out.push('\n');
    for (timestamp, segment) in log.iter() {
        let track = segment.effective_track();
        if track.is_empty() {
            out.push_str(&format!("{} - {}\n", timestamp, segment.status));
        } else {
            out.push_str(&format!("{} - {} - {}\n", timestamp, segment.status, track));
        }
    }
    out
}

/// Collect TIMEOUT/ERROR segment numbers from scan log lines only
pub fn analyze_text_for_rescan(text: &str, segment_length: u32) -> RescanPlan {
    let mut classifier = LineClassifier::new();
    let mut flagged: BTreeMap<u32, bool> = BTreeMap::new();

    for line in text.lines() {
        if let LogLine::ScanEntry {
            timestamp, status, ..
        } = classifier.classify(line)
        {
            flagged.insert(timestamp.segment_number(segment_length), status.needs_rescan());
        }
    }

    RescanPlan {
        max_segment_number: flagged.keys().next_back().copied().unwrap_or(0),
        segment_numbers: flagged
            .into_iter()
            .filter_map(|(number, needs)| needs.then_some(number))
            .collect(),
    }
}
