//! Importer for historical result file layouts
//!
//! Older files used different status names for validation verdicts and a
//! tracklist without row numbers. The canonical reader rejects those lines;
//! this importer accepts them and maps them onto the current model, so a
//! file can be migrated once and read canonically afterwards.
//!
//! Accepted on top of the canonical format:
//! - `FOUND_VALIDATED`, `FOUND_FALSE_POSITIVE`, `FOUND_UNCERTAIN` statuses
//! - tracklist rows `00:01:10 - Artist - Title`

use super::format::{LineClassifier, LogLine, Section, SegmentMapBuilder};
use super::{ResultLog, SegmentStatus};
use mixscan_common::Timestamp;

/// Map a historical status name onto the current status set
pub fn legacy_status(name: &str) -> Option<SegmentStatus> {
    match name {
        "FOUND_VALIDATED" => Some(SegmentStatus::ValidationValidated),
        "FOUND_FALSE_POSITIVE" => Some(SegmentStatus::ValidationFalsePositive),
        "FOUND_UNCERTAIN" => Some(SegmentStatus::ValidationUncertain),
        other => other.parse().ok(),
    }
}

/// Parse text in any known layout
pub fn import(text: &str) -> ResultLog {
    let mut classifier = LineClassifier::new();
    let mut builder = SegmentMapBuilder::default();

    for raw in text.lines() {
        let line = match classifier.classify(raw) {
            LogLine::Skip => legacy_line(classifier.section(), raw.trim()).unwrap_or(LogLine::Skip),
            typed => typed,
        };
        builder.accept(line);
    }

    builder.finish()
}

/// True when the text contains lines only the legacy importer understands
pub fn needs_migration(text: &str) -> bool {
    let mut classifier = LineClassifier::new();
    text.lines().any(|raw| {
        matches!(classifier.classify(raw), LogLine::Skip)
            && legacy_line(classifier.section(), raw.trim()).is_some()
    })
}

fn legacy_line(section: Section, line: &str) -> Option<LogLine> {
    match section {
        Section::Tracklist => {
            let (timestamp, track) = line.split_once(" - ")?;
            let timestamp: Timestamp = timestamp.parse().ok()?;
            let track = track.trim();
            (!track.is_empty()).then(|| LogLine::TracklistEntry {
                timestamp,
                track: track.to_string(),
            })
        }
        Section::ScanLog => {
            let (timestamp, rest) = line.split_once(" - ")?;
            let timestamp: Timestamp = timestamp.parse().ok()?;
            let (status, track) = match rest.split_once(" - ") {
                Some((status, track)) => (status, Some(track.trim())),
                None => (rest, None),
            };
            let status = legacy_status(status.trim())?;
            Some(LogLine::ScanEntry {
                timestamp,
                status,
                track: track.filter(|t| !t.is_empty()).map(str::to_string),
            })
        }
        Section::Preamble | Section::Other => None,
    }
}
