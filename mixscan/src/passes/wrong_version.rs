//! Wrong-version resolution for adjacent near-duplicate tracks
//!
//! Two neighbouring tracklist entries that look like versions of the same
//! song (VIP, remix, live cut, ...) are re-recognized from one merged slice
//! spanning every segment of both, up to the end of the last one. The
//! recognized version is kept; the other is marked VALIDATION_WRONG_VERSION.

use super::PassOutcome;
use crate::result_log::{ResultLog, Segment, SegmentStatus, TracklistEntry};
use crate::services::{Recognition, Recognizer, Segmenter};
use crate::utils::{normalize_artist, normalize_title, primary_artist, sequence_ratio};
use mixscan_common::Timestamp;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Rule that paired two entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    /// Primary artists equal, titles similar
    PrimaryArtistExact,
    /// Artists similar, titles similar
    ArtistFuzzy,
    /// Whole `"artist - title"` strings similar
    CombinedFuzzy,
}

impl DetectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::PrimaryArtistExact => "primary_artist_exact+track_fuzzy",
            DetectionMethod::ArtistFuzzy => "artist_fuzzy+track_fuzzy",
            DetectionMethod::CombinedFuzzy => "combined_fuzzy",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adjacent tracklist entries judged to be the same song
#[derive(Debug, Clone, PartialEq)]
pub struct WrongVersionPair {
    pub first: TracklistEntry,
    pub second: TracklistEntry,
    pub method: DetectionMethod,
    pub score: f64,
}

/// Compare two entries; the first matching rule wins
///
/// Entries with identical artist and title (ignoring case) are never paired.
pub fn compare_entries(
    a: &TracklistEntry,
    b: &TracklistEntry,
    threshold: f64,
) -> Option<(DetectionMethod, f64)> {
    if a.artist().eq_ignore_ascii_case(b.artist()) && a.title().eq_ignore_ascii_case(b.title()) {
        return None;
    }

    let title_similarity = sequence_ratio(&normalize_title(a.title()), &normalize_title(b.title()));

    if primary_artist(a.artist()) == primary_artist(b.artist()) && title_similarity >= threshold {
        return Some((DetectionMethod::PrimaryArtistExact, title_similarity));
    }

    let artist_similarity =
        sequence_ratio(&normalize_artist(a.artist()), &normalize_artist(b.artist()));
    if artist_similarity >= threshold && title_similarity >= threshold {
        return Some((
            DetectionMethod::ArtistFuzzy,
            (artist_similarity + title_similarity) / 2.0,
        ));
    }

    let combined = sequence_ratio(&a.track, &b.track);
    if combined >= threshold {
        return Some((DetectionMethod::CombinedFuzzy, combined));
    }

    None
}

/// Pairs among neighbouring entries only (`i`, `i + 1`)
pub fn detect_pairs(tracklist: &[TracklistEntry], threshold: f64) -> Vec<WrongVersionPair> {
    tracklist
        .windows(2)
        .filter_map(|pair| {
            let (first, second) = (&pair[0], &pair[1]);
            compare_entries(first, second, threshold).map(|(method, score)| WrongVersionPair {
                first: first.clone(),
                second: second.clone(),
                method,
                score,
            })
        })
        .collect()
}

/// How one pair was settled
#[derive(Debug, Clone, PartialEq)]
pub struct PairResolution {
    pub pair: WrongVersionPair,
    /// Track recognized from the merged slice, `None` when unresolved
    pub recognized: Option<String>,
    /// Best similarity of the recognized track to either paired track
    pub confidence: f64,
    pub validated: usize,
    pub wrong_version: usize,
}

impl PairResolution {
    pub fn is_resolved(&self) -> bool {
        self.recognized.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrongVersionReport {
    pub resolutions: Vec<PairResolution>,
}

impl WrongVersionReport {
    pub fn pairs(&self) -> usize {
        self.resolutions.len()
    }

    pub fn resolved(&self) -> usize {
        self.resolutions.iter().filter(|r| r.is_resolved()).count()
    }

    /// Pairs the merged recognition could not settle
    pub fn unresolved(&self) -> Vec<&WrongVersionPair> {
        self.resolutions
            .iter()
            .filter(|r| !r.is_resolved())
            .map(|r| &r.pair)
            .collect()
    }
}

pub struct WrongVersionResolver<'a> {
    recognizer: &'a dyn Recognizer,
    segmenter: &'a dyn Segmenter,
    threshold: f64,
}

impl<'a> WrongVersionResolver<'a> {
    pub fn new(recognizer: &'a dyn Recognizer, segmenter: &'a dyn Segmenter, threshold: f64) -> Self {
        Self {
            recognizer,
            segmenter,
            threshold,
        }
    }

    pub async fn run(&self, source: &Path, mut log: ResultLog) -> PassOutcome<WrongVersionReport> {
        let pairs = detect_pairs(&log.tracklist(), self.threshold);
        let mut report = WrongVersionReport::default();
        let mut changed = false;

        info!(pairs = pairs.len(), "Checking adjacent tracks for wrong versions");

        for pair in pairs {
            info!(
                first = %pair.first.track,
                second = %pair.second.track,
                method = %pair.method,
                score = format!("{:.3}", pair.score),
                "Possible wrong version"
            );

            let resolution = self.resolve(source, &mut log, pair).await;
            if resolution.validated + resolution.wrong_version > 0 {
                changed = true;
            }
            report.resolutions.push(resolution);
        }

        for pair in report.unresolved() {
            warn!(first = %pair.first.track, second = %pair.second.track, "Wrong-version pair unresolved");
        }
        info!(
            pairs = report.pairs(),
            resolved = report.resolved(),
            "Wrong-version resolution complete"
        );

        PassOutcome::new(log, changed, report)
    }

    async fn resolve(
        &self,
        source: &Path,
        log: &mut ResultLog,
        pair: WrongVersionPair,
    ) -> PairResolution {
        let mut resolution = PairResolution {
            pair,
            recognized: None,
            confidence: 0.0,
            validated: 0,
            wrong_version: 0,
        };

        let gathered: Vec<Timestamp> = log
            .iter()
            .filter(|(_, segment)| {
                segment.is_matched()
                    && (segment.track == resolution.pair.first.track
                        || segment.track == resolution.pair.second.track)
            })
            .map(|(timestamp, _)| *timestamp)
            .collect();

        let (Some(start), Some(last)) = (gathered.first().copied(), gathered.last().copied()) else {
            warn!("No matched segments left for pair");
            return resolution;
        };
        let end = last.plus(self.segmenter.segment_length());

        let merged = match self.segmenter.extended_segment(source, start, end).await {
            Ok(path) => path,
            Err(e) => {
                warn!(start = %start, end = %end, "Merged segment failed: {}", e);
                return resolution;
            }
        };

        let track = match self.recognizer.recognize(&merged).await {
            Recognition::Found(track) => track,
            other => {
                warn!(start = %start, end = %end, status = %other.status(), "Merged segment not recognized");
                return resolution;
            }
        };

        resolution.confidence = sequence_ratio(&track, &resolution.pair.first.track)
            .max(sequence_ratio(&track, &resolution.pair.second.track));

        for timestamp in gathered {
            let Some(current) = log.get(timestamp) else {
                continue;
            };
            let status = if current.track == track {
                resolution.validated += 1;
                SegmentStatus::ValidationValidated
            } else {
                resolution.wrong_version += 1;
                SegmentStatus::ValidationWrongVersion
            };
            let segment = Segment::new(status, current.track.clone());
            log.set(timestamp, segment);
        }

        info!(
            recognized = %track,
            confidence = format!("{:.3}", resolution.confidence),
            validated = resolution.validated,
            wrong_version = resolution.wrong_version,
            "Wrong version resolved"
        );
        resolution.recognized = Some(track);
        resolution
    }
}
