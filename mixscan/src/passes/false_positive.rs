//! False-positive validation of rarely matched tracks
//!
//! A track matched only a few times in a long recording is suspicious. Each
//! such candidate is re-recognized from three extended slices around its
//! first occurrence and classified by how the extended results agree with
//! the original match. The verdict is written at the first occurrence
//! only, which is the segment the extended slices were cut around; later
//! occurrences keep their status. The track text is always preserved.

use super::PassOutcome;
use crate::result_log::{ResultLog, Segment, SegmentStatus};
use crate::services::{ExtensionMode, Recognition, Recognizer, Segmenter};
use mixscan_common::Timestamp;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Suspicion level derived from occurrence count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suspicion {
    High,
    Medium,
    Low,
}

impl Suspicion {
    /// HIGH for 1 occurrence, MEDIUM for 2, LOW otherwise
    pub fn from_count(count: usize) -> Self {
        match count {
            0 | 1 => Suspicion::High,
            2 => Suspicion::Medium,
            _ => Suspicion::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Suspicion::High => "HIGH",
            Suspicion::Medium => "MEDIUM",
            Suspicion::Low => "LOW",
        }
    }
}

impl fmt::Display for Suspicion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Track selected for validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub track: String,
    pub count: usize,
    /// Every FOUND / VALIDATION_VALIDATED timestamp of the track, ascending
    pub positions: Vec<Timestamp>,
    pub suspicion: Suspicion,
}

impl Candidate {
    pub fn first_position(&self) -> Timestamp {
        self.positions.first().copied().unwrap_or_default()
    }
}

/// Tracks with at most `threshold` FOUND / VALIDATION_VALIDATED segments
///
/// Ordered by count ascending, then first timestamp ascending.
pub fn find_candidates(log: &ResultLog, threshold: usize) -> Vec<Candidate> {
    let mut by_track: HashMap<&str, Vec<Timestamp>> = HashMap::new();
    for (timestamp, segment) in log.iter() {
        if matches!(
            segment.status,
            SegmentStatus::Found | SegmentStatus::ValidationValidated
        ) {
            by_track
                .entry(segment.effective_track())
                .or_default()
                .push(*timestamp);
        }
    }

    let mut candidates: Vec<Candidate> = by_track
        .into_iter()
        .filter(|(_, positions)| positions.len() <= threshold)
        .map(|(track, positions)| Candidate {
            track: track.to_string(),
            count: positions.len(),
            suspicion: Suspicion::from_count(positions.len()),
            positions,
        })
        .collect();

    candidates.sort_by_key(|c| (c.count, c.first_position()));
    candidates
}

/// Outcome of cross-checking one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// None of the extended slices was recognized
    NoExtendedRecognition,
    /// At least two extended slices recognized the original track
    ConfirmedValid,
    /// At least two extended slices agree on another track
    LikelyFalsePositive { suggestion: String },
    Uncertain,
}

impl Verdict {
    pub fn status(&self) -> SegmentStatus {
        match self {
            Verdict::NoExtendedRecognition => SegmentStatus::ValidationFalsePositive,
            Verdict::ConfirmedValid => SegmentStatus::ValidationValidated,
            Verdict::LikelyFalsePositive { .. } => SegmentStatus::ValidationFalsePositive,
            Verdict::Uncertain => SegmentStatus::ValidationUncertain,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Verdict::NoExtendedRecognition => "NO_EXTENDED_RECOGNITION",
            Verdict::ConfirmedValid => "CONFIRMED_VALID",
            Verdict::LikelyFalsePositive { .. } => "LIKELY_FALSE_POSITIVE",
            Verdict::Uncertain => "UNCERTAIN",
        }
    }

    pub fn is_false_positive(&self) -> bool {
        self.status() == SegmentStatus::ValidationFalsePositive
    }
}

/// Classify extended recognitions against the original track
///
/// Rules in order, first satisfied wins: no successes; two or more equal to
/// the original; two or more agreeing on another track (the most frequent
/// one, earliest on ties, becomes the suggestion); otherwise uncertain.
pub fn classify(original: &str, extended: &[Recognition]) -> Verdict {
    let found: Vec<&str> = extended.iter().filter_map(Recognition::track).collect();
    if found.is_empty() {
        return Verdict::NoExtendedRecognition;
    }

    if found.iter().filter(|t| **t == original).count() >= 2 {
        return Verdict::ConfirmedValid;
    }

    let mut others: Vec<(&str, usize)> = Vec::new();
    for track in found.iter().filter(|t| **t != original) {
        match others.iter().position(|(t, _)| t == track) {
            Some(i) => others[i].1 += 1,
            None => others.push((*track, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (track, n) in others {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((track, n));
        }
    }

    match best {
        Some((track, n)) if n >= 2 => Verdict::LikelyFalsePositive {
            suggestion: track.to_string(),
        },
        _ => Verdict::Uncertain,
    }
}

/// Candidate with its extended results and verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateVerdict {
    pub candidate: Candidate,
    pub extended: Vec<(ExtensionMode, Recognition)>,
    pub verdict: Verdict,
}

/// Summary of a validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub results: Vec<CandidateVerdict>,
}

impl ValidationReport {
    pub fn candidates(&self) -> usize {
        self.results.len()
    }

    pub fn confirmed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::ConfirmedValid))
    }

    pub fn uncertain(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Uncertain))
    }

    /// `(track, suggested alternative)` for every false positive
    pub fn false_positives(&self) -> Vec<(&str, Option<&str>)> {
        self.results
            .iter()
            .filter(|r| r.verdict.is_false_positive())
            .map(|r| {
                let suggestion = match &r.verdict {
                    Verdict::LikelyFalsePositive { suggestion } => Some(suggestion.as_str()),
                    _ => None,
                };
                (r.candidate.track.as_str(), suggestion)
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&Verdict) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.verdict)).count()
    }

    /// Log the summary at INFO
    pub fn log_summary(&self) {
        info!(
            candidates = self.candidates(),
            high = self.high,
            medium = self.medium,
            low = self.low,
            "Validation candidates"
        );
        for (track, suggestion) in self.false_positives() {
            match suggestion {
                Some(alt) => info!("False positive: {} (suggested: {})", track, alt),
                None => info!("False positive: {}", track),
            }
        }
        info!(
            confirmed = self.confirmed(),
            false_positives = self.false_positives().len(),
            uncertain = self.uncertain(),
            "Validation summary"
        );
    }
}

pub struct FalsePositiveValidator<'a> {
    recognizer: &'a dyn Recognizer,
    segmenter: &'a dyn Segmenter,
    threshold: usize,
    extension_seconds: u32,
}

impl<'a> FalsePositiveValidator<'a> {
    pub fn new(
        recognizer: &'a dyn Recognizer,
        segmenter: &'a dyn Segmenter,
        threshold: usize,
        extension_seconds: u32,
    ) -> Self {
        Self {
            recognizer,
            segmenter,
            threshold,
            extension_seconds,
        }
    }

    pub async fn run(&self, source: &Path, mut log: ResultLog) -> PassOutcome<ValidationReport> {
        let candidates = find_candidates(&log, self.threshold);
        let mut report = ValidationReport::default();
        let mut changed = false;

        info!(
            candidates = candidates.len(),
            threshold = self.threshold,
            "Validating rarely matched tracks"
        );

        for candidate in candidates {
            match candidate.suspicion {
                Suspicion::High => report.high += 1,
                Suspicion::Medium => report.medium += 1,
                Suspicion::Low => report.low += 1,
            }

            let extended = self.recognize_extended(source, &candidate).await;
            let results: Vec<Recognition> = extended.iter().map(|(_, r)| r.clone()).collect();
            let verdict = classify(&candidate.track, &results);

            info!(
                track = %candidate.track,
                count = candidate.count,
                suspicion = %candidate.suspicion,
                verdict = verdict.tag(),
                "Candidate validated"
            );

            let segment = Segment::new(verdict.status(), candidate.track.clone());
            if log.set(candidate.first_position(), segment.clone()).as_ref() != Some(&segment) {
                changed = true;
            }

            report.results.push(CandidateVerdict {
                candidate,
                extended,
                verdict,
            });
        }

        report.log_summary();
        PassOutcome::new(log, changed, report)
    }

    /// Before/after/both slices around the first occurrence, in that order
    async fn recognize_extended(
        &self,
        source: &Path,
        candidate: &Candidate,
    ) -> Vec<(ExtensionMode, Recognition)> {
        let anchor = candidate.first_position();
        let mut results = Vec::with_capacity(ExtensionMode::ALL.len());

        for mode in ExtensionMode::ALL {
            let result = match self
                .segmenter
                .extended_around(source, anchor, mode, self.extension_seconds)
                .await
            {
                Ok(path) => self.recognizer.recognize(&path).await,
                Err(e) => {
                    warn!(anchor = %anchor, mode = %mode, "Extended segment failed: {}", e);
                    Recognition::Error
                }
            };
            results.push((mode, result));
        }

        results
    }
}
