//! Rescan pass tests
//! Test File: rescan_tests.rs
//!
//! Round selection, TIMEOUT handling and termination of the rescan pass.

mod helpers;

use helpers::{init_test_logging, log_of, ts, FakeSegmenter, ScriptedRecognizer};
use mixscan::passes::RescanSelector;
use mixscan::result_log::{Segment, SegmentStatus};
use mixscan::services::Recognition;
use mixscan::MixscanError;
use std::path::Path;
use std::time::Duration;

use SegmentStatus::*;

const SOURCE: &str = "downloads/set.mp3";

/// Only TIMEOUT and ERROR segments are retried, across rounds
#[tokio::test]
async fn retries_flagged_segments_until_recovered() {
    // Given: Segment 2 times out once more, segment 3 errors then is not found
    let log = log_of(&[
        (0, Found, "A - One"),
        (10, Timeout, ""),
        (20, Error, ""),
        (30, NotFound, ""),
    ]);
    let recognizer = ScriptedRecognizer::new()
        .on("2.wav", Recognition::Timeout)
        .found("2.wav", "B - Two")
        .on("3.wav", Recognition::NotFound);
    let segmenter = FakeSegmenter::new(10, 4);

    // When: Rescanned with two rounds
    let selector = RescanSelector::new(&recognizer, &segmenter, 2, Duration::ZERO);
    let outcome = selector.run(Path::new(SOURCE), log).await.unwrap();

    // Then: Round 1 settles segment 3, round 2 recovers segment 2
    assert_eq!(recognizer.calls(), vec!["2.wav", "3.wav", "2.wav"]);
    assert_eq!(outcome.log.get(ts(10)), Some(&Segment::found("B - Two")));
    assert_eq!(outcome.log.get(ts(20)), Some(&Segment::unmatched(NotFound)));
    assert_eq!(outcome.log.get(ts(0)), Some(&Segment::found("A - One")));
    assert!(outcome.changed);
    assert_eq!(outcome.report.rounds, 2);
    assert_eq!(outcome.report.attempted, 3);
    assert_eq!(outcome.report.recovered, 1);
    assert_eq!(outcome.report.remaining, 0);
}

/// A segment that keeps timing out is left exactly as it was
#[tokio::test]
async fn repeated_timeout_leaves_segment_untouched() {
    // Given: An ERROR segment whose retries all time out
    let log = log_of(&[(0, Found, "A - One"), (10, Error, "")]);
    let recognizer = ScriptedRecognizer::new().on("2.wav", Recognition::Timeout);
    let segmenter = FakeSegmenter::new(10, 2);

    // When: Rescanned with three rounds
    let selector = RescanSelector::new(&recognizer, &segmenter, 3, Duration::ZERO);
    let outcome = selector.run(Path::new(SOURCE), log.clone()).await.unwrap();

    // Then: The stored ERROR is kept and nothing changed
    assert_eq!(outcome.log, log);
    assert!(!outcome.changed);
    assert_eq!(outcome.report.rounds, 3);
    assert_eq!(recognizer.call_count("2.wav"), 3);
    assert_eq!(outcome.report.remaining, 1);
}

/// The pass stops as soon as nothing is flagged
#[tokio::test]
async fn stops_early_when_nothing_left() {
    // Given: One TIMEOUT segment that recovers on the first retry
    let log = log_of(&[(0, Timeout, ""), (10, Found, "B - Two")]);
    let recognizer = ScriptedRecognizer::new().found("1.wav", "A - One");
    let segmenter = FakeSegmenter::new(10, 2);

    // When: Rescanned with five rounds allowed
    let selector = RescanSelector::new(&recognizer, &segmenter, 5, Duration::from_secs(60));
    let outcome = selector.run(Path::new(SOURCE), log).await.unwrap();

    // Then: One round ran and the cooldown was never needed
    assert_eq!(outcome.report.rounds, 1);
    assert_eq!(segmenter.whole_file_calls(), 1);
    assert_eq!(outcome.log.get(ts(0)), Some(&Segment::found("A - One")));
}

/// A log without flagged segments needs no segmentation at all
#[tokio::test]
async fn clean_log_is_not_rescanned() {
    let log = log_of(&[(0, Found, "A - One"), (10, NotFound, "")]);
    let recognizer = ScriptedRecognizer::new();
    let segmenter = FakeSegmenter::new(10, 2);

    let selector = RescanSelector::new(&recognizer, &segmenter, 2, Duration::ZERO);
    let outcome = selector.run(Path::new(SOURCE), log).await.unwrap();

    assert_eq!(outcome.report.rounds, 0);
    assert_eq!(segmenter.whole_file_calls(), 0);
    assert!(recognizer.calls().is_empty());
    assert!(!outcome.changed);
}

/// Segmentation failure before the first round fails the pass
#[tokio::test]
async fn first_round_segmentation_failure_is_error() {
    let log = log_of(&[(0, Timeout, "")]);
    let recognizer = ScriptedRecognizer::new();
    let segmenter = FakeSegmenter::new(10, 1).failing_whole_file();

    let selector = RescanSelector::new(&recognizer, &segmenter, 2, Duration::ZERO);
    let result = selector.run(Path::new(SOURCE), log).await;

    assert!(matches!(result, Err(MixscanError::Segmenter(_))));
}

/// Each rescanned segment logs a progress line
#[tokio::test]
async fn progress_lines_are_logged() {
    // Given: Log capture on this thread
    let (capture, _guard) = init_test_logging();
    let log = log_of(&[(0, Timeout, ""), (10, Error, "")]);
    let recognizer = ScriptedRecognizer::new()
        .found("1.wav", "A - One")
        .on("2.wav", Recognition::Timeout);
    let segmenter = FakeSegmenter::new(10, 2);

    // When: One round runs
    let selector = RescanSelector::new(&recognizer, &segmenter, 1, Duration::ZERO);
    selector.run(Path::new(SOURCE), log).await.unwrap();

    // Then: "[i/n] HH:MM:SS: track|STATUS" per segment
    capture.assert_contains("[1/2] 00:00:00: A - One");
    capture.assert_contains("[2/2] 00:00:10: TIMEOUT");
    capture.assert_contains("Rescan complete");
}
