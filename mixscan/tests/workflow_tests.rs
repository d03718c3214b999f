//! Workflow driver tests
//! Test File: workflow_tests.rs
//!
//! Load/commit sequencing, missing-state errors and batch processing.

mod helpers;

use helpers::{
    generate_test_wav, init_test_logging, log_of, merged_name, test_config, touch_audio, ts,
    AudioConfig, FakeSegmenter, MemoryLogStore, ScriptedRecognizer,
};
use mixscan::result_log::{FileLogStore, LogStore, Segment, SegmentStatus};
use mixscan::services::{AudioSegmenter, Recognition};
use mixscan::workflow::{self, PassKind, PassReport, Workflow};
use mixscan::MixscanError;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::Level;

use SegmentStatus::*;

fn workflow(recognizer: ScriptedRecognizer, segmenter: FakeSegmenter) -> Workflow {
    Workflow::new(Arc::new(recognizer), Arc::new(segmenter), test_config())
}

/// Scan writes one entry per slice and replaces whatever was stored
#[tokio::test]
async fn scan_commits_fresh_log() {
    // Given: An old log in the store and a three-slice recording
    let temp = TempDir::new().unwrap();
    let source = touch_audio(temp.path(), "set.mp3");
    let store = MemoryLogStore::with_log(log_of(&[(500, Found, "Old - Entry")]));
    let recognizer = ScriptedRecognizer::new()
        .found("1.wav", "A - One")
        .on("2.wav", Recognition::Timeout)
        .found("3.wav", "A - One");

    // When: Scanned
    let report = workflow(recognizer, FakeSegmenter::new(10, 3))
        .scan(&source, &store)
        .await
        .unwrap();

    // Then: The committed log holds exactly the new slices
    let log = store.current().unwrap();
    assert_eq!(log.header, "===== Scan results for set.mp3 ======");
    assert_eq!(log.len(), 3);
    assert!(log.get(ts(500)).is_none());
    assert_eq!(log.get(ts(10)), Some(&Segment::unmatched(Timeout)));
    assert_eq!((report.segments, report.found, report.unique_tracks), (3, 2, 1));
    assert_eq!(store.commits(), 1);
}

/// Corrective passes need an existing result log
#[tokio::test]
async fn missing_result_log_is_reported() {
    let temp = TempDir::new().unwrap();
    let source = touch_audio(temp.path(), "set.mp3");
    let wf = workflow(ScriptedRecognizer::new(), FakeSegmenter::new(10, 3));

    for kind in [PassKind::Rescan, PassKind::Validate, PassKind::MergeGaps] {
        let store = MemoryLogStore::new();
        let result = wf.run_pass(kind, &source, &store).await;
        assert!(
            matches!(result, Err(MixscanError::ResultFileMissing(_))),
            "{} should need a result log",
            kind
        );
        assert_eq!(store.commits(), 0);
    }
}

/// Passes need the source recording
#[tokio::test]
async fn missing_audio_is_reported() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("gone.mp3");
    let wf = workflow(ScriptedRecognizer::new(), FakeSegmenter::new(10, 3));

    let scan = wf.scan(&source, &MemoryLogStore::new()).await;
    assert!(matches!(scan, Err(MixscanError::AudioFileMissing(_))));

    let store = MemoryLogStore::with_log(log_of(&[(0, Timeout, "")]));
    let rescan = wf.rescan(&source, &store).await;
    assert!(matches!(rescan, Err(MixscanError::AudioFileMissing(_))));
    assert_eq!(store.commits(), 0);
}

/// Validation commits, then wrong-version resolution runs and commits again
#[tokio::test]
async fn validate_runs_wrong_version_resolution() {
    // Given: A confirmed VIP next to a track validation rejects
    let temp = TempDir::new().unwrap();
    let source = touch_audio(temp.path(), "set.mp3");
    let store = MemoryLogStore::with_log(log_of(&[
        (0, Found, "DJ Nova - Skyline"),
        (10, Found, "DJ Nova - Skyline"),
        (20, Found, "DJ Nova - Skyline"),
        (30, Found, "DJ Nova - Skyline"),
        (40, Found, "DJ Nova - Skyline (VIP)"),
        (50, Found, "DJ Nova - Skyline (VIP)"),
        (60, Found, "DJ Nova - Skyline (VIP)"),
        (70, Found, "DJ Nova - Skyline (VIP)"),
    ]));
    let recognizer = ScriptedRecognizer::new().found(&merged_name(0, 80), "DJ Nova - Skyline (VIP)");

    // When: Validated with the default threshold of 3
    let report = workflow(recognizer, FakeSegmenter::new(10, 8))
        .validate(&source, &store)
        .await
        .unwrap();

    // Then: No validation candidates, one resolved pair, two commits
    assert_eq!(report.validation.candidates(), 0);
    assert_eq!(report.wrong_version.resolved(), 1);
    assert_eq!(store.commits(), 2);

    let log = store.current().unwrap();
    assert_eq!(log.status_count(ValidationWrongVersion), 4);
    assert_eq!(log.status_count(ValidationValidated), 4);
}

/// Gap merge through the workflow commits even when nothing was merged
#[tokio::test]
async fn merge_gaps_always_commits() {
    let temp = TempDir::new().unwrap();
    let source = touch_audio(temp.path(), "set.mp3");
    let log = log_of(&[(0, NotFound, ""), (10, NotFound, ""), (20, NotFound, "")]);
    let store = MemoryLogStore::with_log(log.clone());

    let report = workflow(ScriptedRecognizer::new(), FakeSegmenter::new(10, 3))
        .merge_gaps(&source, &store)
        .await
        .unwrap();

    assert_eq!(report.runs, 1);
    assert_eq!(report.merged_runs, 0);
    assert_eq!(store.commits(), 1);
    assert_eq!(store.current(), Some(log));
}

/// Scan then rescan over real audio, with the result log on disk
#[tokio::test]
async fn scan_and_rescan_real_recording() {
    // Given: A 25 second recording cut into 10 second slices
    let temp = TempDir::new().unwrap();
    let downloads = temp.path().join("downloads");
    let results = temp.path().join("lists");
    std::fs::create_dir_all(&downloads).unwrap();
    let source = generate_test_wav(&downloads.join("set.wav"), &AudioConfig::with_duration(25.0)).unwrap();

    let recognizer = ScriptedRecognizer::new()
        .found("1.wav", "A - One")
        .found("2.wav", "A - One")
        .on("3.wav", Recognition::Timeout)
        .found("3.wav", "B - Two");
    let segmenter = AudioSegmenter::new(temp.path().join("segments"), 10, 2);
    let wf = Workflow::new(Arc::new(recognizer), Arc::new(segmenter), test_config());

    // When: Scanned, then rescanned
    let scanned = wf.run_file(PassKind::Scan, &source, &results).await.unwrap();
    let rescanned = wf.run_file(PassKind::Rescan, &source, &results).await.unwrap();

    // Then: The file lists both tracks and no flagged segment remains
    assert!(matches!(scanned, PassReport::Scan(ref r) if r.segments == 3));
    assert!(matches!(rescanned, PassReport::Rescan(ref r) if r.recovered == 1 && r.remaining == 0));

    let text = std::fs::read_to_string(results.join("set.txt")).unwrap();
    assert_eq!(
        text,
        "\
===== Scan results for set.wav ======

===== Tracklist =====
  1 - 00:00:00 - A - One
  2 - 00:00:20 - B - Two

===== Scan Log =====
00:00:00 - FOUND - A - One
00:00:10 - FOUND - A - One
00:00:20 - FOUND - B - Two
"
    );
}

/// A batch runs every audio file and counts failures without stopping
#[tokio::test]
async fn batch_continues_after_failure() {
    // Given: Two recordings, only one with a result log
    let temp = TempDir::new().unwrap();
    let downloads = temp.path().join("downloads");
    let results = temp.path().join("lists");
    std::fs::create_dir_all(&downloads).unwrap();
    let first = touch_audio(&downloads, "a.mp3");
    touch_audio(&downloads, "b.mp3");
    touch_audio(&downloads, "notes.md");
    FileLogStore::new(workflow::result_path(&results, &first))
        .commit(&log_of(&[(0, Timeout, "")]))
        .unwrap();

    let recognizer = ScriptedRecognizer::new().found("1.wav", "A - One");
    let wf = workflow(recognizer, FakeSegmenter::new(10, 1));

    // When: Rescanned as a batch
    let summary = wf.run_batch(PassKind::Rescan, &downloads, &results).await.unwrap();

    // Then: a.mp3 is rescanned, b.mp3 fails for lack of a result log
    assert_eq!((summary.processed, summary.failed), (1, 1));
    let log = FileLogStore::new(results.join("a.txt")).load().unwrap();
    assert_eq!(log.get(ts(0)), Some(&Segment::found("A - One")));
    assert!(!results.join("b.txt").exists());
}

/// An empty downloads directory only warns
#[tokio::test]
async fn empty_batch_warns() {
    let (capture, _guard) = init_test_logging();
    let temp = TempDir::new().unwrap();
    let wf = workflow(ScriptedRecognizer::new(), FakeSegmenter::new(10, 1));

    let summary = wf
        .run_batch(PassKind::Scan, &temp.path().join("downloads"), &temp.path().join("lists"))
        .await
        .unwrap();

    assert_eq!((summary.processed, summary.failed), (0, 0));
    capture.assert_level(Level::WARN, "No audio files found");
}
