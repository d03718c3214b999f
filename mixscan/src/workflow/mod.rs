//! Per-recording workflow driver
//!
//! Sequences the passes against a [`LogStore`]: load, run one pass on the
//! in-memory log, commit. Validation commits its own result and then always
//! runs wrong-version resolution, which commits again.
//!
//! Batch mode runs one pass over every audio file in the downloads
//! directory. A failure on one file is logged and does not stop the batch.

pub mod steps;

pub use steps::{parse_steps, Step, StepError};

use crate::config::ScanConfig;
use crate::error::{MixscanError, MixscanResult};
use crate::passes::{
    initial_scan, FalsePositiveValidator, GapMergeReport, GapMerger, RescanReport, RescanSelector,
    ScanReport, ValidationReport, WrongVersionReport, WrongVersionResolver,
};
use crate::result_log::{legacy, FileLogStore, LogStore, ResultLog};
use crate::services::{Recognizer, Segmenter};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Audio extensions picked up from the downloads directory
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "flac", "m4a", "ogg"];

/// Extension of result log files
pub const RESULT_EXTENSION: &str = "txt";

/// Pass selectable per file or per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Scan,
    Rescan,
    Validate,
    MergeGaps,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassKind::Scan => "scan",
            PassKind::Rescan => "rescan",
            PassKind::Validate => "validate",
            PassKind::MergeGaps => "merge-gaps",
        })
    }
}

/// Reports from validation and the wrong-version resolution it triggers
#[derive(Debug, Clone, Default)]
pub struct ValidateReport {
    pub validation: ValidationReport,
    pub wrong_version: WrongVersionReport,
}

/// Per-pass report, as returned by [`Workflow::run_pass`]
#[derive(Debug, Clone)]
pub enum PassReport {
    Scan(ScanReport),
    Rescan(RescanReport),
    Validate(ValidateReport),
    MergeGaps(GapMergeReport),
}

/// Files processed by a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

pub struct Workflow {
    recognizer: Arc<dyn Recognizer>,
    segmenter: Arc<dyn Segmenter>,
    config: ScanConfig,
}

impl Workflow {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        segmenter: Arc<dyn Segmenter>,
        config: ScanConfig,
    ) -> Self {
        Self {
            recognizer,
            segmenter,
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Initial full pass; replaces any existing log
    pub async fn scan(&self, source: &Path, store: &dyn LogStore) -> MixscanResult<ScanReport> {
        require_audio(source)?;
        let started_at = Utc::now();

        let header = ResultLog::header_for(&file_name(source));
        let outcome =
            initial_scan(source, header, self.recognizer.as_ref(), self.segmenter.as_ref()).await?;
        store.commit(&outcome.log)?;

        log_finished(PassKind::Scan, source, started_at);
        Ok(outcome.report)
    }

    pub async fn rescan(&self, source: &Path, store: &dyn LogStore) -> MixscanResult<RescanReport> {
        let log = store.load()?;
        require_audio(source)?;
        let started_at = Utc::now();

        let selector = RescanSelector::new(
            self.recognizer.as_ref(),
            self.segmenter.as_ref(),
            self.config.max_retries,
            self.config.rescan_cooldown,
        );
        let outcome = selector.run(source, log).await?;
        store.commit(&outcome.log)?;

        log_finished(PassKind::Rescan, source, started_at);
        Ok(outcome.report)
    }

    /// False-positive validation followed by wrong-version resolution
    pub async fn validate(
        &self,
        source: &Path,
        store: &dyn LogStore,
    ) -> MixscanResult<ValidateReport> {
        let log = store.load()?;
        require_audio(source)?;
        let started_at = Utc::now();

        let validator = FalsePositiveValidator::new(
            self.recognizer.as_ref(),
            self.segmenter.as_ref(),
            self.config.validation_threshold,
            self.config.extension_seconds,
        );
        let validated = validator.run(source, log).await;
        store.commit(&validated.log)?;

        let resolver = WrongVersionResolver::new(
            self.recognizer.as_ref(),
            self.segmenter.as_ref(),
            self.config.similarity_threshold,
        );
        let resolved = resolver.run(source, validated.log).await;
        store.commit(&resolved.log)?;

        log_finished(PassKind::Validate, source, started_at);
        Ok(ValidateReport {
            validation: validated.report,
            wrong_version: resolved.report,
        })
    }

    pub async fn merge_gaps(
        &self,
        source: &Path,
        store: &dyn LogStore,
    ) -> MixscanResult<GapMergeReport> {
        let log = store.load()?;
        require_audio(source)?;
        let started_at = Utc::now();

        let merger = GapMerger::new(
            self.recognizer.as_ref(),
            self.segmenter.as_ref(),
            self.config.min_consecutive,
            self.config.min_window,
        );
        let outcome = merger.run(source, log).await;
        store.commit(&outcome.log)?;

        log_finished(PassKind::MergeGaps, source, started_at);
        Ok(outcome.report)
    }

    pub async fn run_pass(
        &self,
        kind: PassKind,
        source: &Path,
        store: &dyn LogStore,
    ) -> MixscanResult<PassReport> {
        Ok(match kind {
            PassKind::Scan => PassReport::Scan(self.scan(source, store).await?),
            PassKind::Rescan => PassReport::Rescan(self.rescan(source, store).await?),
            PassKind::Validate => PassReport::Validate(self.validate(source, store).await?),
            PassKind::MergeGaps => PassReport::MergeGaps(self.merge_gaps(source, store).await?),
        })
    }

    /// Run `kind` on one audio file with its result log in `results_dir`
    pub async fn run_file(
        &self,
        kind: PassKind,
        source: &Path,
        results_dir: &Path,
    ) -> MixscanResult<PassReport> {
        let store = FileLogStore::new(result_path(results_dir, source));
        self.run_pass(kind, source, &store).await
    }

    /// Run `kind` over every audio file in `downloads_dir`
    pub async fn run_batch(
        &self,
        kind: PassKind,
        downloads_dir: &Path,
        results_dir: &Path,
    ) -> MixscanResult<BatchSummary> {
        let files = audio_files(downloads_dir)?;
        let mut summary = BatchSummary::default();

        if files.is_empty() {
            warn!(dir = %downloads_dir.display(), "No audio files found");
            return Ok(summary);
        }

        let total = files.len();
        for (index, source) in files.iter().enumerate() {
            info!(pass = %kind, "[{}/{}] {}", index + 1, total, file_name(source));
            match self.run_file(kind, source, results_dir).await {
                Ok(_) => summary.processed += 1,
                Err(e) => {
                    error!(pass = %kind, file = %source.display(), "Pass failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            pass = %kind,
            processed = summary.processed,
            failed = summary.failed,
            "Batch complete"
        );
        Ok(summary)
    }
}

/// Rewrite a result file in canonical form if it uses a historical layout
///
/// Returns whether the file was rewritten.
pub fn migrate(path: &Path) -> MixscanResult<bool> {
    if !path.is_file() {
        return Err(MixscanError::ResultFileMissing(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path)?;
    if !legacy::needs_migration(&text) {
        info!(file = %path.display(), "Already in canonical format");
        return Ok(false);
    }

    let log = legacy::import(&text);
    FileLogStore::new(path).commit(&log)?;
    info!(file = %path.display(), segments = log.len(), "Result file migrated");
    Ok(true)
}

/// Result files (`*.txt`) in `results_dir`, sorted
pub fn result_files(results_dir: &Path) -> MixscanResult<Vec<PathBuf>> {
    files_with_extensions(results_dir, &[RESULT_EXTENSION])
}

/// Audio files directly inside `dir`, sorted by path
pub fn audio_files(dir: &Path) -> MixscanResult<Vec<PathBuf>> {
    files_with_extensions(dir, &AUDIO_EXTENSIONS)
}

/// `<results_dir>/<audio stem>.txt`
pub fn result_path(results_dir: &Path, audio: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    results_dir.join(format!("{}.{}", stem, RESULT_EXTENSION))
}

fn files_with_extensions(dir: &Path, extensions: &[&str]) -> MixscanResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let matches = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
                    .unwrap_or(false);
                if matches {
                    files.push(entry.path().to_path_buf());
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Error accessing entry: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

fn require_audio(source: &Path) -> MixscanResult<()> {
    if source.is_file() {
        Ok(())
    } else {
        Err(MixscanError::AudioFileMissing(source.to_path_buf()))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn log_finished(kind: PassKind, source: &Path, started_at: DateTime<Utc>) {
    let elapsed = Utc::now().signed_duration_since(started_at);
    info!(
        pass = %kind,
        file = %file_name(source),
        elapsed_s = elapsed.num_seconds(),
        "Pass finished"
    );
}
