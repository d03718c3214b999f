//! Reconciliation passes
//!
//! Every pass takes a [`ResultLog`] by value, mutates its own copy and
//! returns it in a [`PassOutcome`] together with a changed flag and a
//! pass-specific report. Passes never touch the store; the workflow driver
//! loads before and commits after.
//!
//! Recognition calls are issued one at a time within a pass.

pub mod false_positive;
pub mod gap_merge;
pub mod rescan;
pub mod scan;
pub mod wrong_version;

pub use false_positive::{
    classify, find_candidates, Candidate, CandidateVerdict, FalsePositiveValidator, Suspicion,
    ValidationReport, Verdict,
};
pub use gap_merge::{find_runs, GapMergeReport, GapMerger, GapRun};
pub use rescan::{RescanReport, RescanSelector};
pub use scan::{initial_scan, ScanReport};
pub use wrong_version::{
    compare_entries, detect_pairs, DetectionMethod, PairResolution, WrongVersionPair,
    WrongVersionReport, WrongVersionResolver,
};

use crate::result_log::ResultLog;
use crate::services::Recognition;
use mixscan_common::Timestamp;
use tracing::info;

/// Result of one pass over a log
#[derive(Debug, Clone)]
pub struct PassOutcome<R> {
    pub log: ResultLog,
    /// Whether any segment was written
    pub changed: bool,
    pub report: R,
}

impl<R> PassOutcome<R> {
    pub fn new(log: ResultLog, changed: bool, report: R) -> Self {
        Self { log, changed, report }
    }
}

/// `[idx/total] HH:MM:SS: <track|STATUS>`
fn log_progress(index: usize, total: usize, timestamp: Timestamp, result: &Recognition) {
    match result.track() {
        Some(track) => info!("[{}/{}] {}: {}", index, total, timestamp, track),
        None => info!("[{}/{}] {}: {}", index, total, timestamp, result.status()),
    }
}
