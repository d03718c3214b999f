//! Retry segments that timed out or errored
//!
//! Per round: SELECT (TIMEOUT/ERROR segments) -> RECOGNIZE -> UPDATE.
//! A result that is no longer TIMEOUT replaces the stored segment; a
//! segment that times out again is left as it was for the next round.

use super::{log_progress, PassOutcome};
use crate::error::MixscanResult;
use crate::result_log::ResultLog;
use crate::services::{Recognition, Recognizer, Segmenter};
use mixscan_common::Timestamp;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Counts from a rescan pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RescanReport {
    /// Rounds run
    pub rounds: u32,
    /// Recognition calls made
    pub attempted: usize,
    /// Segments now FOUND
    pub recovered: usize,
    /// Segments still TIMEOUT or ERROR at the end
    pub remaining: usize,
}

pub struct RescanSelector<'a> {
    recognizer: &'a dyn Recognizer,
    segmenter: &'a dyn Segmenter,
    max_retries: u32,
    cooldown: Duration,
}

impl<'a> RescanSelector<'a> {
    pub fn new(
        recognizer: &'a dyn Recognizer,
        segmenter: &'a dyn Segmenter,
        max_retries: u32,
        cooldown: Duration,
    ) -> Self {
        Self {
            recognizer,
            segmenter,
            max_retries,
            cooldown,
        }
    }

    /// Run up to `max_retries` rounds over `log`
    ///
    /// Fails only when the first round cannot segment the source; a later
    /// segmentation failure ends the pass with what was recovered so far.
    pub async fn run(
        &self,
        source: &Path,
        mut log: ResultLog,
    ) -> MixscanResult<PassOutcome<RescanReport>> {
        let segment_length = self.segmenter.segment_length();
        let mut report = RescanReport::default();
        let mut changed = false;

        for round in 0..self.max_retries {
            let plan = log.rescan_plan(segment_length);
            if plan.is_empty() {
                info!(round = round + 1, "No segments left to rescan");
                break;
            }

            if round >= 1 && !self.cooldown.is_zero() {
                info!(
                    round = round + 1,
                    cooldown_s = self.cooldown.as_secs(),
                    "Waiting before next rescan round"
                );
                tokio::time::sleep(self.cooldown).await;
            }

            info!(
                round = round + 1,
                max_rounds = self.max_retries,
                segments = plan.segment_numbers.len(),
                "Rescanning failed segments"
            );

            let slices = match self.segmenter.segment_whole_file(source).await {
                Ok(slices) => slices,
                Err(e) if round == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(round = round + 1, "Segmentation failed, ending rescan: {}", e);
                    break;
                }
            };

            report.rounds += 1;
            let total = plan.segment_numbers.len();
            for (index, number) in plan.segment_numbers.iter().copied().enumerate() {
                let Some(slice) = slices.get(number as usize - 1) else {
                    warn!(segment = number, slices = slices.len(), "No audio slice for segment");
                    continue;
                };

                let timestamp = Timestamp::from_segment_number(number, segment_length);
                let result = self.recognizer.recognize(slice).await;
                report.attempted += 1;
                log_progress(index + 1, total, timestamp, &result);

                if result == Recognition::Timeout {
                    continue;
                }
                if result.is_found() {
                    report.recovered += 1;
                }
                let segment = result.into_segment();
                let previous = log.set(timestamp, segment.clone());
                if previous.as_ref() != Some(&segment) {
                    changed = true;
                }
            }
        }

        report.remaining = log.rescan_plan(segment_length).segment_numbers.len();
        info!(
            rounds = report.rounds,
            attempted = report.attempted,
            remaining = report.remaining,
            improved = changed,
            "Rescan complete"
        );

        Ok(PassOutcome::new(log, changed, report))
    }
}
