//! In-memory stand-ins for the recognition service, the segmenter and the
//! result store

use async_trait::async_trait;
use mixscan::result_log::{LogStore, ResultLog};
use mixscan::services::{Recognition, Recognizer, SegmentError, Segmenter};
use mixscan::{MixscanError, MixscanResult};
use mixscan_common::Timestamp;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Recognizer answering from a per-file-name script
///
/// Each file name has a queue of answers. The last answer in a queue
/// repeats; unscripted files are NOT_FOUND.
#[derive(Default)]
pub struct ScriptedRecognizer {
    script: Mutex<HashMap<String, VecDeque<Recognition>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `answer` to the queue for `file_name`
    pub fn on(self, file_name: &str, answer: Recognition) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(file_name.to_string())
            .or_default()
            .push_back(answer);
        self
    }

    pub fn found(self, file_name: &str, track: &str) -> Self {
        self.on(file_name, Recognition::Found(track.to_string()))
    }

    /// File names recognized so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, file_name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == file_name).count()
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self, audio: &Path) -> Recognition {
        let name = file_name(audio);
        self.calls.lock().unwrap().push(name.clone());

        let mut script = self.script.lock().unwrap();
        match script.get_mut(&name) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Recognition::NotFound),
            Some(queue) => queue.front().cloned().unwrap_or(Recognition::NotFound),
            None => Recognition::NotFound,
        }
    }
}

/// Segmenter that hands out file names without touching audio
///
/// Whole-file slices are `1.wav`..`N.wav`; extended slices are
/// `merged_<HHMMSS>_to_<HHMMSS>.wav` with the requested span recorded.
pub struct FakeSegmenter {
    segment_length: u32,
    slices: usize,
    fail_whole_file: bool,
    failing_spans: HashSet<(Timestamp, Timestamp)>,
    whole_file_calls: Mutex<usize>,
    spans: Mutex<Vec<(Timestamp, Timestamp)>>,
}

impl FakeSegmenter {
    pub fn new(segment_length: u32, slices: usize) -> Self {
        Self {
            segment_length,
            slices,
            fail_whole_file: false,
            failing_spans: HashSet::new(),
            whole_file_calls: Mutex::new(0),
            spans: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_whole_file(mut self) -> Self {
        self.fail_whole_file = true;
        self
    }

    /// Make the extended slice `[start, end)` fail to export
    pub fn failing_span(mut self, start: u32, end: u32) -> Self {
        self.failing_spans
            .insert((Timestamp::from_seconds(start), Timestamp::from_seconds(end)));
        self
    }

    /// Extended spans requested so far, in call order
    pub fn spans(&self) -> Vec<(Timestamp, Timestamp)> {
        self.spans.lock().unwrap().clone()
    }

    pub fn whole_file_calls(&self) -> usize {
        *self.whole_file_calls.lock().unwrap()
    }
}

#[async_trait]
impl Segmenter for FakeSegmenter {
    fn segment_length(&self) -> u32 {
        self.segment_length
    }

    async fn segment_whole_file(&self, source: &Path) -> Result<Vec<PathBuf>, SegmentError> {
        *self.whole_file_calls.lock().unwrap() += 1;
        if self.fail_whole_file {
            return Err(SegmentError::SourceMissing(source.to_path_buf()));
        }
        Ok((1..=self.slices)
            .map(|n| PathBuf::from(format!("{}.wav", n)))
            .collect())
    }

    async fn extended_segment(
        &self,
        source: &Path,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<PathBuf, SegmentError> {
        self.spans.lock().unwrap().push((start, end));
        if self.failing_spans.contains(&(start, end)) {
            return Err(SegmentError::Export {
                path: source.to_path_buf(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(PathBuf::from(merged_name(start.as_seconds(), end.as_seconds())))
    }
}

/// Result store kept in memory, counting commits
#[derive(Default)]
pub struct MemoryLogStore {
    log: Mutex<Option<ResultLog>>,
    commits: Mutex<usize>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: ResultLog) -> Self {
        Self {
            log: Mutex::new(Some(log)),
            commits: Mutex::new(0),
        }
    }

    pub fn current(&self) -> Option<ResultLog> {
        self.log.lock().unwrap().clone()
    }

    pub fn commits(&self) -> usize {
        *self.commits.lock().unwrap()
    }
}

impl LogStore for MemoryLogStore {
    fn exists(&self) -> bool {
        self.log.lock().unwrap().is_some()
    }

    fn load(&self) -> MixscanResult<ResultLog> {
        self.current()
            .ok_or_else(|| MixscanError::ResultFileMissing(PathBuf::from("memory")))
    }

    fn commit(&self, log: &ResultLog) -> MixscanResult<()> {
        *self.log.lock().unwrap() = Some(log.clone());
        *self.commits.lock().unwrap() += 1;
        Ok(())
    }
}

/// File name the fake segmenter uses for an extended slice
pub fn merged_name(start: u32, end: u32) -> String {
    format!(
        "merged_{}_to_{}.wav",
        Timestamp::from_seconds(start).compact(),
        Timestamp::from_seconds(end).compact()
    )
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
