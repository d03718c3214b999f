//! Symphonia/hound backed segmenter
//!
//! The source is decoded once to mono PCM and cached; slices are written
//! as 16-bit mono WAV files into a scratch directory. Whole-file slicing
//! exports in parallel on the blocking pool.

use super::segmenter::{SegmentError, Segmenter};
use crate::utils::{decode_audio_file, DecodedAudio};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mixscan_common::Timestamp;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Segmenter cutting fixed-length WAV slices from a decoded recording
pub struct AudioSegmenter {
    work_dir: PathBuf,
    segment_length: u32,
    export_workers: usize,
    /// Last decoded source
    cache: Mutex<Option<(PathBuf, Arc<DecodedAudio>)>>,
}

impl AudioSegmenter {
    pub fn new(work_dir: impl Into<PathBuf>, segment_length: u32, export_workers: usize) -> Self {
        Self {
            work_dir: work_dir.into(),
            segment_length: segment_length.max(1),
            export_workers: export_workers.max(1),
            cache: Mutex::new(None),
        }
    }

    /// Remove every exported slice
    pub fn clear_work_dir(&self) -> Result<(), SegmentError> {
        if self.work_dir.exists() {
            std::fs::remove_dir_all(&self.work_dir)?;
        }
        std::fs::create_dir_all(&self.work_dir)?;
        Ok(())
    }

    async fn decoded(&self, source: &Path) -> Result<Arc<DecodedAudio>, SegmentError> {
        if !source.is_file() {
            return Err(SegmentError::SourceMissing(source.to_path_buf()));
        }

        if let Ok(cache) = self.cache.lock() {
            if let Some((path, audio)) = cache.as_ref() {
                if path == source {
                    return Ok(audio.clone());
                }
            }
        }

        let owned = source.to_path_buf();
        let audio = tokio::task::spawn_blocking(move || decode_audio_file(&owned))
            .await
            .map_err(|e| SegmentError::Decode {
                path: source.to_path_buf(),
                message: e.to_string(),
            })?
            .map_err(|e| SegmentError::Decode {
                path: source.to_path_buf(),
                message: format!("{:#}", e),
            })?;
        let audio = Arc::new(audio);

        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some((source.to_path_buf(), audio.clone()));
        }
        Ok(audio)
    }
}

#[async_trait]
impl Segmenter for AudioSegmenter {
    fn segment_length(&self) -> u32 {
        self.segment_length
    }

    async fn segment_whole_file(&self, source: &Path) -> Result<Vec<PathBuf>, SegmentError> {
        let audio = self.decoded(source).await?;
        self.clear_work_dir()?;

        let length = self.segment_length;
        let count = audio.duration_whole_seconds().div_ceil(length);
        tracing::info!(
            source = %source.display(),
            segments = count,
            segment_length = length,
            "Splitting audio into segments"
        );

        let paths: Vec<PathBuf> = (1..=count)
            .map(|number| self.work_dir.join(format!("{}.wav", number)))
            .collect();

        let results: Vec<Result<(), SegmentError>> = stream::iter(paths.iter().cloned().enumerate())
            .map(|(index, path)| {
                let audio = audio.clone();
                async move {
                    let start = index as u32 * length;
                    let target = path.clone();
                    tokio::task::spawn_blocking(move || {
                        write_wav(&target, audio.slice_seconds(start, start + length), audio.sample_rate)
                    })
                    .await
                    .map_err(|e| SegmentError::Export {
                        path,
                        message: e.to_string(),
                    })?
                }
            })
            .buffer_unordered(self.export_workers)
            .collect()
            .await;

        for result in results {
            result?;
        }
        Ok(paths)
    }

    async fn extended_segment(
        &self,
        source: &Path,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<PathBuf, SegmentError> {
        let audio = self.decoded(source).await?;
        let samples = audio.slice_seconds(start.as_seconds(), end.as_seconds());
        if samples.is_empty() {
            return Err(SegmentError::EmptySpan { start, end });
        }

        std::fs::create_dir_all(&self.work_dir)?;
        let path = self
            .work_dir
            .join(format!("merged_{}_to_{}.wav", start.compact(), end.compact()));

        tracing::debug!(
            source = %source.display(),
            start = %start,
            end = %end,
            "Exporting merged segment"
        );

        let target = path.clone();
        let sample_rate = audio.sample_rate;
        let owned = samples.to_vec();
        tokio::task::spawn_blocking(move || write_wav(&target, &owned, sample_rate))
            .await
            .map_err(|e| SegmentError::Export {
                path: path.clone(),
                message: e.to_string(),
            })??;
        Ok(path)
    }
}

/// Write mono f32 samples as 16-bit PCM WAV
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), SegmentError> {
    let export_err = |e: hound::Error| SegmentError::Export {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(export_err)?;
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).map_err(export_err)?;
    }
    writer.finalize().map_err(export_err)
}
