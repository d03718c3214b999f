//! Audio decoding utilities
//!
//! Decodes a recording to mono f32 PCM with symphonia (MP3, FLAC, AAC, WAV,
//! OGG, ...). Slices for recognition are cut from this buffer.

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples, range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    pub duration_seconds: f64,
}

impl DecodedAudio {
    /// Samples covering `[start, end)` seconds, clipped to the buffer
    pub fn slice_seconds(&self, start: u32, end: u32) -> &[f32] {
        let rate = self.sample_rate as usize;
        let len = self.samples.len();
        let from = (start as usize).saturating_mul(rate).min(len);
        let to = (end as usize).saturating_mul(rate).min(len);
        if to <= from {
            &[]
        } else {
            &self.samples[from..to]
        }
    }

    /// Whole seconds of audio, rounded up
    pub fn duration_whole_seconds(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        let rate = self.sample_rate as usize;
        self.samples.len().div_ceil(rate) as u32
    }
}

/// Decode an audio file to mono f32 samples
///
/// Multi-channel audio is mixed down by averaging channels. Decode errors
/// on individual packets are skipped; I/O and probe failures are errors.
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Failed to probe audio file: {}", file_path.display()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Failed to create decoder for: {}", file_path.display()))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(anyhow::anyhow!("Error reading packet: {}", e));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => all_samples.extend(convert_to_mono_f32(&decoded)),
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(path = %file_path.display(), "Skipping corrupt packet: {}", e);
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to decode packet in {}: {}",
                    file_path.display(),
                    e
                ));
            }
        }
    }

    let duration_seconds = all_samples.len() as f64 / sample_rate as f64;

    tracing::debug!(
        path = %file_path.display(),
        total_samples = all_samples.len(),
        duration_seconds = format!("{:.2}", duration_seconds),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels: channel_count,
        duration_seconds,
    })
}

fn convert_to_mono_f32(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::F32(buf) => mix_to_mono(&**buf),
        AudioBufferRef::F64(buf) => mix_to_mono(&**buf),
        AudioBufferRef::U8(buf) => mix_to_mono(&**buf),
        AudioBufferRef::U16(buf) => mix_to_mono(&**buf),
        AudioBufferRef::U24(buf) => mix_to_mono(&**buf),
        AudioBufferRef::U32(buf) => mix_to_mono(&**buf),
        AudioBufferRef::S8(buf) => mix_to_mono(&**buf),
        AudioBufferRef::S16(buf) => mix_to_mono(&**buf),
        AudioBufferRef::S24(buf) => mix_to_mono(&**buf),
        AudioBufferRef::S32(buf) => mix_to_mono(&**buf),
    }
}

/// Average all channels of `buf` into one f32 channel
fn mix_to_mono<S>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count().max(1);
    let num_frames = buf.frames();
    let mut mono = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        mono.push(sum / num_channels as f32);
    }

    mono
}
