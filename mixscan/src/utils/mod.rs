//! Utility modules for mixscan

pub mod audio_decoder;
pub mod similarity;

pub use audio_decoder::{decode_audio_file, DecodedAudio};
pub use similarity::{normalize_artist, normalize_title, primary_artist, sequence_ratio};
