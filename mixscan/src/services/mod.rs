//! External collaborators of the reconciliation passes
//!
//! - Recognizer contract, retry policy and HTTP backend
//! - Segmenter contract and the symphonia/hound implementation
//! - yt-dlp downloader

pub mod audio_segmenter;
pub mod downloader;
pub mod http_client;
pub mod recognizer;
pub mod segmenter;

pub use audio_segmenter::AudioSegmenter;
pub use downloader::{is_url, DownloadError, Downloader, MediaSource};
pub use http_client::HttpRecognitionClient;
pub use recognizer::{
    BackendError, Recognition, RecognitionBackend, Recognizer, RetryPolicy, RetryingRecognizer,
};
pub use segmenter::{ExtensionMode, SegmentError, Segmenter};
