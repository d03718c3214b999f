//! # mixscan common library
//!
//! Shared code for the mixscan workspace:
//! - Error types
//! - Recording-relative timestamps
//! - Configuration loading
//! - Logging setup

pub mod config;
pub mod error;
pub mod logging;
pub mod timestamp;

pub use error::{Error, Result};
pub use timestamp::Timestamp;
