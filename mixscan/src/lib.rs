//! mixscan library interface
//!
//! Reconciles per-segment recognition results for long recordings into a
//! deduplicated tracklist. The persisted result log is the state shared
//! between invocations; each pass loads it, corrects it in memory and
//! commits it back.

pub mod config;
pub mod error;
pub mod passes;
pub mod result_log;
pub mod services;
pub mod utils;
pub mod workflow;

pub use crate::error::{MixscanError, MixscanResult};
