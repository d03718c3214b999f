//! Recording-relative timestamps
//!
//! Segments are keyed by their offset from the start of the recording,
//! rendered as `HH:MM:SS`. The rendering is the on-disk key format of the
//! result log, so `Display` and `FromStr` must round-trip exactly.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Whole-second offset from the start of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u32);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    pub fn as_seconds(self) -> u32 {
        self.0
    }

    /// Start timestamp of the 1-based segment `number`
    pub fn from_segment_number(number: u32, segment_length: u32) -> Self {
        Self(number.saturating_sub(1) * segment_length)
    }

    /// 1-based segment number: `floor(seconds / segment_length) + 1`
    pub fn segment_number(self, segment_length: u32) -> u32 {
        if segment_length == 0 {
            return 1;
        }
        self.0 / segment_length + 1
    }

    pub fn plus(self, seconds: u32) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    /// Subtract, clamping at the start of the recording
    pub fn minus(self, seconds: u32) -> Self {
        Self(self.0.saturating_sub(seconds))
    }

    /// `HHMMSS`, used in generated file names
    pub fn compact(self) -> String {
        let (h, m, s) = self.parts();
        format!("{:02}{:02}{:02}", h, m, s)
    }

    fn parts(self) -> (u32, u32, u32) {
        (self.0 / 3600, (self.0 % 3600) / 60, self.0 % 60)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = self.parts();
        write!(f, "{:02}:{:02}:{:02}", h, m, s)
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    /// Strict `HH:MM:SS` parser. Minutes and seconds must be below 60 so
    /// that every accepted value renders back to the same text.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("malformed timestamp: {:?}", s));

        let mut fields = s.trim().split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid());
        };

        let parse = |field: &str| -> Result<u32> {
            if field.len() < 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            field.parse::<u32>().map_err(|_| invalid())
        };

        let hours = parse(h)?;
        let minutes = parse(m)?;
        let seconds = parse(sec)?;
        if minutes >= 60 || seconds >= 60 || m.len() != 2 || sec.len() != 2 {
            return Err(invalid());
        }
        if h.len() > 2 && h.starts_with('0') {
            return Err(invalid());
        }

        hours
            .checked_mul(3600)
            .and_then(|v| v.checked_add(minutes * 60 + seconds))
            .map(Timestamp)
            .ok_or_else(invalid)
    }
}
