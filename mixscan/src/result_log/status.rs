//! Per-segment status

use std::fmt;
use std::str::FromStr;

/// Outcome recorded for one segment
///
/// The persisted name of every variant is its `SCREAMING_SNAKE_CASE` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentStatus {
    Found,
    NotFound,
    Timeout,
    Error,
    /// Matched by a merged multi-segment window
    FoundMerged,
    /// Confirmed by extended-context re-recognition
    ValidationValidated,
    ValidationFalsePositive,
    ValidationUncertain,
    /// Adjacent near-duplicate that lost to the authoritative version
    ValidationWrongVersion,
}

impl SegmentStatus {
    pub const ALL: [SegmentStatus; 9] = [
        SegmentStatus::Found,
        SegmentStatus::NotFound,
        SegmentStatus::Timeout,
        SegmentStatus::Error,
        SegmentStatus::FoundMerged,
        SegmentStatus::ValidationValidated,
        SegmentStatus::ValidationFalsePositive,
        SegmentStatus::ValidationUncertain,
        SegmentStatus::ValidationWrongVersion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SegmentStatus::Found => "FOUND",
            SegmentStatus::NotFound => "NOT_FOUND",
            SegmentStatus::Timeout => "TIMEOUT",
            SegmentStatus::Error => "ERROR",
            SegmentStatus::FoundMerged => "FOUND_MERGED",
            SegmentStatus::ValidationValidated => "VALIDATION_VALIDATED",
            SegmentStatus::ValidationFalsePositive => "VALIDATION_FALSE_POSITIVE",
            SegmentStatus::ValidationUncertain => "VALIDATION_UNCERTAIN",
            SegmentStatus::ValidationWrongVersion => "VALIDATION_WRONG_VERSION",
        }
    }

    /// Statuses that contribute to the tracklist
    pub fn is_matched(self) -> bool {
        match self {
            SegmentStatus::Found
            | SegmentStatus::FoundMerged
            | SegmentStatus::ValidationValidated => true,
            SegmentStatus::NotFound
            | SegmentStatus::Timeout
            | SegmentStatus::Error
            | SegmentStatus::ValidationFalsePositive
            | SegmentStatus::ValidationUncertain
            | SegmentStatus::ValidationWrongVersion => false,
        }
    }

    /// Statuses persisted with a track suffix in the scan log
    ///
    /// Validation verdicts keep the original track text for audit even
    /// when they remove it from the tracklist.
    pub fn carries_track(self) -> bool {
        match self {
            SegmentStatus::NotFound | SegmentStatus::Timeout | SegmentStatus::Error => false,
            SegmentStatus::Found
            | SegmentStatus::FoundMerged
            | SegmentStatus::ValidationValidated
            | SegmentStatus::ValidationFalsePositive
            | SegmentStatus::ValidationUncertain
            | SegmentStatus::ValidationWrongVersion => true,
        }
    }

    /// Transient recognition failures eligible for rescan
    pub fn needs_rescan(self) -> bool {
        match self {
            SegmentStatus::Timeout | SegmentStatus::Error => true,
            SegmentStatus::Found
            | SegmentStatus::NotFound
            | SegmentStatus::FoundMerged
            | SegmentStatus::ValidationValidated
            | SegmentStatus::ValidationFalsePositive
            | SegmentStatus::ValidationUncertain
            | SegmentStatus::ValidationWrongVersion => false,
        }
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised status name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown segment status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for SegmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SegmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
