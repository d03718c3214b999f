//! Command-line step parsing
//!
//! Steps run left to right. Optional file arguments are taken from the next
//! token unless it is itself a step name.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Scan,
    Rescan,
    Validate(Option<PathBuf>),
    MergeGaps(Option<PathBuf>),
    Migrate(Option<PathBuf>),
    Download(String),
    /// Local audio file or URL
    Recognize(String),
}

impl Step {
    /// Whether the step calls the recognition service
    pub fn needs_recognizer(&self) -> bool {
        !matches!(self, Step::Migrate(_))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("No steps given")]
    Empty,

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Step '{0}' requires an argument")]
    MissingArgument(&'static str),
}

const STEP_NAMES: [&str; 7] = [
    "scan",
    "rescan",
    "validate",
    "merge-gaps",
    "migrate",
    "download",
    "recognize",
];

fn is_step_name(token: &str) -> bool {
    STEP_NAMES.contains(&token)
}

pub fn parse_steps(tokens: &[String]) -> Result<Vec<Step>, StepError> {
    if tokens.is_empty() {
        return Err(StepError::Empty);
    }

    let mut steps = Vec::new();
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        let mut optional_path = || {
            iter.next_if(|next| !is_step_name(next))
                .map(PathBuf::from)
        };

        let step = match token.as_str() {
            "scan" => Step::Scan,
            "rescan" => Step::Rescan,
            "validate" => Step::Validate(optional_path()),
            "merge-gaps" => Step::MergeGaps(optional_path()),
            "migrate" => Step::Migrate(optional_path()),
            "download" => Step::Download(
                optional_path()
                    .map(|p| p.to_string_lossy().into_owned())
                    .ok_or(StepError::MissingArgument("download"))?,
            ),
            "recognize" => Step::Recognize(
                optional_path()
                    .map(|p| p.to_string_lossy().into_owned())
                    .ok_or(StepError::MissingArgument("recognize"))?,
            ),
            other => return Err(StepError::UnknownStep(other.to_string())),
        };
        steps.push(step);
    }

    Ok(steps)
}
