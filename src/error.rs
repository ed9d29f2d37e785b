use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

/// Fatal, whole-run failures. Anything per-record is a [`DropReason`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source '{source_tag}' could not be fetched: {reason}")]
    SourceFetch { source_tag: String, reason: String },

    #[error("source '{source_tag}' has no record carrying any of the text fields {fields:?}")]
    SchemaMismatch {
        source_tag: String,
        fields: Vec<String>,
    },

    #[error(
        "label class '{label}' has {members} member(s), too few to stratify across {partitions} partition(s)"
    )]
    InsufficientSamples {
        label: String,
        members: usize,
        partitions: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("logger setup failed: {0}")]
    Logger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Why a single record was left out of the output. Tallied, never fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MalformedLine,
    MissingRequiredField,
    MissingLabel,
    AmbiguousLabel,
    TooShort,
    TooLong,
    Excluded,
    Duplicate,
    Subsampled,
}

impl DropReason {
    pub const ALL: [DropReason; 9] = [
        DropReason::MalformedLine,
        DropReason::MissingRequiredField,
        DropReason::MissingLabel,
        DropReason::AmbiguousLabel,
        DropReason::TooShort,
        DropReason::TooLong,
        DropReason::Excluded,
        DropReason::Duplicate,
        DropReason::Subsampled,
    ];

    pub fn describe(self) -> &'static str {
        match self {
            DropReason::MalformedLine => "malformed line",
            DropReason::MissingRequiredField => "missing text field",
            DropReason::MissingLabel => "missing label",
            DropReason::AmbiguousLabel => "dropped (ambiguous)",
            DropReason::TooShort => "too short",
            DropReason::TooLong => "too long",
            DropReason::Excluded => "excluded by pattern",
            DropReason::Duplicate => "duplicate",
            DropReason::Subsampled => "subsampled away",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
