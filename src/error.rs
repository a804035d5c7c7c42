//! Error types for Driftcheck

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Stream;

/// Errors that abort a reconciliation call
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Delta sequences differ in length ({left} vs {right}): the event tags did not produce \
         matching counts in both logs. One recording probably missed an event, or the tag \
         lists differ between the two streams."
    )]
    LengthMismatch { left: usize, right: usize },

    #[error("No usable records in {0} log")]
    NoRecords(Stream),

    #[error("Invalid event tag: {0:?}")]
    InvalidTag(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Reasons a single log row is dropped during normalization.
///
/// These never abort a stream; the row is recorded in
/// [`NormalizedStream::dropped`](crate::types::NormalizedStream) and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Row has no column {column} ({field})")]
    MissingField { column: usize, field: &'static str },

    #[error("Invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("Label {found:?} does not match {expected:?}")]
    LabelMismatch { expected: String, found: String },

    #[error("Empty event tag")]
    EmptyTag,
}
