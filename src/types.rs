//! Core types for the Driftcheck pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw rows, normalized records, delta sequences and comparison results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RecordError;

/// Log stream identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Stimulus-presentation client log (decimal seconds)
    Presentation,
    /// Physiological-recording device log (`HH:MM:SS:mmm`)
    Device,
    /// Client-side wall-clock list written by the auto-pulse check
    Client,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Presentation => "presentation",
            Stream::Device => "device",
            Stream::Client => "client",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log row with its columns mapped to named fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number in the source file
    pub line: usize,
    /// Event tag as it appears in the log
    pub tag: String,
    /// Timestamp text, stray markers already stripped
    pub raw_time: String,
}

/// A record with its timestamp converted to milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub tag: String,
    pub time_ms: f64,
    pub line: usize,
}

/// A row that normalization skipped, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub line: usize,
    pub reason: RecordError,
}

/// Output of the normalizer for one log
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStream {
    pub stream: Stream,
    pub records: Vec<NormalizedRecord>,
    pub dropped: Vec<DroppedRecord>,
}

impl NormalizedStream {
    /// Rows dropped because they were malformed (label mismatches excluded)
    pub fn malformed_count(&self) -> usize {
        self.dropped
            .iter()
            .filter(|d| !matches!(d.reason, RecordError::LabelMismatch { .. }))
            .count()
    }
}

/// How records with equal timestamps are ordered after filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// Keep accumulation order
    Stable,
    /// Order equal times by tag
    ByTag,
}

/// How a requested tag is matched against a record tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    /// Compare the first `n` characters of both tags
    Prefix(usize),
    /// Whole-tag equality
    Exact,
}

/// Result of comparing two delta sequences index-by-index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// `|a[i] - b[i]|`, rounded to 2 decimals
    pub per_index_abs_diff: Vec<f64>,
    /// Mean of `per_index_abs_diff`, `None` when there is nothing to compare
    pub mean_ms: Option<f64>,
    /// Indices whose difference reached the warning threshold
    pub warnings: Vec<usize>,
}

impl ComparisonResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Photocell latencies measured in one stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub stream: Stream,
    pub latencies_ms: Vec<f64>,
    pub warnings: Vec<usize>,
    /// `None` when the stream had no photocell detection to pair
    pub mean_ms: Option<f64>,
}

impl LatencySummary {
    pub fn is_no_data(&self) -> bool {
        self.mean_ms.is_none()
    }
}

/// Round half away from zero to `places` decimals
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.1 * 1000.0, 2), 100.0);
        assert_eq!(round_to(12.345_6, 2), 12.35);
        assert_eq!(round_to(-3.25, 1), -3.3);
        assert_eq!(round_to(7.0, 0), 7.0);
    }

    #[test]
    fn test_malformed_count_ignores_label_mismatch() {
        let stream = NormalizedStream {
            stream: Stream::Presentation,
            records: vec![],
            dropped: vec![
                DroppedRecord {
                    line: 1,
                    reason: RecordError::InvalidTimestamp("abc".to_string()),
                },
                DroppedRecord {
                    line: 2,
                    reason: RecordError::LabelMismatch {
                        expected: "data".to_string(),
                        found: "exp".to_string(),
                    },
                },
            ],
        };
        assert_eq!(stream.malformed_count(), 1);
    }

    #[test]
    fn test_stream_serializes_lowercase() {
        let json = serde_json::to_string(&Stream::Device).unwrap();
        assert_eq!(json, "\"device\"");
    }
}
