//! Log stream adapters
//!
//! This module provides adapters that map positional log rows to named-field
//! records and supply the per-stream timestamp parser, so one pipeline can
//! serve both the presentation and the device log.

mod device;
mod presentation;

pub use device::DeviceAdapter;
pub use presentation::PresentationAdapter;

use crate::error::RecordError;
use crate::types::{RawRecord, Stream, TieBreak};

/// Trait for log stream adapters
pub trait StreamAdapter {
    /// Which stream this adapter reads
    fn stream(&self) -> Stream;

    /// Map one row to a named-field record; `line` is 1-based
    fn extract(&self, line: usize, fields: &[String]) -> Result<RawRecord, RecordError>;

    /// Convert a record's timestamp text to milliseconds
    fn parse_time(&self, raw: &str) -> Result<f64, RecordError>;

    /// Decimal places kept on inter-event deltas, `None` for exact values
    fn delta_places(&self) -> Option<i32>;

    /// Ordering of equal timestamps after filtering
    fn tie_break(&self) -> TieBreak;
}

/// Fetch a column or report which one is missing
pub(crate) fn column<'a>(
    fields: &'a [String],
    column: usize,
    field: &'static str,
) -> Result<&'a str, RecordError> {
    fields
        .get(column)
        .map(String::as_str)
        .ok_or(RecordError::MissingField { column, field })
}
