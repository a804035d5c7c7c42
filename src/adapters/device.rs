//! Device log adapter
//!
//! Parses rows of the amplifier's event export: tag in column 0, onset time in
//! column 4 as `_HH:MM:SS:mmm`.

use crate::error::RecordError;
use crate::normalizer::parse_device_time;
use crate::types::{RawRecord, Stream, TieBreak};

use super::{column, StreamAdapter};

const TAG_COLUMN: usize = 0;
const TIME_COLUMN: usize = 4;

/// Device log adapter
pub struct DeviceAdapter;

impl StreamAdapter for DeviceAdapter {
    fn stream(&self) -> Stream {
        Stream::Device
    }

    fn extract(&self, line: usize, fields: &[String]) -> Result<RawRecord, RecordError> {
        let tag = column(fields, TAG_COLUMN, "tag")?;
        if tag.is_empty() {
            return Err(RecordError::EmptyTag);
        }
        let raw_time = column(fields, TIME_COLUMN, "onset")?;

        Ok(RawRecord {
            line,
            tag: tag.to_string(),
            raw_time: raw_time.to_string(),
        })
    }

    fn parse_time(&self, raw: &str) -> Result<f64, RecordError> {
        // Whole milliseconds well below 2^53, exact in f64
        parse_device_time(raw).map(|ms| ms as f64)
    }

    fn delta_places(&self) -> Option<i32> {
        None
    }

    fn tie_break(&self) -> TieBreak {
        TieBreak::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_extract_device_row() {
        let adapter = DeviceAdapter;
        let record = adapter
            .extract(3, &row(&["DIN3", "Stim", "1", "", "_00:00:02:500", "0"]))
            .unwrap();

        assert_eq!(record.line, 3);
        assert_eq!(record.tag, "DIN3");
        assert_eq!(record.raw_time, "_00:00:02:500");
        assert_eq!(adapter.parse_time(&record.raw_time).unwrap(), 2500.0);
    }

    #[test]
    fn test_short_row_is_missing_field() {
        let adapter = DeviceAdapter;
        let err = adapter.extract(1, &row(&["Code", "Label"])).unwrap_err();
        assert_eq!(
            err,
            RecordError::MissingField {
                column: 4,
                field: "onset"
            }
        );
    }

    #[test]
    fn test_empty_tag_rejected() {
        let adapter = DeviceAdapter;
        let err = adapter
            .extract(1, &row(&["", "", "", "", "_00:00:02:500"]))
            .unwrap_err();
        assert_eq!(err, RecordError::EmptyTag);
    }
}
