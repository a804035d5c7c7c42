//! Timestamp normalization
//!
//! This module converts each stream's native timestamp to milliseconds.
//! - Device times `HH:MM:SS:mmm` become whole milliseconds
//! - Presentation seconds become milliseconds rounded to 2 decimals
//! - Malformed rows are dropped and recorded, never fatal

use crate::adapters::StreamAdapter;
use crate::error::RecordError;
use crate::types::{round_to, DroppedRecord, NormalizedRecord, NormalizedStream};

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;

/// Length of `HH:MM:SS:mmm`
const DEVICE_TIME_LEN: usize = 12;

/// Normalizer for converting raw rows to normalized records
pub struct Normalizer;

impl Normalizer {
    /// Normalize every row of a log through `adapter`
    pub fn normalize(adapter: &dyn StreamAdapter, rows: &[Vec<String>]) -> NormalizedStream {
        let mut records = Vec::with_capacity(rows.len());
        let mut dropped = Vec::new();

        for (idx, fields) in rows.iter().enumerate() {
            let line = idx + 1;
            let parsed = adapter.extract(line, fields).and_then(|raw| {
                let time_ms = adapter.parse_time(&raw.raw_time)?;
                Ok(NormalizedRecord {
                    tag: raw.tag,
                    time_ms,
                    line,
                })
            });

            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => {
                    tracing::debug!(stream = %adapter.stream(), line, %reason, "dropped row");
                    dropped.push(DroppedRecord { line, reason });
                }
            }
        }

        tracing::info!(
            stream = %adapter.stream(),
            kept = records.len(),
            dropped = dropped.len(),
            "normalized log"
        );

        NormalizedStream {
            stream: adapter.stream(),
            records,
            dropped,
        }
    }
}

/// Parse a device onset `HH:MM:SS:mmm` to milliseconds.
///
/// One leading marker character (the export writes `_`) is stripped when the
/// text is one character longer than the bare format.
pub fn parse_device_time(raw: &str) -> Result<i64, RecordError> {
    let invalid = || RecordError::InvalidTimestamp(raw.to_string());

    let text = if raw.chars().count() == DEVICE_TIME_LEN + 1 {
        let mut chars = raw.chars();
        chars.next();
        chars.as_str()
    } else {
        raw
    };
    if !text.is_ascii() || text.len() != DEVICE_TIME_LEN {
        return Err(invalid());
    }

    let bytes = text.as_bytes();
    if bytes[2] != b':' || bytes[5] != b':' || bytes[8] != b':' {
        return Err(invalid());
    }

    let number = |range: std::ops::Range<usize>| -> Result<i64, RecordError> {
        let part = &text[range];
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        part.parse::<i64>().map_err(|_| invalid())
    };

    let hh = number(0..2)?;
    let mm = number(3..5)?;
    let ss = number(6..8)?;
    let ms = number(9..12)?;

    Ok(hh * MS_PER_HOUR + mm * MS_PER_MINUTE + ss * MS_PER_SECOND + ms)
}

/// Format milliseconds as `HH:MM:SS:mmm`, the inverse of [`parse_device_time`]
pub fn format_device_time(ms: i64) -> String {
    let hh = ms / MS_PER_HOUR;
    let mm = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let ss = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let mmm = ms % MS_PER_SECOND;
    format!("{:02}:{:02}:{:02}:{:03}", hh, mm, ss, mmm)
}

/// Parse presentation seconds to milliseconds, rounded to 2 decimals
pub fn parse_presentation_time(raw: &str) -> Result<f64, RecordError> {
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| RecordError::InvalidTimestamp(raw.to_string()))?;
    if !seconds.is_finite() {
        return Err(RecordError::InvalidTimestamp(raw.to_string()));
    }
    Ok(round_to(seconds * 1000.0, 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DeviceAdapter, PresentationAdapter};
    use crate::delimited::{read_rows, Delimiter};
    use crate::types::Stream;
    use proptest::prelude::*;

    #[test]
    fn test_parse_device_time() {
        assert_eq!(parse_device_time("_01:02:03:004"), Ok(3_723_004));
        assert_eq!(parse_device_time("01:02:03:004"), Ok(3_723_004));
        assert_eq!(parse_device_time("_00:00:00:000"), Ok(0));
    }

    #[test]
    fn test_parse_device_time_rejects_malformed() {
        for raw in ["", "_", "Onset", "_01:02:03", "_0a:02:03:004", "_01-02-03-004", "__01:02:03:004"] {
            assert!(parse_device_time(raw).is_err(), "{raw:?} should fail");
        }
    }

    #[test]
    fn test_format_device_time() {
        assert_eq!(format_device_time(3_723_004), "01:02:03:004");
        assert_eq!(format_device_time(0), "00:00:00:000");
    }

    #[test]
    fn test_parse_presentation_time() {
        assert_eq!(parse_presentation_time("1.25"), Ok(1250.0));
        assert_eq!(parse_presentation_time("0.1"), Ok(100.0));
        assert_eq!(parse_presentation_time(" 12.3456 "), Ok(12345.6));
        assert!(parse_presentation_time("").is_err());
        assert!(parse_presentation_time("inf").is_err());
        assert!(parse_presentation_time("seconds").is_err());
    }

    #[test]
    fn test_normalize_device_log_drops_bad_rows() {
        let text = "Code,Label,Type,Track,Onset\n\
                    DIN3,,,,_00:00:01:000\n\
                    short,row\n\
                    ope,,,,_00:00:01:500\n";
        let rows = read_rows(text, Delimiter::Comma);
        let stream = Normalizer::normalize(&DeviceAdapter, &rows);

        assert_eq!(stream.stream, Stream::Device);
        assert_eq!(stream.records.len(), 2);
        assert_eq!(stream.records[0].tag, "DIN3");
        assert_eq!(stream.records[0].time_ms, 1000.0);
        assert_eq!(stream.records[1].line, 4);
        assert_eq!(
            stream.dropped.iter().map(|d| d.line).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_normalize_presentation_log_filters_label() {
        let text = "0.0100 \tEXP \tCreated window\n\
                    \n\
                    1.0000 \tDATA \twsq\n\
                    1.5000 \tDATA \tope\n";
        let rows = read_rows(text, Delimiter::Tab);
        let stream = Normalizer::normalize(&PresentationAdapter::default(), &rows);

        assert_eq!(stream.records.len(), 2);
        assert_eq!(stream.records[1].time_ms, 1500.0);
        assert_eq!(stream.dropped.len(), 2);
        assert_eq!(stream.malformed_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_device_time_round_trip(ms in 0i64..(100 * MS_PER_HOUR)) {
            let text = format_device_time(ms);
            prop_assert_eq!(parse_device_time(&text), Ok(ms));
            prop_assert_eq!(parse_device_time(&format!("_{text}")), Ok(ms));
        }

        #[test]
        fn prop_device_string_round_trip(h in 0i64..100, m in 0i64..60, s in 0i64..60, f in 0i64..1000) {
            let text = format!("{h:02}:{m:02}:{s:02}:{f:03}");
            let ms = parse_device_time(&text).unwrap();
            prop_assert_eq!(format_device_time(ms), text);
        }
    }
}
