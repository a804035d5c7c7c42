//! Presentation log adapter
//!
//! Parses rows of the stimulus client's log: seconds since session start in
//! column 0, a level label such as `DATA ` in column 1 and the event message in
//! column 2. Only rows whose cleaned label matches the configured label are
//! kept; the message's leading characters carry the event code.

use crate::error::RecordError;
use crate::normalizer::parse_presentation_time;
use crate::types::{RawRecord, Stream, TieBreak};

use super::{column, StreamAdapter};

const TIME_COLUMN: usize = 0;
const LABEL_COLUMN: usize = 1;
const TAG_COLUMN: usize = 2;

/// Presentation log adapter
pub struct PresentationAdapter {
    label: String,
}

impl PresentationAdapter {
    /// Create an adapter keeping rows whose label column reads `label`
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_lowercase(),
        }
    }
}

impl Default for PresentationAdapter {
    fn default() -> Self {
        Self::new("data")
    }
}

/// Drop the trailing delimiter artifact and lower-case the label
pub fn clean_label(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next_back();
    chars.as_str().to_lowercase()
}

impl StreamAdapter for PresentationAdapter {
    fn stream(&self) -> Stream {
        Stream::Presentation
    }

    fn extract(&self, line: usize, fields: &[String]) -> Result<RawRecord, RecordError> {
        let raw_time = column(fields, TIME_COLUMN, "time")?;
        let label = clean_label(column(fields, LABEL_COLUMN, "label")?);
        if label != self.label {
            return Err(RecordError::LabelMismatch {
                expected: self.label.clone(),
                found: label,
            });
        }
        let tag = column(fields, TAG_COLUMN, "message")?;
        if tag.is_empty() {
            return Err(RecordError::EmptyTag);
        }

        Ok(RawRecord {
            line,
            tag: tag.to_string(),
            raw_time: raw_time.to_string(),
        })
    }

    fn parse_time(&self, raw: &str) -> Result<f64, RecordError> {
        parse_presentation_time(raw)
    }

    fn delta_places(&self) -> Option<i32> {
        Some(1)
    }

    fn tie_break(&self) -> TieBreak {
        TieBreak::ByTag
    }
}
