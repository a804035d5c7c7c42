//! Delimited text handling
//!
//! Both logs arrive as delimited text: the device export and the presentation
//! log are tab-separated, and are usually re-saved as comma-separated before
//! analysis. This module reads either form and converts tab to comma.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Field separator of a log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// Detect the delimiter from a file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "csv" => Some(Delimiter::Comma),
            "txt" | "log" | "tsv" => Some(Delimiter::Tab),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }
}

/// Split one line into fields.
///
/// Fields may be wrapped in double quotes; inside quotes the delimiter is
/// literal and `""` stands for one quote character.
pub fn split_record(line: &str, delimiter: Delimiter) -> Vec<String> {
    let sep = delimiter.as_char();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && field.is_empty() {
            in_quotes = true;
        } else if c == sep {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    fields.push(field);
    fields
}

/// Split text into rows of fields. Blank lines become empty rows so that line
/// numbers stay aligned with the source file.
pub fn read_rows(text: &str, delimiter: Delimiter) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                Vec::new()
            } else {
                split_record(line, delimiter)
            }
        })
        .collect()
}

/// Read a log file into rows.
///
/// `delimiter` wins when given; otherwise the extension decides and comma is
/// the fallback.
pub fn load_rows(path: &Path, delimiter: Option<Delimiter>) -> Result<Vec<Vec<String>>, ReconcileError> {
    let text = fs::read_to_string(path).map_err(|source| ReconcileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let delimiter = delimiter
        .or_else(|| Delimiter::from_extension(path))
        .unwrap_or(Delimiter::Comma);
    tracing::debug!(path = %path.display(), ?delimiter, "loaded log");
    Ok(read_rows(&text, delimiter))
}

fn write_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// Re-emit tab-separated text as comma-separated text
pub fn tab_to_csv(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for row in read_rows(text, Delimiter::Tab) {
        for (i, field) in row.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_field(&mut out, field);
        }
        out.push('\n');
    }
    out
}

/// Convert a tab-separated log file to a comma-separated copy
pub fn convert_file(src: &Path, dst: &Path) -> Result<usize, ReconcileError> {
    let text = fs::read_to_string(src).map_err(|source| ReconcileError::Io {
        path: src.to_path_buf(),
        source,
    })?;
    let csv = tab_to_csv(&text);
    let rows = csv.lines().count();
    fs::write(dst, csv).map_err(|source| ReconcileError::Io {
        path: dst.to_path_buf(),
        source,
    })?;
    tracing::info!(src = %src.display(), dst = %dst.display(), rows, "converted log to csv");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delimiter_detection() {
        assert_eq!(
            Delimiter::from_extension(Path::new("session.csv")),
            Some(Delimiter::Comma)
        );
        assert_eq!(
            Delimiter::from_extension(Path::new("session.LOG")),
            Some(Delimiter::Tab)
        );
        assert_eq!(Delimiter::from_extension(Path::new("events")), None);
    }

    #[test]
    fn test_split_plain_and_quoted() {
        assert_eq!(
            split_record("DIN3,1,,x,_00:00:01:000", Delimiter::Comma),
            vec!["DIN3", "1", "", "x", "_00:00:01:000"]
        );
        assert_eq!(
            split_record("1.5,\"DATA \",\"sent, \"\"ope\"\"\"", Delimiter::Comma),
            vec!["1.5", "DATA ", "sent, \"ope\""]
        );
    }

    #[test]
    fn test_read_rows_keeps_blank_lines() {
        let rows = read_rows("a\tb\r\n\r\nc\td\n", Delimiter::Tab);
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["c", "d"]);
    }

    #[test]
    fn test_tab_to_csv_quotes_when_needed() {
        let tsv = "12.0012 \tDATA \tsent to NS: ope\n13.5\tEXP \tkey, pressed\n";
        let csv = tab_to_csv(tsv);
        assert_eq!(
            csv,
            "12.0012 ,DATA ,sent to NS: ope\n13.5,EXP ,\"key, pressed\"\n"
        );
        let back = read_rows(&csv, Delimiter::Comma);
        assert_eq!(back[1][2], "key, pressed");
    }

    #[test]
    fn test_convert_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("device.txt");
        let dst = dir.path().join("device.csv");
        fs::write(&src, "DIN3\t1\t2\t3\t_00:00:01:000\n").unwrap();

        let rows = convert_file(&src, &dst).unwrap();
        assert_eq!(rows, 1);
        assert_eq!(
            fs::read_to_string(&dst).unwrap(),
            "DIN3,1,2,3,_00:00:01:000\n"
        );
    }

    #[test]
    fn test_explicit_delimiter_overrides_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.csv");
        fs::write(&path, "DIN3\t\t\t\t_00:00:01:000\n").unwrap();

        let rows = load_rows(&path, Some(Delimiter::Tab)).unwrap();
        assert_eq!(rows, vec![vec!["DIN3", "", "", "", "_00:00:01:000"]]);

        let by_extension = load_rows(&path, None).unwrap();
        assert_eq!(by_extension[0].len(), 1);
    }

    #[test]
    fn test_unknown_extension_falls_back_to_comma() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events");
        fs::write(&path, "DIN3,,,,_00:00:01:000\nevtA\t_00:00:02:000\n").unwrap();

        let rows = load_rows(&path, None).unwrap();
        assert_eq!(rows[0], vec!["DIN3", "", "", "", "_00:00:01:000"]);
        assert_eq!(rows[1], vec!["evtA\t_00:00:02:000"]);
    }

    #[test]
    fn test_load_rows_missing_file() {
        let err = load_rows(Path::new("/nonexistent/log.csv"), None).unwrap_err();
        assert!(matches!(err, ReconcileError::Io { .. }));
    }
}
