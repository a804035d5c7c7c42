//! Auto-pulse log comparison
//!
//! The connectivity check sends a few `auto` events to the recording device
//! and writes the client's millisecond clock for each send to a plain file,
//! one integer per line. Comparing the gaps on both sides shows how much the
//! transport adds or loses between pulses.

use crate::comparator::DriftComparator;
use crate::error::ReconcileError;
use crate::filter::EventFilter;
use crate::sequencer::DeltaSequencer;
use crate::types::{ComparisonResult, NormalizedRecord, Stream, TagMatch, TieBreak};

/// Gaps on both sides of an auto-pulse run and their comparison
#[derive(Debug, Clone, PartialEq)]
pub struct AutoLogComparison {
    pub device_deltas: Vec<f64>,
    pub client_deltas: Vec<f64>,
    pub comparison: ComparisonResult,
}

/// Parse the client's timestamp list: first column of each row, whole ms.
///
/// Rows that do not hold an integer are skipped.
pub fn parse_client_times(rows: &[Vec<String>]) -> Vec<f64> {
    rows.iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let raw = row.first()?;
            match raw.trim().parse::<i64>() {
                Ok(ms) => Some(ms as f64),
                Err(_) => {
                    tracing::debug!(stream = %Stream::Client, line = idx + 1, raw = %raw, "dropped row");
                    None
                }
            }
        })
        .collect()
}

/// Compare device `auto_tag` events against the client's send times
pub fn compare_auto_log(
    device: &[NormalizedRecord],
    client_times_ms: &[f64],
    auto_tag: &str,
    comparator: &DriftComparator,
) -> Result<AutoLogComparison, ReconcileError> {
    let filter = EventFilter::new(TagMatch::Exact, TieBreak::Stable);
    let pulses = filter.filter(device, &[auto_tag]);
    if pulses.is_empty() {
        return Err(ReconcileError::NoRecords(Stream::Device));
    }

    let device_deltas = DeltaSequencer::sequence(&pulses, None);
    let client_deltas = DeltaSequencer::sequence_times(client_times_ms);
    tracing::info!(
        pulses = pulses.len(),
        client_times = client_times_ms.len(),
        "comparing auto pulses"
    );

    let comparison = comparator.compare(&device_deltas, &client_deltas)?;
    Ok(AutoLogComparison {
        device_deltas,
        client_deltas,
        comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimited::{read_rows, Delimiter};
    use pretty_assertions::assert_eq;

    fn rec(tag: &str, time_ms: f64, line: usize) -> NormalizedRecord {
        NormalizedRecord {
            tag: tag.to_string(),
            time_ms,
            line,
        }
    }

    #[test]
    fn test_parse_client_times() {
        let rows = read_rows("1544000000100\n1544000002105\nnan\n\n1544000005109\n", Delimiter::Comma);
        assert_eq!(
            parse_client_times(&rows),
            vec![1544000000100.0, 1544000002105.0, 1544000005109.0]
        );
    }

    #[test]
    fn test_compare_auto_log() {
        let device = vec![
            rec("strt", 0.0, 1),
            rec("auto", 2000.0, 2),
            rec("auto", 5002.0, 3),
            rec("automatic", 6000.0, 4),
            rec("auto", 9001.0, 5),
        ];
        let client = [100.0, 3100.0, 7100.0];

        let result = compare_auto_log(&device, &client, "auto", &DriftComparator::default()).unwrap();
        assert_eq!(result.device_deltas, vec![3002.0, 3999.0]);
        assert_eq!(result.client_deltas, vec![3000.0, 4000.0]);
        assert_eq!(result.comparison.per_index_abs_diff, vec![2.0, 1.0]);
        assert_eq!(result.comparison.mean_ms, Some(1.5));
    }

    #[test]
    fn test_missing_pulses() {
        let device = vec![rec("strt", 0.0, 1)];
        let err = compare_auto_log(&device, &[1.0, 2.0], "auto", &DriftComparator::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::NoRecords(Stream::Device)));
    }

    #[test]
    fn test_pulse_count_mismatch() {
        let device = vec![rec("auto", 0.0, 1), rec("auto", 1000.0, 2)];
        let err = compare_auto_log(&device, &[0.0, 1000.0, 2000.0], "auto", &DriftComparator::default())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::LengthMismatch { left: 1, right: 2 }));
    }
}
