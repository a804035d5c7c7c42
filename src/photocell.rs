//! Photocell latency analysis
//!
//! Measures how long after a stimulus onset the light sensor reported the
//! screen change. Photocell records and onset records are merged, sorted by
//! time, and every photocell record is paired with the record right before it.
//!
//! The two streams differ in how the photocell is tagged:
//! - presentation logs carry a caller-chosen code, matched by prefix
//! - the device always reports a fixed channel code (`DIN3`), matched exactly,
//!   and closes the export with one extra detection that is not a real one

use serde::{Deserialize, Serialize};

use crate::comparator::DriftComparator;
use crate::filter::{sort_events, EventFilter};
use crate::types::{round_to, LatencySummary, NormalizedRecord, Stream, TagMatch, TieBreak};

/// Default photocell channel code written by the recording device
pub const DEVICE_PHOTOCELL_TAG: &str = "DIN3";

/// Default photocell code used by the presentation scripts
pub const PRESENTATION_PHOTOCELL_TAG: &str = "wsq";

/// Decimal places kept on presentation latencies
const PRESENTATION_LATENCY_PLACES: i32 = 3;

/// Decimal places kept on mean latencies
const MEAN_LATENCY_PLACES: i32 = 1;

/// Which device record, if any, is the closing sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelPolicy {
    /// The last data row of the export is the sentinel
    #[default]
    DropFinalRow,
    /// The last photocell record is the sentinel, wherever it sits
    DropFinalPhotocell,
    /// No sentinel
    Keep,
}

/// Analyzer for onset-to-detection latency
#[derive(Debug, Clone, Copy)]
pub struct PhotocellAnalyzer {
    prefix_len: usize,
    comparator: DriftComparator,
}

impl PhotocellAnalyzer {
    pub fn new(prefix_len: usize, comparator: DriftComparator) -> Self {
        Self {
            prefix_len,
            comparator,
        }
    }

    /// Latencies in the presentation log
    pub fn presentation<S: AsRef<str>>(
        &self,
        records: &[NormalizedRecord],
        photocell_tag: &str,
        onset_tags: &[S],
    ) -> LatencySummary {
        let prefix = EventFilter::new(TagMatch::Prefix(self.prefix_len), TieBreak::ByTag);
        let is_photocell = |tag: &str| prefix.matches(tag, photocell_tag);

        let merged = merge(records, &prefix, is_photocell, onset_tags);
        self.measure(
            Stream::Presentation,
            &merged,
            is_photocell,
            Some(PRESENTATION_LATENCY_PLACES),
        )
    }

    /// Latencies in the device log, after removing the sentinel per `sentinel`
    pub fn device<S: AsRef<str>>(
        &self,
        records: &[NormalizedRecord],
        photocell_tag: &str,
        onset_tags: &[S],
        sentinel: SentinelPolicy,
    ) -> LatencySummary {
        let exact = EventFilter::new(TagMatch::Exact, TieBreak::Stable);
        let prefix = EventFilter::new(TagMatch::Prefix(self.prefix_len), TieBreak::Stable);
        let is_photocell = |tag: &str| exact.matches(tag, photocell_tag);

        let scanned = without_sentinel(records, sentinel, is_photocell);
        let merged = merge(&scanned, &prefix, is_photocell, onset_tags);
        self.measure(Stream::Device, &merged, is_photocell, None)
    }

    fn measure(
        &self,
        stream: Stream,
        merged: &[NormalizedRecord],
        is_photocell: impl Fn(&str) -> bool,
        places: Option<i32>,
    ) -> LatencySummary {
        let mut latencies_ms = Vec::new();
        for (i, record) in merged.iter().enumerate() {
            if !is_photocell(&record.tag) {
                continue;
            }
            let Some(previous) = i.checked_sub(1).map(|p| &merged[p]) else {
                tracing::debug!(%stream, line = record.line, "photocell record has no preceding onset");
                continue;
            };
            let latency = record.time_ms - previous.time_ms;
            latencies_ms.push(match places {
                Some(places) => round_to(latency, places),
                None => latency,
            });
        }

        let warnings = self.comparator.threshold_indices(&latencies_ms);
        for &idx in &warnings {
            tracing::warn!(
                %stream,
                index = idx,
                latency_ms = latencies_ms[idx],
                threshold_ms = self.comparator.warn_threshold_ms(),
                "large photocell latency"
            );
        }

        let mean_ms = crate::comparator::mean(&latencies_ms).map(|m| round_to(m, MEAN_LATENCY_PLACES));
        if mean_ms.is_none() {
            tracing::warn!(%stream, "no photocell detections to measure");
        }

        LatencySummary {
            stream,
            latencies_ms,
            warnings,
            mean_ms,
        }
    }
}

/// Photocell records first, then onset matches, then sorted by time
fn merge<S: AsRef<str>>(
    records: &[NormalizedRecord],
    onsets: &EventFilter,
    is_photocell: impl Fn(&str) -> bool,
    onset_tags: &[S],
) -> Vec<NormalizedRecord> {
    let mut merged: Vec<NormalizedRecord> = records
        .iter()
        .filter(|r| is_photocell(&r.tag))
        .cloned()
        .collect();
    merged.extend(
        onsets
            .collect(records, onset_tags)
            .into_iter()
            .filter(|r| !is_photocell(&r.tag)),
    );
    sort_events(&mut merged, onsets.tie_break());
    merged
}

fn without_sentinel(
    records: &[NormalizedRecord],
    sentinel: SentinelPolicy,
    is_photocell: impl Fn(&str) -> bool,
) -> Vec<NormalizedRecord> {
    let sentinel_line = match sentinel {
        SentinelPolicy::Keep => None,
        SentinelPolicy::DropFinalRow => records.iter().map(|r| r.line).max(),
        SentinelPolicy::DropFinalPhotocell => records
            .iter()
            .filter(|r| is_photocell(&r.tag))
            .map(|r| r.line)
            .max(),
    };

    match sentinel_line {
        Some(line) => {
            tracing::debug!(line, ?sentinel, "excluding device sentinel row");
            records.iter().filter(|r| r.line != line).cloned().collect()
        }
        None => records.to_vec(),
    }
}
