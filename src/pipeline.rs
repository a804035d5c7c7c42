//! Pipeline orchestration
//!
//! This module provides the public API for Driftcheck.
//! It orchestrates the full pipeline from two raw logs to a drift report.

use std::path::Path;

use serde::Serialize;

use crate::adapters::{DeviceAdapter, PresentationAdapter, StreamAdapter};
use crate::autolog::{compare_auto_log, parse_client_times, AutoLogComparison};
use crate::comparator::DriftComparator;
use crate::config::ReconcileConfig;
use crate::delimited::{load_rows, read_rows, Delimiter};
use crate::error::ReconcileError;
use crate::filter::EventFilter;
use crate::normalizer::Normalizer;
use crate::photocell::PhotocellAnalyzer;
use crate::sequencer::DeltaSequencer;
use crate::types::{ComparisonResult, LatencySummary, NormalizedStream, TagMatch};

/// Outcome of comparing inter-event gaps between the two logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub presentation_deltas: Vec<f64>,
    pub device_deltas: Vec<f64>,
    pub comparison: ComparisonResult,
    pub presentation_dropped: usize,
    pub device_dropped: usize,
}

impl Reconciliation {
    /// Mean absolute drift in ms, `None` when no gap could be compared
    pub fn mean_ms(&self) -> Option<f64> {
        self.comparison.mean_ms
    }
}

/// Photocell latency in each stream, plus their drift when comparable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotocellReport {
    pub presentation: LatencySummary,
    pub device: LatencySummary,
    pub drift: Option<ComparisonResult>,
}

impl PhotocellReport {
    /// `(presentation_mean_ms, device_mean_ms)`
    pub fn means(&self) -> (Option<f64>, Option<f64>) {
        (self.presentation.mean_ms, self.device.mean_ms)
    }
}

/// Compare inter-event gaps of a presentation log and a device log.
///
/// # Arguments
/// * `presentation_file` - Presentation log (comma- or tab-separated)
/// * `device_file` - Device event export (comma- or tab-separated)
/// * `presentation_label` - Level label kept from the presentation log (usually "data")
/// * `event_tags` - Event codes to compare, matched on their first 3 characters
///
/// # Example
/// ```ignore
/// let result = reconcile(
///     Path::new("session.csv"),
///     Path::new("device.csv"),
///     "data",
///     &["int", "ope", "clo", "gaz", "end"],
/// )?;
/// println!("mean drift: {:?} ms", result.mean_ms());
/// ```
pub fn reconcile<S: AsRef<str>>(
    presentation_file: &Path,
    device_file: &Path,
    presentation_label: &str,
    event_tags: &[S],
) -> Result<Reconciliation, ReconcileError> {
    let config = ReconcileConfig {
        presentation_label: presentation_label.to_string(),
        ..ReconcileConfig::default()
    };
    Reconciler::new(config)?.reconcile_files(presentation_file, device_file, event_tags)
}

/// Measure photocell latency in both logs.
///
/// # Arguments
/// * `presentation_file` - Presentation log
/// * `device_file` - Device event export
/// * `presentation_photocell_tag` - Photocell code in the presentation log (usually "wsq")
/// * `event_tags` - Stimulus-onset codes preceding each detection
///
/// # Example
/// ```ignore
/// let report = photocell_latency(
///     Path::new("session.csv"),
///     Path::new("device.csv"),
///     "wsq",
///     &["ope", "clo", "gaz"],
/// )?;
/// let (presentation_ms, device_ms) = report.means();
/// ```
pub fn photocell_latency<S: AsRef<str>>(
    presentation_file: &Path,
    device_file: &Path,
    presentation_photocell_tag: &str,
    event_tags: &[S],
) -> Result<PhotocellReport, ReconcileError> {
    let config = ReconcileConfig {
        presentation_photocell_tag: presentation_photocell_tag.to_string(),
        ..ReconcileConfig::default()
    };
    Reconciler::new(config)?.photocell_files(presentation_file, device_file, event_tags)
}

/// Configured driver for reconciliation runs
pub struct Reconciler {
    config: ReconcileConfig,
    comparator: DriftComparator,
}

impl Default for Reconciler {
    fn default() -> Self {
        let config = ReconcileConfig::default();
        Self {
            comparator: DriftComparator::new(config.warn_threshold_ms),
            config,
        }
    }
}

impl Reconciler {
    /// Create a driver after validating `config`
    pub fn new(config: ReconcileConfig) -> Result<Self, ReconcileError> {
        config.validate()?;
        Ok(Self {
            comparator: DriftComparator::new(config.warn_threshold_ms),
            config,
        })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Compare inter-event gaps of two log files
    pub fn reconcile_files<S: AsRef<str>>(
        &self,
        presentation_file: &Path,
        device_file: &Path,
        event_tags: &[S],
    ) -> Result<Reconciliation, ReconcileError> {
        let presentation = self.load_presentation(presentation_file)?;
        let device = self.load_device(device_file)?;
        self.reconcile_streams(&presentation, &device, event_tags)
    }

    /// Compare inter-event gaps of two logs already in memory
    pub fn reconcile_text<S: AsRef<str>>(
        &self,
        presentation_text: &str,
        presentation_delimiter: Delimiter,
        device_text: &str,
        device_delimiter: Delimiter,
        event_tags: &[S],
    ) -> Result<Reconciliation, ReconcileError> {
        let presentation = self.normalize_presentation(&read_rows(presentation_text, presentation_delimiter));
        let device = Normalizer::normalize(&DeviceAdapter, &read_rows(device_text, device_delimiter));
        self.reconcile_streams(&presentation, &device, event_tags)
    }

    /// Measure photocell latency in two log files
    pub fn photocell_files<S: AsRef<str>>(
        &self,
        presentation_file: &Path,
        device_file: &Path,
        event_tags: &[S],
    ) -> Result<PhotocellReport, ReconcileError> {
        let presentation = self.load_presentation(presentation_file)?;
        let device = self.load_device(device_file)?;
        self.photocell_streams(&presentation, &device, event_tags)
    }

    /// Measure photocell latency in two logs already in memory
    pub fn photocell_text<S: AsRef<str>>(
        &self,
        presentation_text: &str,
        presentation_delimiter: Delimiter,
        device_text: &str,
        device_delimiter: Delimiter,
        event_tags: &[S],
    ) -> Result<PhotocellReport, ReconcileError> {
        let presentation = self.normalize_presentation(&read_rows(presentation_text, presentation_delimiter));
        let device = Normalizer::normalize(&DeviceAdapter, &read_rows(device_text, device_delimiter));
        self.photocell_streams(&presentation, &device, event_tags)
    }

    /// Compare device auto pulses against the client's send-time file
    pub fn auto_log_files(
        &self,
        device_file: &Path,
        client_file: &Path,
    ) -> Result<AutoLogComparison, ReconcileError> {
        let device = self.load_device(device_file)?;
        let client_times = parse_client_times(&load_rows(client_file, self.config.delimiter)?);
        compare_auto_log(
            &device.records,
            &client_times,
            &self.config.auto_tag,
            &self.comparator,
        )
    }

    /// Load and normalize a presentation log
    pub fn load_presentation(&self, path: &Path) -> Result<NormalizedStream, ReconcileError> {
        let rows = load_rows(path, self.config.delimiter)?;
        Ok(self.normalize_presentation(&rows))
    }

    /// Load and normalize a device log
    pub fn load_device(&self, path: &Path) -> Result<NormalizedStream, ReconcileError> {
        let rows = load_rows(path, self.config.delimiter)?;
        Ok(Normalizer::normalize(&DeviceAdapter, &rows))
    }

    fn normalize_presentation(&self, rows: &[Vec<String>]) -> NormalizedStream {
        let adapter = PresentationAdapter::new(&self.config.presentation_label);
        Normalizer::normalize(&adapter, rows)
    }

    fn reconcile_streams<S: AsRef<str>>(
        &self,
        presentation: &NormalizedStream,
        device: &NormalizedStream,
        event_tags: &[S],
    ) -> Result<Reconciliation, ReconcileError> {
        check_tags(event_tags)?;

        let presentation_deltas = self.stream_deltas(
            &PresentationAdapter::new(&self.config.presentation_label),
            presentation,
            event_tags,
        )?;
        let device_deltas = self.stream_deltas(&DeviceAdapter, device, event_tags)?;

        tracing::info!(?presentation_deltas, "presentation timing differences");
        tracing::info!(?device_deltas, "device timing differences");

        let comparison = self.comparator.compare(&presentation_deltas, &device_deltas)?;
        tracing::info!(mean_ms = ?comparison.mean_ms, "mean presentation-device drift");

        Ok(Reconciliation {
            presentation_deltas,
            device_deltas,
            comparison,
            presentation_dropped: presentation.malformed_count(),
            device_dropped: device.malformed_count(),
        })
    }

    /// Filter, sort and sequence one stream
    fn stream_deltas<S: AsRef<str>>(
        &self,
        adapter: &dyn StreamAdapter,
        stream: &NormalizedStream,
        event_tags: &[S],
    ) -> Result<Vec<f64>, ReconcileError> {
        if stream.records.is_empty() {
            return Err(ReconcileError::NoRecords(stream.stream));
        }
        let filter = EventFilter::new(TagMatch::Prefix(self.config.tag_prefix_len), adapter.tie_break());
        let events = filter.filter(&stream.records, event_tags);
        if events.is_empty() {
            tracing::warn!(stream = %stream.stream, "no records matched the event tags");
        }
        Ok(DeltaSequencer::sequence(&events, adapter.delta_places()))
    }

    fn photocell_streams<S: AsRef<str>>(
        &self,
        presentation: &NormalizedStream,
        device: &NormalizedStream,
        event_tags: &[S],
    ) -> Result<PhotocellReport, ReconcileError> {
        check_tags(event_tags)?;

        let analyzer = PhotocellAnalyzer::new(self.config.tag_prefix_len, self.comparator);
        let presentation_summary = analyzer.presentation(
            &presentation.records,
            &self.config.presentation_photocell_tag,
            event_tags,
        );
        let device_summary = analyzer.device(
            &device.records,
            &self.config.device_photocell_tag,
            event_tags,
            self.config.sentinel,
        );

        tracing::info!(mean_ms = ?presentation_summary.mean_ms, "average presentation photocell latency");
        tracing::info!(mean_ms = ?device_summary.mean_ms, "average device photocell latency");

        let drift = match self
            .comparator
            .compare(&presentation_summary.latencies_ms, &device_summary.latencies_ms)
        {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(error = %e, "photocell latencies not comparable across logs");
                None
            }
        };

        Ok(PhotocellReport {
            presentation: presentation_summary,
            device: device_summary,
            drift,
        })
    }
}

fn check_tags<S: AsRef<str>>(event_tags: &[S]) -> Result<(), ReconcileError> {
    match event_tags.iter().find(|t| t.as_ref().trim().is_empty()) {
        Some(tag) => Err(ReconcileError::InvalidTag(tag.as_ref().to_string())),
        None => Ok(()),
    }
}
