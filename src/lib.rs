//! Driftcheck - timing reconciliation for stimulus and recording-device event logs
//!
//! Driftcheck answers whether an event shows up at consistent relative times in
//! the stimulus-presentation log and in the physiological recording device's
//! event export, through a deterministic pipeline: stream adaptation →
//! timestamp normalization → event filtering → delta sequencing → drift
//! comparison.
//!
//! ## Analyses
//!
//! - **Reconciliation**: compare inter-event gaps between the two logs
//! - **Photocell latency**: onset-to-light-sensor delay in each log
//! - **Auto-pulse check**: device pulse gaps against client send times

pub mod adapters;
pub mod autolog;
pub mod comparator;
pub mod config;
pub mod delimited;
pub mod error;
pub mod filter;
pub mod normalizer;
pub mod photocell;
pub mod pipeline;
pub mod sequencer;
pub mod types;

pub use comparator::DriftComparator;
pub use config::ReconcileConfig;
pub use error::{ReconcileError, RecordError};
pub use photocell::SentinelPolicy;
pub use pipeline::{photocell_latency, reconcile, PhotocellReport, Reconciler, Reconciliation};
pub use types::{ComparisonResult, LatencySummary, NormalizedRecord, Stream};

/// Driftcheck version embedded in JSON reports
pub const DRIFTCHECK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for JSON reports
pub const PRODUCER_NAME: &str = "driftcheck";
