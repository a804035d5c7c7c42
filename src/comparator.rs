//! Drift comparison
//!
//! Aligns two delta sequences index-by-index and reduces the absolute
//! differences to a mean, flagging each index at or above the warning
//! threshold.

use crate::error::ReconcileError;
use crate::types::{round_to, ComparisonResult};

/// Default warning threshold in milliseconds
pub const DEFAULT_WARN_THRESHOLD_MS: f64 = 15.0;

/// Comparator for two delta sequences
#[derive(Debug, Clone, Copy)]
pub struct DriftComparator {
    warn_threshold_ms: f64,
}

impl Default for DriftComparator {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_THRESHOLD_MS)
    }
}

impl DriftComparator {
    pub fn new(warn_threshold_ms: f64) -> Self {
        Self { warn_threshold_ms }
    }

    pub fn warn_threshold_ms(&self) -> f64 {
        self.warn_threshold_ms
    }

    /// Compare `left` and `right` element-wise.
    ///
    /// Sequences of different length cannot be aligned and yield
    /// [`ReconcileError::LengthMismatch`].
    pub fn compare(&self, left: &[f64], right: &[f64]) -> Result<ComparisonResult, ReconcileError> {
        if left.len() != right.len() {
            return Err(ReconcileError::LengthMismatch {
                left: left.len(),
                right: right.len(),
            });
        }

        let per_index_abs_diff: Vec<f64> = left
            .iter()
            .zip(right)
            .map(|(a, b)| round_to(a - b, 2).abs())
            .collect();

        let warnings = self.threshold_indices(&per_index_abs_diff);
        for &idx in &warnings {
            tracing::warn!(
                index = idx,
                diff_ms = per_index_abs_diff[idx],
                threshold_ms = self.warn_threshold_ms,
                "large timing difference between logs"
            );
        }

        Ok(ComparisonResult {
            mean_ms: mean(&per_index_abs_diff).map(|m| round_to(m, 2)),
            per_index_abs_diff,
            warnings,
        })
    }

    /// Indices whose value reached the threshold
    pub fn threshold_indices(&self, values: &[f64]) -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v >= self.warn_threshold_ms)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
