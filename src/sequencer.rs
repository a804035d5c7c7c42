//! Inter-event delta sequencing

use crate::types::{round_to, NormalizedRecord};

/// Sequencer for consecutive inter-event gaps
pub struct DeltaSequencer;

impl DeltaSequencer {
    /// Gaps between consecutive events, `places` decimals kept when given.
    ///
    /// `events` must already be time-sorted. Negative gaps are returned as-is
    /// and logged, since they mean the input order was broken.
    pub fn sequence(events: &[NormalizedRecord], places: Option<i32>) -> Vec<f64> {
        events
            .windows(2)
            .map(|pair| {
                let delta = pair[1].time_ms - pair[0].time_ms;
                if delta < 0.0 {
                    tracing::warn!(
                        from_line = pair[0].line,
                        to_line = pair[1].line,
                        delta,
                        "negative inter-event delta"
                    );
                }
                match places {
                    Some(places) => round_to(delta, places),
                    None => delta,
                }
            })
            .collect()
    }

    /// Gaps between consecutive raw timestamps
    pub fn sequence_times(times_ms: &[f64]) -> Vec<f64> {
        times_ms.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }
}
