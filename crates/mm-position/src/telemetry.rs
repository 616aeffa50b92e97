//! Per-position bounded telemetry buffers: the suppression window and the
//! fee-snapshot series used for velocity estimation.

use std::collections::VecDeque;

const SUPPRESSION_WINDOW_MS: i64 = 30 * 60 * 1000;
const FEE_SNAPSHOT_CAPACITY: usize = 10;

/// Bounded deque of timestamps of suppressed exit events in the last 30
/// minutes.
#[derive(Debug, Clone, Default)]
pub struct SuppressionWindow {
    timestamps: VecDeque<i64>,
}

impl SuppressionWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, now_ms: i64) {
        self.prune(now_ms);
        self.timestamps.push_back(now_ms);
    }

    pub fn count(&mut self, now_ms: i64) -> usize {
        self.prune(now_ms);
        self.timestamps.len()
    }

    fn prune(&mut self, now_ms: i64) {
        while let Some(&oldest) = self.timestamps.front() {
            if now_ms - oldest > SUPPRESSION_WINDOW_MS {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FeeSnapshot {
    at_ms: i64,
    cumulative_fees: f64,
}

/// Bounded deque of up to 10 (timestamp, cumulative-fees) pairs, used to
/// estimate the position's current fee-accrual velocity.
#[derive(Debug, Clone, Default)]
pub struct FeeSnapshots {
    samples: VecDeque<FeeSnapshot>,
}

impl FeeSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, at_ms: i64, cumulative_fees: f64) {
        if self.samples.len() == FEE_SNAPSHOT_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(FeeSnapshot { at_ms, cumulative_fees });
    }

    /// Fee velocity in dollars per hour, estimated from the oldest and
    /// newest retained samples. `None` if fewer than two samples or the
    /// samples span zero time.
    pub fn velocity_per_hour(&self) -> Option<f64> {
        let oldest = self.samples.front()?;
        let newest = self.samples.back()?;
        let elapsed_ms = newest.at_ms - oldest.at_ms;
        if elapsed_ms <= 0 {
            return None;
        }
        let delta_fees = newest.cumulative_fees - oldest.cumulative_fees;
        Some(delta_fees / (elapsed_ms as f64) * 3_600_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_window_prunes_entries_older_than_thirty_minutes() {
        let mut window = SuppressionWindow::new();
        window.record(0);
        window.record(SUPPRESSION_WINDOW_MS / 2);
        assert_eq!(window.count(SUPPRESSION_WINDOW_MS / 2), 2);
        assert_eq!(window.count(SUPPRESSION_WINDOW_MS + 1), 1);
    }

    #[test]
    fn fee_snapshots_bounded_to_ten() {
        let mut snapshots = FeeSnapshots::new();
        for i in 0..20 {
            snapshots.record(i * 1_000, i as f64);
        }
        assert_eq!(snapshots.samples.len(), 10);
    }

    #[test]
    fn velocity_per_hour_computed_from_span() {
        let mut snapshots = FeeSnapshots::new();
        snapshots.record(0, 0.0);
        snapshots.record(3_600_000, 2.0);
        assert_eq!(snapshots.velocity_per_hour(), Some(2.0));
    }

    #[test]
    fn velocity_is_none_with_single_sample() {
        let mut snapshots = FeeSnapshots::new();
        snapshots.record(0, 0.0);
        assert!(snapshots.velocity_per_hour().is_none());
    }
}
