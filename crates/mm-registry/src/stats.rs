//! RollingStats(k): the four rolling-window statistics the Opportunity
//! Density Detector scores each pool against.

use mm_core::RollingStat;

/// The four per-pool rolling series scored by the Opportunity Density
/// Detector, each a bounded queue of up to 120 samples (§3).
#[derive(Debug, Default)]
pub struct RollingStats {
    pub fee_intensity: RollingStat,
    pub volume_in_range: RollingStat,
    pub bin_stability: RollingStat,
    pub churn_quality: RollingStat,
}

impl RollingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of samples pushed into the shortest-running series.
    /// The detector treats this as the pool's "sample count" for its
    /// steady-state/bootstrap threshold (≥ 30 vs ≥ 5).
    pub fn min_sample_count(&self) -> usize {
        [
            self.fee_intensity.count(),
            self.volume_in_range.count(),
            self.bin_stability.count(),
            self.churn_quality.count(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_sample_count_tracks_shortest_series() {
        let mut stats = RollingStats::new();
        stats.fee_intensity.push(1.0, 1);
        stats.fee_intensity.push(2.0, 2);
        stats.volume_in_range.push(1.0, 1);
        assert_eq!(stats.min_sample_count(), 1);
    }
}
