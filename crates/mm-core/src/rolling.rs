//! Bounded rolling statistics with Welford's online mean/variance update.
//!
//! A single abstraction shared by the Opportunity Density Detector (per-pool
//! `{fee_intensity, volume_in_range, bin_stability, churn_quality}` stats)
//! and anything else that needs a cheap, numerically stable rolling
//! mean/stddev over a capped window of timestamped samples. Oldest sample is
//! evicted on push once the window is full; mean/variance are recomputed
//! from the retained window rather than attempting incremental removal,
//! which keeps Welford's update exact without the numerical drift that
//! comes from subtracting out evicted samples.

use std::collections::VecDeque;

/// Default window capacity: 120 samples, matching `RollingStats(k)` in the
/// data model (§3).
pub const DEFAULT_CAPACITY: usize = 120;

#[derive(Debug, Clone, Copy)]
struct Sample {
    value: f64,
    ts_ms: i64,
}

/// A bounded deque of samples plus the running (mean, stddev, count).
#[derive(Debug, Clone)]
pub struct RollingStat {
    capacity: usize,
    samples: VecDeque<Sample>,
    mean: f64,
    m2: f64,
}

impl RollingStat {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity),
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Push a new sample, evicting the oldest if the window is full, then
    /// recompute (mean, m2) over the retained window.
    pub fn push(&mut self, value: f64, ts_ms: i64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { value, ts_ms });
        self.recompute();
    }

    fn recompute(&mut self) {
        let n = self.samples.len() as f64;
        if n == 0.0 {
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let mean = self.samples.iter().map(|s| s.value).sum::<f64>() / n;
        let m2 = self
            .samples
            .iter()
            .map(|s| (s.value - mean).powi(2))
            .sum::<f64>();
        self.mean = mean;
        self.m2 = m2;
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation. Zero if fewer than 2 samples.
    pub fn stddev(&self) -> f64 {
        let n = self.samples.len() as f64;
        if n < 2.0 {
            return 0.0;
        }
        (self.m2 / n).sqrt()
    }

    /// z-score of `value` against the current window, winsorized to
    /// `[-clamp, clamp]`. Returns 0.0 if stddev is zero (degenerate window,
    /// e.g. all-identical samples) since a z-score is undefined there and
    /// treating it as "no deviation" is the conservative choice.
    pub fn z_score(&self, value: f64, clamp: f64) -> f64 {
        let sd = self.stddev();
        if sd <= f64::EPSILON {
            return 0.0;
        }
        let z = (value - self.mean) / sd;
        z.clamp(-clamp, clamp)
    }

    /// Fraction of retained samples whose timestamp exactly matches the most
    /// recent one — used to detect synthetic/duplicated data feeds.
    pub fn identical_timestamp_fraction(&self) -> f64 {
        let Some(latest) = self.samples.back().map(|s| s.ts_ms) else {
            return 0.0;
        };
        let matching = self.samples.iter().filter(|s| s.ts_ms == latest).count();
        matching as f64 / self.samples.len() as f64
    }

    /// Milliseconds since the most recent sample, or `i64::MAX` if empty.
    pub fn staleness_ms(&self, now_ms: i64) -> i64 {
        match self.samples.back() {
            Some(s) => (now_ms - s.ts_ms).max(0),
            None => i64::MAX,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum value retained in the current window. 0.0 if empty.
    pub fn max(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.value)
            .fold(None, |acc: Option<f64>, v| match acc {
                Some(a) if a >= v => Some(a),
                _ => Some(v),
            })
            .unwrap_or(0.0)
    }
}

impl Default for RollingStat {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_enforced() {
        let mut stat = RollingStat::new(3);
        for i in 0..10 {
            stat.push(i as f64, i as i64);
        }
        assert_eq!(stat.count(), 3);
    }

    #[test]
    fn z_score_of_mean_is_zero() {
        let mut stat = RollingStat::new(10);
        for i in 0..10 {
            stat.push(5.0, i);
        }
        // all samples identical -> stddev 0 -> degenerate z-score defined as 0
        assert_eq!(stat.z_score(5.0, 4.0), 0.0);
    }

    #[test]
    fn z_score_is_winsorized() {
        let mut stat = RollingStat::new(30);
        for i in 0..30 {
            stat.push(if i % 2 == 0 { 1.0 } else { -1.0 }, i);
        }
        let extreme = stat.z_score(1000.0, 4.0);
        assert_eq!(extreme, 4.0);
        let extreme_neg = stat.z_score(-1000.0, 4.0);
        assert_eq!(extreme_neg, -4.0);
    }

    #[test]
    fn identical_timestamp_fraction_detects_synthetic_data() {
        let mut stat = RollingStat::new(20);
        for _ in 0..15 {
            stat.push(1.0, 1_000);
        }
        for i in 0..5 {
            stat.push(1.0, 2_000 + i);
        }
        // last sample ts is 2004, only one sample shares it
        assert!(stat.identical_timestamp_fraction() < 0.3);
    }

    #[test]
    fn staleness_tracks_most_recent_sample() {
        let mut stat = RollingStat::new(10);
        stat.push(1.0, 1_000);
        assert_eq!(stat.staleness_ms(6_000), 5_000);
    }

    #[test]
    fn max_tracks_largest_retained_sample() {
        let mut stat = RollingStat::new(5);
        assert_eq!(stat.max(), 0.0);
        for v in [1.0, 4.0, 2.0, 4.5, 0.5] {
            stat.push(v, 0);
        }
        assert_eq!(stat.max(), 4.5);
    }
}
