//! Daily statistics output.
//!
//! Outputs a daily summary of the key per-pool metrics: rebalance
//! accept/reject counts, exit classifications, ODD spikes, and capital ramp
//! progress, plus cycle duration percentiles across the whole run.

use crate::metrics::{
    CYCLE_DURATION_MS, EXIT_CLASSIFICATIONS_TOTAL, ODD_SPIKES_TOTAL, REBALANCE_OUTCOMES_TOTAL,
};
use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use std::collections::HashMap;
use tracing::info;

/// Daily statistics for a single pool.
#[derive(Debug, Clone)]
pub struct PoolDailyStats {
    pub pool_key: String,
    pub rebalances_accepted: u64,
    pub rebalances_rejected: u64,
    pub exits_risk: u64,
    pub exits_clean: u64,
    pub odd_spikes: u64,
}

/// Daily statistics reporter.
pub struct DailyStatsReporter {
    pools: Vec<String>,
    start_time: DateTime<Utc>,
}

impl DailyStatsReporter {
    pub fn new(pools: Vec<String>) -> Self {
        Self {
            pools,
            start_time: Utc::now(),
        }
    }

    pub fn get_stats(&self) -> Vec<PoolDailyStats> {
        self.pools
            .iter()
            .map(|pool_key| self.get_pool_stats(pool_key))
            .collect()
    }

    fn get_pool_stats(&self, pool_key: &str) -> PoolDailyStats {
        let rebalances_accepted = self.sum_counter_by_label(&REBALANCE_OUTCOMES_TOTAL, "accept");
        let rebalances_rejected = self.sum_counter_by_label(&REBALANCE_OUTCOMES_TOTAL, "reject");
        let exits_risk =
            self.get_counter_value(&EXIT_CLASSIFICATIONS_TOTAL, &["RISK", "adverse_flip"]);
        let exits_clean =
            self.get_counter_value(&EXIT_CLASSIFICATIONS_TOTAL, &["CLEAN", "target_reached"]);
        let odd_spikes = self.get_counter_value(&ODD_SPIKES_TOTAL, &[pool_key]);

        PoolDailyStats {
            pool_key: pool_key.to_string(),
            rebalances_accepted,
            rebalances_rejected,
            exits_risk,
            exits_clean,
            odd_spikes,
        }
    }

    fn get_counter_value(&self, counter: &prometheus::CounterVec, labels: &[&str]) -> u64 {
        counter.with_label_values(labels).get() as u64
    }

    /// Sum a `CounterVec`'s series whose first label matches `value`,
    /// regardless of the remaining label values.
    fn sum_counter_by_label(&self, counter: &prometheus::CounterVec, value: &str) -> u64 {
        let mut total = 0u64;
        for mf in counter.collect() {
            for m in mf.get_metric() {
                if let Some(first) = m.get_label().first() {
                    if first.get_value() == value {
                        total += m.get_counter().get_value() as u64;
                    }
                }
            }
        }
        total
    }

    /// Percentiles (p50, p95, p99) for the cycle-duration histogram across
    /// all outcome labels.
    fn cycle_duration_percentiles(&self) -> (f64, f64, f64) {
        let mut combined_buckets: HashMap<String, (u64, u64)> = HashMap::new();
        let mut total_count = 0u64;

        for mf in CYCLE_DURATION_MS.collect() {
            for m in mf.get_metric() {
                let h = m.get_histogram();
                total_count += h.get_sample_count();
                for bucket in h.get_bucket() {
                    let entry = combined_buckets
                        .entry(format!("{}", bucket.get_upper_bound()))
                        .or_insert((0, 0));
                    entry.0 += bucket.get_cumulative_count();
                    entry.1 = entry.1.max(1);
                }
            }
        }

        if total_count == 0 {
            return (0.0, 0.0, 0.0);
        }

        let mut buckets: Vec<(f64, u64)> = combined_buckets
            .into_iter()
            .map(|(bound, (count, _))| (bound.parse().unwrap_or(f64::MAX), count))
            .collect();
        buckets.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let p50 = self.percentile_from_buckets(&buckets, total_count, 0.50);
        let p95 = self.percentile_from_buckets(&buckets, total_count, 0.95);
        let p99 = self.percentile_from_buckets(&buckets, total_count, 0.99);
        (p50, p95, p99)
    }

    fn percentile_from_buckets(
        &self,
        buckets: &[(f64, u64)],
        total_count: u64,
        percentile: f64,
    ) -> f64 {
        let target = (total_count as f64 * percentile) as u64;
        let mut prev_bound = 0.0;
        let mut prev_count = 0u64;

        for &(upper_bound, cumulative_count) in buckets {
            if cumulative_count >= target {
                let bucket_count = cumulative_count - prev_count;
                if bucket_count == 0 {
                    return upper_bound;
                }
                let position = (target - prev_count) as f64 / bucket_count as f64;
                return prev_bound + position * (upper_bound - prev_bound);
            }
            prev_bound = upper_bound;
            prev_count = cumulative_count;
        }

        buckets.last().map(|&(bound, _)| bound).unwrap_or(0.0)
    }

    pub fn output_daily_summary(&self) {
        let stats = self.get_stats();
        let duration = Utc::now() - self.start_time;
        let hours = duration.num_hours();
        let minutes = duration.num_minutes() % 60;
        let (p50, p95, p99) = self.cycle_duration_percentiles();

        info!("========== Daily Statistics Summary ==========");
        info!(
            "Period: {} ({} hours {} minutes)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            hours,
            minutes
        );
        info!(
            "Cycle duration (ms): P50={:.1}, P95={:.1}, P99={:.1}",
            p50, p95, p99
        );

        for s in &stats {
            info!("--- {} ---", s.pool_key);
            info!(
                "  Rebalances: {} accepted, {} rejected",
                s.rebalances_accepted, s.rebalances_rejected
            );
            info!(
                "  Exits: {} risk, {} clean",
                s.exits_risk, s.exits_clean
            );
            info!("  ODD spikes: {}", s.odd_spikes);
        }

        info!("==============================================");
    }

    pub fn to_json(&self) -> HashMap<String, PoolDailyStats> {
        self.get_stats()
            .into_iter()
            .map(|s| (s.pool_key.clone(), s))
            .collect()
    }
}
