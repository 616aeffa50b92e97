//! The pool registry: per-pool state owned independently of any position.
//!
//! Realized as an `Arc<DashMap<...>>`-backed cache, the same way the
//! teacher's position tracker gives the hot path synchronous reads without
//! an async round trip. There is no authoritative actor task behind it here
//! because nothing downstream needs serialized mutation ordering across
//! pools — each pool's entry is independent, so a `DashMap`'s per-shard
//! locking is sufficient on its own.

use std::sync::Arc;

use dashmap::DashMap;

use crate::bleed::BleedState;
use crate::error::{RegistryError, Result};
use crate::pool::PoolSnapshot;
use crate::rebalance_history::RebalanceHistory;
use crate::stats::RollingStats;

/// Everything the registry tracks for a single pool, independent of any
/// open position against it.
#[derive(Debug, Default)]
pub struct PoolEntry {
    pub latest_snapshot: Option<PoolSnapshot>,
    pub stats: RollingStats,
    pub bleed: BleedState,
    pub rebalances: RebalanceHistory,
    pub cooldown_until_ms: Option<i64>,
    pub consecutive_proof_failures: u32,
    pub blacklisted_until_ms: Option<i64>,
}

/// Shared, cloneable handle onto the pool registry.
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: Arc<DashMap<String, PoolEntry>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh snapshot and push its derived metrics into the
    /// pool's rolling stats.
    pub fn observe(&self, snapshot: PoolSnapshot) {
        let mut entry = self.pools.entry(snapshot.address.clone()).or_default();
        let ts = snapshot.observed_at_ms;
        let fee_intensity = snapshot.fee_intensity.to_string().parse::<f64>().unwrap_or(0.0);
        let volume_in_range = snapshot.volume_24h.to_string().parse::<f64>().unwrap_or(0.0);
        let bin_stability = snapshot.bin_stability();
        let churn_quality = snapshot.churn_quality();

        entry.stats.fee_intensity.push(fee_intensity, ts);
        entry.stats.volume_in_range.push(volume_in_range, ts);
        entry.stats.bin_stability.push(bin_stability, ts);
        entry.stats.churn_quality.push(churn_quality, ts);
        entry.latest_snapshot = Some(snapshot);
    }

    /// Run `f` against the pool's entry, creating a default entry if one
    /// does not yet exist.
    pub fn with_entry_mut<R>(&self, address: &str, f: impl FnOnce(&mut PoolEntry) -> R) -> R {
        let mut entry = self.pools.entry(address.to_string()).or_default();
        f(&mut entry)
    }

    /// Read-only access; fails if the pool has never been observed.
    pub fn with_entry<R>(&self, address: &str, f: impl FnOnce(&PoolEntry) -> R) -> Result<R> {
        self.pools
            .get(address)
            .map(|entry| f(&entry))
            .ok_or_else(|| RegistryError::UnknownPool(address.to_string()))
    }

    pub fn is_on_cooldown(&self, address: &str, now_ms: i64) -> bool {
        self.pools
            .get(address)
            .is_some_and(|entry| entry.cooldown_until_ms.is_some_and(|until| now_ms < until))
    }

    pub fn is_blacklisted(&self, address: &str, now_ms: i64) -> bool {
        self.pools
            .get(address)
            .is_some_and(|entry| entry.blacklisted_until_ms.is_some_and(|until| now_ms < until))
    }

    pub fn set_cooldown(&self, address: &str, until_ms: i64) {
        self.with_entry_mut(address, |entry| entry.cooldown_until_ms = Some(until_ms));
    }

    pub fn set_blacklist(&self, address: &str, until_ms: i64) {
        self.with_entry_mut(address, |entry| entry.blacklisted_until_ms = Some(until_ms));
    }

    /// Candidate pool addresses: everything observed that is neither
    /// cooling down nor blacklisted at `now_ms`.
    pub fn candidate_addresses(&self, now_ms: i64) -> Vec<String> {
        self.pools
            .iter()
            .filter(|kv| {
                let entry = kv.value();
                let cooling = entry.cooldown_until_ms.is_some_and(|until| now_ms < until);
                let blacklisted = entry.blacklisted_until_ms.is_some_and(|until| now_ms < until);
                !cooling && !blacklisted
            })
            .map(|kv| kv.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(address: &str, ts: i64) -> PoolSnapshot {
        PoolSnapshot {
            address: address.to_string(),
            liquidity: dec!(100000),
            volume_24h: dec!(5000),
            swap_velocity: dec!(0.01),
            bin_velocity: dec!(0.005),
            fee_intensity: dec!(0.05),
            migration_slope: dec!(0.01),
            active_bin: 10,
            fee_rate: dec!(0.003),
            bin_step: 10,
            price_velocity: dec!(0.01),
            observed_at_ms: ts,
        }
    }

    #[test]
    fn observe_accumulates_into_rolling_stats() {
        let registry = PoolRegistry::new();
        registry.observe(snapshot("pool1", 1_000));
        registry.observe(snapshot("pool1", 2_000));
        let count = registry
            .with_entry("pool1", |entry| entry.stats.min_sample_count())
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn unknown_pool_lookup_errors() {
        let registry = PoolRegistry::new();
        assert!(registry.with_entry("ghost", |_| ()).is_err());
    }

    #[test]
    fn cooldown_excludes_pool_from_candidates() {
        let registry = PoolRegistry::new();
        registry.observe(snapshot("pool1", 1_000));
        registry.observe(snapshot("pool2", 1_000));
        registry.set_cooldown("pool1", 10_000);

        let candidates = registry.candidate_addresses(5_000);
        assert!(!candidates.contains(&"pool1".to_string()));
        assert!(candidates.contains(&"pool2".to_string()));

        let candidates_after_expiry = registry.candidate_addresses(10_001);
        assert!(candidates_after_expiry.contains(&"pool1".to_string()));
    }

    #[test]
    fn blacklist_excludes_pool_from_candidates() {
        let registry = PoolRegistry::new();
        registry.observe(snapshot("pool1", 1_000));
        registry.set_blacklist("pool1", 86_400_000);
        assert!(registry.candidate_addresses(1_000).is_empty());
    }
}
