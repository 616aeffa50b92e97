//! Per-pool rebalance history: last-rebalance timestamp, running count, and
//! a bounded 24h window of timestamps for the per-day frequency cap.

use std::collections::VecDeque;

/// Rebalance bookkeeping the registry owns per pool.
///
/// The 24h window is a plain timestamp deque rather than a `RollingStat`
/// because the controller only ever needs a count within the window, not a
/// mean/stddev over it.
#[derive(Debug, Clone, Default)]
pub struct RebalanceHistory {
    total_count: u64,
    last_rebalance_ms: Option<i64>,
    window: VecDeque<i64>,
}

const WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

impl RebalanceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_rebalance_ms(&self) -> Option<i64> {
        self.last_rebalance_ms
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Count of rebalances within the trailing 24h of `now_ms`.
    pub fn count_last_24h(&mut self, now_ms: i64) -> usize {
        self.evict_stale(now_ms);
        self.window.len()
    }

    pub fn record_rebalance(&mut self, now_ms: i64) {
        self.evict_stale(now_ms);
        self.window.push_back(now_ms);
        self.total_count += 1;
        self.last_rebalance_ms = Some(now_ms);
    }

    fn evict_stale(&mut self, now_ms: i64) {
        while let Some(&oldest) = self.window.front() {
            if now_ms - oldest > WINDOW_MS {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn minutes_since_last(&self, now_ms: i64) -> Option<i64> {
        self.last_rebalance_ms.map(|last| (now_ms - last) / 60_000)
    }
}
