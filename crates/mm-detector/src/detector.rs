//! The Opportunity Density Detector: scores each pool's rolling stats into
//! a single ODS value per cycle and tracks confirmed spikes with a
//! peak-decaying TTL.

use std::collections::HashMap;

use mm_core::Regime;
use mm_registry::RollingStats;

use crate::config::DetectorConfig;

/// Why a pool's ODS could not be computed this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    InsufficientSamples,
    Stale,
    SyntheticData,
    FallbackData,
    MissingMicroMetrics,
}

/// The outcome of scoring one pool for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assessment {
    Rejected(RejectReason),
    Scored { ods: f64 },
}

/// Inputs the ODD needs beyond the pool's rolling stats.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext {
    pub fee_intensity: f64,
    pub volume_in_range: f64,
    pub bin_stability: f64,
    pub churn_quality: f64,
    pub now_ms: i64,
    pub bootstrap: bool,
    pub has_micro_metrics: bool,
}

/// A confirmed, decaying spike for one pool.
#[derive(Debug, Clone, Copy)]
pub struct Spike {
    pub confirmed_at_ms: i64,
    pub expires_at_ms: i64,
    pub peak_ods: f64,
    pub consecutive_cycles: u32,
}

/// Scores pools into an ODS and manages the confirmed-spike lifecycle.
///
/// Spike state lives here rather than in the pool registry because it is a
/// derived, detector-owned judgment (confirmation, peak, decay), not raw
/// observational data the registry would otherwise own.
#[derive(Debug, Default)]
pub struct OpportunityDensityDetector {
    config: DetectorConfig,
    pending_confirm: HashMap<String, u32>,
    spikes: HashMap<String, Spike>,
}

impl OpportunityDensityDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            pending_confirm: HashMap::new(),
            spikes: HashMap::new(),
        }
    }

    /// Validate a pool's rolling stats and scoring context, then compute ODS.
    pub fn assess(&self, stats: &RollingStats, ctx: &ScoringContext) -> Assessment {
        let sample_count = stats.min_sample_count();

        // Bootstrap relaxes the requirement to `min_samples_bootstrap`; the
        // absolute floor only guards the steady-state threshold against
        // being misconfigured below a sane minimum, so it must not be
        // applied ahead of the bootstrap branch.
        let min_required = if ctx.bootstrap {
            self.config.min_samples_bootstrap
        } else {
            self.config.min_samples_steady_state.max(self.config.min_samples_floor)
        };
        if sample_count < min_required {
            return Assessment::Rejected(RejectReason::InsufficientSamples);
        }

        if !ctx.has_micro_metrics {
            return Assessment::Rejected(RejectReason::MissingMicroMetrics);
        }

        if stats.fee_intensity.staleness_ms(ctx.now_ms) > self.config.max_staleness_ms {
            return Assessment::Rejected(RejectReason::Stale);
        }

        if stats.fee_intensity.identical_timestamp_fraction()
            > self.config.max_identical_timestamp_fraction
        {
            return Assessment::Rejected(RejectReason::SyntheticData);
        }

        if ctx.fee_intensity == 0.0 && ctx.volume_in_range == 0.0 {
            return Assessment::Rejected(RejectReason::FallbackData);
        }

        let clamp = self.config.z_clamp;
        let z_fee = stats.fee_intensity.z_score(ctx.fee_intensity, clamp);
        let z_volume = stats.volume_in_range.z_score(ctx.volume_in_range, clamp);
        let z_stability = stats.bin_stability.z_score(ctx.bin_stability, clamp);
        let z_churn = stats.churn_quality.z_score(ctx.churn_quality, clamp);

        let ods = self.config.weight_fee_intensity * z_fee
            + self.config.weight_volume_in_range * z_volume
            + self.config.weight_bin_stability * z_stability
            + self.config.weight_churn_quality * z_churn;

        Assessment::Scored { ods }
    }

    /// Whether all spike conditions hold for this cycle, given a scored
    /// assessment and the other portfolio-level gates.
    pub fn spike_conditions_hold(
        &self,
        ods: f64,
        regime: Regime,
        ev_positive: bool,
        fee_bleed_defense_active: bool,
        portfolio_consistency_healthy: bool,
    ) -> bool {
        ods >= self.config.spike_threshold
            && regime.is_favorable_for_spike()
            && ev_positive
            && !fee_bleed_defense_active
            && portfolio_consistency_healthy
    }

    /// Advance this pool's spike state machine for the cycle. Call once per
    /// pool per cycle with the current ODS (if scored) and whether the
    /// other spike conditions held.
    pub fn update_spike(
        &mut self,
        pool: &str,
        ods: f64,
        conditions_hold: bool,
        now_ms: i64,
    ) -> Option<Spike> {
        if !conditions_hold {
            self.pending_confirm.remove(pool);
            self.spikes.remove(pool);
            return None;
        }

        if let Some(spike) = self.spikes.get_mut(pool) {
            spike.consecutive_cycles += 1;
            if ods > spike.peak_ods {
                spike.peak_ods = ods;
            }
            let drop = (spike.peak_ods - ods) / spike.peak_ods.max(f64::EPSILON);
            if drop >= self.config.peak_drop_fraction {
                let accelerated = now_ms + self.config.spike_min_ttl_ms;
                spike.expires_at_ms = spike.expires_at_ms.min(accelerated);
            }
            return Some(*spike);
        }

        let streak = self.pending_confirm.entry(pool.to_string()).or_insert(0);
        *streak += 1;

        if *streak >= self.config.spike_confirm_cycles {
            let spike = Spike {
                confirmed_at_ms: now_ms,
                expires_at_ms: now_ms + self.config.spike_ttl_ms,
                peak_ods: ods,
                consecutive_cycles: *streak,
            };
            self.pending_confirm.remove(pool);
            self.spikes.insert(pool.to_string(), spike);
            return Some(spike);
        }

        None
    }

    pub fn is_rare_convergence(&self, ods: f64) -> bool {
        ods >= self.config.rare_convergence_threshold
    }

    pub fn active_spike(&self, pool: &str, now_ms: i64) -> Option<Spike> {
        self.spikes.get(pool).copied().filter(|s| now_ms < s.expires_at_ms)
    }

    pub fn expire_spikes(&mut self, now_ms: i64) {
        self.spikes.retain(|_, spike| now_ms < spike.expires_at_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_registry::RollingStats;

    fn seed_stats(samples: usize) -> RollingStats {
        let mut stats = RollingStats::new();
        for i in 0..samples {
            let ts = i as i64 * 1_000;
            stats.fee_intensity.push(1.0 + (i as f64 * 0.01), ts);
            stats.volume_in_range.push(100.0 + i as f64, ts);
            stats.bin_stability.push(0.8, ts);
            stats.churn_quality.push(2.0, ts);
        }
        stats
    }

    fn ctx(now_ms: i64) -> ScoringContext {
        ScoringContext {
            fee_intensity: 1.5,
            volume_in_range: 150.0,
            bin_stability: 0.9,
            churn_quality: 3.0,
            now_ms,
            bootstrap: false,
            has_micro_metrics: true,
        }
    }

    #[test]
    fn rejects_insufficient_samples() {
        let detector = OpportunityDensityDetector::new(DetectorConfig::default());
        let stats = seed_stats(10);
        let result = detector.assess(&stats, &ctx(10_000));
        assert_eq!(result, Assessment::Rejected(RejectReason::InsufficientSamples));
    }

    #[test]
    fn bootstrap_lowers_sample_requirement() {
        let detector = OpportunityDensityDetector::new(DetectorConfig::default());
        let stats = seed_stats(20);
        let mut context = ctx(20_000);
        context.bootstrap = true;
        let result = detector.assess(&stats, &context);
        assert!(matches!(result, Assessment::Scored { .. }));
    }

    #[test]
    fn bootstrap_scores_below_the_absolute_floor() {
        // 10 samples: below min_samples_floor (15) and min_samples_steady_state
        // (30), but above min_samples_bootstrap (5) — bootstrap must still score.
        let detector = OpportunityDensityDetector::new(DetectorConfig::default());
        let stats = seed_stats(10);
        let mut context = ctx(10_000);
        context.bootstrap = true;
        let result = detector.assess(&stats, &context);
        assert!(matches!(result, Assessment::Scored { .. }));
    }

    #[test]
    fn rejects_stale_data() {
        let detector = OpportunityDensityDetector::new(DetectorConfig::default());
        let stats = seed_stats(40);
        let result = detector.assess(&stats, &ctx(40_000 + 10 * 60 * 1000));
        assert_eq!(result, Assessment::Rejected(RejectReason::Stale));
    }

    #[test]
    fn rejects_missing_micro_metrics() {
        let detector = OpportunityDensityDetector::new(DetectorConfig::default());
        let stats = seed_stats(40);
        let mut context = ctx(40_000);
        context.has_micro_metrics = false;
        assert_eq!(
            detector.assess(&stats, &context),
            Assessment::Rejected(RejectReason::MissingMicroMetrics)
        );
    }

    #[test]
    fn spike_requires_consecutive_cycles() {
        let mut detector = OpportunityDensityDetector::new(DetectorConfig::default());
        assert!(detector.update_spike("pool1", 3.0, true, 0).is_none());
        let spike = detector.update_spike("pool1", 3.0, true, 1_000).unwrap();
        assert_eq!(spike.consecutive_cycles, 2);
    }

    #[test]
    fn spike_drops_when_conditions_fail() {
        let mut detector = OpportunityDensityDetector::new(DetectorConfig::default());
        detector.update_spike("pool1", 3.0, true, 0);
        detector.update_spike("pool1", 3.0, true, 1_000);
        assert!(detector.active_spike("pool1", 1_000).is_some());
        detector.update_spike("pool1", 3.0, false, 2_000);
        assert!(detector.active_spike("pool1", 2_000).is_none());
    }

    #[test]
    fn peak_drop_accelerates_decay() {
        let mut detector = OpportunityDensityDetector::new(DetectorConfig::default());
        detector.update_spike("pool1", 3.0, true, 0);
        detector.update_spike("pool1", 3.0, true, 1_000);
        let decayed = detector.update_spike("pool1", 2.0, true, 2_000).unwrap();
        // peak 3.0, dropped to 2.0: 33% drop exceeds the 30% acceleration threshold
        assert!(decayed.expires_at_ms <= 2_000 + detector.config.spike_min_ttl_ms);
    }

    #[test]
    fn rare_convergence_threshold() {
        let detector = OpportunityDensityDetector::new(DetectorConfig::default());
        assert!(detector.is_rare_convergence(2.8));
        assert!(!detector.is_rare_convergence(2.79));
    }
}
