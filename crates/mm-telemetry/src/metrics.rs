//! Prometheus metrics for the market-making controller.
//!
//! Counts lifecycle transitions, exit classifications, escape-hatch
//! triggers, fee-bleed defense activity, rebalance accept/reject, capital
//! ramp progress, ODD spikes, and reconciliation-seal outcome. Dashboarding
//! and alert routing on top of these metrics are out of scope here.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails
//! it indicates a fatal configuration error (duplicate metric names) that
//! should crash at startup rather than fail silently. These panics only
//! occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec, CounterVec,
    Gauge, GaugeVec, HistogramVec,
};

/// Lifecycle transitions by (prior, next) state.
pub static LIFECYCLE_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_lifecycle_transitions_total",
        "Total position lifecycle transitions by prior and next state",
        &["prior", "next"]
    )
    .unwrap()
});

/// Exit classifications by (classification, reason).
pub static EXIT_CLASSIFICATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_exit_classifications_total",
        "Total exit classifications by classification and reason",
        &["classification", "reason"]
    )
    .unwrap()
});

/// Escape-hatch triggers by kind (ttl/suppression_cap/economic_staleness).
pub static ESCAPE_HATCH_TRIGGERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_escape_hatch_triggers_total",
        "Total escape-hatch triggers by kind",
        &["kind"]
    )
    .unwrap()
});

/// Fee-bleed defense activations by reason.
pub static DEFENSE_ACTIVATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_defense_activations_total",
        "Total fee-bleed defense activations",
        &["reason"]
    )
    .unwrap()
});

/// Fee-bleed defense deactivations by reason.
pub static DEFENSE_DEACTIVATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_defense_deactivations_total",
        "Total fee-bleed defense deactivations",
        &["reason"]
    )
    .unwrap()
});

/// Whether the fee-bleed defense is currently active (1/0).
pub static DEFENSE_ACTIVE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "mm_defense_active",
        "Fee-bleed defense active state (1=active)"
    )
    .unwrap()
});

/// Rebalance accept/reject outcomes by trigger and gate.
pub static REBALANCE_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_rebalance_outcomes_total",
        "Total rebalance evaluations by outcome, trigger and gate",
        &["outcome", "trigger", "gate"]
    )
    .unwrap()
});

/// Capital ramp stage transitions by (pool, prior_stage, next_stage).
pub static CAPITAL_RAMP_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_capital_ramp_transitions_total",
        "Total capital ramp stage transitions",
        &["pool", "prior_stage", "next_stage"]
    )
    .unwrap()
});

/// Capital ramp proof-window failures by pool.
pub static CAPITAL_RAMP_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_capital_ramp_failures_total",
        "Total capital ramp proof-window failures by pool",
        &["pool"]
    )
    .unwrap()
});

/// ODD spikes confirmed, by pool.
pub static ODD_SPIKES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_odd_spikes_total",
        "Total opportunity density spikes confirmed by pool",
        &["pool"]
    )
    .unwrap()
});

/// ODD rejects by reason.
pub static ODD_REJECTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mm_odd_rejects_total",
        "Total opportunity density rejections by reason",
        &["reason"]
    )
    .unwrap()
});

/// Current ODS score per pool.
pub static ODD_SCORE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "mm_odd_score",
        "Current opportunity density score per pool",
        &["pool"]
    )
    .unwrap()
});

/// Reconciliation seal outcome (1=sealed, 0=rejected) at startup.
pub static RECONCILIATION_SEAL_OUTCOME: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "mm_reconciliation_seal_outcome",
        "Reconciliation seal outcome at startup (1=sealed, 0=rejected)"
    )
    .unwrap()
});

/// Ledger deployed fraction of equity.
pub static LEDGER_DEPLOYED_FRACTION: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "mm_ledger_deployed_fraction",
        "Fraction of equity currently deployed across all pools"
    )
    .unwrap()
});

/// Per-cycle evaluator duration in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "mm_cycle_duration_ms",
        "Scheduler evaluation cycle duration in milliseconds",
        &["outcome"],
        vec![
            10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 30000.0
        ]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn lifecycle_transition(prior: &str, next: &str) {
        LIFECYCLE_TRANSITIONS_TOTAL
            .with_label_values(&[prior, next])
            .inc();
    }

    pub fn exit_classified(classification: &str, reason: &str) {
        EXIT_CLASSIFICATIONS_TOTAL
            .with_label_values(&[classification, reason])
            .inc();
    }

    pub fn escape_hatch_triggered(kind: &str) {
        ESCAPE_HATCH_TRIGGERS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn defense_activated(reason: &str) {
        DEFENSE_ACTIVATIONS_TOTAL.with_label_values(&[reason]).inc();
        DEFENSE_ACTIVE.set(1.0);
    }

    pub fn defense_deactivated(reason: &str) {
        DEFENSE_DEACTIVATIONS_TOTAL
            .with_label_values(&[reason])
            .inc();
        DEFENSE_ACTIVE.set(0.0);
    }

    pub fn rebalance_outcome(outcome: &str, trigger: &str, gate: &str) {
        REBALANCE_OUTCOMES_TOTAL
            .with_label_values(&[outcome, trigger, gate])
            .inc();
    }

    pub fn capital_ramp_transition(pool: &str, prior_stage: &str, next_stage: &str) {
        CAPITAL_RAMP_TRANSITIONS_TOTAL
            .with_label_values(&[pool, prior_stage, next_stage])
            .inc();
    }

    pub fn capital_ramp_failure(pool: &str) {
        CAPITAL_RAMP_FAILURES_TOTAL.with_label_values(&[pool]).inc();
    }

    pub fn odd_spike(pool: &str) {
        ODD_SPIKES_TOTAL.with_label_values(&[pool]).inc();
    }

    pub fn odd_reject(reason: &str) {
        ODD_REJECTS_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn odd_score(pool: &str, score: f64) {
        ODD_SCORE.with_label_values(&[pool]).set(score);
    }

    pub fn reconciliation_seal_outcome(sealed: bool) {
        RECONCILIATION_SEAL_OUTCOME.set(if sealed { 1.0 } else { 0.0 });
    }

    pub fn ledger_deployed_fraction(fraction: f64) {
        LEDGER_DEPLOYED_FRACTION.set(fraction);
    }

    pub fn cycle_duration(outcome: &str, duration_ms: f64) {
        CYCLE_DURATION_MS
            .with_label_values(&[outcome])
            .observe(duration_ms);
    }
}
