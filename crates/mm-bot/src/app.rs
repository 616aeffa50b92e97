//! The `Application`: wires the persistence/seal/ledger/registry layer to
//! the `Scheduler` and drives one scan-interval tick per cycle.
//!
//! Startup is reconciliation-first: hydrate whatever the `positions` table
//! says is open, seal the recovered totals exactly once, then either stop
//! (`RECONCILE_ONLY=true`) or enter the run loop. The loop itself is a
//! single `tokio::time::interval` tick rather than the teacher's
//! WS-event `select!` — there is no exchange feed in this workspace, so the
//! only external event the loop reacts to is the scan timer and shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use mm_core::{FlowState, Money, PoolId, PositionId, Regime, SystemClock};
use mm_persistence::{
    evaluate_bootstrap, BootstrapDecision, BootstrapState, FilePositionsStore, FileRuntimeStateStore,
    InMemoryPositionsStore, InMemoryRuntimeStateStore, PersistedPosition, PoolSnapshotSource,
    PositionsStore, RuntimeStateStore, SnapshotRecord, SnapshotStore, StaticPoolSnapshotSource,
};
use mm_position::Position;
use mm_registry::PoolRegistry;
use mm_seal::{EngineMode, HydrationResult, Ledger, ReconciliationSeal, SealInput};
use mm_telemetry::Metrics;

use crate::config::{AppConfig, EnvSettings};
use crate::error::{AppError, AppResult};
use crate::scheduler::{PoolProofSignal, PositionSignal, Scheduler};

/// How many cycles between snapshot-store prune passes; pruning is
/// periodic housekeeping, not a per-append cost.
const PRUNE_EVERY_N_CYCLES: u64 = 30;

/// Average candidate-pool `price_velocity` above which the cycle classifies
/// the regime as BULL; below its negation, BEAR. No teacher or spec
/// precedent defines this threshold since `Regime` has no workspace-internal
/// classifier (see DESIGN.md) — picked as a small multiple of the noise
/// floor implied by the detector's own z-score clamp on the same field.
const REGIME_PRICE_VELOCITY_THRESHOLD: f64 = 0.01;

pub struct Application {
    config: AppConfig,
    env: EnvSettings,
    seal: Arc<ReconciliationSeal>,
    ledger: Arc<Ledger>,
    registry: PoolRegistry,
    scheduler: Scheduler,
    positions: HashMap<Uuid, Position>,
    positions_store: Arc<dyn PositionsStore>,
    runtime_state_store: Arc<dyn RuntimeStateStore>,
    snapshot_store: Arc<SnapshotStore>,
    pool_snapshot_source: Arc<dyn PoolSnapshotSource>,
    clock: Arc<SystemClock>,
    cycle_count: u64,
    bootstrap_decision: BootstrapDecision,
}

impl Application {
    /// Construct every collaborator from `config`. File-backed stores are
    /// used unless `DEV_MODE=true`, in which case everything lives
    /// in-memory for a throwaway local run.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let env = EnvSettings::from_env();

        let (positions_store, runtime_state_store): (
            Arc<dyn PositionsStore>,
            Arc<dyn RuntimeStateStore>,
        ) = if env.dev_mode {
            (
                Arc::new(InMemoryPositionsStore::new()),
                Arc::new(InMemoryRuntimeStateStore::new()),
            )
        } else {
            (
                Arc::new(FilePositionsStore::new(config.persistence.positions_path.clone())),
                Arc::new(FileRuntimeStateStore::new(
                    config.persistence.runtime_state_path.clone(),
                )),
            )
        };
        let snapshot_store = Arc::new(SnapshotStore::new(config.persistence.snapshot_store_path.clone()));

        let starting_equity = Decimal::try_from(config.capital.starting_equity)
            .map_err(|e| AppError::Config(format!("invalid starting_equity: {e}")))?;
        let ledger = Arc::new(Ledger::new(Money::ZERO, Money::new(starting_equity), Money::new(starting_equity)));

        let registry = PoolRegistry::new();
        let scheduler = Scheduler::new(
            registry.clone(),
            ledger.clone(),
            config.detector.clone(),
            config.rebalance.clone(),
            config.capital_ramp.clone(),
        );

        Ok(Self {
            config,
            env,
            seal: Arc::new(ReconciliationSeal::new()),
            ledger,
            registry,
            scheduler,
            positions: HashMap::new(),
            positions_store,
            runtime_state_store,
            snapshot_store,
            pool_snapshot_source: Arc::new(StaticPoolSnapshotSource::new(Vec::new())),
            clock: Arc::new(SystemClock),
            cycle_count: 0,
            bootstrap_decision: BootstrapDecision::Off,
        })
    }

    /// Swap in a real pool snapshot source (discovery/indexer collaborator).
    /// Tests and the dry-run binary use the default empty static source.
    pub fn with_pool_snapshot_source(mut self, source: Arc<dyn PoolSnapshotSource>) -> Self {
        self.pool_snapshot_source = source;
        self
    }

    /// Hydrate open positions from the `positions` table and seal the
    /// recovered totals exactly once. Must run before [`Self::run`].
    ///
    /// `PersistedPosition` carries only what the table's sole-source-of-
    /// truth contract promises (id, pool, size, stage, entry timestamp);
    /// it has no entry regime/score/fee-velocity fields, since those are
    /// in-memory-only until the first cycle re-observes the pool. Hydrated
    /// positions start `Active` with neutral entry signal values — the
    /// seal only needs count and locked-capital totals to match, not full
    /// signal fidelity.
    pub fn run_preflight(&mut self) -> AppResult<()> {
        let now_ms = self.clock_now_ms();

        let bootstrap_state = self.runtime_state_store.load_bootstrap_state()?;
        let snapshots_last_6h = self.snapshot_store.load_recent(now_ms)?.len() as u32;
        let decision = evaluate_bootstrap(&bootstrap_state, now_ms, snapshots_last_6h, 0);
        tracing::info!(?decision, "bootstrap persistence contract evaluated");

        // RESUME keeps the saved state as-is; SKIP/OFF both mean this run
        // starts with bootstrap inactive, so persist that explicitly rather
        // than leaving a stale `bootstrap_active: true` on disk.
        let next_bootstrap_state = match decision {
            BootstrapDecision::Resume => bootstrap_state,
            BootstrapDecision::Skip | BootstrapDecision::Off => BootstrapState {
                bootstrap_active: false,
                ..bootstrap_state
            },
        };
        self.runtime_state_store.save_bootstrap_state(&next_bootstrap_state)?;
        self.bootstrap_decision = decision;

        let persisted = self.positions_store.list_open()?;
        let mut total_locked = Money::ZERO;
        let mut open_position_ids = Vec::with_capacity(persisted.len());

        for record in &persisted {
            let position = hydrate_position(record)?;
            total_locked += position.entry_size;
            open_position_ids.push(position.id);
            self.positions.insert(position.id.0, position);
        }

        // Rebuild the ledger's totals to match hydration before sealing:
        // `guard_capital_rebuild` only forbids a rebuild *after* the seal
        // with positions still open, and at this point nothing is sealed
        // yet, so this is the initial population, not a later overwrite.
        let equity = self.ledger.equity();
        self.ledger
            .rebuild(total_locked, equity - total_locked, equity)
            .map_err(AppError::Seal)?;

        let seal_input = SealInput {
            open_count: persisted.len(),
            locked: total_locked,
            available: self.ledger.available_capital(),
            equity: self.ledger.equity(),
            recovered_count: persisted.len(),
            run_id: mm_core::RunId::new(),
            sealed_at_ms: now_ms,
            open_position_ids,
        };
        let hydration = HydrationResult {
            position_count: self.positions.len(),
            total_locked,
        };

        self.seal.seal(seal_input, hydration).map_err(|e| {
            tracing::error!(error = %e, "reconciliation seal failed, this is fatal");
            AppError::Seal(e)
        })?;

        Metrics::reconciliation_seal_outcome(true);
        Ok(())
    }

    /// Run the scan loop until shutdown. Honors `RECONCILE_ONLY` (returns
    /// immediately after preflight) and `SCAN_INTERVAL_MS`.
    pub async fn run(mut self) -> AppResult<()> {
        if self.env.reconcile_only {
            tracing::info!("RECONCILE_ONLY=true, exiting after reconciliation");
            return Ok(());
        }

        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(
            self.env.scan_interval_ms.max(1) as u64,
        ));
        // A cycle that overruns the interval is logged and the next tick is
        // skipped rather than queued; Skip is what makes that true instead
        // of a burst of catch-up ticks.
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_one_cycle().await {
                        if e.is_fatal() {
                            tracing::error!(error = %e, "fatal error, stopping");
                            return Err(e);
                        }
                        tracing::warn!(error = %e, "cycle failed, continuing");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    async fn run_one_cycle(&mut self) -> AppResult<()> {
        let cycle_start_ms = self.clock_now_ms();

        for snapshot in self.pool_snapshot_source.snapshots() {
            self.persist_snapshot(&snapshot)?;
            self.registry.observe(snapshot);
        }

        let regime = self.current_regime(cycle_start_ms);
        let flow = if self.bootstrap_decision == BootstrapDecision::Resume {
            FlowState::Bootstrap
        } else {
            self.current_flow(cycle_start_ms)
        };
        let signals = self.build_position_signals(regime);
        let proofs = self.build_pool_proofs();
        let portfolio_consistency_healthy = self.seal.is_sealed();

        let outcome = self.scheduler.run_cycle(
            &mut self.positions,
            &signals,
            &proofs,
            regime,
            flow,
            portfolio_consistency_healthy,
            cycle_start_ms,
        )?;

        for entry in &outcome.entries {
            self.apply_entry(entry, regime, cycle_start_ms)?;
        }
        for exit in &outcome.exits {
            self.apply_exit(exit)?;
        }
        for rebalance in &outcome.rebalances {
            if let Some(position) = self.positions.get(&rebalance.position.0) {
                self.positions_store.upsert(PersistedPosition {
                    position_id: position.id.to_string(),
                    pool_id: position.pool_id.0.clone(),
                    size: position.entry_size.to_string(),
                    stage: "REBALANCED".to_string(),
                    entry_ts_ms: position.entry_ts_ms,
                })?;
            }
            Metrics::rebalance_outcome("accepted", &format!("{:?}", rebalance.trigger), "pass");
        }
        if let Some(defense) = &outcome.defense {
            if defense.active {
                Metrics::defense_activated("active");
            } else if let Some(reason) = &defense.deactivation_reason {
                Metrics::defense_deactivated(reason);
            }
        }

        let elapsed_ms = self.clock_now_ms() - cycle_start_ms;
        Metrics::cycle_duration("ok", elapsed_ms as f64);
        if elapsed_ms > self.env.scan_interval_ms {
            tracing::warn!(elapsed_ms, budget_ms = self.env.scan_interval_ms, "cycle exceeded scan interval");
        }

        self.cycle_count += 1;
        if self.cycle_count % PRUNE_EVERY_N_CYCLES == 0 {
            self.snapshot_store.prune(cycle_start_ms)?;
        }

        Ok(())
    }

    fn apply_entry(&mut self, entry: &crate::scheduler::EntryDecision, regime: Regime, now_ms: i64) -> AppResult<()> {
        self.ledger
            .reserve_entry(entry.size)
            .map_err(|e| AppError::InvariantViolation(format!("{:?}", e)))?;

        let position = Position::new(PositionId::new(), entry.pool.clone(), now_ms, entry.size, 0.0, regime, 0.0);
        self.positions_store.upsert(PersistedPosition {
            position_id: position.id.to_string(),
            pool_id: entry.pool.0.clone(),
            size: entry.size.to_string(),
            stage: format!("{:?}", entry.stage),
            entry_ts_ms: now_ms,
        })?;
        self.positions.insert(position.id.0, position);
        tracing::info!(pool = %entry.pool, size = %entry.size, reason = %entry.reason, "entered position");
        Ok(())
    }

    fn apply_exit(&mut self, exit: &crate::scheduler::ExitDecision) -> AppResult<()> {
        if let Some(position) = self.positions.remove(&exit.position.0) {
            self.ledger.release_exit(position.entry_size);
            self.positions_store.remove(&exit.position.to_string())?;
            Metrics::exit_classified(
                exit.classification.map(|c| format!("{c:?}")).unwrap_or_else(|| "forced".to_string()).as_str(),
                &exit.reason,
            );
        }
        Ok(())
    }

    fn persist_snapshot(&self, snapshot: &mm_registry::PoolSnapshot) -> AppResult<()> {
        let record = SnapshotRecord {
            pool_id_hash: hash_pool_id(&snapshot.address),
            ts_ms: snapshot.observed_at_ms,
            fee_intensity: snapshot.fee_intensity.to_string().parse().unwrap_or(0.0),
            volume_in_range: snapshot.volume_24h.to_string().parse().unwrap_or(0.0),
            migration_slope: snapshot.migration_slope.to_string().parse().unwrap_or(0.0),
            bin_velocity: snapshot.bin_velocity.to_string().parse().unwrap_or(0.0),
            swap_velocity: snapshot.swap_velocity.to_string().parse().unwrap_or(0.0),
            price_velocity: snapshot.price_velocity.to_string().parse().unwrap_or(0.0),
        };
        self.snapshot_store.append(&record)?;
        Ok(())
    }

    /// Average `price_velocity` across every candidate pool's latest
    /// snapshot, classified into a BULL/NEUTRAL/BEAR regime. `Regime` has no
    /// workspace-internal classifier (it is informational-only, see
    /// `mm-core::regime`) so this is this workspace's own derivation, not a
    /// teacher-grounded one.
    fn current_regime(&self, now_ms: i64) -> Regime {
        let addresses = self.registry.candidate_addresses(now_ms);
        if addresses.is_empty() {
            return Regime::Neutral;
        }
        let mut total = 0.0;
        let mut count = 0usize;
        for address in &addresses {
            if let Ok(velocity) = self.registry.with_entry(address, |entry| {
                entry
                    .latest_snapshot
                    .as_ref()
                    .map(|s| s.price_velocity.to_string().parse::<f64>().unwrap_or(0.0))
                    .unwrap_or(0.0)
            }) {
                total += velocity;
                count += 1;
            }
        }
        if count == 0 {
            return Regime::Neutral;
        }
        let avg = total / count as f64;
        if avg > REGIME_PRICE_VELOCITY_THRESHOLD {
            Regime::Bull
        } else if avg < -REGIME_PRICE_VELOCITY_THRESHOLD {
            Regime::Bear
        } else {
            Regime::Neutral
        }
    }

    /// Average candidate-pool fee intensity, read through
    /// `FlowState::from_fee_velocity`. Bootstrap is never returned here —
    /// the caller overrides to `FlowState::Bootstrap` from the persisted
    /// bootstrap decision instead, per that classifier's own contract.
    fn current_flow(&self, now_ms: i64) -> FlowState {
        let addresses = self.registry.candidate_addresses(now_ms);
        if addresses.is_empty() {
            return FlowState::Low;
        }
        let mut total = 0.0;
        let mut count = 0usize;
        for address in &addresses {
            if let Ok(mean) = self
                .registry
                .with_entry(address, |entry| entry.stats.fee_intensity.mean())
            {
                total += mean;
                count += 1;
            }
        }
        if count == 0 {
            return FlowState::Low;
        }
        FlowState::from_fee_velocity(total / count as f64)
    }

    /// Derive per-position signals from what this workspace actually has:
    /// the position's own fee-snapshot velocity and its pool's latest
    /// observed snapshot. No valuation/pricing feed is in scope, so
    /// unrealized pnl and EV default conservatively to zero until a real
    /// feed is wired in.
    fn build_position_signals(&self, regime: Regime) -> HashMap<Uuid, PositionSignal> {
        self.positions
            .iter()
            .map(|(id, position)| {
                let fee_velocity = position.fee_snapshots.velocity_per_hour().unwrap_or(0.0);
                let signal = PositionSignal {
                    current_regime: regime,
                    current_score: position.entry_score,
                    ev: 0.0,
                    unrealized_pnl: 0.0,
                    loss_rate_per_hour: 0.0,
                    fee_rate_per_hour: fee_velocity,
                    current_fee_velocity: fee_velocity,
                    migration_slope_per_min: 0.0,
                    price_movement_pct_per_hour: 0.0,
                    normalized_fee_intensity: self.config.cost.rebalance_tx_cost / entry_or_one(position.entry_size),
                    expected_net_value: 0.0,
                    cost_target: self.config.cost.rebalance_tx_cost,
                    neighbor_max_fee_velocity: fee_velocity,
                    rolling_peak_fee_velocity: fee_velocity,
                    external_liquidity_in_range_change_pct: 0.0,
                    adjacent_bin_revisit_rate_change_pct: 0.0,
                    tx_cost: self.config.cost.rebalance_tx_cost,
                };
                (*id, signal)
            })
            .collect()
    }

    fn build_pool_proofs(&self) -> HashMap<String, PoolProofSignal> {
        let now_ms = self.clock_now_ms();
        let bootstrap = self.bootstrap_decision == BootstrapDecision::Resume;
        self.registry
            .candidate_addresses(now_ms)
            .into_iter()
            .filter_map(|address| {
                self.registry
                    .with_entry(&address, |entry| {
                        let fees_accrued = entry.stats.fee_intensity.mean();
                        PoolProofSignal {
                            fees_accrued,
                            entry_cost: self.config.cost.entry_cost,
                            expected_exit_cost: self.config.cost.expected_exit_cost,
                            normalized_fee_velocity_per_1000_per_hour: fees_accrued,
                            consecutive_velocity_intervals: entry.stats.fee_intensity.count() as u32,
                            has_micro_metrics: true,
                            bootstrap,
                            ev: fees_accrued - (self.config.cost.entry_cost + self.config.cost.expected_exit_cost),
                        }
                    })
                    .ok()
                    .map(|proof| (address, proof))
            })
            .collect()
    }

    fn clock_now_ms(&self) -> i64 {
        use mm_core::Clock;
        self.clock.now_ms()
    }
}

fn hash_pool_id(address: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    address.hash(&mut hasher);
    hasher.finish()
}

fn entry_or_one(size: Money) -> f64 {
    let value = size.inner().to_string().parse::<f64>().unwrap_or(0.0);
    if value.abs() < f64::EPSILON {
        1.0
    } else {
        value
    }
}

fn hydrate_position(record: &PersistedPosition) -> AppResult<Position> {
    let position_uuid = Uuid::parse_str(&record.position_id)
        .map_err(|e| AppError::Reconciliation(format!("invalid position id {}: {e}", record.position_id)))?;
    let size: Decimal = record
        .size
        .parse()
        .map_err(|e| AppError::Reconciliation(format!("invalid persisted size {}: {e}", record.size)))?;

    Ok(Position::new(
        PositionId(position_uuid),
        PoolId::new(record.pool_id.clone()),
        record.entry_ts_ms,
        Money::new(size),
        0.0,
        Regime::Neutral,
        0.0,
    ))
}

// Guard against an accidental engine-mode downgrade attempt; this crate
// only ever runs Stateful, but the seal type represents the alternative so
// the rejection is explicit rather than absent.
#[allow(dead_code)]
fn assert_stateful(seal: &ReconciliationSeal) -> AppResult<()> {
    seal.guard_engine_mode(EngineMode::Stateful).map_err(AppError::Seal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn new_application_starts_with_zero_locked_capital() {
        std::env::set_var("DEV_MODE", "true");
        let app = Application::new(test_config()).unwrap();
        assert_eq!(app.ledger.locked_capital(), Money::ZERO);
        std::env::remove_var("DEV_MODE");
    }

    #[test]
    fn preflight_with_no_persisted_positions_seals_empty_state() {
        std::env::set_var("DEV_MODE", "true");
        let mut app = Application::new(test_config()).unwrap();
        app.run_preflight().unwrap();
        assert!(app.seal.is_sealed());
        assert_eq!(app.seal.record().unwrap().open_count, 0);
        std::env::remove_var("DEV_MODE");
    }

    #[test]
    fn hydrate_position_parses_persisted_fields() {
        let record = PersistedPosition {
            position_id: Uuid::new_v4().to_string(),
            pool_id: "pool1".to_string(),
            size: "150.25".to_string(),
            stage: "PROBE".to_string(),
            entry_ts_ms: 1_000,
        };
        let position = hydrate_position(&record).unwrap();
        assert_eq!(position.entry_size, Money::new(Decimal::try_from(150.25).unwrap()));
        assert_eq!(position.pool_id.0, "pool1");
    }
}
