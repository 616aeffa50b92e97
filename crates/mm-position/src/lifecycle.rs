//! The position lifecycle state machine.
//!
//! Every transition is driven by an explicit cause and emits a
//! [`LifecycleEvent`] carrying the prior and new state plus a monotonic
//! sequence number, the same bookkeeping discipline the teacher applies to
//! order-state transitions.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{PositionError, PositionResult};

/// Lifecycle states a position moves through between ENTRY and EXIT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Hold,
    ExitTriggered,
    ForcedExitPending,
    Exiting,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Hold => "HOLD",
            Self::ExitTriggered => "EXIT_TRIGGERED",
            Self::ForcedExitPending => "FORCED_EXIT_PENDING",
            Self::Exiting => "EXITING",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a lifecycle transition happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionCause {
    HoldEntryConditionsMet,
    HoldExitConditionMet(String),
    RiskExit(String),
    NoiseExitUnsuppressed(String),
    EscapeHatch(String),
    ExitIssued,
}

/// A single recorded lifecycle transition.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub seq: u64,
    pub prior: LifecycleState,
    pub new: LifecycleState,
    pub cause: TransitionCause,
    pub at_ms: i64,
}

/// Global monotonic sequence counter for lifecycle events, shared across
/// every position so a merged event log sorts correctly by `seq` alone.
static LIFECYCLE_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    LIFECYCLE_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Drives a single position's state and records its transition history.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    events: Vec<LifecycleEvent>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Active,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    fn transition(&mut self, new: LifecycleState, cause: TransitionCause, at_ms: i64) {
        let prior = self.state;
        self.state = new;
        self.events.push(LifecycleEvent {
            seq: next_seq(),
            prior,
            new,
            cause,
            at_ms,
        });
    }

    pub fn enter_hold(&mut self, at_ms: i64) -> PositionResult<()> {
        if self.state != LifecycleState::Active {
            return Err(invalid(self.state, LifecycleState::Hold, "enter_hold"));
        }
        self.transition(LifecycleState::Hold, TransitionCause::HoldEntryConditionsMet, at_ms);
        Ok(())
    }

    pub fn exit_hold_to_active(&mut self, reason: &str, at_ms: i64) -> PositionResult<()> {
        if self.state != LifecycleState::Hold {
            return Err(invalid(self.state, LifecycleState::Active, "exit_hold_to_active"));
        }
        self.transition(
            LifecycleState::Active,
            TransitionCause::HoldExitConditionMet(reason.to_string()),
            at_ms,
        );
        Ok(())
    }

    /// A RISK exit from HOLD skips EXIT_TRIGGERED entirely and goes straight
    /// to EXITING: HOLD mode may not suppress RISK.
    pub fn risk_exit_from_hold(&mut self, reason: &str, at_ms: i64) -> PositionResult<()> {
        if self.state != LifecycleState::Hold {
            return Err(invalid(self.state, LifecycleState::Exiting, "risk_exit_from_hold"));
        }
        self.transition(LifecycleState::Exiting, TransitionCause::RiskExit(reason.to_string()), at_ms);
        Ok(())
    }

    /// {ACTIVE, HOLD} -> EXIT_TRIGGERED for a RISK classification, or a NOISE
    /// exit raised against ACTIVE that was not suppressed.
    pub fn trigger_exit(&mut self, cause: TransitionCause, at_ms: i64) -> PositionResult<()> {
        if !matches!(self.state, LifecycleState::Active | LifecycleState::Hold) {
            return Err(invalid(self.state, LifecycleState::ExitTriggered, "trigger_exit"));
        }
        self.transition(LifecycleState::ExitTriggered, cause, at_ms);
        Ok(())
    }

    pub fn escape_hatch(&mut self, reason: &str, at_ms: i64) -> PositionResult<()> {
        if self.state != LifecycleState::ExitTriggered {
            return Err(invalid(self.state, LifecycleState::ForcedExitPending, "escape_hatch"));
        }
        self.transition(
            LifecycleState::ForcedExitPending,
            TransitionCause::EscapeHatch(reason.to_string()),
            at_ms,
        );
        Ok(())
    }

    pub fn issue_exit(&mut self, at_ms: i64) -> PositionResult<()> {
        if !matches!(
            self.state,
            LifecycleState::ExitTriggered | LifecycleState::ForcedExitPending
        ) {
            return Err(invalid(self.state, LifecycleState::Exiting, "issue_exit"));
        }
        self.transition(LifecycleState::Exiting, TransitionCause::ExitIssued, at_ms);
        Ok(())
    }
}

fn invalid(from: LifecycleState, to: LifecycleState, cause: &str) -> PositionError {
    PositionError::InvalidTransition {
        from: from.as_str(),
        to: to.as_str(),
        cause: cause.to_string(),
    }
}
