//! Position lifecycle: the state machine, HOLD mode, exit classifier,
//! escape hatch and bleed guard that together decide whether an open
//! position holds, rebalances, or exits on a given cycle.

pub mod bleed_guard;
pub mod error;
pub mod escape_hatch;
pub mod exit_classifier;
pub mod hold;
pub mod lifecycle;
pub mod position;
pub mod telemetry;

pub use error::{PositionError, PositionResult};
pub use lifecycle::{Lifecycle, LifecycleEvent, LifecycleState, TransitionCause};
pub use position::Position;
pub use telemetry::{FeeSnapshots, SuppressionWindow};
