//! Capital ramp ("Prove-It"): stages a pool's deployed size up only after
//! it proves it earns fees fast enough, and exits/blacklists it when it
//! doesn't.

pub mod config;
pub mod error;
pub mod ramp;

pub use config::CapitalRampConfig;
pub use error::{CapitalError, CapitalResult};
pub use ramp::{ProofContext, RampOutcome, RampState, Stage};
