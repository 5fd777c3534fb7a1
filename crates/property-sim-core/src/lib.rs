//! Real-estate investment cash-flow simulator.
//!
//! Turns one property's acquisition, financing, operating and exit
//! parameters into summary investment metrics and a year-by-year cash-flow
//! projection. The single entry point, [`simulate`], accepts an untrusted
//! JSON mapping, sanitises it, rejects resource-exhaustion inputs, and runs
//! the computation under a wall-clock and memory budget.

pub mod config;
pub mod error;
pub mod finance;
pub mod safety;
pub mod sanitize;
pub mod simulation;
pub mod types;

pub use config::SimulatorConfig;
pub use error::{ErrorKind, SimulatorError};
pub use simulation::{
    loan_schedule, run_simulation, simulate, simulate_with_config, Metrics, SimulationResult,
    YearRow,
};
pub use types::*;

/// Standard result type for all simulator operations
pub type SimulatorResult<T> = Result<T, SimulatorError>;
