//! Investment metrics, the year-by-year projection, and the `simulate`
//! entry point that wires sanitisation, gating and the guarded computation.

pub mod metrics;
pub mod projection;
pub mod simulator;

pub use metrics::{compute_metrics, Metrics};
pub use projection::{project_cash_flows, YearRow};
pub use simulator::{loan_schedule, run_simulation, simulate, simulate_with_config, SimulationResult};
