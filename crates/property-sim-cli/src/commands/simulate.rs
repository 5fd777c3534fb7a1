use clap::Args;
use serde_json::Value;

use property_sim_core::run_simulation;

use super::{read_parameters, RunArgs};

/// Arguments for a full simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a JSON or YAML file with the property parameters
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = read_parameters(args.input.as_deref(), "simulate")?;
    let config = args.run.load_config()?;
    let output = run_simulation(&params, &config)?;
    tracing::info!(
        years = output.result.cash_flow.len(),
        warnings = output.warnings.len(),
        "simulation complete"
    );
    Ok(serde_json::to_value(output)?)
}
