pub mod loan;
pub mod simulate;

use clap::Args;
use property_sim_core::SimulatorConfig;
use serde_json::Value;

use crate::input;

/// Budget and configuration flags shared by every computing subcommand
#[derive(Args)]
pub struct RunArgs {
    /// Path to a JSON or YAML simulator configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Wall-clock budget in milliseconds (overrides the config file)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Memory budget in MiB (overrides the config file)
    #[arg(long)]
    pub memory_mb: Option<u64>,
}

impl RunArgs {
    /// Resolve the effective configuration: defaults, then file, then flags.
    pub fn load_config(&self) -> Result<SimulatorConfig, Box<dyn std::error::Error>> {
        let mut config: SimulatorConfig = match self.config {
            Some(ref path) => input::file::read_document(path)?,
            None => SimulatorConfig::default(),
        };
        if let Some(ms) = self.timeout_ms {
            config.guard.timeout_ms = ms;
        }
        if let Some(mb) = self.memory_mb {
            config.guard.memory_limit_bytes = mb.saturating_mul(1024 * 1024);
        }
        tracing::debug!(?config.guard, "configuration resolved");
        Ok(config)
    }
}

/// Property parameters from `--input` or piped stdin.
pub fn read_parameters(
    path: Option<&str>,
    what: &str,
) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::file::read_value(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(data)
    } else {
        Err(format!("--input <file.json|file.yaml> or stdin required for {what}").into())
    }
}
