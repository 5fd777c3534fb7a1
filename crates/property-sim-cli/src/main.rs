mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::loan::LoanArgs;
use commands::simulate::SimulateArgs;

/// Real-estate investment cash-flow simulator
#[derive(Parser)]
#[command(
    name = "propsim",
    version,
    about = "Real-estate investment cash-flow simulator",
    long_about = "Simulates the financial performance of a single rental property: \
                  yields, cash-on-cash return, IRR, DSCR and a year-by-year cash-flow \
                  projection with loan amortisation, depreciation, loss carry-forward \
                  and terminal sale. Amounts follow Japanese conventions (円 / 万円)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace); logs go to stderr
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full simulation: summary metrics plus yearly cash flow
    Simulate(SimulateArgs),
    /// Print the year-by-year amortisation table for a loan
    Loan(LoanArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Loan(args) => commands::loan::run_loan(args),
        Commands::Version => {
            println!("propsim {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            let kind = e
                .downcast_ref::<property_sim_core::SimulatorError>()
                .map(|err| err.kind().to_string());
            match kind {
                Some(kind) => eprintln!("{} [{}]: {}", "error".red().bold(), kind.yellow(), e),
                None => eprintln!("{}: {}", "error".red().bold(), e),
            }
            process::exit(1);
        }
    }
}
