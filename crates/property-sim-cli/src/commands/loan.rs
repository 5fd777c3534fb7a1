use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use property_sim_core::loan_schedule;

use super::{read_parameters, RunArgs};

/// Arguments for a loan amortisation table
#[derive(Args)]
pub struct LoanArgs {
    /// Path to a JSON or YAML file with the property parameters
    #[arg(long, conflicts_with_all = ["amount", "rate", "years"])]
    pub input: Option<String>,

    /// Loan principal in 万円
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in years
    #[arg(long)]
    pub years: Option<u32>,

    /// Repayment method: level-payment (元利均等) or level-principal (元金均等)
    #[arg(long, default_value = "level-payment")]
    pub loan_type: String,

    #[command(flatten)]
    pub run: RunArgs,
}

pub fn run_loan(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params = match args.amount {
        Some(amount) => from_flags(amount, &args),
        None => read_parameters(args.input.as_deref(), "loan")?,
    };
    let config = args.run.load_config()?;
    let schedule = loan_schedule(&params, &config)?;
    Ok(serde_json::to_value(schedule)?)
}

/// Minimal parameter mapping for a standalone loan: the price is set to the
/// loan amount so the sanitizer's loan cap never binds.
fn from_flags(amount: Decimal, args: &LoanArgs) -> Value {
    let mut params = Map::new();
    params.insert("purchase_price".into(), json!(amount.to_string()));
    params.insert("loan_amount".into(), json!(amount.to_string()));
    params.insert(
        "interest_rate".into(),
        json!(args.rate.unwrap_or_default().to_string()),
    );
    if let Some(years) = args.years {
        params.insert("loan_years".into(), json!(years));
    }
    params.insert("loan_type".into(), json!(args.loan_type));
    Value::Object(params)
}
