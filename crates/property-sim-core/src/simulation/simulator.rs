use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::metrics::{compute_metrics, Metrics};
use super::projection::{project_cash_flows, YearRow};
use crate::config::SimulatorConfig;
use crate::finance::{AnnualLoanPeriod, LoanSchedule};
use crate::safety::{check_input, GuardContext, ResourceGuard};
use crate::sanitize::{sanitize_input, PropertyInput, SanitizedInput};
use crate::types::{with_metadata, ComputationOutput};
use crate::SimulatorResult;

/// Two-part simulation output: summary metrics and the yearly table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub metrics: Metrics,
    pub cash_flow: Vec<YearRow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the simulator on an untrusted parameter mapping with default limits.
///
/// Deterministic: the same input always yields the same result. On any
/// validation, safety, budget or arithmetic failure no result is produced.
pub fn simulate(raw: &Value) -> SimulatorResult<SimulationResult> {
    simulate_with_config(raw, &SimulatorConfig::default())
}

/// [`simulate`] with explicit guard budgets, safety ceilings and coefficients.
pub fn simulate_with_config(
    raw: &Value,
    config: &SimulatorConfig,
) -> SimulatorResult<SimulationResult> {
    evaluate(raw, config).map(|(result, _)| result)
}

/// [`simulate_with_config`] wrapped in the standard output envelope, with
/// sanitisation repairs and advisory notes collected as warnings.
pub fn run_simulation(
    raw: &Value,
    config: &SimulatorConfig,
) -> SimulatorResult<ComputationOutput<SimulationResult>> {
    let start = Instant::now();
    let (result, sanitized) = evaluate(raw, config)?;

    let mut warnings = sanitized.warnings;
    warnings.extend(advisories(&sanitized.input, &result));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Real-estate investment cash-flow simulation (JPY, straight-line depreciation, loss carry-forward)",
        &sanitized.input,
        warnings,
        elapsed,
        result,
    ))
}

/// Year-by-year amortisation table for the loan described by `raw`.
pub fn loan_schedule(
    raw: &Value,
    config: &SimulatorConfig,
) -> SimulatorResult<Vec<AnnualLoanPeriod>> {
    let sanitized = sanitize_input(raw)?;
    check_input(&sanitized.input, &config.safety)?;
    let loan = LoanSchedule::from_input(&sanitized.input)?;

    ResourceGuard::new(config.guard.clone()).run("loan_schedule", move |ctx| {
        let rows = u64::from(loan.months() / 12);
        ctx.reserve(std::mem::size_of::<AnnualLoanPeriod>() as u64 * rows)?;
        loan.annual_schedule()
    })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn evaluate(
    raw: &Value,
    config: &SimulatorConfig,
) -> SimulatorResult<(SimulationResult, SanitizedInput)> {
    let sanitized = sanitize_input(raw)?;
    debug!(warnings = sanitized.warnings.len(), "input sanitised");

    check_input(&sanitized.input, &config.safety)?;
    debug!("safety gate passed");

    let input = sanitized.input.clone();
    let cfg = config.clone();
    let result = ResourceGuard::new(config.guard.clone())
        .run("simulate", move |ctx| compute(&input, &cfg, ctx))?;

    Ok((result, sanitized))
}

fn compute(
    input: &PropertyInput,
    config: &SimulatorConfig,
    ctx: &GuardContext,
) -> SimulatorResult<SimulationResult> {
    let loan = LoanSchedule::from_input(input)?;
    ctx.checkpoint()?;

    let metrics = compute_metrics(input, &loan, config)?;
    debug!(noi = %metrics.noi, dscr = %metrics.dscr, "metrics computed");

    let cash_flow = project_cash_flows(input, &loan, config, ctx)?;
    debug!(years = cash_flow.len(), "cash flow projected");

    Ok(SimulationResult { metrics, cash_flow })
}

fn advisories(input: &PropertyInput, result: &SimulationResult) -> Vec<String> {
    let mut warnings = Vec::new();
    let m = &result.metrics;

    if m.dscr > Decimal::ZERO && m.dscr < dec!(1.2) {
        warnings.push(format!(
            "DSCR of {} is below 1.20 — thin coverage of debt service",
            m.dscr
        ));
    }
    if m.ltv > dec!(100) {
        warnings.push(format!(
            "LTV of {}% exceeds the assessed land and building value",
            m.ltv
        ));
    }
    if input.vacancy_rate > dec!(15) {
        warnings.push(format!(
            "Vacancy rate {}% exceeds 15% — above typical market norms",
            input.vacancy_rate
        ));
    }
    if input.holding_years > input.depreciation_years {
        warnings.push(format!(
            "Depreciation ends in year {}; later years carry no depreciation shield",
            input.depreciation_years
        ));
    }
    if m.irr.is_none() {
        warnings.push("IRR not reportable: non-positive multiple or outside (-100%, 1000%)".into());
    }
    if let Some(last) = result.cash_flow.last() {
        if last.cumulative_cf < Decimal::ZERO {
            warnings.push(format!(
                "Cumulative operating cash flow is negative after {} years",
                last.year
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "property_name": "サンプルマンション",
            "purchase_price": 3000,
            "loan_amount": 2400,
            "interest_rate": 2.5,
            "loan_years": 30,
            "monthly_rent": 200000,
            "management_fee": 10000,
            "property_tax": 80000,
            "holding_years": 10,
            "expected_sale_price": 2800,
        })
    }

    #[test]
    fn test_result_shape() {
        let result = simulate(&sample()).unwrap();
        assert_eq!(result.cash_flow.len(), 10);
        assert!(result.metrics.annual_debt_service > Decimal::ZERO);
        assert_eq!(result.cash_flow[0].year, 1);
        assert_eq!(result.cash_flow[9].label, "10年目");
    }

    #[test]
    fn test_envelope_collects_warnings() {
        let mut raw = sample();
        raw["vacancy_rate"] = json!(250);
        let output = run_simulation(&raw, &SimulatorConfig::default()).unwrap();
        assert!(output.warnings.iter().any(|w| w.starts_with("vacancy_rate")));
        assert!(output.warnings.iter().any(|w| w.contains("above typical")));
        assert_eq!(output.assumptions["property_name"], "サンプルマンション");
    }

    #[test]
    fn test_errors_surface_kind() {
        let err = simulate(&json!({"holding_years": 5})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let mut raw = sample();
        raw["loan_years"] = json!(80);
        raw["interest_rate"] = json!(20);
        assert_eq!(simulate(&raw).unwrap_err().kind(), ErrorKind::UnsafeInput);
    }

    #[test]
    fn test_loan_schedule_matches_term() {
        let schedule = loan_schedule(&sample(), &SimulatorConfig::default()).unwrap();
        assert_eq!(schedule.len(), 30);
        assert!(schedule[29].closing_balance.abs() <= dec!(1));
    }
}
