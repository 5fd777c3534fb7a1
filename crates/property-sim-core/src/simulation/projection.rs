use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::SimulatorConfig;
use crate::finance::{annual_depreciation, taxable_income, LoanSchedule, LossCarryForward};
use crate::safety::GuardContext;
use crate::sanitize::PropertyInput;
use crate::types::{checked_percent, checked_ratio, man_to_yen, yen_to_man, Man, Percent, Yen};
use crate::SimulatorResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One held year of the cash-flow projection.
///
/// 円 fields are whole yen; 万円 fields carry four decimals (whole yen).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRow {
    #[serde(rename = "年次")]
    pub label: String,
    #[serde(rename = "年数")]
    pub year: u32,
    #[serde(rename = "満室想定家賃（円）", with = "rust_decimal::serde::float")]
    pub full_rent: Yen,
    #[serde(rename = "空室率（%）", with = "rust_decimal::serde::float")]
    pub vacancy_rate: Percent,
    #[serde(rename = "実効家賃収入（円）", with = "rust_decimal::serde::float")]
    pub effective_rent: Yen,
    #[serde(rename = "経費（円）", with = "rust_decimal::serde::float")]
    pub expenses: Yen,
    #[serde(rename = "減価償却費（円）", with = "rust_decimal::serde::float")]
    pub depreciation: Yen,
    #[serde(rename = "税金（円）", with = "rust_decimal::serde::float")]
    pub tax: Yen,
    #[serde(rename = "大規模修繕（円）", with = "rust_decimal::serde::float")]
    pub major_repair: Yen,
    #[serde(rename = "初期リフォーム（円）", with = "rust_decimal::serde::float")]
    pub initial_renovation: Yen,
    #[serde(rename = "ローン返済額（円）", with = "rust_decimal::serde::float")]
    pub debt_service: Yen,
    #[serde(rename = "元金返済額（円）", with = "rust_decimal::serde::float")]
    pub principal_payment: Yen,
    #[serde(rename = "営業キャッシュフロー（円）", with = "rust_decimal::serde::float")]
    pub operating_cf: Yen,
    #[serde(rename = "累計キャッシュフロー（円）", with = "rust_decimal::serde::float")]
    pub cumulative_cf: Yen,
    #[serde(rename = "残債（万円）", with = "rust_decimal::serde::float")]
    pub remaining_loan: Man,
    #[serde(rename = "自己資金回収率（%）", with = "rust_decimal::serde::float")]
    pub self_fund_recovery_ratio: Percent,
    #[serde(rename = "DSCR", with = "rust_decimal::serde::float")]
    pub dscr: Decimal,
    #[serde(rename = "売却額（円）", with = "rust_decimal::serde::float")]
    pub sale_amount: Yen,
    #[serde(rename = "売却手取り（円）", with = "rust_decimal::serde::float")]
    pub net_sale_proceeds: Yen,
    #[serde(rename = "繰越欠損金（円）", with = "rust_decimal::serde::float")]
    pub loss_carryforward: Yen,
}

/// Operating components of one year before financing and tax, in 円.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct YearInputs {
    pub full_rent: Yen,
    pub effective_rent: Yen,
    pub cash_expenses: Yen,
    pub major_repair: Yen,
    pub initial_renovation: Yen,
    pub depreciation: Yen,
}

impl YearInputs {
    pub(crate) fn for_year(input: &PropertyInput, year: u32) -> Self {
        let elapsed = Decimal::from(year.saturating_sub(1));
        let decline_factor = Decimal::ONE - elapsed * input.rent_decline / dec!(100);
        let monthly_rent = (input.monthly_rent * decline_factor).max(Decimal::ZERO);
        let full_rent = monthly_rent * dec!(12);
        let effective_rent = full_rent * (Decimal::ONE - input.vacancy_rate / dec!(100));
        let cash_expenses =
            (input.management_fee + input.fixed_cost) * dec!(12) + input.property_tax;

        let major_repair = if year % input.major_repair_cycle.max(1) == 0 {
            man_to_yen(input.major_repair_cost)
        } else {
            Decimal::ZERO
        };
        let initial_renovation = if year == 1 {
            man_to_yen(input.renovation_cost)
        } else {
            Decimal::ZERO
        };

        Self {
            full_rent,
            effective_rent,
            cash_expenses,
            major_repair,
            initial_renovation,
            depreciation: annual_depreciation(
                input.building_price,
                input.depreciation_years,
                year,
            ),
        }
    }

    /// Costs expensed in full in the year they occur.
    pub(crate) fn one_off_costs(&self) -> Yen {
        self.major_repair + self.initial_renovation
    }

    pub(crate) fn taxable_income(&self) -> Yen {
        taxable_income(
            self.effective_rent,
            self.cash_expenses,
            self.depreciation,
            self.one_off_costs(),
        )
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Project operating cash flows for every held year, in order.
///
/// Runs exactly `holding_years` iterations, checking the guard budget before
/// each one. The loss carry-forward balance lives only for this call.
pub fn project_cash_flows(
    input: &PropertyInput,
    loan: &LoanSchedule,
    config: &SimulatorConfig,
    ctx: &GuardContext,
) -> SimulatorResult<Vec<YearRow>> {
    let years = input.holding_years;
    ctx.reserve(std::mem::size_of::<YearRow>() as u64 * u64::from(years))?;

    let equity = man_to_yen(required_equity(input));
    let mut rows = Vec::with_capacity(years as usize);
    let mut losses = LossCarryForward::new();
    let mut cumulative_cf = Decimal::ZERO;
    let mut previous_remaining = loan.principal();

    for year in 1..=years {
        ctx.checkpoint()?;

        let y = YearInputs::for_year(input, year);
        let assessment = losses.assess(y.taxable_income(), input.effective_tax_rate);
        let debt_service = loan.annual_debt_service(year)?;

        let operating_cf = (y.effective_rent
            - y.cash_expenses
            - debt_service
            - y.one_off_costs()
            - assessment.tax)
            .round_dp(0);
        cumulative_cf += operating_cf;

        let remaining = loan.remaining_principal(year)?.round_dp(0);
        let principal_payment = if input.interest_rate > Decimal::ZERO {
            (debt_service - previous_remaining * input.interest_rate / dec!(100))
                .max(Decimal::ZERO)
        } else {
            debt_service
        };
        previous_remaining = remaining;

        let dscr = if debt_service > Decimal::ZERO {
            checked_ratio(
                y.effective_rent - y.cash_expenses - y.one_off_costs(),
                debt_service,
                "yearly DSCR",
            )?
        } else {
            Decimal::ZERO
        };

        let self_fund_recovery_ratio = if equity > Decimal::ZERO {
            checked_percent(cumulative_cf, equity, "self-fund recovery ratio")?
        } else {
            Decimal::ZERO
        };

        let (sale_amount, net_sale_proceeds) =
            if year == years && input.expected_sale_price > Decimal::ZERO {
                let sale = man_to_yen(input.expected_sale_price);
                (sale, sale - remaining - sale * config.sale_cost_rate)
            } else {
                (Decimal::ZERO, Decimal::ZERO)
            };

        rows.push(YearRow {
            label: format!("{year}年目"),
            year,
            full_rent: y.full_rent.round_dp(0),
            vacancy_rate: input.vacancy_rate.round_dp(2),
            effective_rent: y.effective_rent.round_dp(0),
            expenses: y.cash_expenses.round_dp(0),
            depreciation: y.depreciation.round_dp(0),
            tax: assessment.tax.round_dp(0),
            major_repair: y.major_repair.round_dp(0),
            initial_renovation: y.initial_renovation.round_dp(0),
            debt_service: debt_service.round_dp(0),
            principal_payment: principal_payment.round_dp(0),
            operating_cf,
            cumulative_cf,
            remaining_loan: yen_to_man(remaining),
            self_fund_recovery_ratio: self_fund_recovery_ratio.round_dp(2),
            dscr: dscr.round_dp(2),
            sale_amount: sale_amount.round_dp(0),
            net_sale_proceeds: net_sale_proceeds.round_dp(0),
            loss_carryforward: assessment.loss_balance.round_dp(0),
        });
    }

    Ok(rows)
}

/// Cash the buyer brings: price less loan, plus acquisition and renovation costs (万円).
pub fn required_equity(input: &PropertyInput) -> Man {
    input.purchase_price - input.loan_amount + input.other_costs + input.renovation_cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardLimits;
    use crate::safety::ResourceGuard;
    use crate::sanitize::sanitize_input;
    use serde_json::{json, Value};

    fn project(raw: Value) -> Vec<YearRow> {
        let input = sanitize_input(&raw).unwrap().input;
        let loan = LoanSchedule::from_input(&input).unwrap();
        let config = SimulatorConfig::default();
        ResourceGuard::default()
            .run("test", move |ctx| project_cash_flows(&input, &loan, &config, ctx))
            .unwrap()
    }

    #[test]
    fn test_rent_decline_and_vacancy() {
        let rows = project(json!({
            "purchase_price": 3000,
            "monthly_rent": 200000,
            "vacancy_rate": 10,
            "rent_decline": 1,
            "holding_years": 3,
            "major_repair_cost": 0,
        }));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].full_rent, dec!(2400000));
        assert_eq!(rows[1].full_rent, dec!(2376000));
        assert_eq!(rows[2].full_rent, dec!(2352000));
        assert_eq!(rows[0].effective_rent, dec!(2160000));
        assert_eq!(rows[2].label, "3年目");
    }

    #[test]
    fn test_repairs_and_renovation_timing() {
        let rows = project(json!({
            "purchase_price": 3000,
            "monthly_rent": 200000,
            "renovation_cost": 100,
            "major_repair_cycle": 3,
            "major_repair_cost": 150,
            "holding_years": 7,
        }));
        assert_eq!(rows[0].initial_renovation, dec!(1000000));
        assert!(rows[1..].iter().all(|r| r.initial_renovation.is_zero()));
        let repair_years: Vec<u32> = rows
            .iter()
            .filter(|r| r.major_repair > Decimal::ZERO)
            .map(|r| r.year)
            .collect();
        assert_eq!(repair_years, vec![3, 6]);
        assert_eq!(rows[2].major_repair, dec!(1500000));
    }

    #[test]
    fn test_losses_carried_across_years() {
        // Year 1 renovation creates a loss that shelters year 2 profit.
        let rows = project(json!({
            "purchase_price": 3000,
            "monthly_rent": 100000,
            "renovation_cost": 300,
            "effective_tax_rate": 20,
            "vacancy_rate": 0,
            "major_repair_cost": 0,
            "holding_years": 3,
        }));
        assert_eq!(rows[0].tax, Decimal::ZERO);
        assert_eq!(rows[0].loss_carryforward, dec!(1800000));
        assert_eq!(rows[1].loss_carryforward, dec!(600000));
        assert_eq!(rows[1].tax, Decimal::ZERO);
        assert_eq!(rows[2].loss_carryforward, Decimal::ZERO);
        assert_eq!(rows[2].tax, dec!(120000));
    }

    #[test]
    fn test_sale_only_in_final_year() {
        let rows = project(json!({
            "purchase_price": 3000,
            "monthly_rent": 200000,
            "expected_sale_price": 2800,
            "holding_years": 5,
        }));
        assert!(rows[..4].iter().all(|r| r.sale_amount.is_zero()));
        assert_eq!(rows[4].sale_amount, dec!(28000000));
        assert_eq!(rows[4].net_sale_proceeds, dec!(26600000));
    }

    #[test]
    fn test_budget_exhaustion_aborts_projection() {
        let input = sanitize_input(&json!({"purchase_price": 3000, "holding_years": 100}))
            .unwrap()
            .input;
        let loan = LoanSchedule::from_input(&input).unwrap();
        let config = SimulatorConfig::default();
        let guard = ResourceGuard::new(GuardLimits {
            timeout_ms: 1_000,
            memory_limit_bytes: 64,
        });
        let err = guard
            .run("test", move |ctx| project_cash_flows(&input, &loan, &config, ctx))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ResourceExhausted);
    }
}
