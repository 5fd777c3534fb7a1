use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::projection::{required_equity, YearInputs};
use crate::config::SimulatorConfig;
use crate::finance::{LoanSchedule, LossCarryForward};
use crate::sanitize::PropertyInput;
use crate::types::{
    checked_percent, checked_ratio, man_to_yen, yen_to_man, Man, Percent, Yen, YEN_PER_MAN,
};
use crate::SimulatorResult;

/// Reportable IRR window, in percent (exclusive on both ends).
const IRR_FLOOR: Decimal = dec!(-100);
const IRR_CEILING: Decimal = dec!(1000);

/// Summary investment indicators for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Full rent net of vacancy
    #[serde(rename = "年間家賃収入（円）", with = "rust_decimal::serde::float")]
    pub annual_rent: Yen,
    #[serde(rename = "表面利回り（%）", with = "rust_decimal::serde::float")]
    pub surface_yield: Percent,
    /// Rent less management fee and fixed cost, before debt and tax
    #[serde(rename = "月間キャッシュフロー（円）", with = "rust_decimal::serde::float")]
    pub monthly_cf: Yen,
    #[serde(rename = "年間キャッシュフロー（円）", with = "rust_decimal::serde::float")]
    pub annual_cf: Yen,
    #[serde(rename = "CCR（%）", with = "rust_decimal::serde::float")]
    pub ccr: Percent,
    #[serde(rename = "ROI（%）", with = "rust_decimal::serde::float")]
    pub roi: Percent,
    /// Aggregate-multiple approximation; null when not meaningful
    #[serde(rename = "IRR（%）", with = "rust_decimal::serde::float_option")]
    pub irr: Option<Percent>,
    #[serde(rename = "年間ローン返済額（円）", with = "rust_decimal::serde::float")]
    pub annual_debt_service: Yen,
    #[serde(rename = "NOI（円）", with = "rust_decimal::serde::float")]
    pub noi: Yen,
    #[serde(rename = "収益還元評価額（万円）", with = "rust_decimal::serde::float")]
    pub cap_rate_valuation: Man,
    #[serde(rename = "実勢価格（万円）", with = "rust_decimal::serde::float")]
    pub market_value: Man,
    #[serde(rename = "想定売却価格（万円）", with = "rust_decimal::serde::float")]
    pub expected_sale_price: Man,
    #[serde(rename = "土地積算評価（万円）", with = "rust_decimal::serde::float")]
    pub land_cost_valuation: Man,
    #[serde(rename = "建物積算評価（万円）", with = "rust_decimal::serde::float")]
    pub building_cost_valuation: Man,
    #[serde(rename = "積算評価合計（万円）", with = "rust_decimal::serde::float")]
    pub assessed_total: Man,
    #[serde(rename = "売却コスト（万円）", with = "rust_decimal::serde::float")]
    pub sale_cost: Man,
    /// Loan balance at the end of the holding period
    #[serde(rename = "残債（万円）", with = "rust_decimal::serde::float")]
    pub remaining_loan: Man,
    #[serde(rename = "売却益（万円）", with = "rust_decimal::serde::float")]
    pub sale_gain: Man,
    #[serde(rename = "LTV（%）", with = "rust_decimal::serde::float")]
    pub ltv: Percent,
    #[serde(rename = "DSCR（返済余裕率）", with = "rust_decimal::serde::float")]
    pub dscr: Decimal,
    #[serde(rename = "自己資金（万円）", with = "rust_decimal::serde::float")]
    pub required_equity: Man,
}

/// Compute the summary metrics.
///
/// Year-1 tax is assessed with an empty loss balance and, like the
/// projection, without deducting loan interest.
pub fn compute_metrics(
    input: &PropertyInput,
    loan: &LoanSchedule,
    config: &SimulatorConfig,
) -> SimulatorResult<Metrics> {
    let twelve = dec!(12);
    let price = man_to_yen(input.purchase_price);

    let occupancy = Decimal::ONE - input.vacancy_rate / dec!(100);
    let annual_rent = input.monthly_rent * twelve * occupancy;
    let monthly_cf = input.monthly_rent - input.management_fee - input.fixed_cost;
    let annual_cf = monthly_cf * twelve;

    let required_equity = required_equity(input);
    let equity = man_to_yen(required_equity);
    let annual_debt_service = loan.annual_debt_service(1)?;

    let noi = input.monthly_rent * twelve
        - (input.management_fee * twelve + input.fixed_cost * twelve + input.property_tax);
    let surface_yield = checked_percent(annual_rent, price, "surface yield")?;

    let year1 = YearInputs::for_year(input, 1);
    let year1_tax = LossCarryForward::new()
        .assess(year1.taxable_income(), input.effective_tax_rate)
        .tax;
    let tax_after_cf = noi - year1_tax;

    let (ccr, roi) = if equity > Decimal::ZERO {
        (
            checked_percent(tax_after_cf - annual_debt_service, equity, "CCR")?,
            checked_percent(tax_after_cf, equity, "ROI")?,
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let dscr = if annual_debt_service > Decimal::ZERO {
        checked_ratio(noi, annual_debt_service, "DSCR")?
    } else {
        Decimal::ZERO
    };

    let cap_rate_valuation = if input.exit_cap_rate > Decimal::ZERO {
        checked_ratio(noi, input.exit_cap_rate / dec!(100), "cap rate valuation")? / YEN_PER_MAN
    } else {
        Decimal::ZERO
    };

    let land_cost_valuation = input.land_area * input.road_price / YEN_PER_MAN;
    let building_cost_valuation = input.building_area * config.building_unit_cost;
    let assessed_total = land_cost_valuation + building_cost_valuation;
    let ltv = if assessed_total > Decimal::ZERO {
        checked_percent(input.loan_amount, assessed_total, "LTV")?
    } else {
        Decimal::ZERO
    };

    let sale_cost = input.expected_sale_price * config.sale_cost_rate;
    let remaining_loan = yen_to_man(loan.remaining_principal(input.holding_years)?.round_dp(0));
    let sale_gain = input.expected_sale_price - remaining_loan - sale_cost;

    let irr = approximate_irr(
        annual_cf - annual_debt_service,
        input.holding_years,
        sale_gain,
        required_equity,
    );

    Ok(Metrics {
        annual_rent: annual_rent.round_dp(0),
        surface_yield: surface_yield.round_dp(2),
        monthly_cf: monthly_cf.round_dp(0),
        annual_cf: annual_cf.round_dp(0),
        ccr: ccr.round_dp(2),
        roi: roi.round_dp(2),
        irr: irr.map(|v| v.round_dp(2)),
        annual_debt_service: annual_debt_service.round_dp(0),
        noi: noi.round_dp(0),
        cap_rate_valuation: round_man(cap_rate_valuation),
        market_value: round_man(input.market_value),
        expected_sale_price: round_man(input.expected_sale_price),
        land_cost_valuation: round_man(land_cost_valuation),
        building_cost_valuation: round_man(building_cost_valuation),
        assessed_total: round_man(assessed_total),
        sale_cost: round_man(sale_cost),
        remaining_loan,
        sale_gain: round_man(sale_gain),
        ltv: ltv.round_dp(2),
        dscr: dscr.round_dp(2),
        required_equity: round_man(required_equity),
    })
}

/// Annualised return from the aggregate multiple over the holding period.
///
/// `R = (annual_cf_after_debt * years + sale_gain) / equity`, IRR ≈ R^(1/years) − 1.
/// This is not a solve over per-period flows. Returns `None` when the
/// multiple is non-positive, equity is zero, or the result falls outside
/// (−100%, 1000%).
pub fn approximate_irr(
    annual_cf_after_debt: Yen,
    holding_years: u32,
    sale_gain: Man,
    required_equity: Man,
) -> Option<Percent> {
    if required_equity <= Decimal::ZERO || holding_years == 0 {
        return None;
    }
    let years = Decimal::from(holding_years);
    let total = annual_cf_after_debt * years + man_to_yen(sale_gain);
    let Some(multiple) = total.checked_div(man_to_yen(required_equity)) else {
        debug!(%total, %required_equity, "IRR multiple not representable");
        return None;
    };
    if multiple <= Decimal::ZERO {
        return None;
    }

    let Some(root) = multiple.checked_powd(Decimal::ONE / years) else {
        debug!(%multiple, holding_years, "IRR root not representable");
        return None;
    };
    let irr = (root - Decimal::ONE) * dec!(100);
    (irr > IRR_FLOOR && irr < IRR_CEILING).then_some(irr)
}

/// 万円 figures keep four decimals, i.e. whole yen.
fn round_man(value: Man) -> Man {
    value.round_dp(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::sanitize_input;
    use serde_json::{json, Value};

    fn metrics_for(raw: Value) -> Metrics {
        let input = sanitize_input(&raw).unwrap().input;
        let loan = LoanSchedule::from_input(&input).unwrap();
        compute_metrics(&input, &loan, &SimulatorConfig::default()).unwrap()
    }

    fn baseline() -> Value {
        json!({
            "purchase_price": 3000,
            "loan_amount": 0,
            "monthly_rent": 200000,
            "management_fee": 10000,
            "fixed_cost": 0,
            "property_tax": 80000,
            "vacancy_rate": 5,
            "building_price": 1500,
            "depreciation_years": 27,
            "effective_tax_rate": 20,
            "holding_years": 10,
        })
    }

    #[test]
    fn test_baseline_income_metrics() {
        let m = metrics_for(baseline());
        assert_eq!(m.annual_rent, dec!(2280000));
        assert_eq!(m.noi, dec!(2200000));
        assert_eq!(m.monthly_cf, dec!(190000));
        assert_eq!(m.annual_cf, dec!(2280000));
        assert_eq!(m.surface_yield, dec!(7.60));
        assert_eq!(m.required_equity, dec!(3000));
        assert_eq!(m.annual_debt_service, Decimal::ZERO);
        assert_eq!(m.dscr, Decimal::ZERO);
        assert_eq!(m.ltv, Decimal::ZERO);
    }

    #[test]
    fn test_baseline_after_tax_returns() {
        let m = metrics_for(baseline());
        // Year 1: 2,280,000 - 200,000 - 555,555.56 depreciation - 0 repairs
        // = 1,524,444.44 taxable, 304,888.89 tax at 20%
        let tax = (dec!(2080000) - dec!(15000000) / dec!(27)) * dec!(0.2);
        let expected_roi = ((dec!(2200000) - tax) / dec!(30000000) * dec!(100)).round_dp(2);
        assert_eq!(m.roi, expected_roi);
        assert_eq!(m.ccr, expected_roi);
    }

    #[test]
    fn test_valuations() {
        let mut raw = baseline();
        raw["exit_cap_rate"] = json!(5);
        raw["land_area"] = json!(100);
        raw["road_price"] = json!(300000);
        raw["building_area"] = json!(80);
        raw["loan_amount"] = json!(2000);
        raw["loan_years"] = json!(30);
        raw["interest_rate"] = json!(1.5);
        let m = metrics_for(raw);
        // 2,200,000 / 0.05 = 44,000,000 yen
        assert_eq!(m.cap_rate_valuation, dec!(4400));
        assert_eq!(m.land_cost_valuation, dec!(3000));
        assert_eq!(m.building_cost_valuation, dec!(1600));
        assert_eq!(m.assessed_total, dec!(4600));
        assert_eq!(m.ltv, (dec!(2000) / dec!(4600) * dec!(100)).round_dp(2));
        assert!(m.dscr > Decimal::ZERO);
    }

    #[test]
    fn test_sale_gain_and_cost() {
        let mut raw = baseline();
        raw["expected_sale_price"] = json!(2500);
        let m = metrics_for(raw);
        assert_eq!(m.sale_cost, dec!(125));
        assert_eq!(m.remaining_loan, Decimal::ZERO);
        assert_eq!(m.sale_gain, dec!(2375));
    }

    #[test]
    fn test_irr_from_multiple() {
        // Equity 1,000 万円, no annual cash, sale gain 2,000 万円 over 1 year: 100%
        let irr = approximate_irr(dec!(0), 1, dec!(2000), dec!(1000)).unwrap();
        assert!((irr - dec!(100)).abs() < dec!(0.0001), "got {irr}");

        // Doubling over 10 years is about 7.18%
        let irr = approximate_irr(dec!(0), 10, dec!(2000), dec!(1000)).unwrap();
        assert!((irr - dec!(7.177)).abs() < dec!(0.01), "got {irr}");
    }

    #[test]
    fn test_irr_not_reportable() {
        assert_eq!(approximate_irr(dec!(-1000000), 10, dec!(0), dec!(1000)), None);
        assert_eq!(approximate_irr(dec!(100000), 10, dec!(500), dec!(0)), None);
        // A 1-year multiple of 20x is a 1900% return
        assert_eq!(approximate_irr(dec!(0), 1, dec!(20000), dec!(1000)), None);
    }

    #[test]
    fn test_vanishing_cap_rate_is_arithmetic_error() {
        let mut raw = baseline();
        raw["exit_cap_rate"] = json!("0.0000000000000000000000001");
        let input = sanitize_input(&raw).unwrap().input;
        let loan = LoanSchedule::from_input(&input).unwrap();
        let err = compute_metrics(&input, &loan, &SimulatorConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ArithmeticError);
    }
}
