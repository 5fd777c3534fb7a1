use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::config::SafetyLimits;
use crate::error::SimulatorError;
use crate::sanitize::PropertyInput;
use crate::types::man_to_yen;
use crate::SimulatorResult;

/// Reject parameter combinations that would blow up the computation.
///
/// Runs after sanitisation and before any loan or projection maths, so every
/// later step can assume the compound factor `(1 + r)^n` is bounded.
pub fn check_input(input: &PropertyInput, limits: &SafetyLimits) -> SimulatorResult<()> {
    if input.purchase_price <= Decimal::ZERO {
        return Err(SimulatorError::Validation {
            field: "purchase_price".into(),
            reason: "Purchase price must be positive".into(),
        });
    }

    if input.loan_years > limits.max_loan_years {
        return Err(reject(
            "max_loan_years",
            format!(
                "loan_years={} exceeds {}",
                input.loan_years, limits.max_loan_years
            ),
        ));
    }

    if input.loan_years > limits.long_loan_years
        && input.interest_rate > limits.high_interest_rate
    {
        return Err(reject(
            "loan_years_rate_combination",
            format!(
                "loan_years={} with interest_rate={}%",
                input.loan_years, input.interest_rate
            ),
        ));
    }

    if exceeds_compound_ceiling(input, limits.max_compound_factor) {
        return Err(reject(
            "compound_factor_ceiling",
            format!(
                "(1 + {}%/12)^{} exceeds {}",
                input.interest_rate,
                u64::from(input.loan_years) * 12,
                limits.max_compound_factor
            ),
        ));
    }

    let annual_rent = input.monthly_rent * dec!(12);
    let price_yen = man_to_yen(input.purchase_price);
    if annual_rent > price_yen * limits.max_rent_to_price_ratio {
        return Err(reject(
            "rent_to_price_ratio",
            format!("annual rent {annual_rent} yen against price {price_yen} yen"),
        ));
    }

    Ok(())
}

/// Compare in log space so the check itself cannot overflow.
fn exceeds_compound_ceiling(input: &PropertyInput, ceiling: Decimal) -> bool {
    let monthly_rate = input.interest_rate / dec!(1200);
    if monthly_rate <= Decimal::ZERO {
        return false;
    }
    if ceiling <= Decimal::ONE {
        return true;
    }
    let months = Decimal::from(input.loan_years) * dec!(12);
    (Decimal::ONE + monthly_rate).ln() * months > ceiling.ln()
}

fn reject(rule: &str, detail: String) -> SimulatorError {
    warn!(rule, detail = %detail, "unsafe input rejected");
    SimulatorError::unsafe_input(rule, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sanitize::sanitize_input;
    use serde_json::{json, Value};

    fn input_from(raw: Value) -> PropertyInput {
        sanitize_input(&raw).unwrap().input
    }

    fn base() -> Value {
        json!({
            "purchase_price": 3000,
            "loan_amount": 2400,
            "interest_rate": 2.5,
            "loan_years": 30,
            "monthly_rent": 200000,
            "holding_years": 10,
        })
    }

    #[test]
    fn test_typical_input_passes() {
        let input = input_from(base());
        assert!(check_input(&input, &SafetyLimits::default()).is_ok());
    }

    #[test]
    fn test_long_loan_high_rate_rejected() {
        let mut raw = base();
        raw["loan_years"] = json!(80);
        raw["interest_rate"] = json!(20);
        let err = check_input(&input_from(raw), &SafetyLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafeInput);
    }

    #[test]
    fn test_long_loan_moderate_rate_allowed() {
        let mut raw = base();
        raw["loan_years"] = json!(80);
        raw["interest_rate"] = json!(3);
        assert!(check_input(&input_from(raw), &SafetyLimits::default()).is_ok());
    }

    #[test]
    fn test_compound_ceiling() {
        let mut raw = base();
        raw["loan_years"] = json!(50);
        raw["interest_rate"] = json!(50);
        let input = input_from(raw);
        // (1 + 50/1200)^600 is about 4e10
        assert!(check_input(&input, &SafetyLimits::default()).is_ok());

        let tight = SafetyLimits {
            max_compound_factor: dec!(1000000000),
            ..SafetyLimits::default()
        };
        let err = check_input(&input, &tight).unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::UnsafeInput { ref rule, .. } if rule == "compound_factor_ceiling"
        ));
    }

    #[test]
    fn test_anomalous_rent_rejected() {
        let mut raw = base();
        // 1,500 万円 a year against a 3,000 万円 price is exactly 50%
        raw["monthly_rent"] = json!(1250000);
        assert!(check_input(&input_from(raw.clone()), &SafetyLimits::default()).is_ok());

        raw["monthly_rent"] = json!(1250001);
        let err = check_input(&input_from(raw), &SafetyLimits::default()).unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::UnsafeInput { ref rule, .. } if rule == "rent_to_price_ratio"
        ));
    }

    #[test]
    fn test_term_beyond_ceiling_rejected_at_any_rate() {
        for (years, rate) in [(101, 0), (101, 2), (1000, 2)] {
            let mut raw = base();
            raw["loan_years"] = json!(years);
            raw["interest_rate"] = json!(rate);
            let err = check_input(&input_from(raw), &SafetyLimits::default()).unwrap_err();
            assert!(
                matches!(err, SimulatorError::UnsafeInput { ref rule, .. } if rule == "max_loan_years"),
                "loan_years={years} rate={rate}"
            );
        }
    }

    #[test]
    fn test_max_loan_years_configurable() {
        let limits = SafetyLimits {
            max_loan_years: 35,
            ..SafetyLimits::default()
        };
        let mut raw = base();
        raw["loan_years"] = json!(40);
        let err = check_input(&input_from(raw), &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafeInput);
    }
}
