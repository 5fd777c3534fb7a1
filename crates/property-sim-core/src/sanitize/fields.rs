use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::numeric::{coerce_decimal, Coerced, NumericRange};
use super::text::{sanitize_text, Charset, MAX_LABEL_LEN};
use crate::error::SimulatorError;
use crate::types::{Man, Percent, Yen};
use crate::SimulatorResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Loan amortisation convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanType {
    /// 元利均等: constant monthly payment
    #[default]
    LevelPayment,
    /// 元金均等: constant monthly principal, interest on the declining balance
    LevelPrincipal,
}

impl LoanType {
    /// Parse the labels used by the UI and API, in English or Japanese.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "level-payment" | "annuity" | "元利均等" => Some(LoanType::LevelPayment),
            "level-principal" | "straight-line" | "元金均等" => Some(LoanType::LevelPrincipal),
            _ => None,
        }
    }
}

/// Canonical, closed parameter record for one property.
///
/// Only [`sanitize_input`] constructs this; every numeric is finite and
/// inside its declared range, and both strings are scrubbed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyInput {
    pub property_name: String,
    pub location: String,
    /// 万円, strictly positive
    pub purchase_price: Man,
    /// 万円, never above purchase_price
    pub loan_amount: Man,
    /// 万円
    pub other_costs: Man,
    /// 万円, spent in year 1
    pub renovation_cost: Man,
    /// 円 per month at full occupancy
    pub monthly_rent: Yen,
    /// 円 per month
    pub management_fee: Yen,
    /// 円 per month
    pub fixed_cost: Yen,
    /// 円 per year
    pub property_tax: Yen,
    pub vacancy_rate: Percent,
    /// Annual rent decline, percent of the year-1 rent per elapsed year
    pub rent_decline: Percent,
    /// Annual nominal rate
    pub interest_rate: Percent,
    pub loan_years: u32,
    pub loan_type: LoanType,
    pub holding_years: u32,
    /// 万円, depreciable basis
    pub building_price: Man,
    pub depreciation_years: u32,
    pub effective_tax_rate: Percent,
    pub exit_cap_rate: Percent,
    /// 万円
    pub expected_sale_price: Man,
    /// 万円
    pub market_value: Man,
    /// m²
    pub land_area: Decimal,
    /// m²
    pub building_area: Decimal,
    /// 円 per m² (路線価)
    pub road_price: Yen,
    pub major_repair_cycle: u32,
    /// 万円 per occurrence
    pub major_repair_cost: Man,
}

/// Sanitised record plus a note for every repair applied to the raw input.
#[derive(Debug, Clone)]
pub struct SanitizedInput {
    pub input: PropertyInput,
    pub warnings: Vec<String>,
}

/// Declared range and fallback for one numeric field.
struct FieldSpec {
    name: &'static str,
    range: NumericRange,
    default: Decimal,
}

const fn spec(name: &'static str, min: Decimal, max: Decimal, default: Decimal) -> FieldSpec {
    FieldSpec {
        name,
        range: NumericRange::new(min, max),
        default,
    }
}

const PRICE_MAX: Decimal = dec!(10000000000);

const PURCHASE_PRICE: FieldSpec = spec("purchase_price", dec!(0), PRICE_MAX, dec!(0));
const LOAN_AMOUNT: FieldSpec = spec("loan_amount", dec!(0), PRICE_MAX, dec!(0));
const OTHER_COSTS: FieldSpec = spec("other_costs", dec!(0), dec!(100000000), dec!(0));
const RENOVATION_COST: FieldSpec = spec("renovation_cost", dec!(0), dec!(100000000), dec!(0));
const MONTHLY_RENT: FieldSpec = spec("monthly_rent", dec!(0), dec!(10000000), dec!(0));
const MANAGEMENT_FEE: FieldSpec = spec("management_fee", dec!(0), dec!(1000000), dec!(0));
const FIXED_COST: FieldSpec = spec("fixed_cost", dec!(0), dec!(1000000), dec!(0));
const PROPERTY_TAX: FieldSpec = spec("property_tax", dec!(0), dec!(100000000), dec!(0));
const VACANCY_RATE: FieldSpec = spec("vacancy_rate", dec!(0), dec!(100), dec!(5));
const RENT_DECLINE: FieldSpec = spec("rent_decline", dec!(0), dec!(50), dec!(0));
const INTEREST_RATE: FieldSpec = spec("interest_rate", dec!(0), dec!(50), dec!(0));
/// Only the lower bound is repaired here. Terms above the safety gate's
/// `max_loan_years` are rejected by `check_input`, never shortened.
const LOAN_YEARS: FieldSpec = spec("loan_years", dec!(1), dec!(1000000), dec!(1));
const HOLDING_YEARS: FieldSpec = spec("holding_years", dec!(1), dec!(100), dec!(1));
const BUILDING_PRICE: FieldSpec = spec("building_price", dec!(0), PRICE_MAX, dec!(0));
const DEPRECIATION_YEARS: FieldSpec = spec("depreciation_years", dec!(1), dec!(100), dec!(27));
const EFFECTIVE_TAX_RATE: FieldSpec = spec("effective_tax_rate", dec!(0), dec!(100), dec!(30));
const EXIT_CAP_RATE: FieldSpec = spec("exit_cap_rate", dec!(0), dec!(50), dec!(0));
const EXPECTED_SALE_PRICE: FieldSpec = spec("expected_sale_price", dec!(0), PRICE_MAX, dec!(0));
const MARKET_VALUE: FieldSpec = spec("market_value", dec!(0), PRICE_MAX, dec!(0));
const LAND_AREA: FieldSpec = spec("land_area", dec!(0), dec!(1000000), dec!(0));
const BUILDING_AREA: FieldSpec = spec("building_area", dec!(0), dec!(100000), dec!(0));
const ROAD_PRICE: FieldSpec = spec("road_price", dec!(0), dec!(100000000), dec!(0));
const MAJOR_REPAIR_CYCLE: FieldSpec = spec("major_repair_cycle", dec!(1), dec!(100), dec!(10));
const MAJOR_REPAIR_COST: FieldSpec = spec("major_repair_cost", dec!(0), dec!(10000), dec!(200));

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Validate an arbitrary (possibly hostile) mapping into a [`PropertyInput`].
///
/// Unknown keys are ignored. Unrecoverable fields fall back to their default
/// or lower bound and every such repair is logged and returned as a warning.
/// A missing or non-positive `purchase_price` is the only fatal condition.
pub fn sanitize_input(raw: &Value) -> SimulatorResult<SanitizedInput> {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);
    let mut reader = FieldReader {
        fields,
        warnings: Vec::new(),
    };

    let purchase_price = match coerce_decimal(fields.get(PURCHASE_PRICE.name)) {
        Coerced::Value(v) => PURCHASE_PRICE.range.clamp(v).0,
        Coerced::Missing | Coerced::Invalid => Decimal::ZERO,
    };
    if purchase_price <= Decimal::ZERO {
        return Err(SimulatorError::Validation {
            field: PURCHASE_PRICE.name.into(),
            reason: "Purchase price is required and must be positive".into(),
        });
    }
    if purchase_price == PURCHASE_PRICE.range.max {
        reader.note(PURCHASE_PRICE.name, "clamped to upper bound");
    }

    let loan_amount = reader.decimal(&LOAN_AMOUNT);
    let loan_amount = reader.cap_at(LOAN_AMOUNT.name, loan_amount, purchase_price);
    let building_price = reader.decimal(&BUILDING_PRICE);
    let building_price = reader.cap_at(BUILDING_PRICE.name, building_price, purchase_price);

    let loan_years_present = !matches!(
        coerce_decimal(fields.get(LOAN_YEARS.name)),
        Coerced::Missing
    );
    if loan_amount > Decimal::ZERO && !loan_years_present {
        reader.note(LOAN_YEARS.name, "required when loan_amount > 0; using 1 year");
    }
    if matches!(coerce_decimal(fields.get(HOLDING_YEARS.name)), Coerced::Missing) {
        reader.note(HOLDING_YEARS.name, "missing; using 1 year");
    }

    let market_value = reader.decimal(&MARKET_VALUE);
    let expected_sale_price = match coerce_decimal(fields.get(EXPECTED_SALE_PRICE.name)) {
        Coerced::Missing => market_value,
        Coerced::Value(_) | Coerced::Invalid => reader.decimal(&EXPECTED_SALE_PRICE),
    };

    let input = PropertyInput {
        property_name: reader.text("property_name"),
        location: reader.text("location"),
        purchase_price,
        loan_amount,
        other_costs: reader.decimal(&OTHER_COSTS),
        renovation_cost: reader.decimal(&RENOVATION_COST),
        monthly_rent: reader.decimal(&MONTHLY_RENT),
        management_fee: reader.decimal(&MANAGEMENT_FEE),
        fixed_cost: reader.decimal(&FIXED_COST),
        property_tax: reader.decimal(&PROPERTY_TAX),
        vacancy_rate: reader.decimal(&VACANCY_RATE),
        rent_decline: reader.decimal(&RENT_DECLINE),
        interest_rate: reader.decimal(&INTEREST_RATE),
        loan_years: reader.years(&LOAN_YEARS),
        loan_type: reader.loan_type(),
        holding_years: reader.years(&HOLDING_YEARS),
        building_price,
        depreciation_years: reader.years(&DEPRECIATION_YEARS),
        effective_tax_rate: reader.decimal(&EFFECTIVE_TAX_RATE),
        exit_cap_rate: reader.decimal(&EXIT_CAP_RATE),
        expected_sale_price,
        market_value,
        land_area: reader.decimal(&LAND_AREA),
        building_area: reader.decimal(&BUILDING_AREA),
        road_price: reader.decimal(&ROAD_PRICE),
        major_repair_cycle: reader.years(&MAJOR_REPAIR_CYCLE),
        major_repair_cost: reader.decimal(&MAJOR_REPAIR_COST),
    };

    Ok(SanitizedInput {
        input,
        warnings: reader.warnings,
    })
}

// ---------------------------------------------------------------------------
// Field reader
// ---------------------------------------------------------------------------

struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    warnings: Vec<String>,
}

impl FieldReader<'_> {
    fn note(&mut self, field: &str, message: &str) {
        warn!(field, detail = message, "input repaired");
        self.warnings.push(format!("{field}: {message}"));
    }

    fn decimal(&mut self, spec: &FieldSpec) -> Decimal {
        match coerce_decimal(self.fields.get(spec.name)) {
            Coerced::Missing => spec.default,
            Coerced::Invalid => {
                // NaN, infinities and garbage become 0, or the lower bound when 0 is out of range.
                let fallback = spec.range.clamp(Decimal::ZERO).0;
                warn!(field = spec.name, fallback = %fallback, "non-numeric value replaced");
                self.warnings.push(format!(
                    "{}: not a finite number; using {}",
                    spec.name, fallback
                ));
                fallback
            }
            Coerced::Value(v) => {
                let (clamped, moved) = spec.range.clamp(v);
                if moved {
                    warn!(field = spec.name, raw = %v, applied = %clamped, "value clamped");
                    self.warnings.push(format!(
                        "{}: {} outside [{}, {}]; clamped to {}",
                        spec.name, v, spec.range.min, spec.range.max, clamped
                    ));
                }
                clamped
            }
        }
    }

    fn years(&mut self, spec: &FieldSpec) -> u32 {
        let value = self.decimal(spec).trunc();
        // Every FieldSpec range fits in u32; the fallback is unreachable in practice.
        value.to_u32().unwrap_or(spec.range.min.to_u32().unwrap_or(1))
    }

    fn cap_at(&mut self, field: &str, value: Decimal, cap: Decimal) -> Decimal {
        if value > cap {
            warn!(field, raw = %value, applied = %cap, "capped at purchase_price");
            self.warnings
                .push(format!("{field}: {value} exceeds purchase_price; capped to {cap}"));
            cap
        } else {
            value
        }
    }

    fn text(&mut self, field: &str) -> String {
        let fields = self.fields;
        match fields.get(field) {
            Some(Value::String(s)) => {
                let cleaned = sanitize_text(s, MAX_LABEL_LEN, Charset::Label);
                if cleaned != s.trim() {
                    warn!(field, "text content scrubbed");
                    self.warnings.push(format!("{field}: disallowed content removed"));
                }
                cleaned
            }
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    fn loan_type(&mut self) -> LoanType {
        let fields = self.fields;
        match fields.get("loan_type") {
            Some(Value::String(s)) => LoanType::parse(s).unwrap_or_else(|| {
                self.note("loan_type", "unrecognised; using level-payment");
                LoanType::LevelPayment
            }),
            Some(Value::Null) | None => LoanType::default(),
            Some(_) => {
                self.note("loan_type", "unrecognised; using level-payment");
                LoanType::LevelPayment
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let out = sanitize_input(&json!({"purchase_price": 3000, "holding_years": 10})).unwrap();
        let input = out.input;
        assert_eq!(input.vacancy_rate, dec!(5));
        assert_eq!(input.depreciation_years, 27);
        assert_eq!(input.effective_tax_rate, dec!(30));
        assert_eq!(input.major_repair_cycle, 10);
        assert_eq!(input.major_repair_cost, dec!(200));
        assert_eq!(input.loan_type, LoanType::LevelPayment);
        assert_eq!(input.property_name, "");
    }

    #[test]
    fn test_missing_purchase_price_is_fatal() {
        let err = sanitize_input(&json!({"holding_years": 10})).unwrap_err();
        assert!(matches!(
            err,
            SimulatorError::Validation { ref field, .. } if field == "purchase_price"
        ));

        let err = sanitize_input(&json!({"purchase_price": "0"})).unwrap_err();
        assert!(matches!(err, SimulatorError::Validation { .. }));

        let err = sanitize_input(&json!("not a mapping")).unwrap_err();
        assert!(matches!(err, SimulatorError::Validation { .. }));
    }

    #[test]
    fn test_loan_capped_at_purchase_price() {
        let out = sanitize_input(&json!({
            "purchase_price": 3000,
            "loan_amount": 5000,
            "loan_years": 30,
            "holding_years": 10,
        }))
        .unwrap();
        assert_eq!(out.input.loan_amount, dec!(3000));
        assert!(out.warnings.iter().any(|w| w.starts_with("loan_amount")));
    }

    #[test]
    fn test_out_of_range_clamped_and_reported() {
        let out = sanitize_input(&json!({
            "purchase_price": 3000,
            "holding_years": 500,
            "vacancy_rate": -3,
            "interest_rate": "NaN",
        }))
        .unwrap();
        assert_eq!(out.input.holding_years, 100);
        assert_eq!(out.input.vacancy_rate, dec!(0));
        assert_eq!(out.input.interest_rate, dec!(0));
        assert_eq!(out.warnings.len(), 3);
    }

    #[test]
    fn test_expected_sale_defaults_to_market_value() {
        let out = sanitize_input(&json!({
            "purchase_price": 3000,
            "holding_years": 10,
            "market_value": 3500,
        }))
        .unwrap();
        assert_eq!(out.input.expected_sale_price, dec!(3500));
    }

    #[test]
    fn test_non_finite_values_become_zero_or_lower_bound() {
        let out = sanitize_input(&json!({
            "purchase_price": 3000,
            "holding_years": 10,
            "vacancy_rate": "NaN",
            "effective_tax_rate": "inf",
            "major_repair_cost": "NaN",
            "depreciation_years": "-Infinity",
            "expected_sale_price": "nan",
            "market_value": 3200,
        }))
        .unwrap();
        let input = out.input;
        assert_eq!(input.vacancy_rate, Decimal::ZERO);
        assert_eq!(input.effective_tax_rate, Decimal::ZERO);
        assert_eq!(input.major_repair_cost, Decimal::ZERO);
        assert_eq!(input.depreciation_years, 1);
        assert_eq!(input.expected_sale_price, Decimal::ZERO);
        assert_eq!(out.warnings.len(), 5);
    }

    #[test]
    fn test_long_loan_term_passed_through_unshortened() {
        let out = sanitize_input(&json!({
            "purchase_price": 3000,
            "loan_amount": 2000,
            "loan_years": 1000,
            "holding_years": 10,
        }))
        .unwrap();
        assert_eq!(out.input.loan_years, 1000);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_loan_type_labels() {
        assert_eq!(LoanType::parse("元金均等"), Some(LoanType::LevelPrincipal));
        assert_eq!(LoanType::parse("LEVEL_PAYMENT"), Some(LoanType::LevelPayment));
        assert_eq!(LoanType::parse("balloon"), None);
    }

    #[test]
    fn test_fractional_years_truncated() {
        let out = sanitize_input(&json!({
            "purchase_price": 3000,
            "holding_years": "10.9",
        }))
        .unwrap();
        assert_eq!(out.input.holding_years, 10);
    }
}
