use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Wall-clock and memory budget applied to the supervised computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardLimits {
    /// Wall-clock budget in milliseconds
    pub timeout_ms: u64,
    /// Allocation headroom in bytes, accounted cooperatively by the worker
    pub memory_limit_bytes: u64,
}

impl Default for GuardLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            memory_limit_bytes: 200 * 1024 * 1024,
        }
    }
}

/// Ceilings used by the safety gate before any computation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyLimits {
    /// Largest admissible monthly compound factor (1 + r)^n
    pub max_compound_factor: Decimal,
    /// Loan terms above this many years are only allowed at moderate rates
    pub long_loan_years: u32,
    /// Annual interest rate (%) above which long terms are rejected
    pub high_interest_rate: Decimal,
    /// Absolute loan-term ceiling in years
    pub max_loan_years: u32,
    /// Annual full rent may not exceed this share of the purchase price
    pub max_rent_to_price_ratio: Decimal,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_compound_factor: dec!(1000000000000000),
            long_loan_years: 50,
            high_interest_rate: dec!(10),
            max_loan_years: 100,
            max_rent_to_price_ratio: dec!(0.5),
        }
    }
}

/// Configuration for one simulation run. Always passed explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub guard: GuardLimits,
    pub safety: SafetyLimits,
    /// Brokerage and closing costs on exit, as a fraction of the sale price
    pub sale_cost_rate: Decimal,
    /// Replacement cost per m² of building area, in 万円
    pub building_unit_cost: Decimal,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            guard: GuardLimits::default(),
            safety: SafetyLimits::default(),
            sale_cost_rate: dec!(0.05),
            // TODO: source this coefficient; it has no documented provenance
            building_unit_cost: dec!(20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: SimulatorConfig =
            serde_json::from_str(r#"{"guard": {"timeout_ms": 500}}"#).unwrap();
        assert_eq!(cfg.guard.timeout_ms, 500);
        assert_eq!(cfg.guard.memory_limit_bytes, 200 * 1024 * 1024);
        assert_eq!(cfg.sale_cost_rate, dec!(0.05));
        assert_eq!(cfg.safety.long_loan_years, 50);
    }
}
