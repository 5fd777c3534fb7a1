use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SimulatorError;
use crate::SimulatorResult;

/// Whole-yen amounts (円).
pub type Yen = Decimal;

/// Ten-thousand-yen amounts (万円). 1 万円 = 10,000 円.
pub type Man = Decimal;

/// Percentage points (7.5 means 7.5%). Never a 0..1 fraction.
pub type Percent = Decimal;

/// Multiplier converting 万円 to 円.
pub const YEN_PER_MAN: Decimal = dec!(10000);

/// Convert a 万円 figure to 円.
pub fn man_to_yen(man: Man) -> Yen {
    man * YEN_PER_MAN
}

/// Convert a 円 figure to 万円.
pub fn yen_to_man(yen: Yen) -> Man {
    yen / YEN_PER_MAN
}

/// `numerator / denominator`, with overflow and division by zero reported
/// as an arithmetic error naming `context`.
pub(crate) fn checked_ratio(
    numerator: Decimal,
    denominator: Decimal,
    context: &str,
) -> SimulatorResult<Decimal> {
    numerator
        .checked_div(denominator)
        .ok_or_else(|| SimulatorError::arithmetic(context))
}

/// [`checked_ratio`] expressed in percentage points.
pub(crate) fn checked_percent(
    numerator: Decimal,
    denominator: Decimal,
    context: &str,
) -> SimulatorResult<Percent> {
    checked_ratio(numerator, denominator, context)?
        .checked_mul(dec!(100))
        .ok_or_else(|| SimulatorError::arithmetic(context))
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
