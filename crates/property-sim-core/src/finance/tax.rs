use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{man_to_yen, Man, Percent, Yen};

/// Straight-line depreciation charged in `year` (1-based), in 円.
///
/// The full basis is spread evenly over `depreciation_years`; nothing is
/// charged after the useful life ends.
pub fn annual_depreciation(building_price: Man, depreciation_years: u32, year: u32) -> Yen {
    if depreciation_years == 0 || year == 0 || year > depreciation_years {
        return Decimal::ZERO;
    }
    man_to_yen(building_price) / Decimal::from(depreciation_years)
}

/// Taxable income for one year, in 円.
///
/// Debt principal is not an expense. Loan interest is not deducted either;
/// the projection has always taxed on this basis.
pub fn taxable_income(
    effective_rent: Yen,
    cash_expenses: Yen,
    depreciation: Yen,
    one_off_costs: Yen,
) -> Yen {
    effective_rent - cash_expenses - depreciation - one_off_costs
}

/// Outcome of assessing one year's tax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub taxable_income: Yen,
    /// Carried losses consumed this year
    pub loss_applied: Yen,
    pub tax: Yen,
    /// Balance carried into the next year
    pub loss_balance: Yen,
}

/// Running, non-negative balance of prior-year losses.
///
/// Local to one projection; losses never expire within the horizon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossCarryForward {
    balance: Yen,
}

impl LossCarryForward {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Yen {
        self.balance
    }

    /// Tax `taxable_income` at `tax_rate` percent, netting carried losses first.
    pub fn assess(&mut self, taxable_income: Yen, tax_rate: Percent) -> TaxAssessment {
        if taxable_income <= Decimal::ZERO {
            self.balance += taxable_income.abs();
            return TaxAssessment {
                taxable_income,
                loss_applied: Decimal::ZERO,
                tax: Decimal::ZERO,
                loss_balance: self.balance,
            };
        }

        let applied = taxable_income.min(self.balance);
        self.balance -= applied;
        let tax = (taxable_income - applied) * tax_rate / dec!(100);

        TaxAssessment {
            taxable_income,
            loss_applied: applied,
            tax,
            loss_balance: self.balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depreciation_stops_after_useful_life() {
        assert_eq!(annual_depreciation(dec!(1500), 27, 1), dec!(15000000) / dec!(27));
        assert_eq!(annual_depreciation(dec!(1500), 27, 27), dec!(15000000) / dec!(27));
        assert_eq!(annual_depreciation(dec!(1500), 27, 28), Decimal::ZERO);
        assert_eq!(annual_depreciation(dec!(1000), 10, 0), Decimal::ZERO);
    }

    #[test]
    fn test_taxable_income() {
        let income = taxable_income(dec!(2280000), dec!(200000), dec!(555555), dec!(2000000));
        assert_eq!(income, dec!(-475555));
    }

    #[test]
    fn test_loss_carry_forward_offsets_profit() {
        let mut losses = LossCarryForward::new();
        for _ in 0..5 {
            let year = losses.assess(dec!(-125000), dec!(20));
            assert_eq!(year.tax, Decimal::ZERO);
        }
        assert_eq!(losses.balance(), dec!(625000));

        let year6 = losses.assess(dec!(666000), dec!(20));
        assert_eq!(year6.loss_applied, dec!(625000));
        assert_eq!(year6.tax, dec!(8200));
        assert_eq!(year6.loss_balance, Decimal::ZERO);
    }

    #[test]
    fn test_partial_offset_keeps_remaining_balance() {
        let mut losses = LossCarryForward::new();
        losses.assess(dec!(-1000000), dec!(30));
        let year2 = losses.assess(dec!(400000), dec!(30));
        assert_eq!(year2.tax, Decimal::ZERO);
        assert_eq!(year2.loss_balance, dec!(600000));
    }

    #[test]
    fn test_no_losses_taxes_in_full() {
        let mut losses = LossCarryForward::new();
        let year = losses.assess(dec!(1000000), dec!(30));
        assert_eq!(year.tax, dec!(300000));
        assert_eq!(year.loss_balance, Decimal::ZERO);
    }
}
