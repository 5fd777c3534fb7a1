use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SimulatorError;
use crate::sanitize::{LoanType, PropertyInput};
use crate::types::{man_to_yen, yen_to_man, Man, Percent, Yen};
use crate::SimulatorResult;

/// Residual below zero tolerated before it is treated as a computation fault.
const RESIDUAL_TOLERANCE: Decimal = dec!(1);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Monthly-compounding loan with either amortisation convention.
///
/// All amounts are in 円. Build one per simulation and share it between the
/// metrics engine and the projector.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanSchedule {
    principal: Yen,
    monthly_rate: Decimal,
    months: u32,
    loan_type: LoanType,
    /// (1 + r)^n, or 1 when the rate is zero
    compound: Decimal,
}

/// One year of the amortisation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualLoanPeriod {
    pub year: u32,
    pub opening_balance: Yen,
    pub debt_service: Yen,
    pub interest: Yen,
    pub principal: Yen,
    pub closing_balance: Yen,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl LoanSchedule {
    /// `loan_amount` in 万円, `interest_rate` in annual percent.
    pub fn new(
        loan_amount: Man,
        interest_rate: Percent,
        loan_years: u32,
        loan_type: LoanType,
    ) -> SimulatorResult<Self> {
        if loan_years == 0 {
            return Err(SimulatorError::Validation {
                field: "loan_years".into(),
                reason: "Loan term must be at least 1 year".into(),
            });
        }

        let principal = man_to_yen(loan_amount);
        let monthly_rate = interest_rate / dec!(1200);
        let months = loan_years
            .checked_mul(12)
            .ok_or_else(|| SimulatorError::arithmetic("loan term in months overflow"))?;

        let compound = if monthly_rate.is_zero() {
            Decimal::ONE
        } else {
            (Decimal::ONE + monthly_rate)
                .checked_powu(u64::from(months))
                .ok_or_else(|| SimulatorError::arithmetic("loan compound factor overflow"))?
        };

        Ok(Self {
            principal,
            monthly_rate,
            months,
            loan_type,
            compound,
        })
    }

    pub fn from_input(input: &PropertyInput) -> SimulatorResult<Self> {
        Self::new(
            input.loan_amount,
            input.interest_rate,
            input.loan_years,
            input.loan_type,
        )
    }

    pub fn has_debt(&self) -> bool {
        self.principal > Decimal::ZERO
    }

    pub fn principal(&self) -> Yen {
        self.principal
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    pub fn loan_type(&self) -> LoanType {
        self.loan_type
    }
}

// ---------------------------------------------------------------------------
// Payments and balances
// ---------------------------------------------------------------------------

impl LoanSchedule {
    /// Monthly instalment. For level-principal loans this is the first
    /// (largest) instalment: P/n plus one month of interest on P.
    pub fn monthly_payment(&self) -> SimulatorResult<Yen> {
        if !self.has_debt() {
            return Ok(Decimal::ZERO);
        }
        let n = Decimal::from(self.months);

        match self.loan_type {
            LoanType::LevelPayment if self.monthly_rate.is_zero() => Ok(self.principal / n),
            LoanType::LevelPayment => {
                let numerator = self
                    .principal
                    .checked_mul(self.monthly_rate)
                    .and_then(|v| v.checked_mul(self.compound))
                    .ok_or_else(|| SimulatorError::arithmetic("monthly payment overflow"))?;
                numerator
                    .checked_div(self.compound - Decimal::ONE)
                    .ok_or_else(|| SimulatorError::arithmetic("monthly payment denominator"))
            }
            LoanType::LevelPrincipal => Ok(self.principal / n + self.principal * self.monthly_rate),
        }
    }

    /// Outstanding principal after `elapsed_years` of payments, in 円.
    pub fn remaining_principal(&self, elapsed_years: u32) -> SimulatorResult<Yen> {
        self.balance_after_months(elapsed_years.saturating_mul(12))
    }

    /// Outstanding principal after `elapsed_years`, in 万円.
    pub fn remaining_principal_man(&self, elapsed_years: u32) -> SimulatorResult<Man> {
        Ok(yen_to_man(self.remaining_principal(elapsed_years)?))
    }

    fn balance_after_months(&self, elapsed_months: u32) -> SimulatorResult<Yen> {
        if !self.has_debt() {
            return Ok(Decimal::ZERO);
        }
        let m = elapsed_months.min(self.months);
        let n = Decimal::from(self.months);
        let p = self.principal;

        let straight_line =
            self.loan_type == LoanType::LevelPrincipal || self.monthly_rate.is_zero();
        let balance = if straight_line {
            p * Decimal::from(self.months - m) / n
        } else {
            let compound_m = (Decimal::ONE + self.monthly_rate)
                .checked_powu(u64::from(m))
                .ok_or_else(|| SimulatorError::arithmetic("remaining principal overflow"))?;
            p.checked_mul(self.compound - compound_m)
                .and_then(|v| v.checked_div(self.compound - Decimal::ONE))
                .ok_or_else(|| SimulatorError::arithmetic("remaining principal"))?
        };

        if balance < -RESIDUAL_TOLERANCE {
            return Err(SimulatorError::arithmetic(format!(
                "negative remaining principal {balance} after {m} months"
            )));
        }
        if balance > p * dec!(2) {
            return Err(SimulatorError::arithmetic(format!(
                "remaining principal {balance} exceeds twice the loan"
            )));
        }
        Ok(balance.max(Decimal::ZERO))
    }

    /// Interest / principal split for loan year `year` (1-based).
    /// Years past maturity are all zero.
    pub fn annual_split(&self, year: u32) -> SimulatorResult<AnnualLoanPeriod> {
        let start = year.saturating_sub(1).saturating_mul(12).min(self.months);
        let end = year.saturating_mul(12).min(self.months);
        let opening_balance = self.balance_after_months(start)?;
        let closing_balance = self.balance_after_months(end)?;
        let paid_months = Decimal::from(end - start);

        let (debt_service, interest) = match self.loan_type {
            LoanType::LevelPayment => {
                let debt_service = self.monthly_payment()? * paid_months;
                let principal = opening_balance - closing_balance;
                (debt_service, debt_service - principal)
            }
            LoanType::LevelPrincipal => {
                let per_month = if self.has_debt() {
                    self.principal / Decimal::from(self.months)
                } else {
                    Decimal::ZERO
                };
                // Sum of month indices start..end, i.e. balance reductions already made.
                let index_sum = Decimal::from(u64::from(start + end).saturating_sub(1))
                    * paid_months
                    / dec!(2);
                let interest = self.monthly_rate
                    * (self.principal * paid_months - per_month * index_sum);
                (per_month * paid_months + interest, interest)
            }
        };

        Ok(AnnualLoanPeriod {
            year,
            opening_balance,
            debt_service,
            interest,
            principal: opening_balance - closing_balance,
            closing_balance,
        })
    }

    /// Total debt service in loan year `year`.
    pub fn annual_debt_service(&self, year: u32) -> SimulatorResult<Yen> {
        Ok(self.annual_split(year)?.debt_service)
    }

    /// Full amortisation table, one row per year of the loan term.
    pub fn annual_schedule(&self) -> SimulatorResult<Vec<AnnualLoanPeriod>> {
        let years = self.months / 12;
        (1..=years).map(|y| self.annual_split(y)).collect()
    }
}
