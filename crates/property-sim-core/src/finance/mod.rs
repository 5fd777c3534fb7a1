//! Loan amortisation, depreciation and income tax building blocks.

pub mod loan;
pub mod tax;

pub use loan::{AnnualLoanPeriod, LoanSchedule};
pub use tax::{annual_depreciation, taxable_income, LossCarryForward, TaxAssessment};
