//! Core business logic - framework-agnostic payroll and loan ledger operations.
//!
//! Data flows leaves first: [`compensation`] resolves a salary structure, [`loan`] picks
//! the loans due this period, [`calculator`] turns both into a pay line, [`ledger`] applies
//! loan deductions, and [`payroll`] orchestrates a whole period inside one transaction.

/// Pure pay-line arithmetic
pub mod calculator;
/// Compensation structure resolution and administration
pub mod compensation;
/// Loan repayment ledger updates
pub mod ledger;
/// Loan eligibility and administration
pub mod loan;
/// Payroll period orchestration
pub mod payroll;
/// Payroll period value type
pub mod period;
/// Plain-text run summaries
pub mod report;
/// Staff lookups and administration
pub mod staff;
