//! Loan ledger updates - Applies a repayment to a loan and records it.
//!
//! Applying a posting is not idempotent: every call decrements the balance, bumps the
//! installment counter and appends a repayment row. Payroll relies on the unique period
//! key of the schedule to apply a period's postings at most once, and runs them in the
//! same transaction as the schedule insert.
//!
//! The loan row is only updated while its `installments_paid` still matches the value the
//! posting was computed from. Every ledger write bumps that counter, so a mismatch means
//! someone else moved the balance in between.

use crate::{
    entities::{Loan, LoanStatus, loan, loan_repayment},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*};
use tracing::debug;

/// Repayment method recorded for payroll deductions.
pub const SALARY_DEDUCTION: &str = "SALARY_DEDUCTION";

/// A planned repayment against one loan, computed from the loan as it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPosting {
    /// Loan to repay
    pub loan_id: i64,
    /// Balance the deduction was computed from
    pub balance_before: Decimal,
    /// Installment count the deduction was computed from
    pub installments_before: i32,
    /// Amount to apply
    pub amount: Decimal,
}

impl LedgerPosting {
    /// Plans a repayment of `amount` against `loan`'s current state.
    #[must_use]
    pub fn for_loan(loan: &loan::Model, amount: Decimal) -> Self {
        Self {
            loan_id: loan.id,
            balance_before: loan.outstanding_balance.amount(),
            installments_before: loan.installments_paid,
            amount,
        }
    }

    /// Balance after the posting is applied.
    #[must_use]
    pub fn balance_after(&self) -> Decimal {
        self.balance_before - self.amount
    }

    /// Status the loan ends up in: COMPLETED once nothing is owed.
    #[must_use]
    pub fn status_after(&self) -> LoanStatus {
        if self.balance_after() <= Decimal::ZERO {
            LoanStatus::Completed
        } else {
            LoanStatus::Approved
        }
    }
}

/// Outcome of an applied posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Loan that was repaid
    pub loan_id: i64,
    /// Balance after the repayment
    pub new_balance: Decimal,
    /// Installment count after the repayment
    pub installments_paid: i32,
    /// Status after the repayment
    pub status: LoanStatus,
    /// Id of the appended repayment row
    pub repayment_id: i64,
}

/// Writes a loan's new balance, installment count and status.
///
/// The write only happens if the loan is still APPROVED, not paused, and has
/// `expected_installments` recorded. Returns [`Error::NotFound`] when the loan no longer exists and
/// [`Error::LoanChanged`] when it exists in a different state.
pub async fn update_loan<C>(
    db: &C,
    loan_id: i64,
    expected_installments: i32,
    new_balance: Decimal,
    new_installments: i32,
    new_status: LoanStatus,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Loan::update_many()
        .set(loan::ActiveModel {
            outstanding_balance: Set(new_balance.into()),
            installments_paid: Set(new_installments),
            status: Set(new_status),
            ..Default::default()
        })
        .filter(loan::Column::Id.eq(loan_id))
        .filter(loan::Column::Status.eq(LoanStatus::Approved))
        .filter(loan::Column::IsPaused.eq(false))
        .filter(loan::Column::InstallmentsPaid.eq(expected_installments))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let exists = Loan::find_by_id(loan_id).one(db).await?.is_some();
        return Err(if exists {
            Error::LoanChanged { loan_id }
        } else {
            Error::NotFound {
                entity: "loan",
                id: loan_id,
            }
        });
    }

    Ok(())
}

/// Appends a repayment row to a loan's history.
pub async fn append_repayment<C>(
    db: &C,
    loan_id: i64,
    amount: Decimal,
    method: &str,
    note: &str,
) -> Result<loan_repayment::Model>
where
    C: ConnectionTrait,
{
    let repayment = loan_repayment::ActiveModel {
        loan_id: Set(loan_id),
        amount: Set(amount.into()),
        method: Set(method.to_string()),
        note: Set(note.to_string()),
        paid_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(repayment.insert(db).await?)
}

/// Applies a posting: updates the loan, then appends the repayment record.
///
/// Run this on a transaction when more than one posting must succeed together.
pub async fn apply_posting<C>(
    db: &C,
    posting: &LedgerPosting,
    method: &str,
    note: &str,
) -> Result<LedgerEntry>
where
    C: ConnectionTrait,
{
    if posting.amount <= Decimal::ZERO || posting.amount > posting.balance_before {
        return Err(Error::InvalidAmount {
            amount: posting.amount,
        });
    }

    let new_balance = posting.balance_after();
    let installments_paid = posting.installments_before + 1;
    let status = posting.status_after();

    update_loan(
        db,
        posting.loan_id,
        posting.installments_before,
        new_balance,
        installments_paid,
        status,
    )
    .await?;
    let repayment = append_repayment(db, posting.loan_id, posting.amount, method, note).await?;

    debug!(
        "Loan {} repaid {} ({}), balance {} -> {}",
        posting.loan_id, posting.amount, method, posting.balance_before, new_balance
    );

    Ok(LedgerEntry {
        loan_id: posting.loan_id,
        new_balance,
        installments_paid,
        status,
        repayment_id: repayment.id,
    })
}
