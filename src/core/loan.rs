//! Loan business logic - Eligibility for payroll deduction and loan administration.
//!
//! A loan is deducted in a period when it is approved, not paused, still owes money, and
//! its effective start date (start date, or creation date when unset) is on or before the
//! first day of the period. Administration covers the request/approve/reject/pause
//! lifecycle and manual repayments; balances are only ever changed through [`ledger`].
//!
//! [`ledger`]: crate::core::ledger

use crate::{
    core::{
        ledger::{self, LedgerPosting},
        period::PayrollPeriod,
    },
    entities::{Loan, LoanRepayment, LoanStatus, loan, loan_repayment},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Returns the loans to deduct from a staff member's salary in `period`, in insertion order.
pub async fn list_eligible_loans<C>(
    db: &C,
    staff_id: i64,
    period: PayrollPeriod,
) -> Result<Vec<loan::Model>>
where
    C: ConnectionTrait,
{
    let first_day = period.first_day();

    let candidates = Loan::find()
        .filter(loan::Column::StaffId.eq(staff_id))
        .filter(loan::Column::Status.eq(LoanStatus::Approved))
        .filter(loan::Column::IsPaused.eq(false))
        .order_by_asc(loan::Column::Id)
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .filter(|loan| is_deductible(loan, first_day))
        .collect())
}

/// Whether a loan owes a deduction for the period starting on `first_day`.
#[must_use]
pub fn is_deductible(loan: &loan::Model, first_day: NaiveDate) -> bool {
    loan.status == LoanStatus::Approved
        && !loan.is_paused
        && loan.outstanding_balance > Decimal::ZERO
        && loan.effective_start_date() <= first_day
}

/// Finds a loan by id.
pub async fn get_loan_by_id<C>(db: &C, loan_id: i64) -> Result<Option<loan::Model>>
where
    C: ConnectionTrait,
{
    Loan::find_by_id(loan_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every loan of a staff member, oldest first.
pub async fn list_loans_for_staff(
    db: &DatabaseConnection,
    staff_id: i64,
) -> Result<Vec<loan::Model>> {
    Loan::find()
        .filter(loan::Column::StaffId.eq(staff_id))
        .order_by_asc(loan::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the repayment history of a loan, oldest first.
pub async fn list_repayments_for_loan(
    db: &DatabaseConnection,
    loan_id: i64,
) -> Result<Vec<loan_repayment::Model>> {
    LoanRepayment::find()
        .filter(loan_repayment::Column::LoanId.eq(loan_id))
        .order_by_asc(loan_repayment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Input for [`request_loan`].
#[derive(Debug, Clone)]
pub struct LoanRequest {
    /// Amount to borrow
    pub principal: Decimal,
    /// Why the loan is needed
    pub reason: String,
    /// Number of monthly installments
    pub repayment_term_months: i32,
    /// Fixed monthly deduction; derived from the term when absent
    pub monthly_deduction: Option<Decimal>,
}

/// Monthly installment for a principal spread over `term_months`, rounded up to cents.
#[must_use]
pub fn default_monthly_deduction(principal: Decimal, term_months: i32) -> Decimal {
    (principal / Decimal::from(term_months))
        .round_dp_with_strategy(2, RoundingStrategy::AwayFromZero)
}

/// Records a new PENDING loan for a staff member.
pub async fn request_loan(
    db: &DatabaseConnection,
    staff_id: i64,
    request: LoanRequest,
) -> Result<loan::Model> {
    if request.principal <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: request.principal,
        });
    }
    if request.repayment_term_months < 1 {
        return Err(Error::Validation {
            message: "Repayment term must be at least one month".to_string(),
        });
    }

    let monthly_deduction = request.monthly_deduction.unwrap_or_else(|| {
        default_monthly_deduction(request.principal, request.repayment_term_months)
    });
    if monthly_deduction <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: monthly_deduction,
        });
    }

    crate::core::staff::get_staff_by_id(db, staff_id)
        .await?
        .ok_or(Error::NotFound {
            entity: "staff",
            id: staff_id,
        })?;

    let loan = loan::ActiveModel {
        staff_id: Set(staff_id),
        principal: Set(request.principal.into()),
        reason: Set(request.reason.trim().to_string()),
        repayment_term_months: Set(request.repayment_term_months),
        monthly_deduction: Set(monthly_deduction.into()),
        outstanding_balance: Set(request.principal.into()),
        installments_paid: Set(0),
        status: Set(LoanStatus::Pending),
        start_date: Set(None),
        is_paused: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(loan.insert(db).await?)
}

async fn require_loan<C>(db: &C, loan_id: i64) -> Result<loan::Model>
where
    C: ConnectionTrait,
{
    get_loan_by_id(db, loan_id).await?.ok_or(Error::NotFound {
        entity: "loan",
        id: loan_id,
    })
}

/// Approves a PENDING loan. Deductions begin in the period containing `start_date`
/// (or the approval's creation-date fallback when no start date is given).
pub async fn approve_loan(
    db: &DatabaseConnection,
    loan_id: i64,
    start_date: Option<NaiveDate>,
) -> Result<loan::Model> {
    let loan = require_loan(db, loan_id).await?;
    if loan.status != LoanStatus::Pending {
        return Err(Error::InvalidLoanTransition {
            loan_id,
            status: loan.status,
            action: "approve",
        });
    }

    let mut active_model: loan::ActiveModel = loan.into();
    active_model.status = Set(LoanStatus::Approved);
    if start_date.is_some() {
        active_model.start_date = Set(start_date);
    }
    let updated = active_model.update(db).await?;
    info!("Loan {} approved for staff {}", updated.id, updated.staff_id);
    Ok(updated)
}

/// Rejects a PENDING loan.
pub async fn reject_loan(db: &DatabaseConnection, loan_id: i64) -> Result<loan::Model> {
    let loan = require_loan(db, loan_id).await?;
    if loan.status != LoanStatus::Pending {
        return Err(Error::InvalidLoanTransition {
            loan_id,
            status: loan.status,
            action: "reject",
        });
    }

    let mut active_model: loan::ActiveModel = loan.into();
    active_model.status = Set(LoanStatus::Rejected);
    Ok(active_model.update(db).await?)
}

/// Pauses or resumes salary deductions for an APPROVED loan.
pub async fn set_loan_paused(
    db: &DatabaseConnection,
    loan_id: i64,
    is_paused: bool,
) -> Result<loan::Model> {
    let loan = require_loan(db, loan_id).await?;
    if loan.status != LoanStatus::Approved {
        return Err(Error::InvalidLoanTransition {
            loan_id,
            status: loan.status,
            action: if is_paused { "pause" } else { "resume" },
        });
    }

    let mut active_model: loan::ActiveModel = loan.into();
    active_model.is_paused = Set(is_paused);
    Ok(active_model.update(db).await?)
}

/// Applies a repayment collected outside payroll (cash, bank transfer, ...).
///
/// Follows the same ledger rules as a salary deduction: the amount must not exceed the
/// outstanding balance, the installment counter grows by one, and a zero balance
/// completes the loan.
pub async fn record_manual_repayment(
    db: &DatabaseConnection,
    loan_id: i64,
    amount: Decimal,
    method: &str,
    note: &str,
) -> Result<ledger::LedgerEntry> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    if method.trim().is_empty() {
        return Err(Error::Validation {
            message: "Repayment method cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;

    let loan = require_loan(&txn, loan_id).await?;
    if loan.status != LoanStatus::Approved {
        return Err(Error::InvalidLoanTransition {
            loan_id,
            status: loan.status,
            action: "repay",
        });
    }
    if amount > loan.outstanding_balance.amount() {
        return Err(Error::InvalidAmount { amount });
    }

    let posting = LedgerPosting::for_loan(&loan, amount);
    let entry = ledger::apply_posting(&txn, &posting, method.trim(), note).await?;

    txn.commit().await?;
    Ok(entry)
}
