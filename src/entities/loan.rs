//! Loan entity - A staff loan repaid through monthly salary deductions.
//!
//! The outstanding balance only ever shrinks once repayment starts and the installment
//! counter only ever grows. A loan whose balance reaches zero is `COMPLETED`.

use super::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a loan
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// Requested, awaiting a decision
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Approved and being repaid
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Declined; never deducted
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    /// Fully repaid
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
        };
        f.write_str(label)
    }
}

/// Loan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    /// Unique identifier for the loan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Borrowing staff member
    pub staff_id: i64,
    /// Amount originally lent
    #[sea_orm(column_type = "Text")]
    pub principal: Money,
    /// Free-text reason given on the request
    pub reason: String,
    /// Agreed number of monthly installments
    pub repayment_term_months: i32,
    /// Fixed amount deducted from salary each month
    #[sea_orm(column_type = "Text")]
    pub monthly_deduction: Money,
    /// Amount still owed
    #[sea_orm(column_type = "Text")]
    pub outstanding_balance: Money,
    /// Number of repayments applied so far
    pub installments_paid: i32,
    /// Current lifecycle status
    pub status: LoanStatus,
    /// First payroll period eligible for deduction; creation date when absent
    pub start_date: Option<Date>,
    /// Paused loans are skipped by payroll regardless of dates
    pub is_paused: bool,
    /// When the loan was requested
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Loan and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each loan belongs to one staff member
    #[sea_orm(
        belongs_to = "super::staff::Entity",
        from = "Column::StaffId",
        to = "super::staff::Column::Id"
    )]
    Staff,
    /// One loan has many repayments
    #[sea_orm(has_many = "super::loan_repayment::Entity")]
    Repayments,
}

impl Related<super::staff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Staff.def()
    }
}

impl Related<super::loan_repayment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Date from which the loan may be deducted: the start date, else the creation date.
    #[must_use]
    pub fn effective_start_date(&self) -> Date {
        self.start_date.unwrap_or_else(|| self.created_at.date_naive())
    }
}
