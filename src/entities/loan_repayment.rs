//! Loan repayment entity - Append-only ledger of money applied against a loan.
//!
//! Payroll writes one row per loan per generated period with method `SALARY_DEDUCTION`;
//! manual repayments use whatever method the operator records. Rows are never updated.
use super::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loan repayment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan_repayments")]
pub struct Model {
    /// Unique identifier for the repayment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Loan the repayment was applied to
    pub loan_id: i64,
    /// Amount repaid
    #[sea_orm(column_type = "Text")]
    pub amount: Money,
    /// How the money was collected, e.g. `"SALARY_DEDUCTION"` or `"CASH"`
    pub method: String,
    /// Free-text note, payroll notes reference the period
    pub note: String,
    /// When the repayment was recorded
    pub paid_at: DateTimeUtc,
}

/// Defines relationships between `LoanRepayment` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each repayment belongs to one loan
    #[sea_orm(
        belongs_to = "super::loan::Entity",
        from = "Column::LoanId",
        to = "super::loan::Column::Id"
    )]
    Loan,
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
