//! Staff entity - Represents an employee known to the HR system.
//!
//! Staff rows are maintained by HR administration. The payroll engine only reads them:
//! active staff are paid, externally paid staff are displayed but not paid.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Staff database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staff")]
pub struct Model {
    /// Unique identifier for the staff member
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Employee code printed on payslips (e.g., "EMP-0042")
    #[sea_orm(unique)]
    pub employee_code: String,
    /// Display name
    pub name: String,
    /// Job title
    pub designation: String,
    /// Department name
    pub department: String,
    /// Inactive staff are ignored by payroll
    pub is_active: bool,
    /// Salary is disbursed outside this system; shown for completeness only
    pub is_externally_paid: bool,
    /// When the staff record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Staff and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One staff member has many compensation structures over time
    #[sea_orm(has_many = "super::compensation::Entity")]
    Compensations,
    /// One staff member has many loans
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
}

impl Related<super::compensation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Compensations.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
