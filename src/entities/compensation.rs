//! Compensation entity - A staff member's salary structure from an effective date on.
//!
//! Structures are append-only: a raise creates a new active row and retires the old one,
//! so snapshots generated earlier keep their meaning. Ad-hoc allowance and deduction
//! lists are stored as JSON arrays of `{ "name", "amount" }` objects.

use super::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Compensation structure database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "compensation_structures")]
pub struct Model {
    /// Unique identifier for the structure
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Staff member this structure belongs to
    pub staff_id: i64,
    /// Monthly basic salary
    #[sea_orm(column_type = "Text")]
    pub basic: Money,
    /// Housing allowance
    #[sea_orm(column_type = "Text")]
    pub housing: Money,
    /// Transport allowance
    #[sea_orm(column_type = "Text")]
    pub transport: Money,
    /// Medical allowance
    #[sea_orm(column_type = "Text")]
    pub medical: Money,
    /// JSON-encoded list of additional named allowances
    #[sea_orm(column_type = "Text")]
    pub other_allowances: String,
    /// Income tax withheld per month
    #[sea_orm(column_type = "Text")]
    pub tax: Money,
    /// Pension contribution withheld per month
    #[sea_orm(column_type = "Text")]
    pub pension: Money,
    /// JSON-encoded list of additional named deductions
    #[sea_orm(column_type = "Text")]
    pub other_deductions: String,
    /// First day this structure applies
    pub effective_date: Date,
    /// Whether this is the structure payroll should use
    pub is_active: bool,
    /// When the structure was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Compensation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each structure belongs to one staff member
    #[sea_orm(
        belongs_to = "super::staff::Entity",
        from = "Column::StaffId",
        to = "super::staff::Column::Id"
    )]
    Staff,
}

impl Related<super::staff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Staff.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
