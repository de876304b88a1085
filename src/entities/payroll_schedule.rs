//! Payroll schedule entity - The immutable snapshot of one generated payroll period.
//!
//! `period_key` (`YYYY-MM`) is unique at the storage level, which is what stops two runs
//! for the same month from both committing.

use super::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payroll schedule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payroll_schedules")]
pub struct Model {
    /// Unique identifier for the snapshot
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Payroll month (1-12)
    pub month: i32,
    /// Payroll year
    pub year: i32,
    /// `YYYY-MM`, unique per snapshot
    #[sea_orm(unique)]
    pub period_key: String,
    /// When the payroll was generated
    pub generated_at: DateTimeUtc,
    /// Operator who triggered the run
    pub generated_by: String,
    /// JSON-encoded list of pay lines
    #[sea_orm(column_type = "Text")]
    pub lines: String,
    /// Number of lines counted in the payable total
    pub included_staff_count: i32,
    /// Sum of net pay over included lines
    #[sea_orm(column_type = "Text")]
    pub payable_total: Money,
}

/// `PayrollSchedule` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
