//! Compensation business logic - Resolves the salary structure payroll should use.
//!
//! A staff member may have many structures over time but only one should be active.
//! Resolution tolerates more than one active row and deterministically picks the most
//! recently effective (ties broken by the most recently inserted). Creating a structure
//! retires the previous active ones in the same transaction.

use crate::{
    entities::{Compensation, compensation},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};

/// A named amount, used for ad-hoc allowances and deductions and for itemized pay lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayItem {
    /// Label shown on the payslip
    pub name: String,
    /// Monthly amount
    pub amount: Decimal,
}

impl PayItem {
    /// Creates a pay item.
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// A compensation structure with its JSON lists decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCompensation {
    /// Id of the underlying structure row
    pub id: i64,
    /// Staff member the structure belongs to
    pub staff_id: i64,
    /// Monthly basic salary
    pub basic: Decimal,
    /// Housing allowance
    pub housing: Decimal,
    /// Transport allowance
    pub transport: Decimal,
    /// Medical allowance
    pub medical: Decimal,
    /// Additional named allowances
    pub other_allowances: Vec<PayItem>,
    /// Income tax withheld
    pub tax: Decimal,
    /// Pension contribution withheld
    pub pension: Decimal,
    /// Additional named deductions
    pub other_deductions: Vec<PayItem>,
    /// First day the structure applies
    pub effective_date: NaiveDate,
}

impl TryFrom<compensation::Model> for ResolvedCompensation {
    type Error = Error;

    fn try_from(model: compensation::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            staff_id: model.staff_id,
            basic: model.basic.amount(),
            housing: model.housing.amount(),
            transport: model.transport.amount(),
            medical: model.medical.amount(),
            other_allowances: serde_json::from_str(&model.other_allowances)?,
            tax: model.tax.amount(),
            pension: model.pension.amount(),
            other_deductions: serde_json::from_str(&model.other_deductions)?,
            effective_date: model.effective_date,
        })
    }
}

/// Input for [`create_compensation_structure`].
#[derive(Debug, Clone, Default)]
pub struct NewCompensation {
    /// Monthly basic salary
    pub basic: Decimal,
    /// Housing allowance
    pub housing: Decimal,
    /// Transport allowance
    pub transport: Decimal,
    /// Medical allowance
    pub medical: Decimal,
    /// Additional named allowances
    pub other_allowances: Vec<PayItem>,
    /// Income tax withheld
    pub tax: Decimal,
    /// Pension contribution withheld
    pub pension: Decimal,
    /// Additional named deductions
    pub other_deductions: Vec<PayItem>,
    /// First day the structure applies
    pub effective_date: NaiveDate,
}

impl NewCompensation {
    fn validate(&self) -> Result<()> {
        let fixed = [
            self.basic,
            self.housing,
            self.transport,
            self.medical,
            self.tax,
            self.pension,
        ];
        let items = self.other_allowances.iter().chain(&self.other_deductions);

        for amount in fixed.into_iter().chain(items.clone().map(|item| item.amount)) {
            if amount < Decimal::ZERO {
                return Err(Error::InvalidAmount { amount });
            }
        }

        if items.clone().any(|item| item.name.trim().is_empty()) {
            return Err(Error::Validation {
                message: "Allowance and deduction names cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Returns the compensation structure payroll should use for a staff member.
///
/// `Ok(None)` means the staff member has no active structure and is skipped by payroll.
pub async fn get_active_compensation<C>(
    db: &C,
    staff_id: i64,
) -> Result<Option<ResolvedCompensation>>
where
    C: ConnectionTrait,
{
    Compensation::find()
        .filter(compensation::Column::StaffId.eq(staff_id))
        .filter(compensation::Column::IsActive.eq(true))
        .order_by_desc(compensation::Column::EffectiveDate)
        .order_by_desc(compensation::Column::Id)
        .one(db)
        .await?
        .map(ResolvedCompensation::try_from)
        .transpose()
}

/// Lists every structure a staff member ever had, most recently effective first.
pub async fn list_compensation_history(
    db: &DatabaseConnection,
    staff_id: i64,
) -> Result<Vec<compensation::Model>> {
    Compensation::find()
        .filter(compensation::Column::StaffId.eq(staff_id))
        .order_by_desc(compensation::Column::EffectiveDate)
        .order_by_desc(compensation::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records a new active structure and retires any previously active one.
///
/// Existing rows are never edited beyond their `is_active` flag, so snapshots generated
/// from them keep their meaning.
pub async fn create_compensation_structure(
    db: &DatabaseConnection,
    staff_id: i64,
    new_structure: NewCompensation,
) -> Result<compensation::Model> {
    new_structure.validate()?;

    let other_allowances = serde_json::to_string(&new_structure.other_allowances)?;
    let other_deductions = serde_json::to_string(&new_structure.other_deductions)?;

    let txn = db.begin().await?;

    crate::core::staff::get_staff_by_id(&txn, staff_id)
        .await?
        .ok_or(Error::NotFound {
            entity: "staff",
            id: staff_id,
        })?;

    Compensation::update_many()
        .col_expr(compensation::Column::IsActive, Expr::value(false))
        .filter(compensation::Column::StaffId.eq(staff_id))
        .filter(compensation::Column::IsActive.eq(true))
        .exec(&txn)
        .await?;

    let structure = compensation::ActiveModel {
        staff_id: Set(staff_id),
        basic: Set(new_structure.basic.into()),
        housing: Set(new_structure.housing.into()),
        transport: Set(new_structure.transport.into()),
        medical: Set(new_structure.medical.into()),
        other_allowances: Set(other_allowances),
        tax: Set(new_structure.tax.into()),
        pension: Set(new_structure.pension.into()),
        other_deductions: Set(other_deductions),
        effective_date: Set(new_structure.effective_date),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let result = structure.insert(&txn).await?;

    txn.commit().await?;

    Ok(result)
}
