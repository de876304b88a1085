//! Staff business logic - Lookups used by payroll plus minimal HR administration.
//!
//! Payroll only ever reads staff. The create/activate helpers exist so the engine's inputs
//! can be set up the same way everywhere (tests, CLI seeding).

use crate::{
    entities::{Staff, staff},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Input for [`create_staff`].
#[derive(Debug, Clone)]
pub struct NewStaff {
    /// Unique employee code
    pub employee_code: String,
    /// Display name
    pub name: String,
    /// Job title
    pub designation: String,
    /// Department name
    pub department: String,
    /// Whether the salary is paid outside this system
    pub is_externally_paid: bool,
}

/// Retrieves every active staff member, ordered by id so runs are reproducible.
pub async fn list_active_staff<C>(db: &C) -> Result<Vec<staff::Model>>
where
    C: ConnectionTrait,
{
    Staff::find()
        .filter(staff::Column::IsActive.eq(true))
        .order_by_asc(staff::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a staff member by id.
pub async fn get_staff_by_id<C>(db: &C, staff_id: i64) -> Result<Option<staff::Model>>
where
    C: ConnectionTrait,
{
    Staff::find_by_id(staff_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new active staff member after checking the required fields.
pub async fn create_staff<C>(db: &C, new_staff: NewStaff) -> Result<staff::Model>
where
    C: ConnectionTrait,
{
    let employee_code = new_staff.employee_code.trim().to_string();
    let name = new_staff.name.trim().to_string();

    if employee_code.is_empty() {
        return Err(Error::Validation {
            message: "Employee code cannot be empty".to_string(),
        });
    }
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Staff name cannot be empty".to_string(),
        });
    }

    let staff = staff::ActiveModel {
        employee_code: Set(employee_code),
        name: Set(name),
        designation: Set(new_staff.designation),
        department: Set(new_staff.department),
        is_active: Set(true),
        is_externally_paid: Set(new_staff.is_externally_paid),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(staff.insert(db).await?)
}

/// Activates or deactivates a staff member; inactive staff are left out of payroll.
pub async fn set_staff_active<C>(db: &C, staff_id: i64, is_active: bool) -> Result<staff::Model>
where
    C: ConnectionTrait,
{
    let staff = get_staff_by_id(db, staff_id)
        .await?
        .ok_or(Error::NotFound {
            entity: "staff",
            id: staff_id,
        })?;

    let mut active_model: staff::ActiveModel = staff.into();
    active_model.is_active = Set(is_active);
    Ok(active_model.update(db).await?)
}
