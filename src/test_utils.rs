//! Shared test utilities for the payroll engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating staff, compensation structures and loans with sensible defaults.

use crate::{
    core::{
        compensation::{self, NewCompensation, PayItem},
        loan::{self, LoanRequest},
        staff::{self, NewStaff},
    },
    entities::{self, Money},
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Shorthand for a calendar date. Panics on an invalid date.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Creates an active, internally paid staff member.
///
/// # Defaults
/// * `name`: "Staff {code}"
/// * `designation`: "Officer"
/// * `department`: "Operations"
pub async fn create_test_staff(
    db: &DatabaseConnection,
    code: &str,
) -> Result<entities::staff::Model> {
    staff::create_staff(
        db,
        NewStaff {
            employee_code: code.to_string(),
            name: format!("Staff {code}"),
            designation: "Officer".to_string(),
            department: "Operations".to_string(),
            is_externally_paid: false,
        },
    )
    .await
}

/// Creates an active staff member whose salary is paid outside the system.
pub async fn create_external_staff(
    db: &DatabaseConnection,
    code: &str,
) -> Result<entities::staff::Model> {
    staff::create_staff(
        db,
        NewStaff {
            employee_code: code.to_string(),
            name: format!("Contractor {code}"),
            designation: "Consultant".to_string(),
            department: "External".to_string(),
            is_externally_paid: true,
        },
    )
    .await
}

/// Creates a basic-only structure effective 2024-01-01, retiring any previous one.
pub async fn create_basic_compensation(
    db: &DatabaseConnection,
    staff_id: i64,
    basic: Decimal,
) -> Result<entities::compensation::Model> {
    compensation::create_compensation_structure(
        db,
        staff_id,
        NewCompensation {
            basic,
            effective_date: date(2024, 1, 1),
            ..Default::default()
        },
    )
    .await
}

/// Creates a structure with every component populated, derived from `basic`.
///
/// # Defaults
/// * housing 20%, transport 5%, medical 2% of basic, plus a 50.00 "Shift" allowance
/// * tax 10%, pension 8% of basic, plus a 12.50 "Union dues" deduction
pub async fn create_detailed_compensation(
    db: &DatabaseConnection,
    staff_id: i64,
    basic: Decimal,
) -> Result<entities::compensation::Model> {
    let pct = |p: i64| (basic * Decimal::new(p, 2)).round_dp(2);

    compensation::create_compensation_structure(
        db,
        staff_id,
        NewCompensation {
            basic,
            housing: pct(20),
            transport: pct(5),
            medical: pct(2),
            other_allowances: vec![PayItem::new("Shift", Decimal::new(5000, 2))],
            tax: pct(10),
            pension: pct(8),
            other_deductions: vec![PayItem::new("Union dues", Decimal::new(1250, 2))],
            effective_date: date(2024, 1, 1),
        },
    )
    .await
}

/// Inserts an active basic-only structure directly, without retiring other active rows.
pub async fn insert_raw_compensation(
    db: &DatabaseConnection,
    staff_id: i64,
    basic: Decimal,
    effective_date: NaiveDate,
) -> Result<entities::compensation::Model> {
    let structure = entities::compensation::ActiveModel {
        staff_id: Set(staff_id),
        basic: Set(basic.into()),
        housing: Set(Money::ZERO),
        transport: Set(Money::ZERO),
        medical: Set(Money::ZERO),
        other_allowances: Set("[]".to_string()),
        tax: Set(Money::ZERO),
        pension: Set(Money::ZERO),
        other_deductions: Set("[]".to_string()),
        effective_date: Set(effective_date),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(structure.insert(db).await?)
}

/// Requests and approves a loan in one step.
///
/// # Arguments
/// * `principal` - Amount borrowed (and initial outstanding balance)
/// * `monthly` - Fixed monthly deduction
/// * `start` - First deduction date; the creation date is used when `None`
pub async fn create_approved_loan(
    db: &DatabaseConnection,
    staff_id: i64,
    principal: Decimal,
    monthly: Decimal,
    start: Option<NaiveDate>,
) -> Result<entities::loan::Model> {
    let requested = loan::request_loan(
        db,
        staff_id,
        LoanRequest {
            principal,
            reason: "Test loan".to_string(),
            repayment_term_months: 12,
            monthly_deduction: Some(monthly),
        },
    )
    .await?;
    loan::approve_loan(db, requested.id, start).await
}
