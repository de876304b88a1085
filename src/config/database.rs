//! Database configuration module for the payroll engine.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema, including the unique payroll period key, always matches the Rust structs.

use crate::entities::{Compensation, Loan, LoanRepayment, PayrollSchedule, Staff};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/hr_payroll.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file when no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all payroll tables that do not exist yet.
///
/// Creation order follows the foreign keys: staff, compensation structures, loans,
/// loan repayments, then payroll schedules.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut staff_table = schema.create_table_from_entity(Staff);
    let mut compensation_table = schema.create_table_from_entity(Compensation);
    let mut loan_table = schema.create_table_from_entity(Loan);
    let mut repayment_table = schema.create_table_from_entity(LoanRepayment);
    let mut schedule_table = schema.create_table_from_entity(PayrollSchedule);

    for table in [
        staff_table.if_not_exists(),
        compensation_table.if_not_exists(),
        loan_table.if_not_exists(),
        repayment_table.if_not_exists(),
        schedule_table.if_not_exists(),
    ] {
        db.execute(builder.build(&*table)).await?;
    }

    info!("Payroll tables ensured.");
    Ok(())
}
