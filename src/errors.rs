//! Unified error type for the payroll engine.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants group into
//! validation failures (nothing was touched), conflicts (the period already has a
//! snapshot), missing records, concurrent modification, and storage failures. Anything
//! raised while a payroll run is persisting rolls the whole unit of work back.

use crate::entities::loan::LoanStatus;
use rust_decimal::Decimal;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Errors produced by the payroll engine and its administration helpers.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// The requested payroll period is malformed or outside the configured range
    #[error("Invalid payroll period {month}/{year}: {reason}")]
    InvalidPeriod {
        /// Requested month
        month: u32,
        /// Requested year
        year: i32,
        /// Why the period was rejected
        reason: String,
    },

    /// Input to an administration operation failed validation
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description of the problem
        message: String,
    },

    /// A monetary amount was zero, negative or otherwise unusable
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: Decimal,
    },

    /// A payroll snapshot already exists for the period
    #[error("Payroll for {period} has already been generated")]
    PayrollAlreadyGenerated {
        /// Period key in `YYYY-MM` form
        period: String,
    },

    /// A referenced record does not exist (or vanished mid-run)
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record, e.g. `"loan"`
        entity: &'static str,
        /// Primary key that was looked up
        id: i64,
    },

    /// A loan was modified by someone else between computation and commit
    #[error("Loan {loan_id} changed while payroll was being generated")]
    LoanChanged {
        /// The loan whose state no longer matches
        loan_id: i64,
    },

    /// A loan lifecycle action is not allowed from the loan's current status
    #[error("Cannot {action} loan {loan_id} in status {status}")]
    InvalidLoanTransition {
        /// The loan being changed
        loan_id: i64,
        /// Status the loan is currently in
        status: LoanStatus,
        /// The attempted action, e.g. `"approve"`
        action: &'static str,
    },

    /// Underlying storage failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Stored JSON payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether re-triggering the same operation may succeed.
    ///
    /// Failures that happen inside the persisting unit of work leave no partial state
    /// behind, so they can be retried as a whole.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::LoanChanged { .. } | Self::Database(_)
        )
    }

    /// Whether the error reports an already generated payroll period.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::PayrollAlreadyGenerated { .. })
    }

    /// Maps a failed snapshot insert to a conflict when the period's unique key was hit.
    pub(crate) fn from_schedule_insert(err: DbErr, period_key: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::PayrollAlreadyGenerated {
                period: period_key.to_string(),
            },
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type for the payroll engine.
pub type Result<T> = std::result::Result<T, Error>;
