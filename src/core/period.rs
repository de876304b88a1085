//! Payroll period value type.

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A `(month, year)` pair identifying one payroll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PayrollPeriod {
    year: i32,
    month: u32,
}

impl PayrollPeriod {
    /// Creates a period, rejecting months outside 1-12 and years chrono cannot represent.
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidPeriod {
                month,
                year,
                reason: "month must be between 1 and 12".to_string(),
            });
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(Error::InvalidPeriod {
                month,
                year,
                reason: "year is not a representable calendar year".to_string(),
            });
        }
        Ok(Self { year, month })
    }

    /// Ensures the year lies inside the inclusive `[min_year, max_year]` range.
    pub fn ensure_within(self, min_year: i32, max_year: i32) -> Result<Self> {
        if self.year < min_year || self.year > max_year {
            return Err(Error::InvalidPeriod {
                month: self.month,
                year: self.year,
                reason: format!("year must be between {min_year} and {max_year}"),
            });
        }
        Ok(self)
    }

    /// Month number, 1-12.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// First calendar day of the period; loans starting on or before it are due.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        // Validated in `new`.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Storage key, `YYYY-MM`.
    #[must_use]
    pub fn key(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for PayrollPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first_day().format("%B %Y"))
    }
}
