/// Database configuration and connection management
pub mod database;

/// Payroll settings loading from payroll.toml
pub mod payroll;
