//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the payroll tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod compensation;
pub mod loan;
pub mod loan_repayment;
pub mod money;
pub mod payroll_schedule;
pub mod staff;

// Re-export specific types to avoid conflicts
pub use compensation::{
    Column as CompensationColumn, Entity as Compensation, Model as CompensationModel,
};
pub use loan::{Column as LoanColumn, Entity as Loan, LoanStatus, Model as LoanModel};
pub use loan_repayment::{
    Column as LoanRepaymentColumn, Entity as LoanRepayment, Model as LoanRepaymentModel,
};
pub use money::Money;
pub use payroll_schedule::{
    Column as PayrollScheduleColumn, Entity as PayrollSchedule, Model as PayrollScheduleModel,
};
pub use staff::{Column as StaffColumn, Entity as Staff, Model as StaffModel};
