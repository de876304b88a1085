//! Pay-line arithmetic.
//!
//! Pure and deterministic: no I/O, no clock. The same structure and loans always produce
//! the same line, which is what gets frozen into the payroll snapshot.
//!
//! ```text
//! gross      = basic + housing + transport + medical + sum(other allowances)
//! loan_i     = min(monthly_deduction_i, outstanding_balance_i)
//! deductions = tax + pension + sum(loan_i) + sum(other deductions)
//! net        = gross - deductions
//! ```
//!
//! Net pay is not clamped. A negative result is kept and flagged with
//! [`PayWarning::NegativeNetPay`] for operator review.

use crate::{
    core::{
        compensation::{PayItem, ResolvedCompensation},
        ledger::LedgerPosting,
    },
    entities::{loan, staff},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label of the aggregated loan item in a line's itemized deductions.
pub const LOAN_REPAYMENT_ITEM: &str = "Loan repayment";

/// Non-fatal finding attached to a pay line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayWarning {
    /// Deductions exceed gross pay
    NegativeNetPay {
        /// The computed (negative) net pay
        net_pay: Decimal,
    },
}

/// One loan's contribution to a pay line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDeduction {
    /// Loan being repaid
    pub loan_id: i64,
    /// Amount deducted this period
    pub amount: Decimal,
    /// Outstanding balance before the deduction
    pub balance_before: Decimal,
    /// Installments paid before the deduction
    pub installments_before: i32,
}

impl LoanDeduction {
    /// The ledger posting that applies this deduction.
    #[must_use]
    pub fn posting(&self) -> LedgerPosting {
        LedgerPosting {
            loan_id: self.loan_id,
            balance_before: self.balance_before,
            installments_before: self.installments_before,
            amount: self.amount,
        }
    }
}

/// A computed pay line for one staff member in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayLine {
    /// Staff member paid
    pub staff_id: i64,
    /// Employee code
    pub employee_code: String,
    /// Display name
    pub name: String,
    /// Job title
    pub designation: String,
    /// Department
    pub department: String,
    /// Compensation structure the line was computed from
    pub compensation_id: i64,
    /// Basic salary
    pub basic: Decimal,
    /// Itemized allowances (fixed ones first, then ad-hoc)
    pub allowances: Vec<PayItem>,
    /// Basic plus all allowances
    pub gross_pay: Decimal,
    /// Itemized deductions, including the aggregated loan repayment
    pub deductions: Vec<PayItem>,
    /// Per-loan breakdown of the loan repayment
    pub loan_deductions: Vec<LoanDeduction>,
    /// Sum of all loan deductions
    pub total_loan_deduction: Decimal,
    /// Sum of all deductions
    pub total_deductions: Decimal,
    /// Gross pay minus total deductions
    pub net_pay: Decimal,
    /// Salary paid outside this system; shown for display only
    pub externally_paid: bool,
    /// Whether net pay counts towards the payable total
    pub included: bool,
    /// Computation warnings for operator review
    pub warnings: Vec<PayWarning>,
}

/// Computes the pay line for a staff member.
///
/// Externally paid staff get a display-only line: the same salary math, no loan
/// deductions, and excluded from the payable total.
#[must_use]
pub fn calculate_pay_line(
    staff: &staff::Model,
    compensation: &ResolvedCompensation,
    eligible_loans: &[loan::Model],
) -> PayLine {
    let mut allowances = vec![
        PayItem::new("Housing", compensation.housing),
        PayItem::new("Transport", compensation.transport),
        PayItem::new("Medical", compensation.medical),
    ];
    allowances.extend(compensation.other_allowances.iter().cloned());
    let gross_pay = compensation.basic + sum_items(&allowances);

    let loan_deductions: Vec<LoanDeduction> = if staff.is_externally_paid {
        Vec::new()
    } else {
        eligible_loans.iter().filter_map(loan_deduction).collect()
    };
    let total_loan_deduction: Decimal = loan_deductions.iter().map(|d| d.amount).sum();

    let mut deductions = vec![
        PayItem::new("Tax", compensation.tax),
        PayItem::new("Pension", compensation.pension),
    ];
    deductions.extend(compensation.other_deductions.iter().cloned());
    if total_loan_deduction > Decimal::ZERO {
        deductions.push(PayItem::new(LOAN_REPAYMENT_ITEM, total_loan_deduction));
    }

    let total_deductions = compensation.tax
        + compensation.pension
        + total_loan_deduction
        + sum_items(&compensation.other_deductions);
    let net_pay = gross_pay - total_deductions;

    let mut warnings = Vec::new();
    if net_pay < Decimal::ZERO {
        warnings.push(PayWarning::NegativeNetPay { net_pay });
    }

    PayLine {
        staff_id: staff.id,
        employee_code: staff.employee_code.clone(),
        name: staff.name.clone(),
        designation: staff.designation.clone(),
        department: staff.department.clone(),
        compensation_id: compensation.id,
        basic: compensation.basic,
        allowances,
        gross_pay,
        deductions,
        loan_deductions,
        total_loan_deduction,
        total_deductions,
        net_pay,
        externally_paid: staff.is_externally_paid,
        included: !staff.is_externally_paid,
        warnings,
    }
}

fn loan_deduction(loan: &loan::Model) -> Option<LoanDeduction> {
    let balance = loan.outstanding_balance.amount();
    let amount = loan.monthly_deduction.amount().min(balance);
    (amount > Decimal::ZERO).then(|| LoanDeduction {
        loan_id: loan.id,
        amount,
        balance_before: balance,
        installments_before: loan.installments_paid,
    })
}

fn sum_items(items: &[PayItem]) -> Decimal {
    items.iter().map(|item| item.amount).sum()
}
