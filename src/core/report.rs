//! Plain-text summaries of payroll runs.
//!
//! Formatting only: callers hand in an outcome or a stored snapshot and get a string back
//! suitable for a terminal or a log line.

use crate::core::{
    calculator::{PayLine, PayWarning},
    payroll::{PayrollOutcome, StoredPayroll},
};
use rust_decimal::Decimal;
use std::fmt::Write;

/// Formats an amount with two decimals and thousands separators, e.g. `-1,234.50`.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

/// One summary row for a pay line.
#[must_use]
pub fn format_pay_line(line: &PayLine) -> String {
    let marker = if line.included { "" } else { " [external]" };
    format!(
        "{} {} ({}) | gross {} | deductions {} (loans {}) | net {}{}",
        line.employee_code,
        line.name,
        line.department,
        format_amount(line.gross_pay),
        format_amount(line.total_deductions),
        format_amount(line.total_loan_deduction),
        format_amount(line.net_pay),
        marker
    )
}

fn write_lines(summary: &mut String, lines: &[PayLine]) {
    for line in lines {
        // Writing to a String cannot fail.
        let _ = writeln!(summary, "  {}", format_pay_line(line));
        for warning in &line.warnings {
            match warning {
                PayWarning::NegativeNetPay { net_pay } => {
                    let _ = writeln!(
                        summary,
                        "    ! negative net pay {} needs review",
                        format_amount(*net_pay)
                    );
                }
            }
        }
    }
}

/// Summarizes a freshly generated payroll.
#[must_use]
pub fn format_payroll_summary(outcome: &PayrollOutcome) -> String {
    let mut summary = format!(
        "Payroll - {} - Schedule #{}\n",
        outcome.period, outcome.schedule_id
    );

    let _ = writeln!(
        summary,
        "  Payable: {} staff | Displayed: {} | Skipped: {} | Total: {}",
        outcome.included_staff_count,
        outcome.displayed_staff_count,
        outcome.skipped_staff_count,
        format_amount(outcome.payable_total)
    );
    if !outcome.warnings.is_empty() {
        let _ = writeln!(summary, "  Warnings: {}", outcome.warnings.len());
    }
    summary.push('\n');

    write_lines(&mut summary, &outcome.lines);
    summary
}

/// Summarizes a stored snapshot.
#[must_use]
pub fn format_stored_payroll(stored: &StoredPayroll) -> String {
    let schedule = &stored.schedule;
    let mut summary = format!(
        "Payroll {} - Schedule #{} - generated {} by {}\n",
        schedule.period_key,
        schedule.id,
        schedule.generated_at.format("%Y-%m-%d %H:%M UTC"),
        schedule.generated_by
    );

    let _ = writeln!(
        summary,
        "  Payable: {} staff | Total: {}\n",
        schedule.included_staff_count,
        format_amount(schedule.payable_total.amount())
    );

    write_lines(&mut summary, &stored.lines);
    summary
}
