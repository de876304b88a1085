//! Payroll period orchestration.
//!
//! Generates the payroll of one `(month, year)` period:
//!
//! 1. **Validating** - the period is well formed, within the configured years, and has no
//!    snapshot yet.
//! 2. **Computing** - every active staff member with an active compensation structure gets
//!    a pay line. Staff without a structure are skipped.
//! 3. **Persisting** - loan deductions are applied to the ledger and the snapshot row is
//!    inserted, all in one database transaction.
//! 4. **Done** - the snapshot id and totals are returned.
//!
//! Any failure moves the run to **Failed** and leaves no partial state behind: the ledger
//! updates and the snapshot are committed together or not at all. The snapshot's period
//! key is unique in storage, so of two concurrent runs for the same period only one can
//! commit; the other rolls back with [`Error::PayrollAlreadyGenerated`].

use crate::{
    config::payroll::PayrollSettings,
    core::{
        calculator::{PayLine, PayWarning, calculate_pay_line},
        compensation::get_active_compensation,
        ledger::{self, SALARY_DEDUCTION},
        loan::list_eligible_loans,
        period::PayrollPeriod,
        staff::list_active_staff,
    },
    entities::{PayrollSchedule, payroll_schedule},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::fmt;
use tracing::{error, info, instrument, warn};

/// Lifecycle of a payroll generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Run created, nothing checked yet
    NotStarted,
    /// Checking the period and the one-snapshot-per-period rule
    Validating,
    /// Computing pay lines
    Computing,
    /// Applying ledger updates and storing the snapshot
    Persisting,
    /// Snapshot committed
    Done,
    /// Run aborted; nothing was committed
    Failed,
}

impl RunState {
    /// Whether the run has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::NotStarted, Self::Validating)
            | (Self::Validating, Self::Computing)
            | (Self::Computing, Self::Persisting)
            | (Self::Persisting, Self::Done) => true,
            (current, Self::Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Validating => "VALIDATING",
            Self::Computing => "COMPUTING",
            Self::Persisting => "PERSISTING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

struct RunTracker {
    label: String,
    state: RunState,
}

impl RunTracker {
    fn new(month: u32, year: i32) -> Self {
        Self {
            label: format!("{year:04}-{month:02}"),
            state: RunState::NotStarted,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal payroll run transition {} -> {}",
            self.state,
            next
        );
        info!("Payroll {}: {} -> {}", self.label, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: &Error) {
        error!("Payroll {} failed during {}: {}", self.label, self.state, err);
        self.state = RunState::Failed;
    }
}

/// A warning raised for one staff member's line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffWarning {
    /// Staff member the line belongs to
    pub staff_id: i64,
    /// The warning itself
    pub warning: PayWarning,
}

/// Pay lines computed for a period, not yet persisted.
#[derive(Debug, Clone)]
pub struct ComputedPayroll {
    /// Period the lines were computed for
    pub period: PayrollPeriod,
    /// One line per active staff member with an active compensation structure
    pub lines: Vec<PayLine>,
    /// Active staff skipped for lack of an active compensation structure
    pub skipped_staff: Vec<i64>,
}

impl ComputedPayroll {
    /// Sum of net pay over lines included in the payable total.
    #[must_use]
    pub fn payable_total(&self) -> Decimal {
        self.lines
            .iter()
            .filter(|line| line.included)
            .map(|line| line.net_pay)
            .sum()
    }

    /// Number of lines included in the payable total.
    #[must_use]
    pub fn included_staff_count(&self) -> usize {
        self.lines.iter().filter(|line| line.included).count()
    }

    /// Every warning across all lines.
    #[must_use]
    pub fn warnings(&self) -> Vec<StaffWarning> {
        self.lines
            .iter()
            .flat_map(|line| {
                line.warnings.iter().map(|warning| StaffWarning {
                    staff_id: line.staff_id,
                    warning: warning.clone(),
                })
            })
            .collect()
    }
}

/// Result of a successful payroll run.
#[derive(Debug, Clone)]
pub struct PayrollOutcome {
    /// Id of the stored snapshot
    pub schedule_id: i64,
    /// Period generated
    pub period: PayrollPeriod,
    /// Lines counted in the payable total
    pub included_staff_count: usize,
    /// All lines, including display-only ones
    pub displayed_staff_count: usize,
    /// Active staff left out for lack of a compensation structure
    pub skipped_staff_count: usize,
    /// Sum of net pay over included lines
    pub payable_total: Decimal,
    /// Lines as stored in the snapshot
    pub lines: Vec<PayLine>,
    /// Warnings for operator review
    pub warnings: Vec<StaffWarning>,
}

/// A stored snapshot with its pay lines decoded.
#[derive(Debug, Clone)]
pub struct StoredPayroll {
    /// The snapshot row
    pub schedule: payroll_schedule::Model,
    /// Pay lines frozen at generation time
    pub lines: Vec<PayLine>,
}

/// Whether a snapshot exists for `period`.
pub async fn schedule_exists<C>(db: &C, period: PayrollPeriod) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = PayrollSchedule::find()
        .filter(payroll_schedule::Column::PeriodKey.eq(period.key()))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Validates a requested period against the settings and the existing snapshots.
pub async fn validate_period<C>(
    db: &C,
    settings: &PayrollSettings,
    month: u32,
    year: i32,
) -> Result<PayrollPeriod>
where
    C: ConnectionTrait,
{
    let period =
        PayrollPeriod::new(month, year)?.ensure_within(settings.min_year, settings.max_year)?;

    if schedule_exists(db, period).await? {
        return Err(Error::PayrollAlreadyGenerated {
            period: period.key(),
        });
    }

    Ok(period)
}

/// Computes the pay lines of every active staff member for `period`. Reads only.
pub async fn compute_payroll<C>(db: &C, period: PayrollPeriod) -> Result<ComputedPayroll>
where
    C: ConnectionTrait,
{
    let mut lines = Vec::new();
    let mut skipped_staff = Vec::new();

    for staff in list_active_staff(db).await? {
        let Some(compensation) = get_active_compensation(db, staff.id).await? else {
            warn!(
                "Skipping {} ({}): no active compensation structure",
                staff.name, staff.employee_code
            );
            skipped_staff.push(staff.id);
            continue;
        };

        let loans = if staff.is_externally_paid {
            Vec::new()
        } else {
            list_eligible_loans(db, staff.id, period).await?
        };

        let line = calculate_pay_line(&staff, &compensation, &loans);
        for warning in &line.warnings {
            warn!(
                "Pay line for {} ({}): {:?}",
                staff.name, staff.employee_code, warning
            );
        }
        lines.push(line);
    }

    Ok(ComputedPayroll {
        period,
        lines,
        skipped_staff,
    })
}

/// Inserts the snapshot row for a period.
///
/// Fails with [`Error::PayrollAlreadyGenerated`] when the period's unique key is taken.
pub async fn create_payroll_schedule<C>(
    db: &C,
    computed: &ComputedPayroll,
    operator: &str,
) -> Result<payroll_schedule::Model>
where
    C: ConnectionTrait,
{
    let period_key = computed.period.key();
    let included = i32::try_from(computed.included_staff_count()).map_err(|_| {
        Error::Validation {
            message: "Too many staff in one payroll".to_string(),
        }
    })?;

    let schedule = payroll_schedule::ActiveModel {
        month: Set(i32::try_from(computed.period.month()).unwrap_or_default()),
        year: Set(computed.period.year()),
        period_key: Set(period_key.clone()),
        generated_at: Set(chrono::Utc::now()),
        generated_by: Set(operator.to_string()),
        lines: Set(serde_json::to_string(&computed.lines)?),
        included_staff_count: Set(included),
        payable_total: Set(computed.payable_total().into()),
        ..Default::default()
    };

    schedule
        .insert(db)
        .await
        .map_err(|e| Error::from_schedule_insert(e, &period_key))
}

/// Applies every loan deduction of `computed` and stores its snapshot, atomically.
///
/// Either all ledger updates, repayment records and the snapshot are committed, or the
/// transaction is rolled back and nothing is.
pub async fn commit_payroll(
    db: &DatabaseConnection,
    computed: &ComputedPayroll,
    operator: &str,
) -> Result<payroll_schedule::Model> {
    let txn = db.begin().await?;
    let note = format!("Salary deduction for {}", computed.period);

    for line in computed.lines.iter().filter(|line| line.included) {
        for deduction in &line.loan_deductions {
            ledger::apply_posting(&txn, &deduction.posting(), SALARY_DEDUCTION, &note).await?;
        }
    }

    let schedule = create_payroll_schedule(&txn, computed, operator).await?;

    txn.commit()
        .await
        .map_err(|e| Error::from_schedule_insert(e, &schedule.period_key))?;

    Ok(schedule)
}

/// Generates and stores the payroll of one period.
///
/// `operator` is recorded on the snapshot; the configured default is used when `None`.
#[instrument(skip(db, settings))]
pub async fn generate_payroll(
    db: &DatabaseConnection,
    settings: &PayrollSettings,
    month: u32,
    year: i32,
    operator: Option<&str>,
) -> Result<PayrollOutcome> {
    let mut run = RunTracker::new(month, year);
    let result = run_phases(&mut run, db, settings, month, year, operator).await;
    if let Err(err) = &result {
        run.fail(err);
    }
    result
}

async fn run_phases(
    run: &mut RunTracker,
    db: &DatabaseConnection,
    settings: &PayrollSettings,
    month: u32,
    year: i32,
    operator: Option<&str>,
) -> Result<PayrollOutcome> {
    run.advance(RunState::Validating);
    let operator = operator
        .unwrap_or(&settings.default_operator)
        .trim()
        .to_string();
    if operator.is_empty() {
        return Err(Error::Validation {
            message: "Operator cannot be empty".to_string(),
        });
    }
    let period = validate_period(db, settings, month, year).await?;

    run.advance(RunState::Computing);
    let computed = compute_payroll(db, period).await?;

    run.advance(RunState::Persisting);
    let schedule = commit_payroll(db, &computed, &operator).await?;

    run.advance(RunState::Done);
    let outcome = PayrollOutcome {
        schedule_id: schedule.id,
        period,
        included_staff_count: computed.included_staff_count(),
        displayed_staff_count: computed.lines.len(),
        skipped_staff_count: computed.skipped_staff.len(),
        payable_total: computed.payable_total(),
        warnings: computed.warnings(),
        lines: computed.lines,
    };
    info!(
        "Payroll {} generated by {}: {} staff payable, total {}",
        period.key(),
        operator,
        outcome.included_staff_count,
        outcome.payable_total
    );

    Ok(outcome)
}

/// Loads the snapshot of a period, if it was generated.
pub async fn get_payroll_schedule(
    db: &DatabaseConnection,
    period: PayrollPeriod,
) -> Result<Option<StoredPayroll>> {
    let Some(schedule) = PayrollSchedule::find()
        .filter(payroll_schedule::Column::PeriodKey.eq(period.key()))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let lines = serde_json::from_str(&schedule.lines)?;
    Ok(Some(StoredPayroll { schedule, lines }))
}

/// Lists all generated snapshots, newest period first.
pub async fn list_payroll_schedules(
    db: &DatabaseConnection,
) -> Result<Vec<payroll_schedule::Model>> {
    PayrollSchedule::find()
        .order_by_desc(payroll_schedule::Column::Year)
        .order_by_desc(payroll_schedule::Column::Month)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::loan::{get_loan_by_id, list_repayments_for_loan, set_loan_paused};
    use crate::entities::{Loan, LoanRepayment, LoanStatus};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    fn settings() -> PayrollSettings {
        PayrollSettings::default()
    }

    #[test]
    fn test_run_state_transitions() {
        assert!(RunState::NotStarted.can_transition_to(RunState::Validating));
        assert!(RunState::Validating.can_transition_to(RunState::Computing));
        assert!(RunState::Computing.can_transition_to(RunState::Persisting));
        assert!(RunState::Persisting.can_transition_to(RunState::Done));
        assert!(RunState::Computing.can_transition_to(RunState::Failed));
        assert!(!RunState::Done.can_transition_to(RunState::Failed));
        assert!(!RunState::Failed.can_transition_to(RunState::Validating));
        assert!(!RunState::Validating.can_transition_to(RunState::Persisting));
    }

    #[tokio::test]
    async fn test_example_scenario() -> Result<()> {
        let db = setup_test_db().await?;

        let a = create_test_staff(&db, "EMP-A").await?;
        create_basic_compensation(&db, a.id, dec!(100000)).await?;
        let loan = create_approved_loan(
            &db,
            a.id,
            dec!(150000),
            dec!(60000),
            Some(date(2025, 3, 1)),
        )
        .await?;

        let b = create_external_staff(&db, "EMP-B").await?;
        create_basic_compensation(&db, b.id, dec!(200000)).await?;

        let outcome = generate_payroll(&db, &settings(), 3, 2025, Some("hr-admin")).await?;

        assert_eq!(outcome.included_staff_count, 1);
        assert_eq!(outcome.displayed_staff_count, 2);
        assert_eq!(outcome.payable_total, dec!(40000));

        let line_a = outcome.lines.iter().find(|l| l.staff_id == a.id).unwrap();
        assert_eq!(line_a.gross_pay, dec!(100000));
        assert_eq!(line_a.total_loan_deduction, dec!(60000));
        assert_eq!(line_a.net_pay, dec!(40000));

        let line_b = outcome.lines.iter().find(|l| l.staff_id == b.id).unwrap();
        assert_eq!(line_b.net_pay, dec!(200000));
        assert!(!line_b.included);

        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(90000));
        assert_eq!(stored.installments_paid, 1);
        assert_eq!(stored.status, LoanStatus::Approved);

        let repayments = list_repayments_for_loan(&db, loan.id).await?;
        assert_eq!(repayments.len(), 1);
        assert_eq!(repayments[0].method, SALARY_DEDUCTION);
        assert!(repayments[0].note.contains("March 2025"));

        // Second generation for the same period is a conflict and touches nothing.
        let again = generate_payroll(&db, &settings(), 3, 2025, Some("hr-admin")).await;
        assert!(matches!(again, Err(Error::PayrollAlreadyGenerated { .. })));

        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(90000));
        assert_eq!(stored.installments_paid, 1);
        assert_eq!(list_repayments_for_loan(&db, loan.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_is_stored_and_readable() -> Result<()> {
        let db = setup_test_db().await?;
        let staff = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, staff.id, dec!(2500.50)).await?;

        let outcome = generate_payroll(&db, &settings(), 1, 2025, None).await?;

        let period = PayrollPeriod::new(1, 2025)?;
        let stored = get_payroll_schedule(&db, period).await?.unwrap();
        assert_eq!(stored.schedule.id, outcome.schedule_id);
        assert_eq!(stored.schedule.period_key, "2025-01");
        assert_eq!(stored.schedule.generated_by, "system");
        assert_eq!(stored.schedule.included_staff_count, 1);
        assert_eq!(stored.schedule.payable_total, dec!(2500.50));
        assert_eq!(stored.lines, outcome.lines);

        let missing = get_payroll_schedule(&db, PayrollPeriod::new(2, 2025)?).await?;
        assert!(missing.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_period_has_no_side_effects() -> Result<()> {
        let db = setup_test_db().await?;
        let staff = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, staff.id, dec!(1000)).await?;
        let loan = create_approved_loan(&db, staff.id, dec!(500), dec!(100), None).await?;

        let bad_month = generate_payroll(&db, &settings(), 13, 2025, None).await;
        assert!(matches!(bad_month, Err(Error::InvalidPeriod { .. })));

        let bad_year = generate_payroll(&db, &settings(), 5, 1899, None).await;
        assert!(matches!(bad_year, Err(Error::InvalidPeriod { .. })));

        let blank_operator = generate_payroll(&db, &settings(), 5, 2025, Some("  ")).await;
        assert!(matches!(blank_operator, Err(Error::Validation { .. })));

        assert!(list_payroll_schedules(&db).await?.is_empty());
        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(500));

        Ok(())
    }

    #[tokio::test]
    async fn test_staff_without_structure_are_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        let paid = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, paid.id, dec!(1000)).await?;
        let unpaid = create_test_staff(&db, "EMP-2").await?;
        let loan = create_approved_loan(&db, unpaid.id, dec!(500), dec!(100), None).await?;

        let outcome = generate_payroll(&db, &settings(), 6, 2030, None).await?;

        assert_eq!(outcome.skipped_staff_count, 1);
        assert!(outcome.lines.iter().all(|l| l.staff_id != unpaid.id));
        assert_eq!(outcome.payable_total, dec!(1000));

        // The skipped staff member's loan was not touched.
        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(500));
        assert_eq!(stored.installments_paid, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_externally_paid_loans_untouched() -> Result<()> {
        let db = setup_test_db().await?;
        let external = create_external_staff(&db, "EMP-X").await?;
        create_basic_compensation(&db, external.id, dec!(5000)).await?;
        let loan = create_approved_loan(&db, external.id, dec!(500), dec!(100), None).await?;

        let outcome = generate_payroll(&db, &settings(), 6, 2030, None).await?;

        assert_eq!(outcome.payable_total, Decimal::ZERO);
        assert_eq!(outcome.included_staff_count, 0);
        assert!(outcome.lines[0].loan_deductions.is_empty());

        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(500));
        assert!(list_repayments_for_loan(&db, loan.id).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_loan_completes_over_consecutive_periods() -> Result<()> {
        let db = setup_test_db().await?;
        let staff = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, staff.id, dec!(1000)).await?;
        let loan =
            create_approved_loan(&db, staff.id, dec!(250), dec!(100), Some(date(2025, 1, 1)))
                .await?;

        let expected = [
            (1, dec!(150), LoanStatus::Approved, dec!(900)),
            (2, dec!(50), LoanStatus::Approved, dec!(900)),
            (3, Decimal::ZERO, LoanStatus::Completed, dec!(950)),
            (4, Decimal::ZERO, LoanStatus::Completed, dec!(1000)),
        ];

        for (month, balance, status, payable) in expected {
            let outcome = generate_payroll(&db, &settings(), month, 2025, None).await?;
            assert_eq!(outcome.payable_total, payable);

            let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
            assert!(stored.outstanding_balance >= Decimal::ZERO);
            assert_eq!(stored.outstanding_balance, balance);
            assert_eq!(stored.status, status);
            assert_eq!(
                stored.outstanding_balance.amount().is_zero(),
                stored.status == LoanStatus::Completed
            );
        }

        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.installments_paid, 3);
        assert_eq!(list_repayments_for_loan(&db, loan.id).await?.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_paused_loan_skipped_for_period() -> Result<()> {
        let db = setup_test_db().await?;
        let staff = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, staff.id, dec!(1000)).await?;
        let loan =
            create_approved_loan(&db, staff.id, dec!(500), dec!(100), Some(date(2025, 1, 1)))
                .await?;
        set_loan_paused(&db, loan.id, true).await?;

        let outcome = generate_payroll(&db, &settings(), 2, 2025, None).await?;
        assert_eq!(outcome.payable_total, dec!(1000));

        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(500));

        Ok(())
    }

    #[tokio::test]
    async fn test_negative_net_pay_surfaces_warning() -> Result<()> {
        let db = setup_test_db().await?;
        let staff = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, staff.id, dec!(50)).await?;
        create_approved_loan(&db, staff.id, dec!(500), dec!(80), Some(date(2025, 1, 1))).await?;

        let outcome = generate_payroll(&db, &settings(), 2, 2025, None).await?;

        assert_eq!(outcome.payable_total, dec!(-30));
        assert_eq!(
            outcome.warnings,
            vec![StaffWarning {
                staff_id: staff.id,
                warning: PayWarning::NegativeNetPay { net_pay: dec!(-30) },
            }]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_commit_rolls_back_ledger() -> Result<()> {
        let db = setup_test_db().await?;
        let staff = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, staff.id, dec!(1000)).await?;
        let loan =
            create_approved_loan(&db, staff.id, dec!(500), dec!(100), Some(date(2025, 1, 1)))
                .await?;

        let period = validate_period(&db, &settings(), 2, 2025).await?;
        let computed = compute_payroll(&db, period).await?;

        // Another run commits the same period between our validation and commit.
        let rival = compute_payroll(&db, period).await?;
        create_payroll_schedule(&db, &rival, "rival").await?;

        let result = commit_payroll(&db, &computed, "hr-admin").await;
        assert!(matches!(result, Err(Error::PayrollAlreadyGenerated { .. })));

        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(500));
        assert_eq!(stored.installments_paid, 0);
        assert_eq!(LoanRepayment::find().count(&db).await?, 0);

        let schedules = list_payroll_schedules(&db).await?;
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].generated_by, "rival");

        Ok(())
    }

    #[tokio::test]
    async fn test_vanished_loan_rolls_back_whole_run() -> Result<()> {
        let db = setup_test_db().await?;

        let first = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, first.id, dec!(1000)).await?;
        let kept =
            create_approved_loan(&db, first.id, dec!(500), dec!(100), Some(date(2025, 1, 1)))
                .await?;

        let second = create_test_staff(&db, "EMP-2").await?;
        create_basic_compensation(&db, second.id, dec!(1000)).await?;
        let doomed =
            create_approved_loan(&db, second.id, dec!(500), dec!(100), Some(date(2025, 1, 1)))
                .await?;

        let period = validate_period(&db, &settings(), 2, 2025).await?;
        let computed = compute_payroll(&db, period).await?;

        Loan::delete_by_id(doomed.id).exec(&db).await?;

        let result = commit_payroll(&db, &computed, "hr-admin").await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "loan", id } if id == doomed.id));
        assert!(err.is_retryable());

        // The first staff member's deduction was staged before the failure; it must be gone.
        let stored = get_loan_by_id(&db, kept.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(500));
        assert_eq!(stored.installments_paid, 0);
        assert_eq!(LoanRepayment::find().count(&db).await?, 0);
        assert!(!schedule_exists(&db, period).await?);

        // A re-triggered run now succeeds.
        let outcome = generate_payroll(&db, &settings(), 2, 2025, None).await?;
        assert_eq!(outcome.payable_total, dec!(1900));

        Ok(())
    }

    #[tokio::test]
    async fn test_loan_paused_mid_run_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let staff = create_test_staff(&db, "EMP-1").await?;
        create_basic_compensation(&db, staff.id, dec!(1000)).await?;
        let loan =
            create_approved_loan(&db, staff.id, dec!(500), dec!(100), Some(date(2025, 1, 1)))
                .await?;

        let period = validate_period(&db, &settings(), 2, 2025).await?;
        let computed = compute_payroll(&db, period).await?;

        set_loan_paused(&db, loan.id, true).await?;

        let err = commit_payroll(&db, &computed, "hr-admin").await.unwrap_err();
        assert!(matches!(err, Error::LoanChanged { loan_id } if loan_id == loan.id));
        assert!(err.is_retryable());

        let stored = get_loan_by_id(&db, loan.id).await?.unwrap();
        assert_eq!(stored.outstanding_balance, dec!(500));
        assert_eq!(stored.installments_paid, 0);
        assert_eq!(LoanRepayment::find().count(&db).await?, 0);
        assert!(!schedule_exists(&db, period).await?);

        // Re-running skips the paused loan.
        let outcome = generate_payroll(&db, &settings(), 2, 2025, None).await?;
        assert_eq!(outcome.payable_total, dec!(1000));

        Ok(())
    }

    #[tokio::test]
    async fn test_conservation_across_all_lines() -> Result<()> {
        let db = setup_test_db().await?;
        for (code, basic) in [("EMP-1", dec!(1000)), ("EMP-2", dec!(2750.75))] {
            let staff = create_test_staff(&db, code).await?;
            create_detailed_compensation(&db, staff.id, basic).await?;
            create_approved_loan(&db, staff.id, dec!(90), dec!(120), Some(date(2025, 1, 1)))
                .await?;
        }

        let outcome = generate_payroll(&db, &settings(), 2, 2025, None).await?;

        for line in &outcome.lines {
            let ad_hoc: Decimal = line
                .deductions
                .iter()
                .filter(|item| {
                    !["Tax", "Pension", crate::core::calculator::LOAN_REPAYMENT_ITEM]
                        .contains(&item.name.as_str())
                })
                .map(|item| item.amount)
                .sum();
            let tax = line.deductions[0].amount;
            let pension = line.deductions[1].amount;

            assert_eq!(line.net_pay, line.gross_pay - line.total_deductions);
            assert_eq!(
                line.total_deductions,
                tax + pension + line.total_loan_deduction + ad_hoc
            );
            for deduction in &line.loan_deductions {
                assert!(deduction.amount <= deduction.balance_before);
            }
        }

        let total: Decimal = outcome.lines.iter().map(|l| l.net_pay).sum();
        assert_eq!(outcome.payable_total, total);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_payroll_schedules_newest_first() -> Result<()> {
        let db = setup_test_db().await?;

        generate_payroll(&db, &settings(), 12, 2024, None).await?;
        generate_payroll(&db, &settings(), 2, 2025, None).await?;
        generate_payroll(&db, &settings(), 1, 2025, None).await?;

        let keys: Vec<String> = list_payroll_schedules(&db)
            .await?
            .into_iter()
            .map(|s| s.period_key)
            .collect();
        assert_eq!(keys, vec!["2025-02", "2025-01", "2024-12"]);

        Ok(())
    }
}
