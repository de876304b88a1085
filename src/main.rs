use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use hr_payroll::{
    config::{database, payroll::load_default_config},
    core::{
        payroll::{generate_payroll, get_payroll_schedule, list_payroll_schedules},
        period::PayrollPeriod,
        report::{format_amount, format_payroll_summary, format_stored_payroll},
    },
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Monthly payroll and staff loan ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and store the payroll of one period
    Generate {
        /// Month number, 1-12
        #[arg(long)]
        month: u32,
        /// Four-digit year
        #[arg(long)]
        year: i32,
        /// Operator recorded on the snapshot (defaults to the configured one)
        #[arg(long)]
        operator: Option<String>,
    },
    /// Show a stored payroll snapshot
    Show {
        /// Month number, 1-12
        #[arg(long)]
        month: u32,
        /// Four-digit year
        #[arg(long)]
        year: i32,
    },
    /// List stored payroll snapshots, newest first
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load payroll settings
    let config = load_default_config()
        .inspect_err(|e| error!("Failed to load payroll configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;
    info!("Database ready.");

    match cli.command {
        Command::Generate {
            month,
            year,
            operator,
        } => {
            let outcome =
                generate_payroll(&db, &config.payroll, month, year, operator.as_deref()).await?;
            print!("{}", format_payroll_summary(&outcome));
        }
        Command::Show { month, year } => {
            let period = PayrollPeriod::new(month, year)?;
            match get_payroll_schedule(&db, period).await? {
                Some(stored) => print!("{}", format_stored_payroll(&stored)),
                None => println!("No payroll generated for {period}"),
            }
        }
        Command::List => {
            let schedules = list_payroll_schedules(&db).await?;
            if schedules.is_empty() {
                println!("No payroll generated yet");
            }
            for schedule in schedules {
                println!(
                    "{} | #{} | {} staff | {} | by {}",
                    schedule.period_key,
                    schedule.id,
                    schedule.included_staff_count,
                    format_amount(schedule.payable_total.amount()),
                    schedule.generated_by
                );
            }
        }
    }

    Ok(())
}
