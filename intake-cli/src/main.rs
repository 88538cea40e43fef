use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use intake_core::form::{FileKeyValueStore, FormController, FormError, FormState, Notice};
use intake_core::{ApplicationRecord, DayKey, FormField, GatewayError, Grade, IntakeClient};
use tracing_subscriber::EnvFilter;

const DEFAULT_SERVER: &str = "http://localhost:3001";
const DEFAULT_STATE_FILE: &str = ".intake-form.json";

/// Submit and review club membership applications
#[derive(Parser, Debug)]
#[command(name = "intake")]
#[command(about = "Submit and review club membership applications", long_about = None)]
struct Cli {
    /// Base URL of the intake server
    #[arg(long, global = true, env = "INTAKE_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// File remembering this applicant's submission between runs
    #[arg(long, global = true, env = "INTAKE_STATE_FILE", default_value = DEFAULT_STATE_FILE)]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit an application (once, unless withdrawn)
    Submit(SubmitArgs),
    /// Withdraw the submitted application so it can be edited and resubmitted
    Withdraw,
    /// Show whether an application has been submitted from here
    Status,
    /// Forget the locally remembered submission
    Reset,
    /// List stored applications
    List(ListArgs),
}

#[derive(Parser, Debug)]
struct SubmitArgs {
    /// Applicant's name
    #[arg(long)]
    name: String,

    /// Class year: 大一, 大二, 大三 or 大四
    #[arg(long)]
    grade: String,

    /// A short introduction
    #[arg(long)]
    introduction: String,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Only show applications from this day (YYYY-MM-DD)
    #[arg(long)]
    date: Option<DayKey>,

    /// Print the raw JSON records
    #[arg(long)]
    json: bool,
}

type Form = FormController<FileKeyValueStore, IntakeClient>;

fn open_form(cli: &Cli) -> Result<Form> {
    let store = FileKeyValueStore::open(&cli.state_file)
        .with_context(|| format!("Failed to open state file {}", cli.state_file.display()))?;
    let client = IntakeClient::new(cli.server.clone());
    FormController::load(store, client).context("Failed to restore form state")
}

/// Print the outcome of a form action. Rejections are user-facing, not crashes.
fn report(outcome: Result<Notice, FormError>) -> Result<ExitCode> {
    match outcome {
        Ok(notice) => {
            println!("{}", notice.content);
            Ok(ExitCode::SUCCESS)
        }
        Err(FormError::Rejected(notice)) => {
            eprintln!("{}", notice.content);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_submit(cli: &Cli, args: &SubmitArgs) -> Result<ExitCode> {
    let mut form = open_form(cli)?;

    if args.grade.parse::<Grade>().is_err() {
        tracing::warn!("Grade {:?} is not one of the usual class years", args.grade);
    }

    for (field, value) in [
        (FormField::Name, &args.name),
        (FormField::Grade, &args.grade),
        (FormField::Introduction, &args.introduction),
    ] {
        if let Err(FormError::Rejected(notice)) = form.set_field(field, value.as_str()) {
            eprintln!("{}", notice.content);
            return Ok(ExitCode::FAILURE);
        }
    }

    report(form.submit().await)
}

async fn run_withdraw(cli: &Cli) -> Result<ExitCode> {
    let mut form = open_form(cli)?;
    report(form.withdraw().await)
}

async fn run_reset(cli: &Cli) -> Result<ExitCode> {
    let mut form = open_form(cli)?;
    form.reset().await?;
    println!("Local form state cleared");
    Ok(ExitCode::SUCCESS)
}

fn run_status(cli: &Cli) -> Result<ExitCode> {
    let form = open_form(cli)?;
    for line in status_lines(&form) {
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}

fn status_lines(form: &Form) -> Vec<String> {
    let mut lines = Vec::new();
    match form.state() {
        FormState::Idle => lines.push("No application submitted".to_string()),
        FormState::Withdrawn => {
            lines.push("Application withdrawn; you may submit once more".to_string())
        }
        FormState::Submitted { .. } => {
            let when = form
                .submitted_at()
                .map(display_timestamp)
                .unwrap_or_else(|| "unknown time".to_string());
            lines.push(format!("Application submitted at {}", when));
            for field in FormField::ALL {
                lines.push(format!("  {}: {}", field, form.fields().get(field)));
            }
            if form.state().can_withdraw() {
                lines.push("You may withdraw it once with `intake withdraw`".to_string());
            } else {
                lines.push("The withdrawal has already been used".to_string());
            }
        }
    }
    lines
}

async fn run_list(cli: &Cli, args: &ListArgs) -> Result<ExitCode> {
    let client = IntakeClient::new(cli.server.clone());
    let result = match &args.date {
        Some(day) => client.list_day(day).await,
        None => client.list_all().await,
    };

    let records = match result {
        Ok(records) => records,
        Err(GatewayError::NotFound(day)) => {
            eprintln!("No applications stored for {}", day);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Failed to list applications"),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&records)
            .context("Failed to encode applications as JSON")?;
        println!("{}", json);
    } else if records.is_empty() {
        println!("No applications");
    } else {
        for record in &records {
            println!("{}", summary_line(record));
            println!("    {}", record.introduction);
        }
        println!("{} application(s)", records.len());
    }
    Ok(ExitCode::SUCCESS)
}

fn summary_line(record: &ApplicationRecord) -> String {
    format!(
        "{}  {}  {}",
        display_timestamp(&record.timestamp),
        record.name,
        record.grade
    )
}

/// Show a stored UTC timestamp in local time, or verbatim if it does not parse.
fn display_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(instant) => instant
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => timestamp.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Submit(args) => run_submit(&cli, args).await,
        Commands::Withdraw => run_withdraw(&cli).await,
        Commands::Status => run_status(&cli),
        Commands::Reset => run_reset(&cli).await,
        Commands::List(args) => run_list(&cli, args).await,
    }
}
