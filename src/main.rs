//! CLI entry point for the attendance log seeder.
//!
//! Reads a tab-delimited clock log, reports day-by-day attendance and writes
//! an idempotent SQL seed for the `employees` and `attendance` tables.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use alog_seeder::{
    config::SeedConfig,
    output::{write_json, write_report_csv, write_sql_file},
    parser::{ParsedLog, parse_log},
    report::{DailyReport, build_reports},
    sql::emit,
    stats::RunSummary,
};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "alog_seeder")]
#[command(about = "Turn an attendance log into a daily report and SQL seed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build daily reports and write the SQL seed file
    Generate {
        #[command(flatten)]
        common: CommonArgs,

        /// SQL file to write
        #[arg(short, long, env = "ALOG_OUTPUT", default_value = "complete_daily_attendance.sql")]
        output: PathBuf,
    },
    /// Build daily reports only, without SQL
    Report {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Tab-delimited attendance log
    #[arg(value_name = "LOG_FILE", env = "ALOG_INPUT")]
    input: PathBuf,

    /// JSON file with seed parameters (branch, salary, override range, ...)
    #[arg(short = 'c', long, env = "ALOG_SEED_CONFIG")]
    seed_config: Option<String>,

    /// Optional: write the daily reports as CSV
    #[arg(long)]
    report_csv: Option<PathBuf>,

    /// Optional: write the daily reports as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/alog_seeder.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("alog_seeder.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { common, output } => {
            let seed = load_seed(common.seed_config.as_deref())?;
            let (log, reports) = analyze(&common, &seed)?;

            let sql = emit(&reports, &log.roster, &seed);
            write_sql_file(&output, &sql)?;

            log_summary(&log, &reports);
        }
        Commands::Report { common } => {
            let seed = load_seed(common.seed_config.as_deref())?;
            let (log, reports) = analyze(&common, &seed)?;

            log_summary(&log, &reports);
        }
    }

    Ok(())
}

fn load_seed(path: Option<&str>) -> Result<SeedConfig> {
    match path {
        Some(path) => {
            let seed = SeedConfig::load(path)?;
            info!(path, branch = %seed.branch, "Seed config loaded");
            Ok(seed)
        }
        None => Ok(SeedConfig::default()),
    }
}

/// Parses the log, builds the daily reports and writes any requested exports.
#[tracing::instrument(skip_all, fields(input = %common.input.display(), scope = ?seed.roster_scope))]
fn analyze(
    common: &CommonArgs,
    seed: &SeedConfig,
) -> Result<(ParsedLog, BTreeMap<String, DailyReport>)> {
    let log = parse_log(&common.input)?;

    info!(count = log.roster.len(), "Found employees");
    for (id, name) in log.roster.iter() {
        info!("  {}: {}", id, name);
    }

    let reports = build_reports(&log.presence, &log.roster, seed.roster_scope);

    if let Some(path) = &common.report_csv {
        write_report_csv(path, &reports)?;
    }
    if let Some(path) = &common.report_json {
        write_json(path, &reports)?;
    }

    Ok((log, reports))
}

fn log_summary(log: &ParsedLog, reports: &BTreeMap<String, DailyReport>) {
    let summary = RunSummary::from_reports(reports, log.roster.len());

    info!(
        rows = log.stats.rows,
        skipped = log.stats.skipped,
        duty_on = log.stats.duty_on,
        "Rows processed"
    );
    info!(
        total_days = summary.total_days,
        total_employees = summary.total_employees,
        overall = %summary.percentage_display(),
        "Summary: {} days with data, {} employees, overall attendance {}",
        summary.total_days,
        summary.total_employees,
        summary.percentage_display()
    );
}
