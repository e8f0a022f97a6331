//! Output persistence: the SQL seed file and optional report exports.
//!
//! Supports the SQL file itself, a per-day CSV and a JSON dump of the reports.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::report::DailyReport;

pub const SQL_HEADER: &str = "-- Complete Daily Attendance Report\n-- Generated from attendance log\n\n";

/// One CSV row per day. The id sets are flattened to `;`-separated lists.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    date: &'a str,
    day_of_week: &'a str,
    is_weekend: bool,
    present_count: usize,
    absent_count: usize,
    total_employees: usize,
    present_employees: String,
    absent_employees: String,
}

impl<'a> From<&'a DailyReport> for ReportRow<'a> {
    fn from(report: &'a DailyReport) -> Self {
        let join = |ids: &BTreeSet<String>| {
            ids.iter().map(String::as_str).collect::<Vec<_>>().join(";")
        };

        ReportRow {
            date: &report.date,
            day_of_week: &report.day_of_week,
            is_weekend: report.is_weekend,
            present_count: report.present_count,
            absent_count: report.absent_count,
            total_employees: report.total_employees,
            present_employees: join(&report.present_employees),
            absent_employees: join(&report.absent_employees),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Writes the two header comment lines followed by `sql` to `path`.
pub fn write_sql_file(path: &Path, sql: &str) -> Result<()> {
    ensure_parent(path)?;
    let content = format!("{SQL_HEADER}{sql}");
    fs::write(path, content)
        .with_context(|| format!("Failed to write SQL file: {}", path.display()))?;

    info!(path = %path.display(), bytes = SQL_HEADER.len() + sql.len(), "SQL file generated");
    Ok(())
}

/// Writes every report as a row of a fresh CSV file at `path`.
pub fn write_report_csv(path: &Path, reports: &BTreeMap<String, DailyReport>) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create report CSV: {}", path.display()))?;
    debug!(path = %path.display(), rows = reports.len(), "Writing report CSV");

    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    for report in reports.values() {
        writer.serialize(ReportRow::from(report))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = reports.len(), "Report CSV written");
    Ok(())
}

/// Writes `value` as pretty-printed JSON to `path`.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    ensure_parent(path)?;
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("Failed to write JSON: {}", path.display()))?;

    info!(path = %path.display(), "Report JSON written");
    Ok(())
}
