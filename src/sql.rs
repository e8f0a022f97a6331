//! SQL seed generation for the `employees` and `attendance` tables.
//!
//! Every statement is re-runnable: employees are inserted with
//! `ON CONFLICT (card_no) DO NOTHING` and every attendance insert is guarded
//! by a `NOT EXISTS` check on `(employee_id, attendance_date)`.
//!
//! Values are interpolated as text. [`sql_literal`] doubles single quotes but
//! that is the only escaping done; the output is meant to be reviewed and run
//! by an operator, not fed untrusted input.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{OverrideRange, SeedConfig};
use crate::parser::EmployeeRoster;
use crate::report::{DailyReport, RosterScope};

/// Values of `attendance.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    WeekOff,
}

impl AttendanceStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::WeekOff => "week_off",
        }
    }
}

/// Quotes `value` as a SQL string literal.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn date_literal(date: &str) -> String {
    format!("{}::date", sql_literal(date))
}

fn id_list<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
    ids.into_iter()
        .map(|id| sql_literal(id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extra `WHERE` condition limiting a day's rows to the employees its report
/// counted. Empty under the final roster, where every branch employee counts.
fn scope_filter(report: &DailyReport, scope: RosterScope) -> String {
    match scope {
        RosterScope::Final => String::new(),
        RosterScope::Snapshot => {
            let mut expected: Vec<&String> = report
                .present_employees
                .iter()
                .chain(report.absent_employees.iter())
                .collect();
            expected.sort();
            if expected.is_empty() {
                "\n  AND FALSE".to_string()
            } else {
                format!("\n  AND e.card_no IN ({})", id_list(expected))
            }
        }
    }
}

/// Renders the whole seed: employees, the override range (if any), then one
/// attendance block per report date in ascending order.
#[tracing::instrument(skip_all, fields(days = reports.len(), employees = roster.len()))]
pub fn emit(
    reports: &BTreeMap<String, DailyReport>,
    roster: &EmployeeRoster,
    seed: &SeedConfig,
) -> String {
    let mut sql = String::new();

    if !roster.is_empty() {
        sql.push_str(&employees_block(roster, seed));
    }

    if let Some(range) = &seed.override_range {
        sql.push_str(&override_block(range, seed));
    }

    for (date, report) in reports {
        let block = if report.is_weekend {
            weekend_block(report, seed)
        } else {
            day_block(report, seed)
        };
        debug!(date = %date, weekend = report.is_weekend, "Attendance block emitted");
        sql.push_str(&block);
    }

    sql
}

fn employees_block(roster: &EmployeeRoster, seed: &SeedConfig) -> String {
    let rows: Vec<String> = roster
        .iter()
        .map(|(id, name)| {
            format!(
                "  ({}, {}, {}, {}, {}, true, NOW(), NOW())",
                sql_literal(id),
                sql_literal(&seed.emp_code(id)),
                sql_literal(name),
                sql_literal(&seed.branch),
                seed.default_salary
            )
        })
        .collect();

    format!(
        "-- Insert all employees from log
INSERT INTO employees (card_no, emp_code, employee_name, branch, salary, is_active, created_at, updated_at)
VALUES
{}
ON CONFLICT (card_no) DO NOTHING;

",
        rows.join(",\n")
    )
}

fn override_block(range: &OverrideRange, seed: &SeedConfig) -> String {
    let days = (range.end - range.start).num_days() + 1;

    format!(
        "-- {start} to {end}: Mark ALL employees as {status} ({days} days)
WITH branch_employees AS (
  SELECT id, card_no FROM employees WHERE branch = {branch}
),
override_dates AS (
  SELECT generate_series({start_lit}, {end_lit}, '1 day'::interval)::date AS attendance_date
)
INSERT INTO attendance (employee_id, attendance_date, status, marked_at, marked_by, created_at)
SELECT
  be.id,
  od.attendance_date,
  {status_lit},
  NOW(),
  {marked_by},
  NOW()
FROM branch_employees be
CROSS JOIN override_dates od
WHERE NOT EXISTS (
  SELECT 1 FROM attendance a
  WHERE a.employee_id = be.id AND a.attendance_date = od.attendance_date
);

",
        start = range.start,
        end = range.end,
        status = range.status.db_value(),
        branch = sql_literal(&seed.branch),
        start_lit = iso_date_literal(range.start),
        end_lit = iso_date_literal(range.end),
        status_lit = sql_literal(range.status.db_value()),
        marked_by = sql_literal(&seed.marked_by),
    )
}

fn iso_date_literal(date: NaiveDate) -> String {
    date_literal(&date.format("%Y-%m-%d").to_string())
}

fn weekend_block(report: &DailyReport, seed: &SeedConfig) -> String {
    let header = format!("-- {} ({}) - Weekend", report.date, report.day_of_week);
    let status = sql_literal(AttendanceStatus::WeekOff.db_value());
    attendance_insert(&header, report, &status, seed)
}

fn day_block(report: &DailyReport, seed: &SeedConfig) -> String {
    let header = format!(
        "-- {} ({}) - {} Present, {} Absent",
        report.date, report.day_of_week, report.present_count, report.absent_count
    );

    let absent = sql_literal(AttendanceStatus::Absent.db_value());
    let status = if report.present_employees.is_empty() {
        absent
    } else {
        format!(
            "CASE
    WHEN e.card_no IN ({}) THEN {}
    ELSE {}
  END",
            id_list(&report.present_employees),
            sql_literal(AttendanceStatus::Present.db_value()),
            absent
        )
    };

    attendance_insert(&header, report, &status, seed)
}

/// One attendance row per branch employee for the report's date, skipped
/// where a row already exists.
fn attendance_insert(header: &str, report: &DailyReport, status: &str, seed: &SeedConfig) -> String {
    let date = date_literal(&report.date);
    let scope = scope_filter(report, seed.roster_scope);

    format!(
        "{header}
INSERT INTO attendance (employee_id, attendance_date, status, marked_at, marked_by, created_at)
SELECT
  e.id,
  {date},
  {status},
  NOW(),
  {marked_by},
  NOW()
FROM employees e
WHERE e.branch = {branch}{scope}
  AND NOT EXISTS (
    SELECT 1 FROM attendance a
    WHERE a.employee_id = e.id AND a.attendance_date = {date}
  );

",
        marked_by = sql_literal(&seed.marked_by),
        branch = sql_literal(&seed.branch),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{RosterScope, build_reports};
    use std::collections::BTreeSet;

    fn roster() -> EmployeeRoster {
        let mut roster = EmployeeRoster::default();
        roster.record("007", "Jane Doe", Some("2025-10-04"));
        roster.record("008", "John Roe", Some("2025-10-04"));
        roster
    }

    fn reports(roster: &EmployeeRoster) -> BTreeMap<String, DailyReport> {
        let presence = [
            ("2025-10-04", vec!["007"]),
            ("2025-10-06", vec!["007"]),
            ("N/A", vec!["008"]),
        ]
        .into_iter()
        .map(|(date, ids)| {
            (
                date.to_string(),
                ids.into_iter().map(String::from).collect::<BTreeSet<_>>(),
            )
        })
        .collect();
        build_reports(&presence, roster, RosterScope::Final)
    }

    /// Splits the output into blocks on the blank line each block ends with.
    fn blocks(sql: &str) -> Vec<&str> {
        sql.split("\n\n").filter(|b| !b.trim().is_empty()).collect()
    }

    #[test]
    fn test_every_insert_is_guarded() {
        let roster = roster();
        let sql = emit(&reports(&roster), &roster, &SeedConfig::default());

        let blocks = blocks(&sql);
        assert_eq!(blocks.len(), 5);
        for block in blocks {
            assert!(block.contains("INSERT INTO"));
            assert!(
                block.contains("ON CONFLICT (card_no) DO NOTHING")
                    || block.contains("WHERE NOT EXISTS")
                    || block.contains("AND NOT EXISTS"),
                "unguarded block: {block}"
            );
        }
    }

    #[test]
    fn test_block_order() {
        let roster = roster();
        let sql = emit(&reports(&roster), &roster, &SeedConfig::default());

        let employees = sql.find("INSERT INTO employees").unwrap();
        let overrides = sql.find("generate_series").unwrap();
        let sat = sql.find("-- 2025-10-04").unwrap();
        let mon = sql.find("-- 2025-10-06").unwrap();
        let unknown = sql.find("-- N/A").unwrap();

        assert!(employees < overrides);
        assert!(overrides < sat);
        assert!(sat < mon);
        assert!(mon < unknown);
    }

    #[test]
    fn test_employee_rows() {
        let roster = roster();
        let sql = emit(&BTreeMap::new(), &roster, &SeedConfig::default());

        assert!(sql.contains(
            "  ('007', 'HYD007', 'Jane Doe', 'Hyderabad', 25000, true, NOW(), NOW()),\n  ('008', 'HYD008', 'John Roe', 'Hyderabad', 25000, true, NOW(), NOW())\nON CONFLICT"
        ));
    }

    #[test]
    fn test_weekend_block_ignores_presence() {
        let roster = roster();
        let sql = emit(&reports(&roster), &roster, &SeedConfig::default());

        let block = blocks(&sql)
            .into_iter()
            .find(|b| b.starts_with("-- 2025-10-04"))
            .unwrap();
        assert!(block.starts_with("-- 2025-10-04 (Saturday) - Weekend"));
        assert!(block.contains("'week_off'"));
        assert!(!block.contains("CASE"));
        assert!(!block.contains("'present'"));
    }

    #[test]
    fn test_weekday_block_uses_present_set() {
        let roster = roster();
        let sql = emit(&reports(&roster), &roster, &SeedConfig::default());

        let block = blocks(&sql)
            .into_iter()
            .find(|b| b.starts_with("-- 2025-10-06"))
            .unwrap();
        assert!(block.starts_with("-- 2025-10-06 (Monday) - 1 Present, 1 Absent"));
        assert!(block.contains("WHEN e.card_no IN ('007') THEN 'present'"));
        assert!(block.contains("ELSE 'absent'"));
        assert!(block.contains("a.attendance_date = '2025-10-06'::date"));
    }

    #[test]
    fn test_unknown_date_gets_regular_block() {
        let roster = roster();
        let sql = emit(&reports(&roster), &roster, &SeedConfig::default());

        let block = blocks(&sql)
            .into_iter()
            .find(|b| b.starts_with("-- N/A"))
            .unwrap();
        assert!(block.starts_with("-- N/A (Unknown) - 1 Present, 1 Absent"));
        assert!(block.contains("WHEN e.card_no IN ('008')"));
        assert!(!block.contains("week_off"));
    }

    #[test]
    fn test_override_range() {
        let roster = roster();
        let sql = emit(&BTreeMap::new(), &roster, &SeedConfig::default());

        assert!(sql.contains(
            "generate_series('2025-10-01'::date, '2025-10-07'::date, '1 day'::interval)"
        ));
        assert!(sql.contains("-- 2025-10-01 to 2025-10-07: Mark ALL employees as present (7 days)"));
    }

    #[test]
    fn test_no_override_range() {
        let roster = roster();
        let seed = SeedConfig {
            override_range: None,
            ..SeedConfig::default()
        };
        let sql = emit(&reports(&roster), &roster, &seed);

        assert!(!sql.contains("generate_series"));
        assert_eq!(blocks(&sql).len(), 4);
    }

    #[test]
    fn test_empty_roster_has_no_employee_block() {
        let sql = emit(&BTreeMap::new(), &EmployeeRoster::default(), &SeedConfig::default());

        assert!(!sql.contains("INSERT INTO employees"));
        assert!(sql.contains("generate_series"));
    }

    #[test]
    fn test_empty_present_set_is_plain_absent() {
        let report = DailyReport {
            date: "2025-10-06".to_string(),
            day_of_week: "Monday".to_string(),
            is_weekend: false,
            present_employees: BTreeSet::new(),
            absent_employees: ["007".to_string()].into(),
            present_count: 0,
            absent_count: 1,
            total_employees: 1,
        };

        let block = day_block(&report, &SeedConfig::default());

        assert!(!block.contains("IN ()"));
        assert!(block.contains("\n  'absent',\n"));
    }

    #[test]
    fn test_custom_branch_and_prefix() {
        let roster = roster();
        let seed = SeedConfig {
            branch: "Pune".to_string(),
            code_prefix: "PNQ-".to_string(),
            default_salary: 30000,
            marked_by: "csv_backfill".to_string(),
            ..SeedConfig::default()
        };
        let sql = emit(&reports(&roster), &roster, &seed);

        assert!(sql.contains("('007', 'PNQ-007', 'Jane Doe', 'Pune', 30000, true"));
        assert!(sql.contains("WHERE e.branch = 'Pune'"));
        assert!(sql.contains("'csv_backfill'"));
        assert!(!sql.contains("Hyderabad"));
    }

    #[test]
    fn test_snapshot_scope_limits_rows_to_known_employees() {
        let mut roster = EmployeeRoster::default();
        roster.record("1", "a", Some("2025-10-08"));
        roster.record("2", "b", Some("2025-10-10"));
        let presence = [("2025-10-08", "1"), ("2025-10-10", "2"), ("2025-10-11", "1")]
            .into_iter()
            .map(|(date, id)| (date.to_string(), BTreeSet::from([id.to_string()])))
            .collect();
        let reports = build_reports(&presence, &roster, RosterScope::Snapshot);
        let seed = SeedConfig {
            roster_scope: RosterScope::Snapshot,
            ..SeedConfig::default()
        };

        let sql = emit(&reports, &roster, &seed);
        let blocks = blocks(&sql);

        let wed = blocks.iter().find(|b| b.starts_with("-- 2025-10-08")).unwrap();
        assert!(wed.starts_with("-- 2025-10-08 (Wednesday) - 1 Present, 0 Absent"));
        assert!(wed.contains("WHERE e.branch = 'Hyderabad'\n  AND e.card_no IN ('1')\n"));

        let fri = blocks.iter().find(|b| b.starts_with("-- 2025-10-10")).unwrap();
        assert!(fri.contains("AND e.card_no IN ('1', '2')"));

        let sat = blocks.iter().find(|b| b.starts_with("-- 2025-10-11")).unwrap();
        assert!(sat.contains("'week_off'"));
        assert!(sat.contains("AND e.card_no IN ('1', '2')"));
    }

    #[test]
    fn test_final_scope_covers_whole_branch() {
        let roster = roster();
        let sql = emit(&reports(&roster), &roster, &SeedConfig::default());

        assert!(!sql.contains("AND e.card_no IN"));
        assert!(!sql.contains("AND FALSE"));
    }

    #[test]
    fn test_snapshot_scope_with_empty_report_inserts_nothing() {
        let report = DailyReport {
            date: "2025-10-06".to_string(),
            day_of_week: "Monday".to_string(),
            is_weekend: false,
            present_employees: BTreeSet::new(),
            absent_employees: BTreeSet::new(),
            present_count: 0,
            absent_count: 0,
            total_employees: 0,
        };

        assert_eq!(scope_filter(&report, RosterScope::Snapshot), "\n  AND FALSE");
        assert_eq!(scope_filter(&report, RosterScope::Final), "");
    }

    #[test]
    fn test_sql_literal_doubles_quotes() {
        assert_eq!(sql_literal("O'Brien"), "'O''Brien'");
        assert_eq!(sql_literal("plain"), "'plain'");
    }

    #[test]
    fn test_status_db_values() {
        assert_eq!(AttendanceStatus::Present.db_value(), "present");
        assert_eq!(AttendanceStatus::Absent.db_value(), "absent");
        assert_eq!(AttendanceStatus::WeekOff.db_value(), "week_off");
    }
}
