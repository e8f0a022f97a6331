//! Per-day present/absent partition of the roster.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::parser::{DailyPresenceSet, EmployeeRoster};

pub const UNKNOWN_DAY: &str = "Unknown";

/// Which employees a given day is measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterScope {
    /// Every employee in the final roster, even those who first show up later
    /// in the log. They count as absent on the earlier days.
    #[default]
    Final,
    /// Only employees already seen on or before the day.
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: String,
    pub day_of_week: String,
    pub is_weekend: bool,
    pub present_employees: BTreeSet<String>,
    pub absent_employees: BTreeSet<String>,
    pub present_count: usize,
    pub absent_count: usize,
    pub total_employees: usize,
}

/// Full weekday name and weekend flag for an ISO `YYYY-MM-DD` date.
///
/// Anything that does not parse yields `("Unknown", false)`.
pub fn day_of_week(date: &str) -> (String, bool) {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => (
            d.format("%A").to_string(),
            matches!(d.weekday(), Weekday::Sat | Weekday::Sun),
        ),
        Err(_) => (UNKNOWN_DAY.to_string(), false),
    }
}

fn roster_for<'a>(
    roster: &'a EmployeeRoster,
    scope: RosterScope,
    date: &str,
) -> BTreeSet<&'a str> {
    match scope {
        RosterScope::Final => roster.ids().collect(),
        RosterScope::Snapshot => roster
            .ids()
            .filter(|id| roster.first_seen(id).is_some_and(|seen| seen <= date))
            .collect(),
    }
}

/// Builds one [`DailyReport`] per date in `presence`, in ascending date order.
///
/// Dates with no DutyOn events at all never appear in `presence` and so get
/// no report.
#[tracing::instrument(skip_all, fields(days = presence.len(), employees = roster.len(), scope = ?scope))]
pub fn build_reports(
    presence: &DailyPresenceSet,
    roster: &EmployeeRoster,
    scope: RosterScope,
) -> BTreeMap<String, DailyReport> {
    let mut reports = BTreeMap::new();

    for (date, present) in presence {
        let expected = roster_for(roster, scope, date);
        let present_employees: BTreeSet<String> = present.clone();
        let absent_employees: BTreeSet<String> = expected
            .iter()
            .filter(|id| !present.contains(**id))
            .map(|id| id.to_string())
            .collect();

        let (day_of_week, is_weekend) = day_of_week(date);

        let report = DailyReport {
            date: date.clone(),
            day_of_week,
            is_weekend,
            present_count: present_employees.len(),
            absent_count: absent_employees.len(),
            total_employees: present_employees.len() + absent_employees.len(),
            present_employees,
            absent_employees,
        };

        log_report(&report, roster);
        reports.insert(date.clone(), report);
    }

    reports
}

fn log_report(report: &DailyReport, roster: &EmployeeRoster) {
    let labels = |ids: &BTreeSet<String>| {
        ids.iter()
            .map(|id| roster.label(id))
            .collect::<Vec<_>>()
            .join(", ")
    };

    info!(
        date = %report.date,
        day = %report.day_of_week,
        present = report.present_count,
        total = report.total_employees,
        "{} ({}) Present: {}/{} employees",
        report.date,
        report.day_of_week,
        report.present_count,
        report.total_employees
    );
    if !report.present_employees.is_empty() {
        info!(date = %report.date, "Present: {}", labels(&report.present_employees));
    }
    if !report.absent_employees.is_empty() {
        info!(date = %report.date, "Absent: {}", labels(&report.absent_employees));
    }
}
