use std::collections::BTreeMap;

use serde::Serialize;

use crate::report::DailyReport;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_employees: usize,
    pub total_days: usize,
    pub total_present: usize,
    pub overall_percentage: f64,
}

impl RunSummary {
    /// Overall attendance is present marks over the employees each day was
    /// measured against, which is `days × employees` under the final roster.
    pub fn from_reports(reports: &BTreeMap<String, DailyReport>, total_employees: usize) -> Self {
        let total_days = reports.len();
        let total_present = reports.values().map(|r| r.present_count).sum();
        let total_expected = reports.values().map(|r| r.total_employees).sum();

        RunSummary {
            total_employees,
            total_days,
            total_present,
            overall_percentage: Self::pct(total_present, total_expected),
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Overall attendance to one decimal place, e.g. `60.0%`.
    pub fn percentage_display(&self) -> String {
        format!("{:.1}%", self.overall_percentage)
    }
}
