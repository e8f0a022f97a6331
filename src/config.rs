//! Seed parameters for SQL generation.
//!
//! Everything the generated SQL hardcodes about the target database lives in
//! [`SeedConfig`]: branch label, salary, employee code prefix, audit marker,
//! the optional blanket override range and how the roster is scoped per day.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::report::RosterScope;
use crate::sql::AttendanceStatus;

/// A date range whose attendance is forced to a single status for every
/// branch employee, regardless of what the log contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default = "default_override_status")]
    pub status: AttendanceStatus,
}

fn default_override_status() -> AttendanceStatus {
    AttendanceStatus::Present
}

/// Parameters for the emitted `employees`/`attendance` SQL.
///
/// Stored as a JSON object on disk; missing keys take the defaults:
/// ```json
/// {
///   "branch": "Hyderabad",
///   "default_salary": 25000,
///   "code_prefix": "HYD",
///   "marked_by": "system_import",
///   "override_range": { "start": "2025-10-01", "end": "2025-10-07", "status": "present" },
///   "roster_scope": "final"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub branch: String,
    pub default_salary: u32,
    pub code_prefix: String,
    pub marked_by: String,
    pub override_range: Option<OverrideRange>,
    pub roster_scope: RosterScope,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            branch: "Hyderabad".to_string(),
            default_salary: 25000,
            code_prefix: "HYD".to_string(),
            marked_by: "system_import".to_string(),
            override_range: Some(OverrideRange {
                start: NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid override start"),
                end: NaiveDate::from_ymd_opt(2025, 10, 7).expect("valid override end"),
                status: AttendanceStatus::Present,
            }),
            roster_scope: RosterScope::Final,
        }
    }
}

impl SeedConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed config: {path}"))?;
        let config: SeedConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid seed config: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configs that would produce nonsensical SQL.
    pub fn validate(&self) -> Result<()> {
        if self.branch.trim().is_empty() {
            bail!("branch must not be empty");
        }
        if let Some(range) = &self.override_range {
            if range.end < range.start {
                bail!(
                    "override range ends ({}) before it starts ({})",
                    range.end,
                    range.start
                );
            }
        }
        Ok(())
    }

    /// Synthetic employee code, e.g. `HYD007`.
    pub fn emp_code(&self, employee_id: &str) -> String {
        format!("{}{}", self.code_prefix, employee_id)
    }
}
