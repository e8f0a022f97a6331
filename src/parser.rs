//! Tab-delimited attendance log parser.
//!
//! Reads the device export (`EnNo`, `Name`, `In/Out`, `DateTime` columns plus
//! whatever else the terminal writes) and folds it into a roster and a set of
//! present employees per calendar date.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, info, warn};

const COL_ID: &str = "EnNo";
const COL_NAME: &str = "Name";
const COL_EVENT: &str = "In/Out";
const COL_DATETIME: &str = "DateTime";

/// `date -> employee ids with at least one DutyOn that day`.
pub type DailyPresenceSet = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    DutyOn,
    DutyOff,
    Other(String),
}

impl From<&str> for EventType {
    fn from(raw: &str) -> Self {
        match raw {
            "DutyOn" => EventType::DutyOn,
            "DutyOff" => EventType::DutyOff,
            other => EventType::Other(other.to_string()),
        }
    }
}

/// A single clock event. Only lives for the duration of the parse.
#[derive(Debug, Clone)]
pub struct AttendanceEvent {
    pub employee_id: String,
    pub employee_name: String,
    pub event_type: EventType,
    pub timestamp: String,
}

impl AttendanceEvent {
    /// First whitespace-delimited token of the timestamp.
    pub fn date(&self) -> Option<&str> {
        self.timestamp.split_whitespace().next()
    }
}

/// Every employee seen in the log, keyed by card number.
#[derive(Debug, Clone, Default)]
pub struct EmployeeRoster {
    names: BTreeMap<String, String>,
    first_seen: BTreeMap<String, String>,
}

impl EmployeeRoster {
    /// Records `id -> name`. A later name replaces an earlier one.
    pub fn record(&mut self, id: &str, name: &str, date: Option<&str>) {
        self.names.insert(id.to_string(), name.to_string());

        if let Some(date) = date.filter(|d| !d.is_empty()) {
            self.first_seen
                .entry(id.to_string())
                .and_modify(|seen| {
                    if date < seen.as_str() {
                        *seen = date.to_string();
                    }
                })
                .or_insert_with(|| date.to_string());
        }
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Earliest date on which `id` appears in any row.
    pub fn first_seen(&self, id: &str) -> Option<&str> {
        self.first_seen.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// `(id, name)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `id(name)` label used in log output.
    pub fn label(&self, id: &str) -> String {
        format!("{}({})", id, self.name(id).unwrap_or(""))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub rows: usize,
    pub skipped: usize,
    pub duty_on: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub presence: DailyPresenceSet,
    pub roster: EmployeeRoster,
    pub stats: ParseStats,
}

struct Columns {
    id: usize,
    name: usize,
    event: usize,
    datetime: usize,
}

impl Columns {
    fn from_headers(headers: &ByteRecord) -> Result<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();

        let find = |col: &str| {
            names
                .iter()
                .position(|n| n == col)
                .ok_or_else(|| anyhow!("missing required column '{col}' in header {names:?}"))
        };

        Ok(Self {
            id: find(COL_ID)?,
            name: find(COL_NAME)?,
            event: find(COL_EVENT)?,
            datetime: find(COL_DATETIME)?,
        })
    }

    fn event(&self, record: &ByteRecord) -> Result<AttendanceEvent> {
        let field = |idx: usize, col: &str| {
            record
                .get(idx)
                .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
                .ok_or_else(|| anyhow!("missing field '{col}'"))
        };

        let employee_id = field(self.id, COL_ID)?;
        if employee_id.is_empty() {
            bail!("empty '{COL_ID}'");
        }

        Ok(AttendanceEvent {
            employee_id,
            employee_name: field(self.name, COL_NAME)?,
            event_type: EventType::from(field(self.event, COL_EVENT)?.as_str()),
            timestamp: field(self.datetime, COL_DATETIME)?,
        })
    }
}

/// Parses the attendance log at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its header lacks one of
/// the required columns. Bad rows are skipped, not reported as errors.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn parse_log(path: &Path) -> Result<ParsedLog> {
    info!("Analyzing attendance log");
    let file = File::open(path)
        .with_context(|| format!("Failed to open attendance log: {}", path.display()))?;
    parse_reader(file).with_context(|| format!("Failed to parse attendance log: {}", path.display()))
}

/// Parses an attendance log from any reader.
pub fn parse_reader<R: Read>(reader: R) -> Result<ParsedLog> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.byte_headers()?)?;
    let mut log = ParsedLog::default();
    let mut record = ByteRecord::new();

    loop {
        match rdr.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log.stats.rows += 1;
                log.stats.skipped += 1;
                warn!(error = %e, "Error reading row, skipping");
                continue;
            }
        }
        log.stats.rows += 1;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let event = match columns.event(&record) {
            Ok(event) => event,
            Err(e) => {
                log.stats.skipped += 1;
                warn!(line, error = %e, "Error processing row, skipping");
                continue;
            }
        };

        log.roster
            .record(&event.employee_id, &event.employee_name, event.date());

        if event.event_type == EventType::DutyOn {
            let Some(date) = event.date() else {
                log.stats.skipped += 1;
                warn!(line, employee_id = %event.employee_id, "DutyOn without a date, skipping");
                continue;
            };
            log.stats.duty_on += 1;
            log.presence
                .entry(date.to_string())
                .or_default()
                .insert(event.employee_id.clone());
        }
    }

    debug!(
        rows = log.stats.rows,
        skipped = log.stats.skipped,
        duty_on = log.stats.duty_on,
        "Attendance log parsed"
    );
    info!(
        employees = log.roster.len(),
        days = log.presence.len(),
        "Attendance log analyzed"
    );

    Ok(log)
}
