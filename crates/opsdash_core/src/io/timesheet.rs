//! Timesheet CSV import.
//!
//! # Responsibility
//! - Turn a flat timesheet export into projects, employees and time entries.
//!
//! # Invariants
//! - Projects are keyed by project code, employees by employee number; each
//!   appears once no matter how many rows reference it.
//! - Rows without a parseable date or with non-positive hours still count
//!   towards the summary but produce no time entry.
//! - Returned time entries only reference returned projects/employees.

use crate::io::{checked_reader, record_line, ImportError, RowError};
use crate::model::date::DateRange;
use crate::model::employee::{Employee, EmployeeRole};
use crate::model::ledger::TimeEntry;
use crate::model::project::{Project, ProjectStatus};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

/// Timesheet columns, read by position.
pub const TIMESHEET_COLUMNS: [&str; 10] = [
    "Employee ID",
    "Employee Name",
    "Project ID",
    "Hours Date",
    "Entered Hours",
    "Comments",
    "PLC ID",
    "PLC Desc",
    "Billing Rate",
    "Amount",
];

/// Columns that must be present; the rest are optional.
const REQUIRED_COLUMNS: usize = 5;

/// Timesheet day format, e.g. `05-Mar-24`.
pub const TIMESHEET_DATE_FORMAT: &str = "%d-%b-%y";

const IMPORTED_PROJECT_DESCRIPTION: &str = "Imported from timesheet CSV";

static EMPLOYEE_NUMBER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d+\)").expect("valid employee suffix regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimesheetSummary {
    pub total_rows: usize,
    pub unique_projects: usize,
    pub unique_employees: usize,
    pub time_entries: usize,
    /// Rows that were read but produced no time entry.
    pub skipped_rows: usize,
    /// Earliest and latest valid row date.
    pub date_range: Option<DateRange>,
    /// Sum of hours over rows that produced a time entry.
    pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimesheetImport {
    pub projects: Vec<Project>,
    pub employees: Vec<Employee>,
    pub time_entries: Vec<TimeEntry>,
    pub summary: TimesheetSummary,
    pub rejected: Vec<RowError>,
}

/// `Doe, Jane (1042)` -> `Jane Doe`; names without a comma are kept.
pub fn clean_employee_name(raw: &str) -> String {
    let stripped = EMPLOYEE_NUMBER_SUFFIX.replace_all(raw, "");
    let stripped = stripped.trim();
    match stripped.split_once(',') {
        Some((last, first)) => {
            let joined = format!("{} {}", first.trim(), last.trim());
            let joined = joined.trim();
            if joined.is_empty() {
                raw.trim().to_string()
            } else {
                joined.to_string()
            }
        }
        None => stripped.to_string(),
    }
}

/// Parses a `DD-Mon-YY` day; `None` when the cell does not match.
pub fn parse_timesheet_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), TIMESHEET_DATE_FORMAT).ok()
}

fn cell(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).map_or("", str::trim)
}

/// Reads a timesheet export.
///
/// Rows with a blank project code or a non-numeric employee number are
/// rejected. Unparseable hours count as zero.
///
/// # Errors
/// - `HeaderMismatch` when the required leading columns are missing.
/// - `AllRowsRejected` when the file has rows and every one is rejected.
pub fn read_timesheet<R: Read>(reader: R) -> Result<TimesheetImport, ImportError> {
    let (mut csv_reader, _) = checked_reader(reader, &TIMESHEET_COLUMNS[..REQUIRED_COLUMNS])?;

    let mut projects: BTreeMap<String, Project> = BTreeMap::new();
    let mut employees: BTreeMap<u64, Employee> = BTreeMap::new();
    let mut time_entries = Vec::new();
    let mut rejected = Vec::new();
    let mut total_rows = 0usize;
    let mut skipped_rows = 0usize;
    let mut total_hours = 0.0;
    let mut first_day: Option<NaiveDate> = None;
    let mut last_day: Option<NaiveDate> = None;

    for (index, record) in csv_reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                rejected.push(RowError {
                    line: fallback_line,
                    message: err.to_string(),
                });
                continue;
            }
        };
        let line = record_line(&record, fallback_line);

        let employee_number = match cell(&record, 0).parse::<u64>() {
            Ok(number) => number,
            Err(_) => {
                rejected.push(RowError {
                    line,
                    message: format!("Employee ID: `{}` is not a number", cell(&record, 0)),
                });
                continue;
            }
        };
        let project_code = cell(&record, 2);
        if project_code.is_empty() {
            rejected.push(RowError {
                line,
                message: "Project ID must not be empty".to_string(),
            });
            continue;
        }

        total_rows += 1;
        let hours = cell(&record, 4)
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .unwrap_or(0.0);
        let date = parse_timesheet_date(cell(&record, 3));
        if let Some(day) = date {
            first_day = Some(first_day.map_or(day, |current| current.min(day)));
            last_day = Some(last_day.map_or(day, |current| current.max(day)));
        }

        let project_id = projects
            .entry(project_code.to_string())
            .or_insert_with(|| {
                let mut project = Project::new(project_code, ProjectStatus::Active);
                project.description = IMPORTED_PROJECT_DESCRIPTION.to_string();
                project
            })
            .id;
        let employee_id = employees
            .entry(employee_number)
            .or_insert_with(|| {
                let raw_name = cell(&record, 1);
                let name = match clean_employee_name(raw_name) {
                    name if name.is_empty() => format!("Employee {employee_number}"),
                    name => name,
                };
                let rate = cell(&record, 8)
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite() && *value >= 0.0)
                    .unwrap_or(0.0);
                Employee::new(name, EmployeeRole::from(cell(&record, 7)), rate)
            })
            .id;

        match date {
            Some(day) if hours > 0.0 => {
                total_hours += hours;
                let mut entry = TimeEntry::new(employee_id, project_id, day, hours);
                entry.description = cell(&record, 5).to_string();
                time_entries.push(entry);
            }
            _ => skipped_rows += 1,
        }
    }

    if total_rows == 0 && !rejected.is_empty() {
        return Err(ImportError::AllRowsRejected { rejected });
    }

    let date_range = match (first_day, last_day) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        _ => None,
    };
    let summary = TimesheetSummary {
        total_rows,
        unique_projects: projects.len(),
        unique_employees: employees.len(),
        time_entries: time_entries.len(),
        skipped_rows,
        date_range,
        total_hours,
    };

    Ok(TimesheetImport {
        projects: projects.into_values().collect(),
        employees: employees.into_values().collect(),
        time_entries,
        summary,
        rejected,
    })
}
