//! CSV import and export.
//!
//! # Responsibility
//! - Parse project, employee and timesheet CSV into validated records.
//! - Write records (optionally with derived metric columns) and report
//!   tables back out as CSV.
//!
//! # Invariants
//! - A malformed row is rejected on its own with its 1-based line number;
//!   other rows still import.
//! - Headers must start with the exact column list; trailing extra columns
//!   are ignored so enriched exports re-import cleanly.
//! - Exported record columns re-import to identical field values.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod employees;
pub mod projects;
pub mod table;
pub mod timesheet;

pub use employees::{read_employees, write_employees, EMPLOYEE_COLUMNS, EMPLOYEE_METRIC_COLUMNS};
pub use projects::{read_projects, write_projects, PROJECT_COLUMNS, PROJECT_METRIC_COLUMNS};
pub use table::{write_section, write_table};
pub use timesheet::{read_timesheet, TimesheetImport, TimesheetSummary, TIMESHEET_COLUMNS};

/// One rejected input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line in the source file (the header is line 1).
    pub line: u64,
    pub message: String,
}

impl Display for RowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Accepted records plus per-row rejections.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<RowError>,
}

impl<T> Default for ImportReport<T> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> ImportReport<T> {
    /// Fails with `AllRowsRejected` when there were rows and none survived.
    pub(crate) fn finish(self) -> Result<Self, ImportError> {
        if self.accepted.is_empty() && !self.rejected.is_empty() {
            return Err(ImportError::AllRowsRejected {
                rejected: self.rejected,
            });
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// Header row does not start with the expected columns.
    HeaderMismatch {
        expected: Vec<&'static str>,
        found: Vec<String>,
    },
    AllRowsRejected {
        rejected: Vec<RowError>,
    },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read import file: {err}"),
            Self::Csv(err) => write!(f, "malformed csv: {err}"),
            Self::HeaderMismatch { expected, found } => write!(
                f,
                "header mismatch: expected `{}`, found `{}`",
                expected.join(","),
                found.join(",")
            ),
            Self::AllRowsRejected { rejected } => {
                write!(f, "all {} rows rejected", rejected.len())?;
                if let Some(first) = rejected.first() {
                    write!(f, " (first: {first})")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for ImportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to write export: {err}"),
            Self::Csv(err) => write!(f, "failed to encode csv: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// Opens a CSV reader and checks that the header starts with `expected`.
pub(crate) fn checked_reader<R: std::io::Read>(
    reader: R,
    expected: &[&'static str],
) -> Result<(csv::Reader<R>, csv::StringRecord), ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let matches = headers.len() >= expected.len()
        && headers
            .iter()
            .zip(expected)
            .all(|(found, wanted)| found.trim() == *wanted);
    if !matches {
        return Err(ImportError::HeaderMismatch {
            expected: expected.to_vec(),
            found: headers.iter().map(str::to_string).collect(),
        });
    }
    Ok((csv_reader, headers))
}

/// Line number of a record, falling back to `fallback` when unknown.
pub(crate) fn record_line(record: &csv::StringRecord, fallback: u64) -> u64 {
    record.position().map_or(fallback, |position| position.line())
}

/// Text form of a float that parses back to the same value.
pub(crate) fn format_number(value: f64) -> String {
    value.to_string()
}

/// Parses a numeric cell; blank text maps to `default`.
pub(crate) fn parse_number(field: &str, value: &str, default: f64) -> Result<f64, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| format!("{field}: `{trimmed}` is not a number"))
}
